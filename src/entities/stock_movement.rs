use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status-change record for a serialized stock item.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub stock_item_id: Uuid,
    pub movement_type: String,
    #[sea_orm(nullable)]
    pub reference_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub moved_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_item::Entity",
        from = "Column::StockItemId",
        to = "super::stock_item::Column::Id"
    )]
    StockItem,
}

impl Related<super::stock_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
