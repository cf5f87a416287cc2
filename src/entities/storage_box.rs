use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Box within a shelf; the unit products are actually stored in.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "billing_system_storage_boxes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub shelf_id: i64,
    pub box_code: String,
    #[sea_orm(nullable)]
    pub box_label: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::storage_shelf::Entity",
        from = "Column::ShelfId",
        to = "super::storage_shelf::Column::Id"
    )]
    Shelf,
    #[sea_orm(has_many = "super::product_location::Entity")]
    ProductLocations,
}

impl Related<super::storage_shelf::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shelf.def()
    }
}

impl Related<super::product_location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductLocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
