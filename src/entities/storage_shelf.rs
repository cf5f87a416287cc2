use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shelf within a storage location.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "billing_system_storage_shelves")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub location_id: i64,
    pub shelf_code: String,
    pub shelf_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::storage_location::Entity",
        from = "Column::LocationId",
        to = "super::storage_location::Column::Id"
    )]
    Location,
    #[sea_orm(has_many = "super::storage_box::Entity")]
    Boxes,
}

impl Related<super::storage_location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::storage_box::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Boxes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
