use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Top level of the physical storage hierarchy (a room or store area).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "billing_system_storage_locations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub location_code: String,
    pub location_name: String,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::storage_shelf::Entity")]
    Shelves,
}

impl Related<super::storage_shelf::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shelves.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
