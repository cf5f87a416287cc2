use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sellable product configuration (weight, purity, stones).
///
/// `base_cost` is derived by the pricing service from component rows and is
/// never hand-edited.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((12, 3)))", nullable)]
    pub net_weight_g: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 3)))", nullable)]
    pub gross_weight_g: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub purity_k: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub base_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::metal_component::Entity")]
    MetalComponents,
    #[sea_orm(has_many = "super::diamond_component::Entity")]
    DiamondComponents,
    #[sea_orm(has_many = "super::stock_item::Entity")]
    StockItems,
}

impl Related<super::metal_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MetalComponents.def()
    }
}

impl Related<super::diamond_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiamondComponents.def()
    }
}

impl Related<super::stock_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
