use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived pricing totals for a variant. Mutated only by the pricing
/// service; never created or edited from user input.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "variant_pricing_breakdown")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub variant_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_metal_value: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_stone_value: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_making_charges: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_wastage_charges: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub final_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub suggested_retail_price: Decimal,
    pub last_calculated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id"
    )]
    Variant,
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
