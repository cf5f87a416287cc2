use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metal portion of a variant. Wastage is `gross_weight_g - net_weight_g`;
/// the invariant gross >= net is enforced at write time by the services.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "metal_components")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub variant_id: Uuid,
    pub metal_type: MetalType,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub purity_k: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 3)))")]
    pub net_weight_g: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 3)))")]
    pub gross_weight_g: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub metal_rate_per_g: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub making_charge_per_g: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub making_charge_flat: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum MetalType {
    #[sea_orm(string_value = "gold")]
    Gold,
    #[sea_orm(string_value = "silver")]
    Silver,
    #[sea_orm(string_value = "platinum")]
    Platinum,
}
