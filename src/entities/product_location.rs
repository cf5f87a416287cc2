use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Current-state row: quantity of one product in one box.
///
/// At most one row exists per (box_id, product_kind, product_id); quantity
/// updates happen in place and the row is deleted once quantity reaches zero.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "billing_system_product_locations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub box_id: i64,
    pub product_kind: ProductKind,
    pub product_id: String,
    pub product_name: String,
    #[sea_orm(nullable)]
    pub sku: Option<String>,
    pub quantity: i32,
    /// Serial numbers of the pieces in this box, for serialized jewelry.
    #[sea_orm(column_type = "Json", nullable)]
    pub serial_numbers: Option<Json>,
    /// Populated for real_jewelry rows.
    #[sea_orm(column_type = "Decimal(Some((12, 3)))", nullable)]
    pub metal_weight_g: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub purity_k: Option<Decimal>,
    /// Populated for zakya_product rows; opaque to this system.
    #[sea_orm(column_type = "Json", nullable)]
    pub zakya_metadata: Option<Json>,
    #[sea_orm(nullable)]
    pub last_counted_by: Option<String>,
    #[sea_orm(nullable)]
    pub last_counted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::storage_box::Entity",
        from = "Column::BoxId",
        to = "super::storage_box::Column::Id"
    )]
    Box,
}

impl Related<super::storage_box::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Box.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The two kinds of tracked products: serialized in-house jewelry and
/// SKUs mirrored from the Zakya ERP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    #[sea_orm(string_value = "real_jewelry")]
    RealJewelry,
    #[sea_orm(string_value = "zakya_product")]
    ZakyaProduct,
}
