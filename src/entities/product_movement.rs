use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only ledger row recording every stock mutation.
///
/// Never updated or deleted; this table is the sole audit trail for
/// physical inventory.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "billing_system_product_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_kind: super::product_location::ProductKind,
    pub product_id: String,
    #[sea_orm(nullable)]
    pub sku: Option<String>,
    pub product_name: String,
    pub movement_type: MovementType,
    pub quantity_moved: i32,
    #[sea_orm(nullable)]
    pub from_location_id: Option<i64>,
    #[sea_orm(nullable)]
    pub from_shelf_id: Option<i64>,
    #[sea_orm(nullable)]
    pub from_box_id: Option<i64>,
    #[sea_orm(nullable)]
    pub to_location_id: Option<i64>,
    #[sea_orm(nullable)]
    pub to_shelf_id: Option<i64>,
    #[sea_orm(nullable)]
    pub to_box_id: Option<i64>,
    pub moved_by: String,
    #[sea_orm(nullable)]
    pub reason: Option<String>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub serial_numbers_moved: Option<Json>,
    pub moved_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    #[sea_orm(string_value = "add")]
    Add,
    #[sea_orm(string_value = "transfer")]
    Transfer,
    /// Quantity overwrite with an operator-supplied reason.
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    /// Quantity overwrite without a reason (stock count).
    #[sea_orm(string_value = "recount")]
    Recount,
    #[sea_orm(string_value = "remove")]
    Remove,
}
