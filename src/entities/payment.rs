use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment recorded against an invoice. Multiple rows per invoice are
/// allowed (split tender, later settlement of an outstanding balance).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-facing number, PAY-{seq:06}, global sequence.
    #[sea_orm(unique)]
    pub payment_number: String,
    pub invoice_id: Uuid,
    pub method: PaymentMethod,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    #[sea_orm(nullable)]
    pub card_last_four: Option<String>,
    #[sea_orm(nullable)]
    pub card_type: Option<String>,
    #[sea_orm(nullable)]
    pub bank_name: Option<String>,
    #[sea_orm(nullable)]
    pub cheque_number: Option<String>,
    #[sea_orm(nullable)]
    pub upi_reference: Option<String>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub received_by: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales_invoice::Entity",
        from = "Column::InvoiceId",
        to = "super::sales_invoice::Column::Id"
    )]
    Invoice,
}

impl Related<super::sales_invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "upi")]
    Upi,
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    #[sea_orm(string_value = "cheque")]
    Cheque,
}
