use crate::{
    db::literal::{insert_statement, SqlValue},
    entities::{product_location, product_location::ProductKind, ProductLocation},
    errors::ServiceError,
    services::storage::resolve_box_details,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const LOCATION_COLUMNS: [&str; 13] = [
    "box_id",
    "product_kind",
    "product_id",
    "product_name",
    "sku",
    "quantity",
    "serial_numbers",
    "metal_weight_g",
    "purity_k",
    "zakya_metadata",
    "last_counted_by",
    "created_at",
    "updated_at",
];

const MOVEMENT_COLUMNS: [&str; 13] = [
    "product_kind",
    "product_id",
    "sku",
    "product_name",
    "movement_type",
    "quantity_moved",
    "to_location_id",
    "to_shelf_id",
    "to_box_id",
    "moved_by",
    "reason",
    "serial_numbers_moved",
    "moved_at",
];

#[derive(Clone, Debug, Serialize)]
pub struct UploadError {
    /// 1-based data row (header is row 1).
    pub row: usize,
    pub sku: String,
    pub error: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct UploadSummary {
    pub total_rows: usize,
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<UploadError>,
}

/// Bulk-loads spreadsheet rows into product locations.
///
/// Each row becomes one generated INSERT into the location table plus one
/// `add` ledger row, executed together in a per-row transaction; a bad row
/// is collected and skipped, never aborting the batch.
#[derive(Clone)]
pub struct InventoryUploadService {
    db: Arc<DatabaseConnection>,
}

impl InventoryUploadService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn upload_rows(
        &self,
        rows: &[Value],
        uploaded_by: &str,
    ) -> Result<UploadSummary, ServiceError> {
        let mut processed = 0usize;
        let mut errors = Vec::new();

        for (idx, row) in rows.iter().enumerate() {
            let row_number = idx + 2;
            let sku = row
                .get("sku")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();

            match self.load_row(row, uploaded_by).await {
                Ok(()) => processed += 1,
                Err(e) => {
                    warn!("Upload row {} failed: {}", row_number, e);
                    errors.push(UploadError {
                        row: row_number,
                        sku,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!("Processed {}/{} upload rows", processed, rows.len());
        Ok(UploadSummary {
            total_rows: rows.len(),
            processed,
            failed: errors.len(),
            errors,
        })
    }

    async fn load_row(&self, row: &Value, uploaded_by: &str) -> Result<(), ServiceError> {
        let parsed = ParsedRow::try_from_value(row)?;

        let txn = self.db.begin().await?;

        let storage = resolve_box_details(&txn, parsed.box_id).await?;

        let existing = ProductLocation::find()
            .filter(product_location::Column::BoxId.eq(parsed.box_id))
            .filter(product_location::Column::ProductKind.eq(parsed.kind))
            .filter(product_location::Column::ProductId.eq(parsed.product_id.clone()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Product {} already exists in box {}",
                parsed.product_id, parsed.box_id
            )));
        }

        let now = Utc::now().to_rfc3339();
        let kind_literal = match parsed.kind {
            ProductKind::RealJewelry => "real_jewelry",
            ProductKind::ZakyaProduct => "zakya_product",
        };

        let location_values = [
            SqlValue::Int(parsed.box_id),
            SqlValue::Text(kind_literal.to_string()),
            SqlValue::Text(parsed.product_id.clone()),
            SqlValue::Text(parsed.product_name.clone()),
            parsed
                .sku
                .clone()
                .map(SqlValue::Text)
                .unwrap_or(SqlValue::Null),
            SqlValue::Int(parsed.quantity),
            if parsed.serial_numbers.is_empty() {
                SqlValue::Null
            } else {
                SqlValue::Json(json!(parsed.serial_numbers))
            },
            parsed.metal_weight_g.map(SqlValue::Float).unwrap_or(SqlValue::Null),
            parsed.purity_k.map(SqlValue::Float).unwrap_or(SqlValue::Null),
            parsed
                .zakya_metadata
                .clone()
                .map(SqlValue::Json)
                .unwrap_or(SqlValue::Null),
            SqlValue::Text(uploaded_by.to_string()),
            SqlValue::Text(now.clone()),
            SqlValue::Text(now.clone()),
        ];
        let stmt = insert_statement(
            "billing_system_product_locations",
            &LOCATION_COLUMNS,
            &location_values,
        );
        txn.execute_unprepared(&stmt).await?;

        let movement_values = [
            SqlValue::Text(kind_literal.to_string()),
            SqlValue::Text(parsed.product_id.clone()),
            parsed.sku.map(SqlValue::Text).unwrap_or(SqlValue::Null),
            SqlValue::Text(parsed.product_name.clone()),
            SqlValue::Text("add".to_string()),
            SqlValue::Int(parsed.quantity),
            SqlValue::Int(storage.location_id),
            SqlValue::Int(storage.shelf_id),
            SqlValue::Int(parsed.box_id),
            SqlValue::Text(uploaded_by.to_string()),
            SqlValue::Text("Bulk inventory upload".to_string()),
            if parsed.serial_numbers.is_empty() {
                SqlValue::Null
            } else {
                SqlValue::Json(json!(parsed.serial_numbers))
            },
            SqlValue::Text(now),
        ];
        let stmt = insert_statement(
            "billing_system_product_movements",
            &MOVEMENT_COLUMNS,
            &movement_values,
        );
        txn.execute_unprepared(&stmt).await?;

        txn.commit().await?;
        Ok(())
    }
}

struct ParsedRow {
    box_id: i64,
    kind: ProductKind,
    product_id: String,
    product_name: String,
    sku: Option<String>,
    quantity: i64,
    serial_numbers: Vec<String>,
    metal_weight_g: Option<f64>,
    purity_k: Option<f64>,
    zakya_metadata: Option<Value>,
}

impl ParsedRow {
    fn try_from_value(row: &Value) -> Result<Self, ServiceError> {
        let box_id = row
            .get("box_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| ServiceError::ValidationError("Missing box_id".to_string()))?;
        let kind = match row.get("product_kind").and_then(Value::as_str) {
            Some("real_jewelry") => ProductKind::RealJewelry,
            Some("zakya_product") => ProductKind::ZakyaProduct,
            Some(other) => {
                return Err(ServiceError::ValidationError(format!(
                    "Unknown product_kind: {}",
                    other
                )))
            }
            None => {
                return Err(ServiceError::ValidationError(
                    "Missing product_kind".to_string(),
                ))
            }
        };
        let product_id = row
            .get("product_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::ValidationError("Missing product_id".to_string()))?
            .to_string();
        let product_name = row
            .get("product_name")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::ValidationError("Missing product_name".to_string()))?
            .to_string();
        let quantity = row.get("quantity").and_then(Value::as_i64).unwrap_or(0);

        let serial_numbers = row
            .get("notes")
            .and_then(Value::as_str)
            .map(parse_serial_numbers)
            .unwrap_or_default();

        let metal_weight_g = row.get("metal_weight_g").and_then(Value::as_f64);
        let purity_k = row.get("purity_k").and_then(Value::as_f64);
        let zakya_metadata = row.get("zakya_metadata").filter(|v| v.is_object()).cloned();

        match kind {
            ProductKind::RealJewelry => {
                if metal_weight_g.is_none() || purity_k.is_none() {
                    return Err(ServiceError::ValidationError(
                        "real_jewelry rows require metal_weight_g and purity_k".to_string(),
                    ));
                }
            }
            ProductKind::ZakyaProduct => {
                if zakya_metadata.is_none() {
                    return Err(ServiceError::ValidationError(
                        "zakya_product rows require zakya_metadata".to_string(),
                    ));
                }
            }
        }

        let quantity = if quantity > 0 {
            quantity
        } else if !serial_numbers.is_empty() {
            serial_numbers.len() as i64
        } else {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        };

        Ok(Self {
            box_id,
            kind,
            product_id,
            product_name,
            sku: row
                .get("sku")
                .and_then(Value::as_str)
                .map(str::to_string),
            quantity,
            serial_numbers,
            metal_weight_g,
            purity_k,
            zakya_metadata,
        })
    }
}

/// Pulls serial numbers out of a free-text notes field of the form
/// `... Serial: MJ-001, MJ-002`.
fn parse_serial_numbers(notes: &str) -> Vec<String> {
    match notes.split_once("Serial:") {
        Some((_, rest)) => rest
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serials_from_notes() {
        assert_eq!(
            parse_serial_numbers("22K set. Serial: MJ-001, MJ-002, "),
            vec!["MJ-001".to_string(), "MJ-002".to_string()]
        );
        assert!(parse_serial_numbers("no serials here").is_empty());
    }

    #[test]
    fn rejects_rows_missing_kind_fields() {
        let row = json!({
            "box_id": 1,
            "product_kind": "real_jewelry",
            "product_id": "RJ-1",
            "product_name": "Kundan Choker",
            "quantity": 1
        });
        assert!(ParsedRow::try_from_value(&row).is_err());
    }

    #[test]
    fn quantity_defaults_to_serial_count() {
        let row = json!({
            "box_id": 1,
            "product_kind": "real_jewelry",
            "product_id": "RJ-1",
            "product_name": "Kundan Choker",
            "metal_weight_g": 42.5,
            "purity_k": 22.0,
            "notes": "Serial: A, B, C"
        });
        let parsed = ParsedRow::try_from_value(&row).expect("row should parse");
        assert_eq!(parsed.quantity, 3);
    }
}
