use crate::{
    entities::{
        product_location, product_movement,
        product_location::ProductKind,
        product_movement::MovementType,
        storage_box, storage_shelf, ProductLocation, ProductMovement, StorageBox, StorageShelf,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::storage::{resolve_box_details, BoxDetails},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    NotSet, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone, Debug, Deserialize)]
pub struct AddProductInput {
    pub box_id: i64,
    pub product_kind: ProductKind,
    pub product_id: String,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub serial_numbers: Option<Vec<String>>,
    pub metal_weight_g: Option<Decimal>,
    pub purity_k: Option<Decimal>,
    pub zakya_metadata: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductSearchFilters {
    pub sku: Option<String>,
    pub product_name: Option<String>,
    pub product_kind: Option<ProductKind>,
    pub location_id: Option<i64>,
    pub shelf_id: Option<i64>,
    pub box_id: Option<i64>,
    pub has_serials: Option<bool>,
    pub min_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
}

/// A product-location row joined with its box, shelf, and location.
#[derive(Clone, Debug, Serialize)]
pub struct ProductLocationDetails {
    pub record: product_location::Model,
    pub storage: BoxDetails,
}

/// A ledger row with from/to storage codes resolved for display.
#[derive(Clone, Debug, Serialize)]
pub struct MovementDetails {
    pub movement: product_movement::Model,
    pub from_storage: Option<BoxDetails>,
    pub to_storage: Option<BoxDetails>,
}

#[derive(Clone, Debug, Serialize)]
pub struct InventorySummaryRow {
    pub location_id: i64,
    pub location_name: String,
    pub product_kind: ProductKind,
    pub product_id: String,
    pub product_name: String,
    pub sku: Option<String>,
    pub total_quantity: i64,
    pub num_boxes: usize,
    pub box_codes: Vec<String>,
}

/// Tracks current quantity-at-location per product and appends a ledger row
/// for every mutation. Each operation runs its state update and its ledger
/// insert in one transaction.
#[derive(Clone)]
pub struct ProductTrackerService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductTrackerService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Adds product quantity to a box, merging into the existing row for the
    /// same (box, kind, product) when present.
    #[instrument(skip(self, input), fields(box_id = input.box_id, product_id = %input.product_id))]
    pub async fn add_product(
        &self,
        input: AddProductInput,
        moved_by: &str,
    ) -> Result<product_location::Model, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        // Box must exist; also resolves shelf/location for the ledger row.
        resolve_box_details(&txn, input.box_id).await?;

        let existing = ProductLocation::find()
            .filter(product_location::Column::BoxId.eq(input.box_id))
            .filter(product_location::Column::ProductKind.eq(input.product_kind))
            .filter(product_location::Column::ProductId.eq(input.product_id.clone()))
            .one(&txn)
            .await?;

        let now = Utc::now();
        let (model, reason) = match existing {
            Some(row) => {
                let new_quantity = row.quantity + input.quantity;
                let merged_serials = merge_serials(&row.serial_numbers, &input.serial_numbers);
                let mut row: product_location::ActiveModel = row.into();
                row.quantity = Set(new_quantity);
                row.serial_numbers = Set(merged_serials);
                row.last_counted_by = Set(Some(moved_by.to_string()));
                row.last_counted_at = Set(Some(now));
                row.updated_at = Set(now);
                (row.update(&txn).await?, "Added to existing stock")
            }
            None => {
                let row = product_location::ActiveModel {
                    id: NotSet,
                    box_id: Set(input.box_id),
                    product_kind: Set(input.product_kind),
                    product_id: Set(input.product_id.clone()),
                    product_name: Set(input.product_name.clone()),
                    sku: Set(input.sku.clone()),
                    quantity: Set(input.quantity),
                    serial_numbers: Set(input.serial_numbers.as_ref().map(|s| json!(s))),
                    metal_weight_g: Set(input.metal_weight_g),
                    purity_k: Set(input.purity_k),
                    zakya_metadata: Set(input.zakya_metadata.clone()),
                    last_counted_by: Set(Some(moved_by.to_string())),
                    last_counted_at: Set(Some(now)),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                (row.insert(&txn).await?, "Initial stock addition")
            }
        };

        record_movement(
            &txn,
            MovementRecord {
                product_kind: input.product_kind,
                product_id: input.product_id,
                sku: input.sku,
                product_name: input.product_name,
                movement_type: MovementType::Add,
                quantity_moved: input.quantity,
                from_box_id: None,
                to_box_id: Some(input.box_id),
                moved_by: moved_by.to_string(),
                reason: Some(reason.to_string()),
                notes: None,
                serial_numbers: input.serial_numbers,
            },
        )
        .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductAdded {
                location_record_id: model.id,
                quantity: input.quantity,
            })
            .await;

        info!("Added {} units to box {}", input.quantity, model.box_id);
        Ok(model)
    }

    /// Overwrites a row's quantity (stock count or manual correction).
    ///
    /// A caller-supplied reason marks the ledger row as an `adjustment`;
    /// without one it is a `recount`.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        location_record_id: i64,
        new_quantity: i32,
        updated_by: &str,
        reason: Option<String>,
    ) -> Result<product_location::Model, ServiceError> {
        if new_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity cannot be negative".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let current = ProductLocation::find_by_id(location_record_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Product location {} not found",
                    location_record_id
                ))
            })?;

        let old_quantity = current.quantity;
        let diff = new_quantity - old_quantity;
        let box_id = current.box_id;
        let kind = current.product_kind;
        let product_id = current.product_id.clone();
        let sku = current.sku.clone();
        let product_name = current.product_name.clone();

        let now = Utc::now();
        let mut row: product_location::ActiveModel = current.into();
        row.quantity = Set(new_quantity);
        row.last_counted_by = Set(Some(updated_by.to_string()));
        row.last_counted_at = Set(Some(now));
        row.updated_at = Set(now);
        let model = row.update(&txn).await?;

        let movement_type = if reason.is_some() {
            MovementType::Adjustment
        } else {
            MovementType::Recount
        };
        let ledger_reason = reason.unwrap_or_else(|| {
            format!("Quantity adjusted from {} to {}", old_quantity, new_quantity)
        });

        record_movement(
            &txn,
            MovementRecord {
                product_kind: kind,
                product_id,
                sku,
                product_name,
                movement_type,
                quantity_moved: diff.abs(),
                from_box_id: (diff < 0).then_some(box_id),
                to_box_id: (diff > 0).then_some(box_id),
                moved_by: updated_by.to_string(),
                reason: Some(ledger_reason),
                notes: None,
                serial_numbers: None,
            },
        )
        .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductQuantityAdjusted {
                location_record_id,
                old_quantity,
                new_quantity,
            })
            .await;

        Ok(model)
    }

    /// Moves quantity between boxes. The source row is deleted when it hits
    /// zero; the destination merges into an existing row for the same
    /// product when present. Exactly one `transfer` ledger row is written.
    #[instrument(skip(self))]
    pub async fn transfer_product(
        &self,
        from_location_record_id: i64,
        to_box_id: i64,
        quantity: i32,
        moved_by: &str,
        reason: Option<String>,
        notes: Option<String>,
    ) -> Result<product_location::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let source = ProductLocation::find_by_id(from_location_record_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Product location {} not found",
                    from_location_record_id
                ))
            })?;

        if source.quantity < quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Insufficient quantity. Available: {}, Requested: {}",
                source.quantity, quantity
            )));
        }

        // Destination box must exist before mutating anything.
        resolve_box_details(&txn, to_box_id).await?;

        let from_box_id = source.box_id;
        let kind = source.product_kind;
        let product_id = source.product_id.clone();
        let sku = source.sku.clone();
        let product_name = source.product_name.clone();
        let metal_weight_g = source.metal_weight_g;
        let purity_k = source.purity_k;
        let zakya_metadata = source.zakya_metadata.clone();

        let now = Utc::now();
        let new_source_qty = source.quantity - quantity;
        if new_source_qty == 0 {
            source.delete(&txn).await?;
        } else {
            let mut row: product_location::ActiveModel = source.into();
            row.quantity = Set(new_source_qty);
            row.updated_at = Set(now);
            row.update(&txn).await?;
        }

        let existing_dest = ProductLocation::find()
            .filter(product_location::Column::BoxId.eq(to_box_id))
            .filter(product_location::Column::ProductKind.eq(kind))
            .filter(product_location::Column::ProductId.eq(product_id.clone()))
            .one(&txn)
            .await?;

        let dest = match existing_dest {
            Some(row) => {
                let merged = row.quantity + quantity;
                let mut row: product_location::ActiveModel = row.into();
                row.quantity = Set(merged);
                row.updated_at = Set(now);
                row.update(&txn).await?
            }
            None => {
                let row = product_location::ActiveModel {
                    id: NotSet,
                    box_id: Set(to_box_id),
                    product_kind: Set(kind),
                    product_id: Set(product_id.clone()),
                    product_name: Set(product_name.clone()),
                    sku: Set(sku.clone()),
                    quantity: Set(quantity),
                    serial_numbers: Set(None),
                    metal_weight_g: Set(metal_weight_g),
                    purity_k: Set(purity_k),
                    zakya_metadata: Set(zakya_metadata),
                    last_counted_by: Set(Some(moved_by.to_string())),
                    last_counted_at: Set(Some(now)),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                row.insert(&txn).await?
            }
        };

        record_movement(
            &txn,
            MovementRecord {
                product_kind: kind,
                product_id,
                sku,
                product_name,
                movement_type: MovementType::Transfer,
                quantity_moved: quantity,
                from_box_id: Some(from_box_id),
                to_box_id: Some(to_box_id),
                moved_by: moved_by.to_string(),
                reason,
                notes,
                serial_numbers: None,
            },
        )
        .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductTransferred {
                from_box_id,
                to_box_id,
                quantity,
            })
            .await;

        info!(
            "Transferred {} units from box {} to box {}",
            quantity, from_box_id, to_box_id
        );
        Ok(dest)
    }

    /// Removes quantity from a box, deleting the row when it reaches zero.
    #[instrument(skip(self))]
    pub async fn remove_product(
        &self,
        location_record_id: i64,
        quantity: i32,
        removed_by: &str,
        reason: Option<String>,
    ) -> Result<(), ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let current = ProductLocation::find_by_id(location_record_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Product location {} not found",
                    location_record_id
                ))
            })?;

        if current.quantity < quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Insufficient quantity. Available: {}, Requested: {}",
                current.quantity, quantity
            )));
        }

        let from_box_id = current.box_id;
        let kind = current.product_kind;
        let product_id = current.product_id.clone();
        let sku = current.sku.clone();
        let product_name = current.product_name.clone();

        let new_quantity = current.quantity - quantity;
        if new_quantity == 0 {
            current.delete(&txn).await?;
        } else {
            let mut row: product_location::ActiveModel = current.into();
            row.quantity = Set(new_quantity);
            row.updated_at = Set(Utc::now());
            row.update(&txn).await?;
        }

        record_movement(
            &txn,
            MovementRecord {
                product_kind: kind,
                product_id,
                sku,
                product_name,
                movement_type: MovementType::Remove,
                quantity_moved: quantity,
                from_box_id: Some(from_box_id),
                to_box_id: None,
                moved_by: removed_by.to_string(),
                reason: Some(reason.unwrap_or_else(|| "Product removed from inventory".to_string())),
                notes: None,
                serial_numbers: None,
            },
        )
        .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductRemoved {
                location_record_id,
                quantity,
            })
            .await;

        Ok(())
    }

    /// AND-combination search across the storage hierarchy.
    #[instrument(skip(self, filters))]
    pub async fn search_products(
        &self,
        filters: ProductSearchFilters,
    ) -> Result<Vec<ProductLocationDetails>, ServiceError> {
        let mut query = ProductLocation::find();

        if let Some(sku) = &filters.sku {
            query = query.filter(product_location::Column::Sku.contains(sku));
        }
        if let Some(name) = &filters.product_name {
            query = query.filter(product_location::Column::ProductName.contains(name));
        }
        if let Some(kind) = filters.product_kind {
            query = query.filter(product_location::Column::ProductKind.eq(kind));
        }
        if let Some(box_id) = filters.box_id {
            query = query.filter(product_location::Column::BoxId.eq(box_id));
        }
        if let Some(min) = filters.min_quantity {
            query = query.filter(product_location::Column::Quantity.gte(min));
        }
        if let Some(max) = filters.max_quantity {
            query = query.filter(product_location::Column::Quantity.lte(max));
        }

        // Shelf/location filters narrow to the boxes under them.
        if filters.shelf_id.is_some() || filters.location_id.is_some() {
            let box_ids = self
                .box_ids_under(filters.location_id, filters.shelf_id)
                .await?;
            query = query.filter(product_location::Column::BoxId.is_in(box_ids));
        }

        let rows = query.all(&*self.db).await?;

        let rows: Vec<_> = match filters.has_serials {
            Some(true) => rows
                .into_iter()
                .filter(|r| serial_count(&r.serial_numbers) > 0)
                .collect(),
            Some(false) => rows
                .into_iter()
                .filter(|r| serial_count(&r.serial_numbers) == 0)
                .collect(),
            None => rows,
        };

        let mut results = self.with_storage_details(rows).await?;
        results.sort_by(|a, b| {
            (
                &a.storage.location_name,
                &a.storage.shelf_code,
                &a.storage.box_code,
                &a.record.product_name,
            )
                .cmp(&(
                    &b.storage.location_name,
                    &b.storage.shelf_code,
                    &b.storage.box_code,
                    &b.record.product_name,
                ))
        });
        Ok(results)
    }

    /// Every box a product currently sits in.
    #[instrument(skip(self))]
    pub async fn find_product_locations(
        &self,
        product_kind: ProductKind,
        product_id: &str,
    ) -> Result<Vec<ProductLocationDetails>, ServiceError> {
        let rows = ProductLocation::find()
            .filter(product_location::Column::ProductKind.eq(product_kind))
            .filter(product_location::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?;

        let mut results = self.with_storage_details(rows).await?;
        results.sort_by(|a, b| {
            (&a.storage.location_name, &a.storage.shelf_code, &a.storage.box_code).cmp(&(
                &b.storage.location_name,
                &b.storage.shelf_code,
                &b.storage.box_code,
            ))
        });
        Ok(results)
    }

    /// Ledger history for a product, newest first.
    #[instrument(skip(self))]
    pub async fn movement_history(
        &self,
        product_kind: ProductKind,
        product_id: &str,
        limit: u64,
    ) -> Result<Vec<MovementDetails>, ServiceError> {
        let movements = ProductMovement::find()
            .filter(product_movement::Column::ProductKind.eq(product_kind))
            .filter(product_movement::Column::ProductId.eq(product_id))
            .order_by_desc(product_movement::Column::MovedAt)
            .limit(limit)
            .all(&*self.db)
            .await?;

        let mut cache: HashMap<i64, BoxDetails> = HashMap::new();
        let mut results = Vec::with_capacity(movements.len());
        for m in movements {
            let from_storage = self.cached_box(&mut cache, m.from_box_id).await;
            let to_storage = self.cached_box(&mut cache, m.to_box_id).await;
            results.push(MovementDetails {
                movement: m,
                from_storage,
                to_storage,
            });
        }
        Ok(results)
    }

    /// Totals per (location, product), with the boxes each product spans.
    #[instrument(skip(self))]
    pub async fn inventory_summary(
        &self,
        location_id: Option<i64>,
    ) -> Result<Vec<InventorySummaryRow>, ServiceError> {
        let mut query = ProductLocation::find();
        if location_id.is_some() {
            let box_ids = self.box_ids_under(location_id, None).await?;
            query = query.filter(product_location::Column::BoxId.is_in(box_ids));
        }
        let rows = query.all(&*self.db).await?;
        let details = self.with_storage_details(rows).await?;

        let mut grouped: HashMap<(i64, ProductKind, String), InventorySummaryRow> = HashMap::new();
        for d in details {
            let key = (
                d.storage.location_id,
                d.record.product_kind,
                d.record.product_id.clone(),
            );
            let entry = grouped.entry(key).or_insert_with(|| InventorySummaryRow {
                location_id: d.storage.location_id,
                location_name: d.storage.location_name.clone(),
                product_kind: d.record.product_kind,
                product_id: d.record.product_id.clone(),
                product_name: d.record.product_name.clone(),
                sku: d.record.sku.clone(),
                total_quantity: 0,
                num_boxes: 0,
                box_codes: Vec::new(),
            });
            entry.total_quantity += i64::from(d.record.quantity);
            if !entry.box_codes.contains(&d.storage.box_code) {
                entry.box_codes.push(d.storage.box_code.clone());
                entry.num_boxes += 1;
            }
        }

        let mut summary: Vec<_> = grouped.into_values().collect();
        for row in &mut summary {
            row.box_codes.sort();
        }
        summary.sort_by(|a, b| {
            (&a.location_name, &a.product_name).cmp(&(&b.location_name, &b.product_name))
        });
        Ok(summary)
    }

    async fn with_storage_details(
        &self,
        rows: Vec<product_location::Model>,
    ) -> Result<Vec<ProductLocationDetails>, ServiceError> {
        let mut cache: HashMap<i64, BoxDetails> = HashMap::new();
        let mut results = Vec::with_capacity(rows.len());
        for record in rows {
            let storage = match cache.get(&record.box_id) {
                Some(d) => d.clone(),
                None => {
                    let d = resolve_box_details(&*self.db, record.box_id).await?;
                    cache.insert(record.box_id, d.clone());
                    d
                }
            };
            results.push(ProductLocationDetails { record, storage });
        }
        Ok(results)
    }

    async fn cached_box(
        &self,
        cache: &mut HashMap<i64, BoxDetails>,
        box_id: Option<i64>,
    ) -> Option<BoxDetails> {
        let box_id = box_id?;
        if let Some(d) = cache.get(&box_id) {
            return Some(d.clone());
        }
        // Ledger rows may reference boxes that were since deactivated or
        // deleted; a missing box just leaves the side unresolved.
        let d = resolve_box_details(&*self.db, box_id).await.ok()?;
        cache.insert(box_id, d.clone());
        Some(d)
    }

    async fn box_ids_under(
        &self,
        location_id: Option<i64>,
        shelf_id: Option<i64>,
    ) -> Result<Vec<i64>, ServiceError> {
        let shelf_ids: Vec<i64> = match (shelf_id, location_id) {
            (Some(shelf), _) => vec![shelf],
            (None, Some(location)) => StorageShelf::find()
                .filter(storage_shelf::Column::LocationId.eq(location))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|s| s.id)
                .collect(),
            (None, None) => return Ok(Vec::new()),
        };

        Ok(StorageBox::find()
            .filter(storage_box::Column::ShelfId.is_in(shelf_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect())
    }
}

struct MovementRecord {
    product_kind: ProductKind,
    product_id: String,
    sku: Option<String>,
    product_name: String,
    movement_type: MovementType,
    quantity_moved: i32,
    from_box_id: Option<i64>,
    to_box_id: Option<i64>,
    moved_by: String,
    reason: Option<String>,
    notes: Option<String>,
    serial_numbers: Option<Vec<String>>,
}

/// Appends one ledger row, resolving each box side to its shelf and
/// location so history stays readable after boxes move or are retired.
async fn record_movement<C: ConnectionTrait>(
    conn: &C,
    record: MovementRecord,
) -> Result<product_movement::Model, ServiceError> {
    let from = match record.from_box_id {
        Some(id) => Some(resolve_box_details(conn, id).await?),
        None => None,
    };
    let to = match record.to_box_id {
        Some(id) => Some(resolve_box_details(conn, id).await?),
        None => None,
    };

    let row = product_movement::ActiveModel {
        id: NotSet,
        product_kind: Set(record.product_kind),
        product_id: Set(record.product_id),
        sku: Set(record.sku),
        product_name: Set(record.product_name),
        movement_type: Set(record.movement_type),
        quantity_moved: Set(record.quantity_moved),
        from_location_id: Set(from.as_ref().map(|d| d.location_id)),
        from_shelf_id: Set(from.as_ref().map(|d| d.shelf_id)),
        from_box_id: Set(record.from_box_id),
        to_location_id: Set(to.as_ref().map(|d| d.location_id)),
        to_shelf_id: Set(to.as_ref().map(|d| d.shelf_id)),
        to_box_id: Set(record.to_box_id),
        moved_by: Set(record.moved_by),
        reason: Set(record.reason),
        notes: Set(record.notes),
        serial_numbers_moved: Set(record.serial_numbers.as_ref().map(|s| json!(s))),
        moved_at: Set(Utc::now()),
    };
    Ok(row.insert(conn).await?)
}

fn serial_count(serials: &Option<serde_json::Value>) -> usize {
    serials
        .as_ref()
        .and_then(|v| v.as_array())
        .map(|a| a.len())
        .unwrap_or(0)
}

fn merge_serials(
    existing: &Option<serde_json::Value>,
    added: &Option<Vec<String>>,
) -> Option<serde_json::Value> {
    let mut merged: Vec<String> = existing
        .as_ref()
        .and_then(|v| v.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if let Some(added) = added {
        for s in added {
            if !merged.contains(s) {
                merged.push(s.clone());
            }
        }
    }
    if merged.is_empty() {
        None
    } else {
        Some(json!(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_count_handles_missing_and_empty() {
        assert_eq!(serial_count(&None), 0);
        assert_eq!(serial_count(&Some(json!([]))), 0);
        assert_eq!(serial_count(&Some(json!(["MJ-001", "MJ-002"]))), 2);
    }

    #[test]
    fn merge_serials_dedupes() {
        let existing = Some(json!(["MJ-001"]));
        let added = Some(vec!["MJ-001".to_string(), "MJ-002".to_string()]);
        let merged = merge_serials(&existing, &added);
        assert_eq!(merged, Some(json!(["MJ-001", "MJ-002"])));
    }

    #[test]
    fn merge_serials_empty_stays_none() {
        assert_eq!(merge_serials(&None, &None), None);
        assert_eq!(merge_serials(&Some(json!([])), &Some(vec![])), None);
    }
}
