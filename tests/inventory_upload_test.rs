mod common;

use chrono::Utc;
use common::TestApp;
use minaki_ops::{
    entities::{
        product_location, product_location::ProductKind, product_movement,
        product_movement::MovementType, storage_box, storage_location, storage_shelf,
        ProductLocation, ProductMovement,
    },
    services::InventoryUploadService,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, PaginatorTrait, QueryFilter, Set};
use serde_json::{json, Value};

fn service(app: &TestApp) -> InventoryUploadService {
    InventoryUploadService::new(app.db.clone())
}

async fn seed_box(app: &TestApp) -> i64 {
    let now = Utc::now();
    let location = storage_location::ActiveModel {
        id: NotSet,
        location_code: Set("WH1".to_string()),
        location_name: Set("Main Warehouse".to_string()),
        description: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let location = location
        .insert(&*app.db)
        .await
        .expect("failed to insert location");

    let shelf = storage_shelf::ActiveModel {
        id: NotSet,
        location_id: Set(location.id),
        shelf_code: Set("S1".to_string()),
        shelf_name: Set("Shelf one".to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let shelf = shelf.insert(&*app.db).await.expect("failed to insert shelf");

    let storage_box = storage_box::ActiveModel {
        id: NotSet,
        shelf_id: Set(shelf.id),
        box_code: Set("B1".to_string()),
        box_label: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let storage_box = storage_box
        .insert(&*app.db)
        .await
        .expect("failed to insert box");
    storage_box.id
}

fn jewelry_row(box_id: i64, product_id: &str, sku: &str) -> Value {
    json!({
        "box_id": box_id,
        "product_kind": "real_jewelry",
        "product_id": product_id,
        "product_name": "Kundan Choker",
        "sku": sku,
        "quantity": 2,
        "metal_weight_g": 42.5,
        "purity_k": 22.0,
        "notes": "22K set. Serial: MJ-001, MJ-002"
    })
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn upload_creates_location_and_ledger_rows() {
    let app = TestApp::new().await;
    let upload = service(&app);
    let box_id = seed_box(&app).await;

    let rows = vec![
        jewelry_row(box_id, "RJ-1", "MJ-KC-001"),
        json!({
            "box_id": box_id,
            "product_kind": "zakya_product",
            "product_id": "ZK-9",
            "product_name": "Crystal Pendant",
            "sku": "MJ-CP-009",
            "quantity": 5,
            "zakya_metadata": { "zakya_item_id": "zi-9" }
        }),
    ];

    let summary = upload
        .upload_rows(&rows, "priya")
        .await
        .expect("upload failed");
    assert_eq!(summary.total_rows, 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);

    let jewelry = ProductLocation::find()
        .filter(product_location::Column::ProductId.eq("RJ-1"))
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("location row missing");
    assert_eq!(jewelry.product_kind, ProductKind::RealJewelry);
    assert_eq!(jewelry.quantity, 2);
    assert_eq!(jewelry.serial_numbers, Some(json!(["MJ-001", "MJ-002"])));
    assert_eq!(jewelry.last_counted_by.as_deref(), Some("priya"));

    let ledger = ProductMovement::find()
        .filter(product_movement::Column::MovementType.eq(MovementType::Add))
        .all(&*app.db)
        .await
        .expect("query failed");
    assert_eq!(ledger.len(), 2);
    assert!(ledger.iter().all(|m| m.to_box_id == Some(box_id)));
    assert!(ledger
        .iter()
        .all(|m| m.reason.as_deref() == Some("Bulk inventory upload")));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn bad_rows_are_collected_without_aborting_the_batch() {
    let app = TestApp::new().await;
    let upload = service(&app);
    let box_id = seed_box(&app).await;

    let rows = vec![
        jewelry_row(box_id, "RJ-1", "MJ-KC-001"),
        // real_jewelry without weight and purity.
        json!({
            "box_id": box_id,
            "product_kind": "real_jewelry",
            "product_id": "RJ-2",
            "product_name": "Polki Ring",
            "sku": "MJ-PR-002",
            "quantity": 1
        }),
        jewelry_row(box_id, "RJ-3", "MJ-KC-003"),
    ];

    let summary = upload
        .upload_rows(&rows, "priya")
        .await
        .expect("upload failed");
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
    // Header is row 1, so the second data row reports as row 3.
    assert_eq!(summary.errors[0].row, 3);
    assert_eq!(summary.errors[0].sku, "MJ-PR-002");

    let rows_loaded = ProductLocation::find()
        .count(&*app.db)
        .await
        .expect("count failed");
    assert_eq!(rows_loaded, 2);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn duplicate_product_in_same_box_is_rejected() {
    let app = TestApp::new().await;
    let upload = service(&app);
    let box_id = seed_box(&app).await;

    let rows = vec![jewelry_row(box_id, "RJ-1", "MJ-KC-001")];
    upload
        .upload_rows(&rows, "priya")
        .await
        .expect("first upload failed");

    let summary = upload
        .upload_rows(&rows, "priya")
        .await
        .expect("second upload failed");
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].error.contains("already exists"));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn unknown_box_fails_the_row() {
    let app = TestApp::new().await;
    let upload = service(&app);

    let rows = vec![jewelry_row(9999, "RJ-1", "MJ-KC-001")];
    let summary = upload
        .upload_rows(&rows, "priya")
        .await
        .expect("upload failed");
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failed, 1);
}
