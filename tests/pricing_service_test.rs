mod common;

use chrono::Utc;
use common::TestApp;
use minaki_ops::{
    entities::{
        diamond_component, metal_component, metal_component::MetalType, product_variant,
        MetalComponent, PricingBreakdown, ProductVariant,
    },
    services::{pricing::MetalRateUpdate, PricingService},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

fn service(app: &TestApp) -> PricingService {
    PricingService::new(app.db.clone(), app.event_sender.clone(), app.config.clone())
}

async fn seed_variant(app: &TestApp, sku: &str) -> Uuid {
    let now = Utc::now();
    let variant = product_variant::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku: Set(sku.to_string()),
        name: Set(format!("Test piece {}", sku)),
        net_weight_g: Set(Some(dec!(10))),
        gross_weight_g: Set(Some(dec!(10.5))),
        purity_k: Set(Some(dec!(22.00))),
        base_cost: Set(Decimal::ZERO),
        price: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let variant = variant
        .insert(&*app.db)
        .await
        .expect("failed to insert variant");
    variant.id
}

async fn seed_gold_component(app: &TestApp, variant_id: Uuid, rate: Decimal) {
    let now = Utc::now();
    let component = metal_component::ActiveModel {
        id: Set(Uuid::new_v4()),
        variant_id: Set(variant_id),
        metal_type: Set(MetalType::Gold),
        purity_k: Set(dec!(22.00)),
        net_weight_g: Set(dec!(10)),
        gross_weight_g: Set(dec!(10.5)),
        metal_rate_per_g: Set(rate),
        making_charge_per_g: Set(dec!(50)),
        making_charge_flat: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
    };
    component
        .insert(&*app.db)
        .await
        .expect("failed to insert metal component");
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn recalculation_matches_component_math() {
    let app = TestApp::new().await;
    let pricing = service(&app);

    // 10g net at 6000/g, 0.5g wastage, 50/g making charge.
    let variant_id = seed_variant(&app, "MJ-GOLD-001").await;
    seed_gold_component(&app, variant_id, dec!(6000)).await;

    let summary = pricing
        .recalculate(Some(vec![variant_id]), None)
        .await
        .expect("recalculation failed");
    assert!(summary.success);
    assert_eq!(summary.variants_updated, 1);
    assert!(summary.errors.is_empty());

    let breakdown = PricingBreakdown::find_by_id(variant_id)
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("breakdown row missing");
    assert_eq!(breakdown.total_metal_value, dec!(60000));
    assert_eq!(breakdown.total_wastage_charges, dec!(3000));
    assert_eq!(breakdown.total_making_charges, dec!(500));
    assert_eq!(breakdown.total_stone_value, Decimal::ZERO);
    assert_eq!(breakdown.final_cost, dec!(63500));
    // Default margin is 40%.
    assert_eq!(breakdown.suggested_retail_price, dec!(88900));

    let variant = ProductVariant::find_by_id(variant_id)
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("variant missing");
    assert_eq!(variant.base_cost, dec!(63500));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn stone_value_included_in_final_cost() {
    let app = TestApp::new().await;
    let pricing = service(&app);

    let variant_id = seed_variant(&app, "MJ-POLKI-001").await;
    seed_gold_component(&app, variant_id, dec!(6000)).await;

    let now = Utc::now();
    let stone = diamond_component::ActiveModel {
        id: Set(Uuid::new_v4()),
        variant_id: Set(variant_id),
        carat: Set(dec!(2)),
        stone_price_per_carat: Set(dec!(1500)),
        clarity: Set(Some("VS1".to_string())),
        color: Set(None),
        shape: Set(Some("polki".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
    };
    stone
        .insert(&*app.db)
        .await
        .expect("failed to insert diamond component");

    pricing
        .recalculate(Some(vec![variant_id]), None)
        .await
        .expect("recalculation failed");

    let breakdown = PricingBreakdown::find_by_id(variant_id)
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("breakdown row missing");
    assert_eq!(breakdown.total_stone_value, dec!(3000));
    assert_eq!(breakdown.final_cost, dec!(66500));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn rate_update_flows_into_recalculation() {
    let app = TestApp::new().await;
    let pricing = service(&app);

    let variant_id = seed_variant(&app, "MJ-GOLD-002").await;
    seed_gold_component(&app, variant_id, dec!(6000)).await;

    let rates = MetalRateUpdate {
        gold_22k: Some(dec!(6500)),
        ..Default::default()
    };
    let summary = pricing
        .recalculate(Some(vec![variant_id]), Some(rates))
        .await
        .expect("recalculation failed");
    assert_eq!(summary.variants_updated, 1);

    let component = MetalComponent::find()
        .filter(metal_component::Column::VariantId.eq(variant_id))
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("component missing");
    assert_eq!(component.metal_rate_per_g, dec!(6500));

    let breakdown = PricingBreakdown::find_by_id(variant_id)
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("breakdown row missing");
    // 10 * 6500 metal + 0.5 * 6500 wastage + 500 making.
    assert_eq!(breakdown.final_cost, dec!(68750));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn unknown_variant_ids_are_skipped() {
    let app = TestApp::new().await;
    let pricing = service(&app);

    let variant_id = seed_variant(&app, "MJ-GOLD-003").await;
    seed_gold_component(&app, variant_id, dec!(6000)).await;

    let summary = pricing
        .recalculate(Some(vec![variant_id, Uuid::new_v4()]), None)
        .await
        .expect("recalculation failed");
    assert!(summary.success);
    assert_eq!(summary.variants_updated, 1);
    assert!(summary.errors.is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn current_rates_average_per_metal_and_purity() {
    let app = TestApp::new().await;
    let pricing = service(&app);

    let a = seed_variant(&app, "MJ-GOLD-004").await;
    let b = seed_variant(&app, "MJ-GOLD-005").await;
    seed_gold_component(&app, a, dec!(6000)).await;
    seed_gold_component(&app, b, dec!(7000)).await;

    let rates = pricing
        .current_metal_rates()
        .await
        .expect("rate query failed");
    assert_eq!(rates.get("gold_22k"), Some(&dec!(6500)));
}
