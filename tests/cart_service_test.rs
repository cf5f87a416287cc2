mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use minaki_ops::{
    entities::{
        cart::CartStatus,
        discount::{self, DiscountType},
        product_variant,
    },
    errors::ServiceError,
    services::{
        cart::{AddCartItemInput, CreateCartInput, UpdateCartItemInput},
        CartService,
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, NotSet, Set};
use uuid::Uuid;

fn service(app: &TestApp) -> CartService {
    CartService::new(app.db.clone(), app.event_sender.clone())
}

async fn seed_variant(app: &TestApp, sku: &str, price: Decimal) -> Uuid {
    let now = Utc::now();
    let variant = product_variant::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku: Set(sku.to_string()),
        name: Set(format!("Piece {}", sku)),
        net_weight_g: Set(None),
        gross_weight_g: Set(None),
        purity_k: Set(None),
        base_cost: Set(price / dec!(2)),
        price: Set(price),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let variant = variant
        .insert(&*app.db)
        .await
        .expect("failed to insert variant");
    variant.id
}

async fn seed_percentage_coupon(app: &TestApp, code: &str, percent: Decimal, cap: Decimal) {
    let now = Utc::now();
    let coupon = discount::ActiveModel {
        id: NotSet,
        code: Set(code.to_string()),
        discount_type: Set(DiscountType::Percentage),
        value: Set(percent),
        min_purchase_amount: Set(None),
        max_discount_amount: Set(Some(cap)),
        valid_from: Set(Some(now - Duration::days(1))),
        valid_until: Set(Some(now + Duration::days(30))),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    coupon
        .insert(&*app.db)
        .await
        .expect("failed to insert coupon");
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn add_item_recomputes_totals() {
    let app = TestApp::new().await;
    let carts = service(&app);
    let variant_id = seed_variant(&app, "MJ-CRT-001", dec!(500)).await;

    let cart = carts
        .create_cart(CreateCartInput::default())
        .await
        .expect("create failed");
    let cart = carts
        .add_item(
            cart.id,
            AddCartItemInput {
                variant_id,
                stock_item_id: None,
                quantity: 2,
                discount_percent: Decimal::ZERO,
            },
        )
        .await
        .expect("add failed");

    assert_eq!(cart.subtotal, dec!(1000));
    assert_eq!(cart.total_amount, dec!(1000));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn same_variant_merges_into_one_line() {
    let app = TestApp::new().await;
    let carts = service(&app);
    let variant_id = seed_variant(&app, "MJ-CRT-002", dec!(300)).await;

    let cart = carts
        .create_cart(CreateCartInput::default())
        .await
        .expect("create failed");
    let input = AddCartItemInput {
        variant_id,
        stock_item_id: None,
        quantity: 1,
        discount_percent: Decimal::ZERO,
    };
    carts.add_item(cart.id, input.clone()).await.expect("add failed");
    carts.add_item(cart.id, input).await.expect("add failed");

    let with_items = carts.get_cart(cart.id).await.expect("fetch failed");
    assert_eq!(with_items.items.len(), 1);
    assert_eq!(with_items.items[0].quantity, 2);
    assert_eq!(with_items.cart.subtotal, dec!(600));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn coupon_and_tax_produce_expected_total() {
    let app = TestApp::new().await;
    let carts = service(&app);
    let variant_id = seed_variant(&app, "MJ-CRT-003", dec!(500)).await;
    seed_percentage_coupon(&app, "FESTIVE10", dec!(10), dec!(200)).await;

    let cart = carts
        .create_cart(CreateCartInput::default())
        .await
        .expect("create failed");
    carts
        .add_item(
            cart.id,
            AddCartItemInput {
                variant_id,
                stock_item_id: None,
                quantity: 2,
                discount_percent: Decimal::ZERO,
            },
        )
        .await
        .expect("add failed");

    let cart = carts
        .apply_discount(cart.id, "FESTIVE10")
        .await
        .expect("discount failed");
    assert_eq!(cart.discount_amount, dec!(100));

    // 18% GST on the discounted 900.
    let cart = carts
        .set_tax_rate(cart.id, dec!(18))
        .await
        .expect("tax failed");
    assert_eq!(cart.tax_amount, dec!(162));
    assert_eq!(cart.total_amount, dec!(1062));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn coupon_cap_limits_the_discount() {
    let app = TestApp::new().await;
    let carts = service(&app);
    let variant_id = seed_variant(&app, "MJ-CRT-004", dec!(5000)).await;
    seed_percentage_coupon(&app, "FESTIVE10", dec!(10), dec!(200)).await;

    let cart = carts
        .create_cart(CreateCartInput::default())
        .await
        .expect("create failed");
    carts
        .add_item(
            cart.id,
            AddCartItemInput {
                variant_id,
                stock_item_id: None,
                quantity: 1,
                discount_percent: Decimal::ZERO,
            },
        )
        .await
        .expect("add failed");

    // 10% of 5000 would be 500; the coupon caps at 200.
    let cart = carts
        .apply_discount(cart.id, "FESTIVE10")
        .await
        .expect("discount failed");
    assert_eq!(cart.discount_amount, dec!(200));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn unknown_coupon_is_rejected() {
    let app = TestApp::new().await;
    let carts = service(&app);
    let variant_id = seed_variant(&app, "MJ-CRT-005", dec!(500)).await;

    let cart = carts
        .create_cart(CreateCartInput::default())
        .await
        .expect("create failed");
    carts
        .add_item(
            cart.id,
            AddCartItemInput {
                variant_id,
                stock_item_id: None,
                quantity: 1,
                discount_percent: Decimal::ZERO,
            },
        )
        .await
        .expect("add failed");

    let err = carts
        .apply_discount(cart.id, "NO-SUCH-CODE")
        .await
        .expect_err("discount should fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn update_and_remove_lines() {
    let app = TestApp::new().await;
    let carts = service(&app);
    let variant_id = seed_variant(&app, "MJ-CRT-006", dec!(250)).await;

    let cart = carts
        .create_cart(CreateCartInput::default())
        .await
        .expect("create failed");
    carts
        .add_item(
            cart.id,
            AddCartItemInput {
                variant_id,
                stock_item_id: None,
                quantity: 1,
                discount_percent: Decimal::ZERO,
            },
        )
        .await
        .expect("add failed");

    let with_items = carts.get_cart(cart.id).await.expect("fetch failed");
    let item_id = with_items.items[0].id;

    let cart = carts
        .update_item(
            cart.id,
            item_id,
            UpdateCartItemInput {
                quantity: Some(4),
                discount_percent: None,
            },
        )
        .await
        .expect("update failed");
    assert_eq!(cart.subtotal, dec!(1000));

    let cart = carts
        .remove_item(cart.id, item_id)
        .await
        .expect("remove failed");
    assert_eq!(cart.subtotal, Decimal::ZERO);
    assert_eq!(cart.total_amount, Decimal::ZERO);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn hold_and_resume_cycle() {
    let app = TestApp::new().await;
    let carts = service(&app);

    let cart = carts
        .create_cart(CreateCartInput::default())
        .await
        .expect("create failed");

    let held = carts
        .hold_cart(cart.id, Some("Customer will return".to_string()))
        .await
        .expect("hold failed");
    assert_eq!(held.status, CartStatus::Held);

    // A held cart refuses line mutations.
    let variant_id = seed_variant(&app, "MJ-CRT-007", dec!(100)).await;
    let err = carts
        .add_item(
            cart.id,
            AddCartItemInput {
                variant_id,
                stock_item_id: None,
                quantity: 1,
                discount_percent: Decimal::ZERO,
            },
        )
        .await
        .expect_err("add to held cart should fail");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    let held_list = carts.held_carts().await.expect("list failed");
    assert_eq!(held_list.len(), 1);

    let resumed = carts.resume_cart(cart.id).await.expect("resume failed");
    assert_eq!(resumed.status, CartStatus::Open);
}
