mod common;

use chrono::{Datelike, Duration, Utc};
use common::TestApp;
use minaki_ops::{
    entities::{
        cart::CartStatus,
        customer,
        discount::{self, DiscountType},
        invoice_item,
        payment::PaymentMethod,
        product_variant,
        sales_invoice::PaymentStatus,
        stock_item::{self, StockStatus},
        stock_movement, Cart, Customer, InvoiceItem, SalesInvoice, StockItem, StockMovement,
    },
    errors::ServiceError,
    services::{
        cart::{AddCartItemInput, CreateCartInput},
        checkout::{CheckoutInput, PaymentInput},
        CartService, CheckoutService,
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, Set};
use uuid::Uuid;

fn services(app: &TestApp) -> (CartService, CheckoutService) {
    (
        CartService::new(app.db.clone(), app.event_sender.clone()),
        CheckoutService::new(app.db.clone(), app.event_sender.clone()),
    )
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

async fn seed_cart_with_line(
    app: &TestApp,
    carts: &CartService,
    sku: &str,
    price: Decimal,
    quantity: i32,
) -> Uuid {
    let variant_id = seed_variant(app, sku, price).await;
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
                quantity,
                discount_percent: Decimal::ZERO,
            },
        )
        .await
        .expect("add failed");
    cart.id
}

fn cash(amount: Decimal) -> PaymentInput {
    PaymentInput {
        method: PaymentMethod::Cash,
        amount,
        card_last_four: None,
        card_type: None,
        bank_name: None,
        cheque_number: None,
        upi_reference: None,
        notes: None,
    }
}

fn checkout_input(cart_id: Uuid, payments: Vec<PaymentInput>) -> CheckoutInput {
    CheckoutInput {
        cart_id,
        customer_id: None,
        payments,
        discount_code: None,
        tax_rate_percent: None,
        notes: None,
        sales_person: Some("priya".to_string()),
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn checkout_applies_coupon_and_tax() {
    let app = TestApp::new().await;
    let (carts, checkout) = services(&app);

    let now = Utc::now();
    let coupon = discount::ActiveModel {
        id: NotSet,
        code: Set("FESTIVE10".to_string()),
        discount_type: Set(DiscountType::Percentage),
        value: Set(dec!(10)),
        min_purchase_amount: Set(None),
        max_discount_amount: Set(Some(dec!(200))),
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

    let cart_id = seed_cart_with_line(&app, &carts, "MJ-CHK-001", dec!(500), 2).await;

    let mut input = checkout_input(cart_id, vec![cash(dec!(1062))]);
    input.discount_code = Some("FESTIVE10".to_string());
    input.tax_rate_percent = Some(dec!(18));

    let result = checkout
        .process_checkout(input)
        .await
        .expect("checkout failed");

    // 1000 subtotal, 100 off, 18% tax on 900.
    assert_eq!(result.total_amount, dec!(1062));
    assert_eq!(result.paid_amount, dec!(1062));
    assert_eq!(result.outstanding_amount, Decimal::ZERO);
    assert_eq!(result.payment_status, PaymentStatus::Paid);

    let year = Utc::now().year();
    assert_eq!(result.invoice_number, format!("INV-{}-0001", year));

    let cart = Cart::find_by_id(cart_id)
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("cart missing");
    assert_eq!(cart.status, CartStatus::Converted);

    let lines = InvoiceItem::find()
        .filter(invoice_item::Column::InvoiceId.eq(result.invoice_id))
        .all(&*app.db)
        .await
        .expect("query failed");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].line_total, dec!(1000));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn invoice_numbers_are_sequential_within_the_year() {
    let app = TestApp::new().await;
    let (carts, checkout) = services(&app);
    let year = Utc::now().year();

    let first_cart = seed_cart_with_line(&app, &carts, "MJ-CHK-002", dec!(100), 1).await;
    let second_cart = seed_cart_with_line(&app, &carts, "MJ-CHK-003", dec!(100), 1).await;

    let first = checkout
        .process_checkout(checkout_input(first_cart, vec![cash(dec!(100))]))
        .await
        .expect("first checkout failed");
    let second = checkout
        .process_checkout(checkout_input(second_cart, vec![cash(dec!(100))]))
        .await
        .expect("second checkout failed");

    assert_eq!(first.invoice_number, format!("INV-{}-0001", year));
    assert_eq!(second.invoice_number, format!("INV-{}-0002", year));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn insufficient_payment_aborts_checkout() {
    let app = TestApp::new().await;
    let (carts, checkout) = services(&app);

    let cart_id = seed_cart_with_line(&app, &carts, "MJ-CHK-004", dec!(800), 1).await;

    let err = checkout
        .process_checkout(checkout_input(cart_id, vec![cash(dec!(500))]))
        .await
        .expect_err("checkout should fail");
    assert!(matches!(err, ServiceError::PaymentFailed(_)));

    // The cart stays open and no invoice exists.
    let cart = Cart::find_by_id(cart_id)
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("cart missing");
    assert_eq!(cart.status, CartStatus::Open);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn serialized_piece_is_sold_at_checkout() {
    let app = TestApp::new().await;
    let (carts, checkout) = services(&app);

    let variant_id = seed_variant(&app, "MJ-CHK-005", dec!(2500)).await;
    let now = Utc::now();
    let stock = stock_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        variant_id: Set(variant_id),
        serial_no: Set("MJ-SER-0001".to_string()),
        status: Set(StockStatus::InStock),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let stock = stock.insert(&*app.db).await.expect("failed to insert stock");

    let cart = carts
        .create_cart(CreateCartInput::default())
        .await
        .expect("create failed");
    carts
        .add_item(
            cart.id,
            AddCartItemInput {
                variant_id,
                stock_item_id: Some(stock.id),
                quantity: 1,
                discount_percent: Decimal::ZERO,
            },
        )
        .await
        .expect("add failed");

    let result = checkout
        .process_checkout(checkout_input(cart.id, vec![cash(dec!(2500))]))
        .await
        .expect("checkout failed");

    let stock = StockItem::find_by_id(stock.id)
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("stock item missing");
    assert_eq!(stock.status, StockStatus::Sold);

    let movements = StockMovement::find()
        .filter(stock_movement::Column::StockItemId.eq(stock.id))
        .all(&*app.db)
        .await
        .expect("query failed");
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, "sale");
    assert_eq!(movements[0].reference_id, Some(result.invoice_id));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn loyalty_points_accrue_per_hundred_spent() {
    let app = TestApp::new().await;
    let (carts, checkout) = services(&app);

    let now = Utc::now();
    let buyer = customer::ActiveModel {
        id: NotSet,
        name: Set("Anaya Shah".to_string()),
        phone: Set(Some("9999900000".to_string())),
        email: Set(None),
        billing_address: Set(None),
        shipping_address: Set(None),
        gst_number: Set(None),
        loyalty_points: Set(10),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let buyer = buyer.insert(&*app.db).await.expect("failed to insert customer");

    let cart_id = seed_cart_with_line(&app, &carts, "MJ-CHK-006", dec!(1250), 1).await;
    let mut input = checkout_input(cart_id, vec![cash(dec!(1250))]);
    input.customer_id = Some(buyer.id);

    checkout
        .process_checkout(input)
        .await
        .expect("checkout failed");

    let buyer = Customer::find_by_id(buyer.id)
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("customer missing");
    // 10 existing + floor(1250 / 100).
    assert_eq!(buyer.loyalty_points, 22);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn later_payments_rederive_invoice_status() {
    let app = TestApp::new().await;
    let (carts, checkout) = services(&app);

    let cart_id = seed_cart_with_line(&app, &carts, "MJ-CHK-007", dec!(1000), 1).await;
    let result = checkout
        .process_checkout(checkout_input(cart_id, vec![cash(dec!(1000))]))
        .await
        .expect("checkout failed");
    assert_eq!(result.payment_status, PaymentStatus::Paid);

    // An extra payment keeps the invoice at paid with zero outstanding.
    let row = checkout
        .record_payment(result.invoice_id, cash(dec!(50)), "priya")
        .await
        .expect("payment failed");
    assert!(row.payment_number.starts_with("PAY-"));

    let invoice = SalesInvoice::find_by_id(result.invoice_id)
        .one(&*app.db)
        .await
        .expect("query failed")
        .expect("invoice missing");
    assert_eq!(invoice.payment_status, PaymentStatus::Paid);
    assert_eq!(invoice.outstanding_amount, Decimal::ZERO);
    assert_eq!(invoice.paid_amount, dec!(1050));
}
