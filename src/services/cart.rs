use crate::{
    entities::{
        cart, cart_item,
        cart::CartStatus,
        discount::{self, DiscountType},
        stock_item::StockStatus,
        Cart, CartItem, CartModel, Discount, ProductVariant, StockItem,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateCartInput {
    pub customer_id: Option<i64>,
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AddCartItemInput {
    pub variant_id: Uuid,
    /// Pin the line to one serialized piece. The item must be in stock.
    pub stock_item_id: Option<Uuid>,
    pub quantity: i32,
    #[serde(default)]
    pub discount_percent: Decimal,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateCartItemInput {
    pub quantity: Option<i32>,
    pub discount_percent: Option<Decimal>,
}

/// Cart plus its line items.
#[derive(Clone, Debug, Serialize)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<cart_item::Model>,
}

/// Pre-checkout cart lifecycle: create, line mutations, coupon application,
/// hold and resume. Totals are recomputed after every change.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_cart(&self, input: CreateCartInput) -> Result<CartModel, ServiceError> {
        let cart_id = Uuid::new_v4();
        let now = Utc::now();

        let cart = cart::ActiveModel {
            id: Set(cart_id),
            customer_id: Set(input.customer_id),
            session_id: Set(input.session_id),
            status: Set(CartStatus::Open),
            subtotal: Set(Decimal::ZERO),
            discount_amount: Set(Decimal::ZERO),
            tax_rate_percent: Set(Decimal::ZERO),
            tax_amount: Set(Decimal::ZERO),
            total_amount: Set(Decimal::ZERO),
            notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let cart = cart.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartCreated(cart_id))
            .await;

        info!("Created cart {}", cart_id);
        Ok(cart)
    }

    /// Adds an item, merging into an existing line for the same variant.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: Uuid,
        input: AddCartItemInput,
    ) -> Result<CartModel, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let cart = require_open_cart(&txn, cart_id).await?;

        let variant = ProductVariant::find_by_id(input.variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} not found", input.variant_id))
            })?;

        // Serialized lines carry the piece's serial number.
        let serial_no = match input.stock_item_id {
            Some(stock_item_id) => {
                let stock = StockItem::find_by_id(stock_item_id)
                    .one(&txn)
                    .await?
                    .filter(|s| s.status == StockStatus::InStock)
                    .ok_or_else(|| {
                        ServiceError::ValidationError("Stock item not available".to_string())
                    })?;
                Some(stock.serial_no)
            }
            None => None,
        };

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::VariantId.eq(input.variant_id))
            .one(&txn)
            .await?;

        let now = Utc::now();
        match existing {
            Some(item) => {
                let quantity = item.quantity + input.quantity;
                let (discount_amount, line_total) =
                    line_amounts(item.unit_price, item.discount_percent, quantity);
                let mut item: cart_item::ActiveModel = item.into();
                item.quantity = Set(quantity);
                item.discount_amount = Set(discount_amount);
                item.line_total = Set(line_total);
                item.updated_at = Set(now);
                item.update(&txn).await?;
            }
            None => {
                let (discount_amount, line_total) =
                    line_amounts(variant.price, input.discount_percent, input.quantity);
                let item = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart_id),
                    variant_id: Set(input.variant_id),
                    stock_item_id: Set(input.stock_item_id),
                    product_name: Set(variant.name.clone()),
                    sku: Set(variant.sku.clone()),
                    serial_no: Set(serial_no),
                    quantity: Set(input.quantity),
                    unit_price: Set(variant.price),
                    discount_percent: Set(input.discount_percent),
                    discount_amount: Set(discount_amount),
                    line_total: Set(line_total),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                item.insert(&txn).await?;
            }
        }

        let cart = recalculate_totals(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart_id))
            .await;
        Ok(cart)
    }

    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        cart_id: Uuid,
        cart_item_id: Uuid,
        input: UpdateCartItemInput,
    ) -> Result<CartModel, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = require_open_cart(&txn, cart_id).await?;

        let item = CartItem::find_by_id(cart_item_id)
            .filter(cart_item::Column::CartId.eq(cart_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Cart item {} not found", cart_item_id))
            })?;

        let quantity = input.quantity.unwrap_or(item.quantity);
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }
        let discount_percent = input.discount_percent.unwrap_or(item.discount_percent);
        let (discount_amount, line_total) = line_amounts(item.unit_price, discount_percent, quantity);

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.discount_percent = Set(discount_percent);
        item.discount_amount = Set(discount_amount);
        item.line_total = Set(line_total);
        item.updated_at = Set(Utc::now());
        item.update(&txn).await?;

        let cart = recalculate_totals(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart_id))
            .await;
        Ok(cart)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        cart_id: Uuid,
        cart_item_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = require_open_cart(&txn, cart_id).await?;

        let item = CartItem::find_by_id(cart_item_id)
            .filter(cart_item::Column::CartId.eq(cart_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Cart item {} not found", cart_item_id))
            })?;
        item.delete(&txn).await?;

        let cart = recalculate_totals(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart_id))
            .await;
        Ok(cart)
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: Uuid) -> Result<CartWithItems, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(CartWithItems { cart, items })
    }

    /// Applies an active coupon code: percentage or flat amount, capped by
    /// the coupon's maximum and gated on its minimum purchase.
    #[instrument(skip(self))]
    pub async fn apply_discount(
        &self,
        cart_id: Uuid,
        discount_code: &str,
    ) -> Result<CartModel, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = require_open_cart(&txn, cart_id).await?;
        let discount_amount = compute_discount(&txn, discount_code, cart.subtotal).await?;

        let mut active: cart::ActiveModel = cart.into();
        active.discount_amount = Set(discount_amount);
        let cart = active.update(&txn).await?;

        let cart = recalculate_totals(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart_id))
            .await;
        Ok(cart)
    }

    /// Sets the tax rate and recomputes totals.
    #[instrument(skip(self))]
    pub async fn set_tax_rate(
        &self,
        cart_id: Uuid,
        tax_rate_percent: Decimal,
    ) -> Result<CartModel, ServiceError> {
        if tax_rate_percent < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Tax rate cannot be negative".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let cart = require_open_cart(&txn, cart_id).await?;
        let mut active: cart::ActiveModel = cart.into();
        active.tax_rate_percent = Set(tax_rate_percent);
        let cart = active.update(&txn).await?;

        let cart = recalculate_totals(&txn, cart).await?;
        txn.commit().await?;
        Ok(cart)
    }

    /// Parks an open cart for later completion.
    #[instrument(skip(self))]
    pub async fn hold_cart(
        &self,
        cart_id: Uuid,
        notes: Option<String>,
    ) -> Result<CartModel, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;
        if cart.status != CartStatus::Open {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot hold a {:?} cart",
                cart.status
            )));
        }

        let mut active: cart::ActiveModel = cart.into();
        active.status = Set(CartStatus::Held);
        if notes.is_some() {
            active.notes = Set(notes);
        }
        active.updated_at = Set(Utc::now());
        let cart = active.update(&*self.db).await?;

        self.event_sender.send_or_log(Event::CartHeld(cart_id)).await;
        Ok(cart)
    }

    /// Reopens a held cart.
    #[instrument(skip(self))]
    pub async fn resume_cart(&self, cart_id: Uuid) -> Result<CartModel, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;
        if cart.status != CartStatus::Held {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot resume a {:?} cart",
                cart.status
            )));
        }

        let mut active: cart::ActiveModel = cart.into();
        active.status = Set(CartStatus::Open);
        active.updated_at = Set(Utc::now());
        let cart = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartUpdated(cart_id))
            .await;
        Ok(cart)
    }

    /// All parked carts, most recently touched first.
    #[instrument(skip(self))]
    pub async fn held_carts(&self) -> Result<Vec<CartModel>, ServiceError> {
        Ok(Cart::find()
            .filter(cart::Column::Status.eq(CartStatus::Held))
            .order_by_desc(cart::Column::UpdatedAt)
            .all(&*self.db)
            .await?)
    }
}

/// Per-line discount is a percentage of the full line value.
pub(crate) fn line_amounts(
    unit_price: Decimal,
    discount_percent: Decimal,
    quantity: i32,
) -> (Decimal, Decimal) {
    let qty = Decimal::from(quantity);
    let discount_amount = unit_price * discount_percent / Decimal::ONE_HUNDRED * qty;
    let line_total = unit_price * qty - discount_amount;
    (discount_amount, line_total)
}

/// Cart totals: tax applies to the discounted subtotal.
pub(crate) fn cart_totals(
    subtotal: Decimal,
    discount_amount: Decimal,
    tax_rate_percent: Decimal,
) -> (Decimal, Decimal) {
    let taxable = subtotal - discount_amount;
    let tax_amount = taxable * tax_rate_percent / Decimal::ONE_HUNDRED;
    let total_amount = taxable + tax_amount;
    (tax_amount, total_amount)
}

pub(crate) async fn require_open_cart<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> Result<CartModel, ServiceError> {
    let cart = Cart::find_by_id(cart_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;
    if cart.status != CartStatus::Open {
        return Err(ServiceError::InvalidOperation(
            "Cart is not open".to_string(),
        ));
    }
    Ok(cart)
}

/// Re-sums line totals and rewrites the cart's derived amounts.
pub(crate) async fn recalculate_totals<C: ConnectionTrait>(
    conn: &C,
    cart: CartModel,
) -> Result<CartModel, ServiceError> {
    let items = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .all(conn)
        .await?;
    let subtotal: Decimal = items.iter().map(|i| i.line_total).sum();
    let (tax_amount, total_amount) =
        cart_totals(subtotal, cart.discount_amount, cart.tax_rate_percent);

    let mut active: cart::ActiveModel = cart.into();
    active.subtotal = Set(subtotal);
    active.tax_amount = Set(tax_amount);
    active.total_amount = Set(total_amount);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Looks up an active, in-window coupon and computes the amount it takes
/// off the given subtotal.
pub(crate) async fn compute_discount<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    subtotal: Decimal,
) -> Result<Decimal, ServiceError> {
    let now = Utc::now();
    let coupon = Discount::find()
        .filter(discount::Column::Code.eq(code))
        .filter(discount::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .filter(|d| d.valid_from.map_or(true, |from| from <= now))
        .filter(|d| d.valid_until.map_or(true, |until| until >= now))
        .ok_or_else(|| {
            ServiceError::ValidationError("Invalid or expired discount code".to_string())
        })?;

    if let Some(min_purchase) = coupon.min_purchase_amount {
        if subtotal < min_purchase {
            return Err(ServiceError::ValidationError(format!(
                "Minimum purchase amount is {}",
                min_purchase
            )));
        }
    }

    let mut amount = match coupon.discount_type {
        DiscountType::Percentage => subtotal * coupon.value / Decimal::ONE_HUNDRED,
        DiscountType::FixedAmount => coupon.value,
    };
    if let Some(max) = coupon.max_discount_amount {
        amount = amount.min(max);
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_discount_scales_with_quantity() {
        let (discount, total) = line_amounts(dec!(500), dec!(10), 2);
        assert_eq!(discount, dec!(100));
        assert_eq!(total, dec!(900));
    }

    #[test]
    fn zero_discount_line() {
        let (discount, total) = line_amounts(dec!(250), Decimal::ZERO, 4);
        assert_eq!(discount, Decimal::ZERO);
        assert_eq!(total, dec!(1000));
    }

    #[test]
    fn tax_applies_to_discounted_subtotal() {
        // 1000 subtotal, 100 off, 18% tax -> 162 tax, 1062 total.
        let (tax, total) = cart_totals(dec!(1000), dec!(100), dec!(18));
        assert_eq!(tax, dec!(162.00));
        assert_eq!(total, dec!(1062.00));
    }

    #[test]
    fn no_tax_no_discount() {
        let (tax, total) = cart_totals(dec!(750), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(tax, Decimal::ZERO);
        assert_eq!(total, dec!(750));
    }
}
