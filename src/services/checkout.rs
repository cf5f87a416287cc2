use crate::{
    entities::{
        cart, cart_item, customer, invoice_item, payment, sales_invoice, stock_item,
        stock_movement,
        cart::CartStatus,
        payment::PaymentMethod,
        sales_invoice::PaymentStatus,
        stock_item::StockStatus,
        CartItem, Customer, Payment, SalesInvoice, StockItem,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::cart::{compute_discount, recalculate_totals, require_open_cart},
};
use chrono::{Datelike, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize)]
pub struct PaymentInput {
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub card_last_four: Option<String>,
    pub card_type: Option<String>,
    pub bank_name: Option<String>,
    pub cheque_number: Option<String>,
    pub upi_reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutInput {
    pub cart_id: Uuid,
    pub customer_id: Option<i64>,
    pub payments: Vec<PaymentInput>,
    pub discount_code: Option<String>,
    pub tax_rate_percent: Option<Decimal>,
    pub notes: Option<String>,
    pub sales_person: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckoutResult {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub outstanding_amount: Decimal,
    pub payment_status: PaymentStatus,
}

/// Converts an open cart into an invoice: applies coupon and tax, validates
/// payment cover, snapshots the lines, records payments, flips serialized
/// stock to sold, and awards loyalty points. The whole conversion runs in
/// one transaction.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(cart_id = %input.cart_id))]
    pub async fn process_checkout(
        &self,
        input: CheckoutInput,
    ) -> Result<CheckoutResult, ServiceError> {
        let txn = self.db.begin().await?;

        // 1. Load cart and items.
        let cart = require_open_cart(&txn, input.cart_id).await?;
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(input.cart_id))
            .all(&txn)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }

        // 2. Coupon.
        let cart = match &input.discount_code {
            Some(code) => {
                let discount_amount = compute_discount(&txn, code, cart.subtotal).await?;
                let mut active: cart::ActiveModel = cart.into();
                active.discount_amount = Set(discount_amount);
                let cart = active.update(&txn).await?;
                recalculate_totals(&txn, cart).await?
            }
            None => cart,
        };

        // 3. Tax.
        let cart = match input.tax_rate_percent {
            Some(rate) if rate > Decimal::ZERO => {
                let mut active: cart::ActiveModel = cart.into();
                active.tax_rate_percent = Set(rate);
                let cart = active.update(&txn).await?;
                recalculate_totals(&txn, cart).await?
            }
            _ => cart,
        };

        // 4. Payment cover. Partial checkout is not permitted.
        let total_payment: Decimal = input.payments.iter().map(|p| p.amount).sum();
        if total_payment < cart.total_amount {
            return Err(ServiceError::PaymentFailed(format!(
                "Insufficient payment. Total: {}, Paid: {}",
                cart.total_amount, total_payment
            )));
        }

        // 5. Invoice and line snapshot.
        let invoice_id = Uuid::new_v4();
        let invoice_number = next_invoice_number(&txn).await?;
        let now = Utc::now();

        let invoice = sales_invoice::ActiveModel {
            id: Set(invoice_id),
            invoice_number: Set(invoice_number.clone()),
            cart_id: Set(Some(cart.id)),
            customer_id: Set(input.customer_id),
            subtotal: Set(cart.subtotal),
            discount_amount: Set(cart.discount_amount),
            tax_rate_percent: Set(cart.tax_rate_percent),
            tax_amount: Set(cart.tax_amount),
            total_amount: Set(cart.total_amount),
            paid_amount: Set(Decimal::ZERO),
            outstanding_amount: Set(cart.total_amount),
            payment_status: Set(PaymentStatus::Pending),
            sales_person: Set(input.sales_person.clone()),
            notes: Set(input.notes.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        invoice.insert(&txn).await?;

        for item in &items {
            let snapshot = invoice_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                invoice_id: Set(invoice_id),
                variant_id: Set(item.variant_id),
                stock_item_id: Set(item.stock_item_id),
                product_name: Set(item.product_name.clone()),
                sku: Set(item.sku.clone()),
                serial_no: Set(item.serial_no.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                discount_percent: Set(item.discount_percent),
                discount_amount: Set(item.discount_amount),
                line_total: Set(item.line_total),
            };
            snapshot.insert(&txn).await?;
        }

        // 6. Payments, then the derived invoice status.
        let mut payment_ids = Vec::with_capacity(input.payments.len());
        let payment_count = Payment::find().count(&txn).await?;
        for (i, p) in input.payments.iter().enumerate() {
            let payment_id = Uuid::new_v4();
            let payment_number = format!("PAY-{:06}", payment_count + 1 + i as u64);
            let row = payment::ActiveModel {
                id: Set(payment_id),
                payment_number: Set(payment_number),
                invoice_id: Set(invoice_id),
                method: Set(p.method),
                amount: Set(p.amount),
                card_last_four: Set(p.card_last_four.clone()),
                card_type: Set(p.card_type.clone()),
                bank_name: Set(p.bank_name.clone()),
                cheque_number: Set(p.cheque_number.clone()),
                upi_reference: Set(p.upi_reference.clone()),
                notes: Set(p.notes.clone()),
                received_by: Set(input.sales_person.clone().unwrap_or_else(|| "system".to_string())),
                received_at: Set(now),
            };
            row.insert(&txn).await?;
            payment_ids.push(payment_id);
        }

        let outstanding = (cart.total_amount - total_payment).max(Decimal::ZERO);
        let payment_status = derive_payment_status(total_payment, cart.total_amount);

        let invoice = SalesInvoice::find_by_id(invoice_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::InternalError("Invoice vanished mid-checkout".to_string()))?;
        let mut invoice: sales_invoice::ActiveModel = invoice.into();
        invoice.paid_amount = Set(total_payment);
        invoice.outstanding_amount = Set(outstanding);
        invoice.payment_status = Set(payment_status);
        invoice.updated_at = Set(now);
        invoice.update(&txn).await?;

        // 7. Serialized pieces are sold now.
        for item in &items {
            if let Some(stock_item_id) = item.stock_item_id {
                let stock = StockItem::find_by_id(stock_item_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Stock item {} not found", stock_item_id))
                    })?;
                let mut stock: stock_item::ActiveModel = stock.into();
                stock.status = Set(StockStatus::Sold);
                stock.updated_at = Set(now);
                stock.update(&txn).await?;

                let movement = stock_movement::ActiveModel {
                    id: NotSet,
                    stock_item_id: Set(stock_item_id),
                    movement_type: Set("sale".to_string()),
                    reference_id: Set(Some(invoice_id)),
                    notes: Set(Some(format!("Invoice {}", invoice_number))),
                    moved_at: Set(now),
                };
                movement.insert(&txn).await?;
            }
        }

        // 8. Cart is converted; the transition is terminal.
        let mut cart: cart::ActiveModel = cart.into();
        cart.status = Set(CartStatus::Converted);
        cart.updated_at = Set(now);
        let cart = cart.update(&txn).await?;

        // 9. Loyalty: one point per 100 spent.
        if let Some(customer_id) = input.customer_id {
            award_loyalty_points(&txn, customer_id, cart.total_amount).await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::InvoiceCreated {
                invoice_id,
                invoice_number: invoice_number.clone(),
            })
            .await;
        for payment_id in payment_ids {
            self.event_sender
                .send_or_log(Event::PaymentRecorded {
                    invoice_id,
                    payment_id,
                })
                .await;
        }
        self.event_sender
            .send_or_log(Event::CartConverted(cart.id))
            .await;

        info!("Checkout complete: {}", invoice_number);
        Ok(CheckoutResult {
            invoice_id,
            invoice_number,
            total_amount: cart.total_amount,
            paid_amount: total_payment,
            outstanding_amount: outstanding,
            payment_status,
        })
    }

    /// Records an additional payment against an existing invoice and
    /// rederives its paid/outstanding/status fields.
    #[instrument(skip(self))]
    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        payment: PaymentInput,
        received_by: &str,
    ) -> Result<payment::Model, ServiceError> {
        if payment.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let invoice = SalesInvoice::find_by_id(invoice_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        let payment_count = Payment::find().count(&txn).await?;
        let now = Utc::now();
        let row = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            payment_number: Set(format!("PAY-{:06}", payment_count + 1)),
            invoice_id: Set(invoice_id),
            method: Set(payment.method),
            amount: Set(payment.amount),
            card_last_four: Set(payment.card_last_four),
            card_type: Set(payment.card_type),
            bank_name: Set(payment.bank_name),
            cheque_number: Set(payment.cheque_number),
            upi_reference: Set(payment.upi_reference),
            notes: Set(payment.notes),
            received_by: Set(received_by.to_string()),
            received_at: Set(now),
        };
        let row = row.insert(&txn).await?;

        let paid: Decimal = Payment::find()
            .filter(payment::Column::InvoiceId.eq(invoice_id))
            .all(&txn)
            .await?
            .iter()
            .map(|p| p.amount)
            .sum();
        let outstanding = (invoice.total_amount - paid).max(Decimal::ZERO);
        let status = derive_payment_status(paid, invoice.total_amount);

        let mut invoice: sales_invoice::ActiveModel = invoice.into();
        invoice.paid_amount = Set(paid);
        invoice.outstanding_amount = Set(outstanding);
        invoice.payment_status = Set(status);
        invoice.updated_at = Set(now);
        invoice.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PaymentRecorded {
                invoice_id,
                payment_id: row.id,
            })
            .await;
        Ok(row)
    }
}

/// Next number in the year-scoped INV-{year}-{seq:04} sequence, derived
/// from a count of this year's invoices. Unique for sequential callers;
/// concurrent checkouts could still collide on it.
async fn next_invoice_number(txn: &DatabaseTransaction) -> Result<String, ServiceError> {
    let year = Utc::now().year();
    let prefix = format!("INV-{}-", year);
    let count = SalesInvoice::find()
        .filter(sales_invoice::Column::InvoiceNumber.starts_with(prefix.clone()))
        .count(txn)
        .await?;
    Ok(format!("{}{:04}", prefix, count + 1))
}

fn derive_payment_status(paid: Decimal, total: Decimal) -> PaymentStatus {
    if paid >= total {
        PaymentStatus::Paid
    } else if paid > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}

async fn award_loyalty_points(
    txn: &DatabaseTransaction,
    customer_id: i64,
    total_amount: Decimal,
) -> Result<(), ServiceError> {
    let points = (total_amount / Decimal::ONE_HUNDRED)
        .floor()
        .to_i64()
        .unwrap_or(0);
    if points <= 0 {
        return Ok(());
    }

    let customer = Customer::find_by_id(customer_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;
    let current = customer.loyalty_points;
    let mut customer: customer::ActiveModel = customer.into();
    customer.loyalty_points = Set(current + points);
    customer.updated_at = Set(Utc::now());
    customer.update(txn).await?;
    Ok(())
}
