//! Database entities.
//!
//! Table names follow the production schema: billing tables carry the
//! `billing_system_` prefix, catalog and invoicing tables are unprefixed.

pub mod cart;
pub mod cart_item;
pub mod customer;
pub mod diamond_component;
pub mod discount;
pub mod invoice_item;
pub mod metal_component;
pub mod payment;
pub mod pricing_breakdown;
pub mod product_location;
pub mod product_movement;
pub mod product_variant;
pub mod sales_invoice;
pub mod stock_item;
pub mod stock_movement;
pub mod storage_box;
pub mod storage_location;
pub mod storage_shelf;

pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use customer::Entity as Customer;
pub use diamond_component::Entity as DiamondComponent;
pub use discount::Entity as Discount;
pub use invoice_item::Entity as InvoiceItem;
pub use metal_component::Entity as MetalComponent;
pub use payment::Entity as Payment;
pub use pricing_breakdown::Entity as PricingBreakdown;
pub use product_location::Entity as ProductLocation;
pub use product_movement::Entity as ProductMovement;
pub use product_variant::Entity as ProductVariant;
pub use sales_invoice::Entity as SalesInvoice;
pub use stock_item::Entity as StockItem;
pub use stock_movement::Entity as StockMovement;
pub use storage_box::Entity as StorageBox;
pub use storage_location::Entity as StorageLocation;
pub use storage_shelf::Entity as StorageShelf;

pub use cart::Model as CartModel;
pub use cart_item::Model as CartItemModel;
pub use product_location::Model as ProductLocationModel;
pub use product_movement::Model as ProductMovementModel;
pub use sales_invoice::Model as SalesInvoiceModel;
