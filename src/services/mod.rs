//! Business services. Each service owns a database handle, an event sender,
//! and the application config, and exposes async operations returning
//! `Result<_, ServiceError>`.

pub mod cart;
pub mod checkout;
pub mod inventory_upload;
pub mod pricing;
pub mod product_tracker;
pub mod storage;

pub use cart::CartService;
pub use checkout::CheckoutService;
pub use inventory_upload::InventoryUploadService;
pub use pricing::PricingService;
pub use product_tracker::ProductTrackerService;
pub use storage::StorageService;
