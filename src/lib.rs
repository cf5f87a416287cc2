//! Operations backend for a jewelry retailer: pricing recalculation,
//! storage-location tracking, billing/checkout, and SEO content generation.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod content;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Service bundle shared by handlers.
#[derive(Clone)]
pub struct AppServices {
    pub pricing: services::PricingService,
    pub storage: services::StorageService,
    pub product_tracker: services::ProductTrackerService,
    pub cart: services::CartService,
    pub checkout: services::CheckoutService,
    pub inventory_upload: services::InventoryUploadService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<events::EventSender>,
        config: Arc<config::AppConfig>,
    ) -> Self {
        Self {
            pricing: services::PricingService::new(
                db.clone(),
                event_sender.clone(),
                config.clone(),
            ),
            storage: services::StorageService::new(db.clone()),
            product_tracker: services::ProductTrackerService::new(
                db.clone(),
                event_sender.clone(),
            ),
            cart: services::CartService::new(db.clone(), event_sender.clone()),
            checkout: services::CheckoutService::new(db.clone(), event_sender),
            inventory_upload: services::InventoryUploadService::new(db),
        }
    }
}

/// Shared application state handed to the router.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: Arc<events::EventSender>,
    pub services: AppServices,
}

/// Common response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Initializes the global tracing subscriber from the configured level.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Status and health shell. Business operations are exposed as service
/// calls; the HTTP surface is limited to liveness endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { "minaki-ops up" }))
        .route("/status", get(api_status))
        .route("/health", get(health_check))
}

async fn api_status() -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "service": "minaki-ops",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };
    let health_data = json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(health_data)))
}
