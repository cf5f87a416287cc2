pub mod literal;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Type alias for the shared connection pool.
pub type DbPool = DatabaseConnection;

/// Establishes the application's database connection pool.
///
/// Pool sizing mirrors the hosted-Postgres limits the deployment runs
/// against: a small pool with pre-ping validation and periodic recycling.
pub async fn establish_connection(config: &AppConfig) -> Result<DbPool, ServiceError> {
    let mut opts = ConnectOptions::new(config.database_url.clone());
    opts.max_connections(config.db_max_connections.unwrap_or(8))
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(!config.is_production());

    let pool = Database::connect(opts).await?;
    info!("Database connection established");
    Ok(pool)
}
