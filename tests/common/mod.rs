use std::sync::Arc;
use std::time::Duration;

use minaki_ops::{
    config::AppConfig,
    entities,
    events::{self, EventSender},
};
use sea_orm::sea_query::{Alias, ColumnDef, ColumnSpec, ColumnType, TableCreateStatement};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};

/// Test harness backed by an in-memory SQLite database with the full schema.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub event_sender: Arc<EventSender>,
    pub config: Arc<AppConfig>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
        // A single connection keeps every statement on the same in-memory db.
        opts.max_connections(1)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(5))
            .sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("failed to open in-memory database");

        create_schema(&db).await;

        let (event_sender, event_receiver) = events::event_channel(256);
        let event_task = tokio::spawn(events::process_events(event_receiver));

        Self {
            db: Arc::new(db),
            event_sender: Arc::new(event_sender),
            config: Arc::new(AppConfig::new(
                "sqlite::memory:".to_string(),
                "test".to_string(),
            )),
            _event_task: event_task,
        }
    }
}

async fn create_schema(db: &DatabaseConnection) {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    macro_rules! create_table {
        ($entity:expr) => {
            let stmt = clamp_decimals(&schema.create_table_from_entity($entity));
            db.execute(backend.build(&stmt))
                .await
                .expect("failed to create table");
        };
    }

    create_table!(entities::ProductVariant);
    create_table!(entities::MetalComponent);
    create_table!(entities::DiamondComponent);
    create_table!(entities::PricingBreakdown);
    create_table!(entities::StorageLocation);
    create_table!(entities::StorageShelf);
    create_table!(entities::StorageBox);
    create_table!(entities::ProductLocation);
    create_table!(entities::ProductMovement);
    create_table!(entities::Customer);
    create_table!(entities::Discount);
    create_table!(entities::Cart);
    create_table!(entities::CartItem);
    create_table!(entities::SalesInvoice);
    create_table!(entities::InvoiceItem);
    create_table!(entities::Payment);
    create_table!(entities::StockItem);
    create_table!(entities::StockMovement);
}

/// sea-query's SQLite builder panics on decimal columns wider than 16
/// digits, so the Postgres-shaped `Decimal(19,4)` money columns must be
/// narrowed before they can back the in-memory test database. SQLite
/// stores them as REAL either way, so test values round-trip identically.
fn clamp_decimals(stmt: &TableCreateStatement) -> TableCreateStatement {
    let mut out = TableCreateStatement::new();
    if let Some(table) = stmt.get_table_name() {
        out.table(table.clone());
    }
    for col in stmt.get_columns() {
        let ty = match col.get_column_type() {
            Some(ColumnType::Decimal(Some((precision, scale)))) if *precision > 16 => {
                ColumnType::Decimal(Some((16, *scale)))
            }
            other => other.cloned().expect("entity column has a type"),
        };
        let mut def = ColumnDef::new_with_type(Alias::new(col.get_column_name()), ty);
        for spec in col.get_column_spec() {
            match spec {
                ColumnSpec::Null => def.null(),
                ColumnSpec::NotNull => def.not_null(),
                ColumnSpec::Default(expr) => def.default(expr.clone()),
                ColumnSpec::AutoIncrement => def.auto_increment(),
                ColumnSpec::UniqueKey => def.unique_key(),
                ColumnSpec::PrimaryKey => def.primary_key(),
                ColumnSpec::Check(expr) => def.check(expr.clone()),
                _ => &mut def,
            };
        }
        out.col(def);
    }
    for index in stmt.get_indexes() {
        out.index(&mut index.clone());
    }
    for foreign_key in stmt.get_foreign_key_create_stmts() {
        out.foreign_key(&mut foreign_key.clone());
    }
    out
}
