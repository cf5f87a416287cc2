use std::{net::SocketAddr, sync::Arc};

use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use minaki_ops as ops;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ops::config::load_config()?;
    ops::init_tracing(&config.log_level, config.log_json);

    let db = ops::db::establish_connection(&config).await?;
    let db = Arc::new(db);

    let (event_sender, event_receiver) = ops::events::event_channel(1024);
    tokio::spawn(ops::events::process_events(event_receiver));

    let config = Arc::new(config);
    let event_sender = Arc::new(event_sender);
    let services = ops::AppServices::new(db.clone(), event_sender.clone(), config.clone());

    let state = ops::AppState {
        db,
        config: config.clone(),
        event_sender,
        services,
    };

    let app = ops::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
