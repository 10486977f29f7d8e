//! Scrawl WebSocket Relay Server binary.
//!
//! Configured through `SCRAWL_BIND_ADDR` and `SCRAWL_CHANNEL_CAPACITY`;
//! log filtering through `RUST_LOG`.

use scrawl_server::{AppState, ServerConfig, router};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "scrawl_server=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let state = Arc::new(AppState::new(&config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Scrawl relay server listening on {}", listener.local_addr()?);
    info!("WebSocket endpoint: ws://{}/ws", config.bind_addr);

    axum::serve(listener, app).await
}
