use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod models;
mod render;
mod routes;
mod services;

use services::store::DatasetStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::new()?;

    // Build our application state
    let store = DatasetStore::new(&config.upload_dir)?;
    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState::new(config, store));

    // Build our application with a route
    let app = Router::new()
        .merge(routes::routes())
        .merge(routes::datasets::routes(&state))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    // Run it
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    pub config: config::Config,
    pub store: DatasetStore,
}

impl AppState {
    fn new(config: config::Config, store: DatasetStore) -> Self {
        Self { config, store }
    }
}
