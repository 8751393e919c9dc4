//! Crypto Quote Streaming Terminal API server
//!
//! Streams periodically refreshed CryptoCompare quotes to WebSocket
//! subscribers and serves one-shot quote lookups over HTTP.

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, Method},
    Router,
};
use quotefeed_cryptocompare::CryptoCompareClient;
use quotefeed_services::{Hub, PriceManager, PriceStore};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub price_manager: Arc<PriceManager>,
    pub hub: Hub,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,quotefeed_api=debug")),
        )
        .init();

    info!("Starting Crypto Quote Streaming Terminal API");

    // Initialize the upstream client
    let client = match std::env::var("CRYPTOCOMPARE_API_KEY") {
        Ok(key) => {
            info!("CryptoCompare API key found in environment");
            CryptoCompareClient::with_auth(key)
        }
        Err(_) => CryptoCompareClient::new(),
    };

    // Initialize the persisted fallback store (SQLite)
    let db_path =
        std::env::var("FALLBACK_DB_PATH").unwrap_or_else(|_| "data/prices.db".to_string());
    info!("Initializing fallback price store at: {}", db_path);
    let store = Arc::new(PriceStore::new(&db_path)?);

    // Initialize the price manager and the connection registry
    let price_manager = Arc::new(PriceManager::new(Arc::new(client), store));
    let hub = Hub::new();

    let state = AppState { price_manager, hub };

    // Configure CORS for browser clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // Build router
    let app = Router::new()
        .nest("/api", routes::api_routes())
        .merge(routes::ws_routes())
        .merge(routes::page_routes())
        .layer(cors)
        .with_state(state);

    // Start server
    let port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
