//! API route definitions

mod health;
mod pages;
mod prices;
pub mod ws;

use axum::Router;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(prices::routes())
        .merge(health::routes())
}

/// Create WebSocket routes (separate from API)
pub fn ws_routes() -> Router<AppState> {
    ws::routes()
}

/// Create demo client page routes
pub fn page_routes() -> Router<AppState> {
    pages::routes()
}
