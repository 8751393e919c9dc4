//! One-shot quote endpoint

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use quotefeed_core::PriceQuery;
use tracing::info;

use crate::AppState;

/// Create price routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/prices", get(get_prices))
}

/// Collect repeated `fsyms`/`tsyms` query parameters into a price query.
///
/// Returns `None` when either list is missing, which callers map to 400.
pub(crate) fn parse_query(params: &[(String, String)]) -> Option<PriceQuery> {
    let mut fsyms = Vec::new();
    let mut tsyms = Vec::new();

    for (key, value) in params {
        match key.as_str() {
            "fsyms" => fsyms.push(value.clone()),
            "tsyms" => tsyms.push(value.clone()),
            _ => {}
        }
    }

    if fsyms.is_empty() || tsyms.is_empty() {
        return None;
    }

    Some(PriceQuery::new(fsyms, tsyms))
}

/// Resolve a quote document for the requested symbol pairs
async fn get_prices(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let Some(query) = parse_query(&params) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    info!("One-shot quote request for {}", query);

    match state.price_manager.get_prices(&query).await {
        Ok(payload) => {
            ([(header::CONTENT_TYPE, "application/json")], payload).into_response()
        }
        Err(_) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
