//! API route handlers.

pub mod auth;

use crate::auth::middleware::AppState;
use crate::middleware::security_headers;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Auth endpoints
        .route("/api/nonce", get(auth::issue_nonce))
        .route("/api/verify", post(auth::verify_signature))
        .route("/api/me", get(auth::me))
        .route("/api/logout", post(auth::logout))
}

/// CORS policy for the browser client.
///
/// With no configured origins, `CorsLayer::new()` rejects all cross-origin
/// requests.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// The full application: routes, CORS, security headers and state.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    api_router()
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state)
}
