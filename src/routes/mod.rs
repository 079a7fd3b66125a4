//! HTTP route handlers.
//!
//! Every response carries `Cache-Control: no-store`: health and diagnostic
//! answers describe the process at one instant and must not be reused.
//!
//! Request logging is enabled via middleware that generates a unique request
//! ID for each incoming request, allowing correlation of all logs within a
//! request.

pub mod diag;
pub mod health;
pub mod home;

use axum::{middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::middleware::access_log_layer;
use crate::state::AppState;

const CACHE_CONTROL_NO_STORE: &str = "no-store";

/// Creates the Axum router with all routes.
///
/// Paths and methods not listed here fall through to axum's default 404/405.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/health", get(health::health))
        .route("/diag", get(diag::event))
        .route("/diag/trace", get(diag::trace))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ))
        .with_state(state.clone())
        // Access log - creates root span with request_id for correlation
        .layer(middleware::from_fn_with_state(state, access_log_layer))
}
