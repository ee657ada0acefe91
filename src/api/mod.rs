//! HTTP routes
//!
//! The API is GraphQL at /graphql, plus liveness and readiness probes.

pub mod graphql;
pub mod health;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(graphql::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
