//! ZKAuth Gateway
//!
//! A proxy that holds the real downstream credential and releases it only to
//! requests carrying a valid authorization proof bound to their exact payload.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use zkauth_core::ProofSystem;

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

use handlers::AppState;
use services::downstream::Downstream;

pub fn router<P, D>(state: AppState<P, D>) -> Router
where
    P: ProofSystem + 'static,
    D: Downstream + 'static,
{
    Router::new()
        // Health check
        .route("/health", get(handlers::health::<P, D>))
        // Proof-gated proxy
        .route("/api/v1/proxy", post(handlers::proxy::<P, D>))
        // State
        .with_state(state)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
