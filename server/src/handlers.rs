//! HTTP handlers for the proxy gateway

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use zkauth_core::ProofSystem;

use crate::checkpoint::{Checkpoint, ValidatedRequest};
use crate::error::AppError;
use crate::models::{HealthResponse, ProxyResponse};
use crate::services::downstream::Downstream;

/// Shared application state
pub struct AppState<P, D> {
    pub checkpoint: Arc<Checkpoint<P, D>>,
}

impl<P, D> AppState<P, D> {
    pub fn new(checkpoint: Checkpoint<P, D>) -> Self {
        Self {
            checkpoint: Arc::new(checkpoint),
        }
    }
}

// derive(Clone) would demand P: Clone and D: Clone
impl<P, D> Clone for AppState<P, D> {
    fn clone(&self) -> Self {
        Self {
            checkpoint: Arc::clone(&self.checkpoint),
        }
    }
}

/// Health check endpoint
pub async fn health<P, D>(State(state): State<AppState<P, D>>) -> Json<HealthResponse>
where
    P: ProofSystem + 'static,
    D: Downstream + 'static,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        proof_system: state.checkpoint.proof_system().name().to_string(),
        downstream: state.checkpoint.downstream().describe(),
    })
}

/// Verify an authorization request and, if it holds, execute it downstream.
///
/// The body is taken raw so structural errors surface as our own 400 rather
/// than the extractor's rejection.
pub async fn proxy<P, D>(
    State(state): State<AppState<P, D>>,
    body: Bytes,
) -> Result<(StatusCode, Json<ProxyResponse>), AppError>
where
    P: ProofSystem + 'static,
    D: Downstream + 'static,
{
    let request = ValidatedRequest::parse(&body)?;
    let response = state.checkpoint.process(request).await?;

    Ok((
        StatusCode::OK,
        Json(ProxyResponse::executed(
            response.status.as_u16(),
            response.body,
        )),
    ))
}
