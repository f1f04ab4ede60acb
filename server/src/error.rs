//! Error types for the gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::checkpoint::ConstrainedField;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed authorization request: {0}")]
    MalformedRequest(String),

    #[error("Constraint mismatch: {0}.")]
    ConstraintMismatch(ConstrainedField),

    #[error("Constraint mismatch: Payload Hash. Tampering detected.")]
    TamperDetected,

    #[error("Invalid Zero-Knowledge Proof. Access Denied.")]
    ProofInvalid,

    /// Authorized and forwarded, but the downstream refused or failed.
    #[error("Downstream API Error")]
    DownstreamFailure { status: StatusCode, details: Value },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ConstraintMismatch(_) => StatusCode::BAD_REQUEST,
            AppError::TamperDetected => StatusCode::BAD_REQUEST,
            AppError::ProofInvalid => StatusCode::UNAUTHORIZED,
            AppError::DownstreamFailure { status, .. } => *status,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::DownstreamFailure { details, .. } => json!({
                "error": "Downstream API Error",
                "details": details,
            }),
            AppError::Internal(ref reason) => {
                tracing::error!(%reason, "internal failure during verification");
                json!({ "error": "Server error during verification." })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
