//! Data models for API responses

use serde::Serialize;
use serde_json::Value;

/// Relayed result of an authorized, successful downstream call
#[derive(Debug, Clone, Serialize)]
pub struct ProxyResponse {
    pub success: bool,
    pub gateway_action: String,
    pub downstream_status: u16,
    pub downstream_response: Value,
}

impl ProxyResponse {
    pub fn executed(downstream_status: u16, downstream_response: Value) -> Self {
        Self {
            success: true,
            gateway_action: "Executed securely with injected credentials".to_string(),
            downstream_status,
            downstream_response,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub proof_system: String,
    pub downstream: String,
}
