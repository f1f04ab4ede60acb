//! Gateway HTTP client

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use zkauth_core::AuthorizationRequest;

pub const PROXY_PATH: &str = "/api/v1/proxy";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway refused the request, or relayed a downstream failure.
    #[error("gateway rejected request ({status}): {body}")]
    Rejected { status: StatusCode, body: Value },
}

/// Successful gateway reply.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    pub status: StatusCode,
    pub body: Value,
}

pub struct GatewayClient {
    client: Client,
    gateway: String,
}

impl GatewayClient {
    pub fn new(gateway: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            // proving happens before the call, but the downstream write is behind it
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            gateway: gateway.trim_end_matches('/').to_string(),
        })
    }

    pub async fn submit(&self, request: &AuthorizationRequest) -> Result<GatewayReply, ClientError> {
        let url = format!("{}{}", self.gateway, PROXY_PATH);
        tracing::info!(%url, endpoint = %request.target_endpoint, "submitting proof to gateway");

        let resp = self.client.post(&url).json(request).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if !status.is_success() {
            return Err(ClientError::Rejected { status, body });
        }
        Ok(GatewayReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zkauth_core::ProofBundle;

    fn request() -> AuthorizationRequest {
        AuthorizationRequest {
            resource_id: 1,
            proof_bundle: ProofBundle {
                proof: json!({"protocol": "mock", "tag": "00"}),
                public_signals: vec!["1".into(), "2".into()],
            },
            target_endpoint: "/repos/a/b/contents/c.md".into(),
            method: "PUT".into(),
            request_body: json!({"message": "hi", "content": "aGk="}),
        }
    }

    #[tokio::test]
    async fn test_submit_posts_wire_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PROXY_PATH))
            .and(body_partial_json(json!({
                "resourceId": 1,
                "publicSignals": ["1", "2"],
                "method": "PUT"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = GatewayClient::new(&format!("{}/", server.uri())).unwrap();
        let reply = client.submit(&request()).await.unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["success"], true);
    }

    #[tokio::test]
    async fn test_rejection_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PROXY_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "Constraint mismatch: Payload Hash. Tampering detected."
            })))
            .mount(&server)
            .await;

        let client = GatewayClient::new(&server.uri()).unwrap();
        match client.submit(&request()).await.unwrap_err() {
            ClientError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(body["error"].as_str().unwrap().contains("Tampering"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_reply_kept_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = GatewayClient::new(&server.uri()).unwrap();
        match client.submit(&request()).await.unwrap_err() {
            ClientError::Rejected { status, body } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, Value::String("bad gateway".into()));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }
}
