//! Authorization requester
//!
//! Turns "I want to perform this action" into a proof-carrying
//! [`AuthorizationRequest`]. The auth secret only ever exists inside
//! [`PrivateInputs`] for the duration of one `prove` call.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use thiserror::Error;
use zeroize::Zeroizing;

use zkauth_core::{
    commit, ActionPayload, AuthorizationRequest, PayloadError, PrivateInputs, ProofError,
    ProofSystem,
};

pub const DEFAULT_COMMIT_MESSAGE: &str = "Automated SECURE commit via ZKAuth Agent";

#[derive(Error, Debug)]
pub enum RequesterError {
    /// The prover could not produce a proof for these inputs. Never retried
    /// with different inputs.
    #[error("unable to authorize: {0}")]
    ProvingFailure(#[from] ProofError),

    #[error("invalid action payload: {0}")]
    InvalidPayload(#[from] PayloadError),
}

/// Body of a repository contents write on the downstream system.
#[derive(Debug, Clone, Serialize)]
pub struct PushFilePayload {
    pub message: String,
    /// Base64 file content.
    pub content: String,
}

impl PushFilePayload {
    pub fn new(content: &str, message: &str) -> Self {
        Self {
            message: message.to_string(),
            content: BASE64.encode(content.as_bytes()),
        }
    }
}

pub fn push_file_endpoint(repo_path: &str, filename: &str) -> String {
    format!(
        "/repos/{}/contents/{}",
        repo_path.trim_matches('/'),
        filename.trim_start_matches('/')
    )
}

pub struct AuthorizationRequester<P> {
    proof_system: P,
}

impl<P: ProofSystem> AuthorizationRequester<P> {
    pub fn new(proof_system: P) -> Self {
        Self { proof_system }
    }

    pub fn proof_system(&self) -> &P {
        &self.proof_system
    }

    /// Prove authorization for `payload` and package the request.
    pub async fn build_request(
        &self,
        resource_id: u64,
        auth_secret: Zeroizing<String>,
        payload: ActionPayload,
        target_endpoint: impl Into<String>,
        method: impl Into<String>,
    ) -> Result<AuthorizationRequest, RequesterError> {
        let payload_commitment = commit(&payload);
        tracing::info!(
            resource_id,
            commitment = %payload_commitment,
            "generating authorization proof"
        );

        let inputs = PrivateInputs::new(resource_id, payload_commitment, auth_secret);
        let proof_bundle = self.proof_system.prove(&inputs).await?;
        drop(inputs);

        tracing::info!(
            signals = proof_bundle.public_signals.len(),
            "authorization proof generated"
        );

        Ok(AuthorizationRequest {
            resource_id,
            proof_bundle,
            target_endpoint: target_endpoint.into(),
            method: method.into(),
            request_body: payload.into_value(),
        })
    }

    /// Request to write `content` to `filename` in `repo_path`.
    pub async fn push_file_request(
        &self,
        resource_id: u64,
        auth_secret: Zeroizing<String>,
        repo_path: &str,
        filename: &str,
        content: &str,
        message: &str,
    ) -> Result<AuthorizationRequest, RequesterError> {
        let payload = ActionPayload::new(&PushFilePayload::new(content, message))?;
        self.build_request(
            resource_id,
            auth_secret,
            payload,
            push_file_endpoint(repo_path, filename),
            "PUT",
        )
        .await
    }
}
