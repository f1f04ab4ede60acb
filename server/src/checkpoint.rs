//! Verification checkpoint
//!
//! The trust boundary. Every request walks the same ordered states and
//! leaves at the first failed check:
//!
//! 1. Received: structural validation ([`ValidatedRequest::parse`])
//! 2. ResourceCheck: claimed resource id == declared resource id
//! 3. BindingCheck: commitment recomputed from the payload == claimed commitment
//! 4. ProofCheck: external verifier accepts proof + public signals
//! 5. Forward: credential injected, verified payload sent downstream
//! 6. Completed: downstream status and body relayed
//!
//! Nothing reaches the downstream unless 2-4 all pass. The binding check runs
//! before the proof check because it is cheap.
//!
//! The checkpoint keeps no per-request state and has no replay cache: a
//! captured request stays acceptable for as long as its proof verifies.

use std::fmt;

use axum::http::Method;
use serde_json::Value;
use zkauth_core::{
    commit, ActionPayload, AuthorizationRequest, PayloadCommitment, ProofBundle, ProofSystem,
    SignalError, VerifyError, U256,
};

use crate::error::AppError;
use crate::services::downstream::{
    Credential, Downstream, DownstreamError, DownstreamResponse, ForwardCall,
};

/// Methods the gateway will forward.
const FORWARDABLE_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Request metadata a public signal is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstrainedField {
    ResourceId,
}

impl ConstrainedField {
    /// Wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstrainedField::ResourceId => "resourceId",
        }
    }
}

impl fmt::Display for ConstrainedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstrainedField::ResourceId => f.write_str("Repo ID"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    ConstraintMismatch(ConstrainedField),
    TamperDetected {
        expected: PayloadCommitment,
        claimed: U256,
    },
    ProofInvalid,
    Authorized,
}

impl VerificationOutcome {
    /// The rejection to return, or `None` when authorized.
    pub fn rejection(&self) -> Option<AppError> {
        match self {
            VerificationOutcome::ConstraintMismatch(field) => {
                Some(AppError::ConstraintMismatch(*field))
            }
            VerificationOutcome::TamperDetected { .. } => Some(AppError::TamperDetected),
            VerificationOutcome::ProofInvalid => Some(AppError::ProofInvalid),
            VerificationOutcome::Authorized => None,
        }
    }
}

/// A request that passed structural validation (state 1).
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub resource_id: u64,
    pub proof_bundle: ProofBundle,
    pub claimed_resource_id: U256,
    pub claimed_commitment: U256,
    pub method: Method,
    pub target_endpoint: String,
    pub payload: ActionPayload,
}

impl ValidatedRequest {
    /// Parse and validate a raw request body. Only the body size is logged
    /// on failure.
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        let request: AuthorizationRequest = serde_json::from_slice(body).map_err(|e| {
            tracing::warn!(body_len = body.len(), error = %e, "malformed authorization request");
            AppError::MalformedRequest(format!("invalid JSON structure: {e}"))
        })?;
        Self::try_from(request).map_err(|e| {
            tracing::warn!(body_len = body.len(), error = %e, "malformed authorization request");
            e
        })
    }
}

impl TryFrom<AuthorizationRequest> for ValidatedRequest {
    type Error = AppError;

    fn try_from(request: AuthorizationRequest) -> Result<Self, AppError> {
        let signal_err = |e: SignalError| AppError::MalformedRequest(e.to_string());
        let claimed_resource_id = request.proof_bundle.claimed_resource_id().map_err(signal_err)?;
        let claimed_commitment = request.proof_bundle.claimed_commitment().map_err(signal_err)?;
        let method = parse_method(&request.method)?;
        validate_endpoint(&request.target_endpoint)?;
        let payload = ActionPayload::from_value(request.request_body)
            .map_err(|e| AppError::MalformedRequest(e.to_string()))?;

        Ok(Self {
            resource_id: request.resource_id,
            proof_bundle: request.proof_bundle,
            claimed_resource_id,
            claimed_commitment,
            method,
            target_endpoint: request.target_endpoint,
            payload,
        })
    }
}

fn parse_method(raw: &str) -> Result<Method, AppError> {
    let method = Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| AppError::MalformedRequest(format!("invalid method '{raw}'")))?;
    if !FORWARDABLE_METHODS.contains(&method) {
        return Err(AppError::MalformedRequest(format!(
            "method '{method}' is not forwardable"
        )));
    }
    Ok(method)
}

/// A target must be a path on the downstream, never an authority.
fn validate_endpoint(endpoint: &str) -> Result<(), AppError> {
    let reject = |why: &str| Err(AppError::MalformedRequest(format!("targetEndpoint {why}")));
    if !endpoint.starts_with('/') {
        return reject("must start with '/'");
    }
    if endpoint.starts_with("//") {
        return reject("must not start with '//'");
    }
    if endpoint
        .chars()
        .any(|c| c == '\\' || c.is_whitespace() || c.is_control())
    {
        return reject("contains forbidden characters");
    }
    Ok(())
}

pub struct Checkpoint<P, D> {
    proof_system: P,
    downstream: D,
    credential: Credential,
}

impl<P: ProofSystem, D: Downstream> Checkpoint<P, D> {
    pub fn new(proof_system: P, downstream: D, credential: Credential) -> Self {
        Self {
            proof_system,
            downstream,
            credential,
        }
    }

    pub fn proof_system(&self) -> &P {
        &self.proof_system
    }

    pub fn downstream(&self) -> &D {
        &self.downstream
    }

    /// Run states 2-4. Pure apart from logging.
    pub async fn verify(&self, request: &ValidatedRequest) -> Result<VerificationOutcome, AppError> {
        // ResourceCheck
        if request.claimed_resource_id != U256::from(request.resource_id) {
            tracing::warn!(
                field = ConstrainedField::ResourceId.as_str(),
                declared = request.resource_id,
                claimed = %request.claimed_resource_id,
                "proof resource id does not match request"
            );
            return Ok(VerificationOutcome::ConstraintMismatch(
                ConstrainedField::ResourceId,
            ));
        }

        // BindingCheck
        let expected = commit(&request.payload);
        if expected.as_u256() != request.claimed_commitment {
            tracing::warn!(
                expected = %expected,
                claimed = %request.claimed_commitment,
                "SECURITY ALERT: payload tampering detected"
            );
            return Ok(VerificationOutcome::TamperDetected {
                expected,
                claimed: request.claimed_commitment,
            });
        }

        // ProofCheck
        let bundle = &request.proof_bundle;
        match self
            .proof_system
            .verify(&bundle.public_signals, &bundle.proof)
            .await
        {
            Ok(true) => Ok(VerificationOutcome::Authorized),
            Ok(false) => {
                tracing::warn!(resource_id = request.resource_id, "proof rejected by verifier");
                Ok(VerificationOutcome::ProofInvalid)
            }
            // the gateway cannot run its verifier at all
            Err(VerifyError::NotConfigured(reason)) => Err(AppError::Internal(reason)),
            Err(VerifyError::Io(e)) => Err(AppError::Internal(format!("verifier unavailable: {e}"))),
            // the verifier ran but choked on the submitted proof
            Err(e) => {
                tracing::error!(resource_id = request.resource_id, error = %e, "verifier failed");
                Ok(VerificationOutcome::ProofInvalid)
            }
        }
    }

    /// Verify and, only if authorized, forward. A downstream non-2xx comes
    /// back as [`AppError::DownstreamFailure`].
    pub async fn process(&self, request: ValidatedRequest) -> Result<DownstreamResponse, AppError> {
        tracing::info!(
            resource_id = request.resource_id,
            target_endpoint = %request.target_endpoint,
            method = %request.method,
            "verifying authorization request"
        );

        let outcome = self.verify(&request).await?;
        if let Some(rejection) = outcome.rejection() {
            return Err(rejection);
        }

        tracing::info!("proof verified; injecting credential and forwarding");
        self.forward_authorized(&request).await
    }

    async fn forward_authorized(
        &self,
        request: &ValidatedRequest,
    ) -> Result<DownstreamResponse, AppError> {
        let call = ForwardCall {
            method: &request.method,
            endpoint: &request.target_endpoint,
            body: request.payload.value(),
        };

        let response = self
            .downstream
            .forward(&self.credential, call)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "downstream call failed");
                match e {
                    DownstreamError::InvalidTarget(_) => AppError::MalformedRequest(e.to_string()),
                    DownstreamError::Timeout => AppError::DownstreamFailure {
                        status: axum::http::StatusCode::GATEWAY_TIMEOUT,
                        details: Value::String(e.to_string()),
                    },
                    DownstreamError::Transport(_) => AppError::DownstreamFailure {
                        status: axum::http::StatusCode::BAD_GATEWAY,
                        details: Value::String(e.to_string()),
                    },
                }
            })?;

        if !response.status.is_success() {
            tracing::warn!(status = %response.status, "downstream rejected the request");
            return Err(AppError::DownstreamFailure {
                status: response.status,
                details: response.body,
            });
        }

        tracing::info!(status = %response.status, "downstream call executed");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use zeroize::Zeroizing;
    use zkauth_core::{MockProofSystem, PrivateInputs, ProofError};

    const KEY: &str = "checkpoint-test-key";
    const SECRET: &str = "12345";

    /// Records every forwarded call and answers with a fixed status.
    struct RecordingDownstream {
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, Method, String, Value)>>,
        status: StatusCode,
    }

    impl RecordingDownstream {
        fn answering(status: StatusCode) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                status,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Downstream for RecordingDownstream {
        fn describe(&self) -> String {
            "recording".into()
        }

        async fn forward(
            &self,
            credential: &Credential,
            call: ForwardCall<'_>,
        ) -> Result<DownstreamResponse, DownstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((
                credential.expose().to_string(),
                call.method.clone(),
                call.endpoint.to_string(),
                call.body.clone(),
            ));
            Ok(DownstreamResponse {
                status: self.status,
                body: json!({"ok": self.status.is_success()}),
            })
        }
    }

    /// Verifier that always fails with the error `fail` builds.
    struct BrokenVerifier {
        fail: fn() -> VerifyError,
    }

    impl ProofSystem for BrokenVerifier {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn prove(&self, _inputs: &PrivateInputs) -> Result<ProofBundle, ProofError> {
            Err(ProofError::Backend("unused".into()))
        }

        async fn verify(&self, _signals: &[String], _proof: &Value) -> Result<bool, VerifyError> {
            Err((self.fail)())
        }
    }

    fn broken(fail: fn() -> VerifyError) -> Checkpoint<BrokenVerifier, RecordingDownstream> {
        Checkpoint::new(
            BrokenVerifier { fail },
            RecordingDownstream::answering(StatusCode::OK),
            Credential::new("t"),
        )
    }

    fn checkpoint(status: StatusCode) -> Checkpoint<MockProofSystem, RecordingDownstream> {
        Checkpoint::new(
            MockProofSystem::new(KEY),
            RecordingDownstream::answering(status),
            Credential::new("ghp_real_token"),
        )
    }

    async fn signed_request(resource_id: u64, body: Value) -> AuthorizationRequest {
        let payload = ActionPayload::from_value(body.clone()).unwrap();
        let prover = MockProofSystem::new(KEY).with_expected_secret(SECRET);
        let inputs = PrivateInputs::new(resource_id, commit(&payload), Zeroizing::new(SECRET.into()));
        AuthorizationRequest {
            resource_id,
            proof_bundle: prover.prove(&inputs).await.unwrap(),
            target_endpoint: "/repos/acme/demo/contents/hello.md".into(),
            method: "PUT".into(),
            request_body: body,
        }
    }

    fn validated(request: AuthorizationRequest) -> ValidatedRequest {
        ValidatedRequest::try_from(request).unwrap()
    }

    #[tokio::test]
    async fn test_valid_request_is_forwarded_with_credential() {
        let cp = checkpoint(StatusCode::CREATED);
        let body = json!({"message": "hi", "content": "aGk="});
        let req = validated(signed_request(1, body.clone()).await);

        let resp = cp.process(req).await.unwrap();
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(cp.downstream().calls(), 1);

        let seen = cp.downstream().seen.lock().unwrap();
        let (credential, method, endpoint, forwarded) = &seen[0];
        assert_eq!(credential, "ghp_real_token");
        assert_eq!(method, Method::PUT);
        assert_eq!(endpoint, "/repos/acme/demo/contents/hello.md");
        assert_eq!(forwarded, &body);
    }

    #[tokio::test]
    async fn test_mutated_payload_is_tamper_detected() {
        let cp = checkpoint(StatusCode::OK);
        let mut req = signed_request(1, json!({"message": "hi", "content": "aGk="})).await;
        req.request_body = json!({"message": "hi", "content": "cm0gLXJmIC8="});

        let validated = validated(req);
        let outcome = cp.verify(&validated).await.unwrap();
        assert!(matches!(outcome, VerificationOutcome::TamperDetected { .. }));

        let err = cp.process(validated).await.unwrap_err();
        assert!(matches!(err, AppError::TamperDetected));
        assert_eq!(cp.downstream().calls(), 0);
    }

    #[tokio::test]
    async fn test_resource_id_must_match_proof() {
        let cp = checkpoint(StatusCode::OK);
        let mut req = signed_request(1, json!({"message": "hi"})).await;
        req.resource_id = 2;

        let err = cp.process(validated(req)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::ConstraintMismatch(ConstrainedField::ResourceId)
        ));
        assert_eq!(cp.downstream().calls(), 0);
    }

    #[tokio::test]
    async fn test_resource_check_precedes_binding_check() {
        let cp = checkpoint(StatusCode::OK);
        let mut req = signed_request(1, json!({"message": "hi"})).await;
        req.resource_id = 2;
        req.request_body = json!({"message": "bye"});

        let outcome = cp.verify(&validated(req)).await.unwrap();
        assert_eq!(
            outcome,
            VerificationOutcome::ConstraintMismatch(ConstrainedField::ResourceId)
        );
    }

    #[tokio::test]
    async fn test_forged_proof_is_invalid() {
        let cp = checkpoint(StatusCode::OK);
        let mut req = signed_request(1, json!({"message": "hi"})).await;
        req.proof_bundle.proof = json!({"protocol": "mock", "tag": "00".repeat(32)});

        let err = cp.process(validated(req)).await.unwrap_err();
        assert!(matches!(err, AppError::ProofInvalid));
        assert_eq!(cp.downstream().calls(), 0);
    }

    #[tokio::test]
    async fn test_verifier_choking_on_proof_is_invalid_proof() {
        let cp = broken(|| VerifyError::Backend("segfault".into()));
        let req = validated(signed_request(1, json!({"message": "hi"})).await);

        let outcome = cp.verify(&req).await.unwrap();
        assert_eq!(outcome, VerificationOutcome::ProofInvalid);
        assert_eq!(cp.downstream().calls(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_verifier_is_internal_error() {
        let cp = broken(|| VerifyError::NotConfigured("verification key not loaded".into()));
        let req = validated(signed_request(1, json!({"message": "hi"})).await);

        let err = cp.process(req).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(cp.downstream().calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_verifier_binary_is_internal_error() {
        let cp = broken(|| {
            VerifyError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "snarkjs"))
        });
        let req = validated(signed_request(1, json!({"message": "hi"})).await);

        let err = cp.process(req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(cp.downstream().calls(), 0);
    }

    #[tokio::test]
    async fn test_downstream_rejection_is_distinct() {
        let cp = checkpoint(StatusCode::UNPROCESSABLE_ENTITY);
        let req = validated(signed_request(1, json!({"message": "hi"})).await);

        match cp.process(req).await.unwrap_err() {
            AppError::DownstreamFailure { status, details } => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                assert_eq!(details, json!({"ok": false}));
            }
            other => panic!("expected DownstreamFailure, got {other:?}"),
        }
        assert_eq!(cp.downstream().calls(), 1);
    }

    #[test]
    fn test_parse_rejects_structural_problems() {
        let cases = [
            json!({"resourceId": 1}),
            json!({"resourceId": 1, "proof": {}, "publicSignals": ["1"],
                   "targetEndpoint": "/x", "requestBody": {}}),
            json!({"resourceId": 1, "proof": {}, "publicSignals": ["1", "0xff"],
                   "targetEndpoint": "/x", "requestBody": {}}),
            json!({"resourceId": 1, "proof": {}, "publicSignals": ["1", "2"],
                   "targetEndpoint": "//evil.example/x", "requestBody": {}}),
            json!({"resourceId": 1, "proof": {}, "publicSignals": ["1", "2"],
                   "targetEndpoint": "https://evil.example/x", "requestBody": {}}),
            json!({"resourceId": 1, "proof": {}, "publicSignals": ["1", "2"],
                   "targetEndpoint": "/x", "method": "CONNECT", "requestBody": {}}),
            json!({"resourceId": 1, "proof": {}, "publicSignals": ["1", "2"],
                   "targetEndpoint": "/x y", "requestBody": {}}),
        ];
        for case in cases {
            let raw = serde_json::to_vec(&case).unwrap();
            assert!(
                matches!(ValidatedRequest::parse(&raw), Err(AppError::MalformedRequest(_))),
                "accepted {case}"
            );
        }
        assert!(matches!(
            ValidatedRequest::parse(b"not json"),
            Err(AppError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_parse_normalizes_method() {
        let raw = serde_json::to_vec(&json!({
            "resourceId": 1, "proof": {}, "publicSignals": ["1", "2"],
            "targetEndpoint": "/x", "method": "put", "requestBody": {}
        }))
        .unwrap();
        assert_eq!(ValidatedRequest::parse(&raw).unwrap().method, Method::PUT);
    }
}
