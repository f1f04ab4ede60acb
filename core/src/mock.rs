//! # Mock Proof System
//!
//! Deterministic stand-in for the external prover, used by tests and by
//! local runs without circuit artifacts. A "proof" is a keyed SHA-256 tag
//! over the public signals: anyone holding the key can forge one, so this
//! gives NO zero-knowledge or soundness guarantees.
//!
//! The constraint it simulates is `auth_secret == expected_secret`. Without an
//! expected secret configured the instance can verify but not prove.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::proof::{PrivateInputs, ProofBundle, ProofError, ProofSystem, VerifyError};

const PROTOCOL: &str = "mock";

pub struct MockProofSystem {
    key: Zeroizing<Vec<u8>>,
    expected_secret: Option<Zeroizing<String>>,
}

impl MockProofSystem {
    /// A verifier keyed with `key`.
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: Zeroizing::new(key.as_ref().to_vec()),
            expected_secret: None,
        }
    }

    /// Enable proving for private inputs carrying `secret`.
    pub fn with_expected_secret(mut self, secret: impl Into<String>) -> Self {
        self.expected_secret = Some(Zeroizing::new(secret.into()));
        self
    }

    fn tag(&self, public_signals: &[String]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(PROTOCOL.as_bytes());
        hasher.update(self.key.as_slice());
        for signal in public_signals {
            hasher.update([0u8]);
            hasher.update(signal.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl ProofSystem for MockProofSystem {
    fn name(&self) -> &'static str {
        PROTOCOL
    }

    async fn prove(&self, inputs: &PrivateInputs) -> Result<ProofBundle, ProofError> {
        let expected = self
            .expected_secret
            .as_ref()
            .ok_or_else(|| ProofError::NotConfigured("mock prover has no constraint".into()))?;
        if inputs.auth_secret() != expected.as_str() {
            return Err(ProofError::Unsatisfiable(
                "auth secret does not satisfy the constraint".into(),
            ));
        }

        let public_signals = vec![
            inputs.resource_id.to_string(),
            inputs.payload_commitment.to_string(),
        ];
        let proof = json!({
            "protocol": PROTOCOL,
            "tag": self.tag(&public_signals),
        });
        Ok(ProofBundle {
            proof,
            public_signals,
        })
    }

    async fn verify(&self, public_signals: &[String], proof: &Value) -> Result<bool, VerifyError> {
        if proof.get("protocol").and_then(Value::as_str) != Some(PROTOCOL) {
            return Err(VerifyError::InvalidProof("not a mock proof".into()));
        }
        let tag = proof
            .get("tag")
            .and_then(Value::as_str)
            .ok_or_else(|| VerifyError::InvalidProof("missing tag".into()))?;
        Ok(tag == self.tag(public_signals))
    }
}
