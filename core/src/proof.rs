//! Proof system port
//!
//! The circuit, its keys and the proving algorithm live outside this crate.
//! [`ProofSystem`] is the seam both sides are written against: the agent calls
//! `prove`, the gateway calls `verify`, and tests plug in
//! [`MockProofSystem`](crate::mock::MockProofSystem).

use std::fmt;
use std::future::Future;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::binder::PayloadCommitment;

/// Position of the claimed resource id in the public signals.
pub const RESOURCE_ID_SIGNAL: usize = 0;
/// Position of the claimed payload commitment in the public signals.
pub const PAYLOAD_COMMITMENT_SIGNAL: usize = 1;

/// Error during proof generation.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The constraint does not hold for the supplied private inputs.
    #[error("constraint unsatisfiable: {0}")]
    Unsatisfiable(String),
    /// Proving artifacts (circuit, proving key) are not available.
    #[error("prover not configured: {0}")]
    NotConfigured(String),
    /// The prover ran but failed.
    #[error("prover error: {0}")]
    Backend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during proof verification.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The proof artifact could not be interpreted.
    #[error("invalid proof: {0}")]
    InvalidProof(String),
    /// No usable verification key is loaded.
    #[error("verifier not configured: {0}")]
    NotConfigured(String),
    /// The verifier itself failed.
    #[error("verifier error: {0}")]
    Backend(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Public signal that is absent or not a decimal field element.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignalError {
    #[error("public signal {0} is missing")]
    Missing(usize),
    #[error("public signal {0} is not a decimal numeral")]
    NotDecimal(usize),
}

/// Witness for the authorization circuit.
///
/// Never serialized by this crate and never printed: `Debug` redacts the
/// secret, and the secret buffer is wiped on drop.
pub struct PrivateInputs {
    pub resource_id: u64,
    pub payload_commitment: PayloadCommitment,
    auth_secret: Zeroizing<String>,
}

impl PrivateInputs {
    pub fn new(
        resource_id: u64,
        payload_commitment: PayloadCommitment,
        auth_secret: Zeroizing<String>,
    ) -> Self {
        Self {
            resource_id,
            payload_commitment,
            auth_secret,
        }
    }

    pub fn auth_secret(&self) -> &str {
        &self.auth_secret
    }
}

impl fmt::Debug for PrivateInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateInputs")
            .field("resource_id", &self.resource_id)
            .field("payload_commitment", &self.payload_commitment)
            .field("auth_secret", &"<redacted>")
            .finish()
    }
}

/// A proof and the public signals it attests to, as produced by the prover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    /// Opaque to everything but the proof system.
    pub proof: Value,
    pub public_signals: Vec<String>,
}

impl ProofBundle {
    pub fn claimed_resource_id(&self) -> Result<U256, SignalError> {
        self.signal(RESOURCE_ID_SIGNAL)
    }

    pub fn claimed_commitment(&self) -> Result<U256, SignalError> {
        self.signal(PAYLOAD_COMMITMENT_SIGNAL)
    }

    fn signal(&self, index: usize) -> Result<U256, SignalError> {
        let raw = self
            .public_signals
            .get(index)
            .ok_or(SignalError::Missing(index))?;
        parse_decimal_signal(raw).ok_or(SignalError::NotDecimal(index))
    }
}

/// Parse a public signal, accepting only plain decimal digits.
pub fn parse_decimal_signal(raw: &str) -> Option<U256> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(raw, 10).ok()
}

/// Abstract interface for the external proving capability.
///
/// Both calls either complete with a full result or fail; there are no
/// partial proofs or verdicts. Implementations own their key material.
pub trait ProofSystem: Send + Sync {
    /// Short identifier, reported by the gateway health check.
    fn name(&self) -> &'static str;

    /// Generate a proof that `inputs` satisfy the circuit constraint.
    fn prove(
        &self,
        inputs: &PrivateInputs,
    ) -> impl Future<Output = Result<ProofBundle, ProofError>> + Send;

    /// Check `proof` against `public_signals` with the loaded verification key.
    fn verify(
        &self,
        public_signals: &[String],
        proof: &Value,
    ) -> impl Future<Output = Result<bool, VerifyError>> + Send;
}
