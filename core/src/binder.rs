//! Payload binding
//!
//! Maps an action payload to a field-sized commitment that the circuit takes
//! as an input and exposes as a public signal. The agent and the gateway both
//! run [`commit`] over the same payload; equality of the two results is what
//! detects a payload swapped after proving.
//!
//! The commitment is the first [`COMMITMENT_BYTES`] bytes of
//! `SHA-256(JCS(payload))`, read big-endian. 248 bits is always below the
//! BN254 scalar modulus (> 2^253), so the value is a valid field element for
//! any digest. Birthday collisions need ~2^124 payloads.

use alloy_primitives::U256;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Digest prefix length kept for the commitment.
pub const COMMITMENT_BYTES: usize = 31;

/// BN254 scalar field modulus, the field the commitment must fit in.
pub const BN254_SCALAR_MODULUS: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("payload is not representable as JSON: {0}")]
    NotSerializable(#[from] serde_json::Error),
}

/// An action payload frozen together with its canonical encoding.
///
/// The canonical bytes are computed once at construction, so every later
/// commitment over the same payload hashes the exact same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPayload {
    value: Value,
    canonical: Vec<u8>,
}

impl ActionPayload {
    /// Build a payload from any serializable value.
    pub fn new(payload: &impl Serialize) -> Result<Self, PayloadError> {
        Self::from_value(serde_json::to_value(payload)?)
    }

    /// Build a payload from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        let canonical = serde_jcs::to_vec(&value)?;
        Ok(Self { value, canonical })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// RFC 8785 encoding: sorted keys, no insignificant whitespace.
    pub fn canonical_bytes(&self) -> &[u8] {
        &self.canonical
    }

    /// Size of the canonical encoding in bytes.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Field-bounded commitment to an [`ActionPayload`]. Displays as decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadCommitment(U256);

impl PayloadCommitment {
    pub fn as_u256(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for PayloadCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Commit to a payload. Pure and total.
pub fn commit(payload: &ActionPayload) -> PayloadCommitment {
    let digest = Sha256::digest(payload.canonical_bytes());
    PayloadCommitment(U256::from_be_slice(&digest[..COMMITMENT_BYTES]))
}
