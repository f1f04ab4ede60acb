//! Runtime selection between proof system implementations.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::mock::MockProofSystem;
use crate::proof::{PrivateInputs, ProofBundle, ProofError, ProofSystem, VerifyError};
use crate::snarkjs::SnarkjsProofSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofSystemKind {
    Snarkjs,
    Mock,
}

#[derive(Error, Debug)]
#[error("unknown proof system '{0}' (expected 'snarkjs' or 'mock')")]
pub struct UnknownProofSystem(String);

impl FromStr for ProofSystemKind {
    type Err = UnknownProofSystem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snarkjs" | "plonk" => Ok(Self::Snarkjs),
            "mock" => Ok(Self::Mock),
            other => Err(UnknownProofSystem(other.to_string())),
        }
    }
}

impl fmt::Display for ProofSystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snarkjs => f.write_str("snarkjs"),
            Self::Mock => f.write_str("mock"),
        }
    }
}

/// The proof system a binary was configured with.
pub enum ProofBackend {
    Snarkjs(SnarkjsProofSystem),
    Mock(MockProofSystem),
}

impl ProofSystem for ProofBackend {
    fn name(&self) -> &'static str {
        match self {
            Self::Snarkjs(system) => system.name(),
            Self::Mock(system) => system.name(),
        }
    }

    async fn prove(&self, inputs: &PrivateInputs) -> Result<ProofBundle, ProofError> {
        match self {
            Self::Snarkjs(system) => system.prove(inputs).await,
            Self::Mock(system) => system.prove(inputs).await,
        }
    }

    async fn verify(&self, public_signals: &[String], proof: &Value) -> Result<bool, VerifyError> {
        match self {
            Self::Snarkjs(system) => system.verify(public_signals, proof).await,
            Self::Mock(system) => system.verify(public_signals, proof).await,
        }
    }
}

impl From<SnarkjsProofSystem> for ProofBackend {
    fn from(system: SnarkjsProofSystem) -> Self {
        Self::Snarkjs(system)
    }
}

impl From<MockProofSystem> for ProofBackend {
    fn from(system: MockProofSystem) -> Self {
        Self::Mock(system)
    }
}
