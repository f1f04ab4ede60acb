//! ZKAuth core
//!
//! Shared by the agent and the gateway: payload binding, the proof system
//! port with its snarkjs and mock back-ends, and the authorization request
//! wire model.

pub mod backend;
pub mod binder;
pub mod mock;
pub mod proof;
pub mod request;
pub mod snarkjs;

pub use backend::{ProofBackend, ProofSystemKind};
pub use binder::{commit, ActionPayload, PayloadCommitment, PayloadError};
pub use mock::MockProofSystem;
pub use proof::{PrivateInputs, ProofBundle, ProofError, ProofSystem, SignalError, VerifyError};
pub use request::AuthorizationRequest;
pub use snarkjs::{ProverArtifacts, SnarkjsProofSystem};

pub use alloy_primitives::U256;
