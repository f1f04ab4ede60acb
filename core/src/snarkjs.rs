//! snarkjs PLONK back-end
//!
//! Shells out to the `snarkjs` CLI:
//! 1. writes the witness input / public signals / proof as JSON into a
//!    private temp dir
//! 2. runs `snarkjs plonk fullprove` or `snarkjs plonk verify`
//! 3. reads the outputs back
//!
//! The temp dir (and with it the witness file holding the auth secret) is
//! removed when the call returns.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::process::Command;

use crate::proof::{PrivateInputs, ProofBundle, ProofError, ProofSystem, VerifyError};

/// Circuit input file. Field names must match the circuit's signal names.
#[derive(Serialize)]
struct CircuitInput<'a> {
    #[serde(rename = "repoId")]
    resource_id: String,
    #[serde(rename = "payloadHash")]
    payload_commitment: String,
    #[serde(rename = "authToken")]
    auth_secret: &'a str,
}

impl<'a> From<&'a PrivateInputs> for CircuitInput<'a> {
    fn from(inputs: &'a PrivateInputs) -> Self {
        Self {
            resource_id: inputs.resource_id.to_string(),
            payload_commitment: inputs.payload_commitment.to_string(),
            auth_secret: inputs.auth_secret(),
        }
    }
}

/// Proving artifacts compiled from the circuit.
#[derive(Debug, Clone)]
pub struct ProverArtifacts {
    pub circuit_wasm: PathBuf,
    pub proving_key: PathBuf,
}

pub struct SnarkjsProofSystem {
    bin: String,
    prover: Option<ProverArtifacts>,
    verification_key: Option<Arc<Value>>,
}

impl SnarkjsProofSystem {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            prover: None,
            verification_key: None,
        }
    }

    pub fn with_prover(mut self, artifacts: ProverArtifacts) -> Self {
        self.prover = Some(artifacts);
        self
    }

    pub fn with_verification_key(mut self, key: Value) -> Self {
        self.verification_key = Some(Arc::new(key));
        self
    }

    async fn run(&self, args: &[&str], dir: &Path) -> std::io::Result<Output> {
        Command::new(&self.bin)
            .args(args)
            .current_dir(dir)
            .kill_on_drop(true)
            .output()
            .await
    }
}

async fn write_json(path: &Path, value: &impl Serialize) -> std::io::Result<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    tokio::fs::write(path, bytes).await
}

async fn resolve_artifact(path: &Path) -> Result<PathBuf, ProofError> {
    tokio::fs::canonicalize(path)
        .await
        .map_err(|e| ProofError::NotConfigured(format!("artifact {}: {e}", path.display())))
}

/// A failed exit whose log carries the verifier's verdict rather than a crash.
/// Case is ignored.
fn reports_invalid_proof(log: &str) -> bool {
    log.to_ascii_lowercase().contains("invalid proof")
}

fn path_arg(path: &Path) -> Result<&str, ProofError> {
    path.to_str()
        .ok_or_else(|| ProofError::NotConfigured(format!("non UTF-8 path: {}", path.display())))
}

impl ProofSystem for SnarkjsProofSystem {
    fn name(&self) -> &'static str {
        "snarkjs-plonk"
    }

    async fn prove(&self, inputs: &PrivateInputs) -> Result<ProofBundle, ProofError> {
        let artifacts = self
            .prover
            .as_ref()
            .ok_or_else(|| ProofError::NotConfigured("circuit wasm and proving key not set".into()))?;
        // snarkjs runs inside the temp dir, so relative artifact paths must be resolved first
        let circuit_wasm = resolve_artifact(&artifacts.circuit_wasm).await?;
        let proving_key = resolve_artifact(&artifacts.proving_key).await?;

        let dir = tempfile::tempdir()?;
        write_json(&dir.path().join("input.json"), &CircuitInput::from(inputs)).await?;

        let output = self
            .run(
                &[
                    "plonk",
                    "fullprove",
                    "input.json",
                    path_arg(&circuit_wasm)?,
                    path_arg(&proving_key)?,
                    "proof.json",
                    "public.json",
                ],
                dir.path(),
            )
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // witness calculation aborts on a failed `===` constraint
            if stderr.contains("Assert Failed") || stderr.contains("Error in template") {
                return Err(ProofError::Unsatisfiable(stderr.trim().to_string()));
            }
            return Err(ProofError::Backend(format!(
                "snarkjs plonk fullprove failed: {}",
                stderr.trim()
            )));
        }

        let proof_raw = tokio::fs::read(dir.path().join("proof.json")).await?;
        let public_raw = tokio::fs::read(dir.path().join("public.json")).await?;
        let proof: Value = serde_json::from_slice(&proof_raw)
            .map_err(|e| ProofError::Backend(format!("unreadable proof.json: {e}")))?;
        let public_signals: Vec<String> = serde_json::from_slice(&public_raw)
            .map_err(|e| ProofError::Backend(format!("unreadable public.json: {e}")))?;

        tracing::debug!(signals = public_signals.len(), "snarkjs proof generated");
        Ok(ProofBundle {
            proof,
            public_signals,
        })
    }

    async fn verify(&self, public_signals: &[String], proof: &Value) -> Result<bool, VerifyError> {
        let key = self
            .verification_key
            .as_ref()
            .ok_or_else(|| VerifyError::NotConfigured("verification key not loaded".into()))?;
        if !proof.is_object() {
            return Err(VerifyError::InvalidProof("proof must be a JSON object".into()));
        }

        let dir = tempfile::tempdir()?;
        write_json(&dir.path().join("verification_key.json"), &**key).await?;
        write_json(&dir.path().join("public.json"), &public_signals).await?;
        write_json(&dir.path().join("proof.json"), proof).await?;

        let output = self
            .run(
                &[
                    "plonk",
                    "verify",
                    "verification_key.json",
                    "public.json",
                    "proof.json",
                ],
                dir.path(),
            )
            .await?;

        if output.status.success() {
            return Ok(true);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if reports_invalid_proof(&stdout) || reports_invalid_proof(&stderr) {
            return Ok(false);
        }
        Err(VerifyError::Backend(format!(
            "snarkjs plonk verify failed: {}",
            stderr.trim()
        )))
    }
}
