//! Configuration management

use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use zkauth_core::ProofSystemKind;

use crate::services::downstream::Credential;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub downstream_base_url: String,
    pub downstream_api_key: Credential,
    pub downstream_timeout: Duration,
    pub downstream_user_agent: String,
    pub proof_system: ProofSystemKind,
    pub verification_key_path: PathBuf,
    pub snarkjs_bin: String,
    pub mock_proof_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("Invalid PORT")?,

            downstream_base_url: env::var("DOWNSTREAM_BASE_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),

            downstream_api_key: env::var("DOWNSTREAM_API_KEY")
                .map(Credential::new)
                .context("DOWNSTREAM_API_KEY must be set")?,

            downstream_timeout: Duration::from_secs(
                env::var("DOWNSTREAM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid DOWNSTREAM_TIMEOUT_SECS")?,
            ),

            downstream_user_agent: env::var("DOWNSTREAM_USER_AGENT")
                .unwrap_or_else(|_| "ZKAuth-Agent-Proxy".to_string()),

            proof_system: env::var("PROOF_SYSTEM")
                .unwrap_or_else(|_| "snarkjs".to_string())
                .parse()
                .context("Invalid PROOF_SYSTEM")?,

            verification_key_path: env::var("VERIFICATION_KEY_PATH")
                .unwrap_or_else(|_| "../zk-circuits/verification_key.json".to_string())
                .into(),

            snarkjs_bin: env::var("SNARKJS_BIN").unwrap_or_else(|_| "snarkjs".to_string()),

            mock_proof_key: env::var("MOCK_PROOF_KEY").ok(),
        })
    }
}

// Secrets stay out of startup logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("downstream_base_url", &self.downstream_base_url)
            .field("downstream_api_key", &self.downstream_api_key)
            .field("downstream_timeout", &self.downstream_timeout)
            .field("downstream_user_agent", &self.downstream_user_agent)
            .field("proof_system", &self.proof_system)
            .field("verification_key_path", &self.verification_key_path)
            .field("snarkjs_bin", &self.snarkjs_bin)
            .field("mock_proof_key", &self.mock_proof_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
