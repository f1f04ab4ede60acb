//! ZKAuth Agent
//!
//! Demonstrates the complete flow:
//! 1. Build the action payload
//! 2. Bind it to a commitment and generate the authorization proof locally
//! 3. Send proof + payload to the gateway, which holds the real credential

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use zkauth_agent::requester::{AuthorizationRequester, DEFAULT_COMMIT_MESSAGE};
use zkauth_agent::{ClientError, GatewayClient};
use zkauth_core::{
    commit, ActionPayload, AuthorizationRequest, MockProofSystem, ProofBackend, ProofSystem,
    ProofSystemKind, ProverArtifacts, SnarkjsProofSystem,
};

#[derive(Parser)]
#[command(name = "agent")]
#[command(about = "Autonomous agent that proves its right to act instead of holding credentials")]
struct Cli {
    #[command(flatten)]
    opts: AgentOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct AgentOpts {
    /// Gateway URL
    #[arg(long, env = "ZKAUTH_GATEWAY", default_value = "http://localhost:8000")]
    gateway: String,

    /// Resource the proof is scoped to
    #[arg(long, env = "ZKAUTH_RESOURCE_ID", default_value = "1")]
    resource_id: u64,

    /// Private value that satisfies the circuit constraint
    #[arg(long, env = "ZKAUTH_AUTH_SECRET", hide_env_values = true)]
    auth_secret: Option<String>,

    /// Proof system: snarkjs or mock
    #[arg(long, env = "ZKAUTH_PROOF_SYSTEM", default_value = "snarkjs")]
    proof_system: ProofSystemKind,

    #[arg(long, env = "SNARKJS_BIN", default_value = "snarkjs")]
    snarkjs_bin: String,

    #[arg(long, env = "ZKAUTH_CIRCUIT_WASM", default_value = "../zk-circuits/commit_auth.wasm")]
    circuit_wasm: PathBuf,

    #[arg(long, env = "ZKAUTH_PROVING_KEY", default_value = "../zk-circuits/circuit_final.zkey")]
    proving_key: PathBuf,

    /// Shared key for the mock proof system
    #[arg(long, env = "MOCK_PROOF_KEY", hide_env_values = true)]
    mock_proof_key: Option<String>,

    /// Secret the mock circuit accepts
    #[arg(long, env = "MOCK_EXPECTED_SECRET", hide_env_values = true)]
    mock_expected_secret: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a file to a repository through the gateway
    Push {
        /// Repository path, e.g. owner/repo
        repo_path: String,

        /// File path inside the repository
        filename: String,

        /// File content (plain text, encoded before sending)
        content: String,

        #[arg(short, long, default_value = DEFAULT_COMMIT_MESSAGE)]
        message: String,

        /// Print the request instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Request an arbitrary action
    Request {
        /// Path on the downstream system
        #[arg(short, long)]
        endpoint: String,

        /// HTTP method
        #[arg(short, long, default_value = "POST")]
        method: String,

        /// JSON request body
        #[arg(short, long)]
        body: String,

        #[arg(long)]
        dry_run: bool,
    },

    /// Print the commitment of a JSON payload
    Commit {
        /// JSON payload
        payload: String,
    },
}

impl AgentOpts {
    fn proof_backend(&self) -> Result<ProofBackend> {
        Ok(match self.proof_system {
            ProofSystemKind::Snarkjs => SnarkjsProofSystem::new(&self.snarkjs_bin)
                .with_prover(ProverArtifacts {
                    circuit_wasm: self.circuit_wasm.clone(),
                    proving_key: self.proving_key.clone(),
                })
                .into(),
            ProofSystemKind::Mock => {
                let key = self
                    .mock_proof_key
                    .as_deref()
                    .context("--mock-proof-key is required with the mock proof system")?;
                let expected = self
                    .mock_expected_secret
                    .clone()
                    .context("--mock-expected-secret is required with the mock proof system")?;
                MockProofSystem::new(key).with_expected_secret(expected).into()
            }
        })
    }

    fn auth_secret(&mut self) -> Result<Zeroizing<String>> {
        self.auth_secret
            .take()
            .map(Zeroizing::new)
            .context("--auth-secret or ZKAUTH_AUTH_SECRET is required")
    }
}

async fn submit(gateway: &str, request: &AuthorizationRequest, dry_run: bool) -> Result<()> {
    if dry_run {
        println!("\n[DRY RUN] Would submit:");
        println!("{}", serde_json::to_string_pretty(request)?);
        return Ok(());
    }

    println!("\n[2] Sending proof + payload to gateway ({})...", gateway);
    let client = GatewayClient::new(gateway)?;
    match client.submit(request).await {
        Ok(reply) => {
            println!("\n[$] AUTHORIZED ({})", reply.status);
            println!("{}", serde_json::to_string_pretty(&reply.body)?);
            Ok(())
        }
        Err(ClientError::Rejected { status, body }) => {
            println!("\n[!] Gateway rejected the request ({})", status);
            println!("{}", serde_json::to_string_pretty(&body)?);
            anyhow::bail!("request rejected with {}", status)
        }
        Err(e) => Err(e.into()),
    }
}

fn report_proof(proof_system: &impl ProofSystem, request: &AuthorizationRequest) {
    println!("\n[1] Authorization proof generated ({})", proof_system.name());
    if let Ok(commitment) = request.proof_bundle.claimed_commitment() {
        println!("    Commitment bound: {}", commitment);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zkauth_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    dotenvy::dotenv().ok();

    let Cli { mut opts, command } = Cli::parse();

    match command {
        Commands::Commit { payload } => {
            let value: serde_json::Value =
                serde_json::from_str(&payload).context("payload is not valid JSON")?;
            let payload = ActionPayload::from_value(value)?;
            println!("Canonical:  {}", String::from_utf8_lossy(payload.canonical_bytes()));
            println!("Commitment: {}", commit(&payload));
        }

        Commands::Push {
            repo_path,
            filename,
            content,
            message,
            dry_run,
        } => {
            println!("[*] Agent: pushing {} to {}", filename, repo_path);
            let secret = opts.auth_secret()?;
            let requester = AuthorizationRequester::new(opts.proof_backend()?);
            let request = requester
                .push_file_request(opts.resource_id, secret, &repo_path, &filename, &content, &message)
                .await
                .context("I do not have the mathematical right to do this")?;
            report_proof(requester.proof_system(), &request);
            submit(&opts.gateway, &request, dry_run).await?;
        }

        Commands::Request {
            endpoint,
            method,
            body,
            dry_run,
        } => {
            println!("[*] Agent: {} {}", method, endpoint);
            let value: serde_json::Value =
                serde_json::from_str(&body).context("--body is not valid JSON")?;
            let payload = ActionPayload::from_value(value)?;
            let secret = opts.auth_secret()?;
            let requester = AuthorizationRequester::new(opts.proof_backend()?);
            let request = requester
                .build_request(opts.resource_id, secret, payload, endpoint, method)
                .await
                .context("I do not have the mathematical right to do this")?;
            report_proof(requester.proof_system(), &request);
            submit(&opts.gateway, &request, dry_run).await?;
        }
    }

    Ok(())
}
