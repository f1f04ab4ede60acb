//! ZKAuth Gateway Server

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zkauth_core::{MockProofSystem, ProofBackend, ProofSystem, ProofSystemKind, SnarkjsProofSystem};

use zkauth_server::checkpoint::Checkpoint;
use zkauth_server::config::Config;
use zkauth_server::handlers::AppState;
use zkauth_server::services::downstream::{Downstream, HttpDownstream};

async fn load_proof_system(config: &Config) -> anyhow::Result<ProofBackend> {
    Ok(match config.proof_system {
        ProofSystemKind::Snarkjs => {
            let path = &config.verification_key_path;
            let raw = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read verification key {}", path.display()))?;
            let vk = serde_json::from_slice(&raw)
                .with_context(|| format!("Verification key {} is not JSON", path.display()))?;
            SnarkjsProofSystem::new(&config.snarkjs_bin)
                .with_verification_key(vk)
                .into()
        }
        ProofSystemKind::Mock => {
            let key = config
                .mock_proof_key
                .as_deref()
                .context("MOCK_PROOF_KEY must be set when PROOF_SYSTEM=mock")?;
            tracing::warn!("Using the mock proof system; do not run this in production");
            MockProofSystem::new(key).into()
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zkauth_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let proof_system = load_proof_system(&config).await?;
    let downstream = HttpDownstream::new(
        &config.downstream_base_url,
        &config.downstream_user_agent,
        config.downstream_timeout,
    )?;

    tracing::info!("Starting ZKAuth Gateway");
    tracing::info!("Proof system: {}", proof_system.name());
    tracing::info!("Downstream: {}", downstream.describe());

    let checkpoint = Checkpoint::new(proof_system, downstream, config.downstream_api_key.clone());
    let app = zkauth_server::router(AppState::new(checkpoint));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
