//! poll-server: encrypted poll server with HTTP API
//!
//! Holds polls in memory for the lifetime of the process.

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use private_polls::http::router;
use private_polls::{PollParams, PollService};

#[derive(Parser)]
#[command(name = "poll-server")]
#[command(about = "Encrypted poll aggregation server")]
#[command(version)]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Ring degree of the BFV parameters (8192 or 16384)
    #[arg(long, default_value = "8192")]
    ring_dim: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let params = PollParams::from_degree(args.ring_dim).ok_or_else(|| {
        eyre::eyre!(
            "Invalid ring dimension: {}. Must be 8192 or 16384",
            args.ring_dim
        )
    })?;
    params
        .validate()
        .map_err(|e| eyre::eyre!("Invalid parameters: {}", e))?;

    info!("Private polls server");
    info!(
        "Parameters: n={}, t={}, log q={}",
        params.degree,
        params.plaintext_modulus,
        params.log_q()
    );

    let service = PollService::new(params).with_context(|| "Failed to instantiate BFV parameters")?;
    let app = router(Arc::new(service));

    info!("Starting server on {}", args.bind);
    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;

    axum::serve(listener, app).await?;

    Ok(())
}
