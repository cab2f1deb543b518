//! poll-client: offline key and ciphertext tool for poll participants
//!
//! Produces the base64 payloads the poll server expects. Network submission is
//! left to any HTTP client.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use rand::{RngCore, TryRngCore};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use private_polls::{PollClient, PollParams, VECTOR_LEN};

#[derive(Parser)]
#[command(name = "poll-client")]
#[command(about = "Generate poll keys, encrypt availabilities, decrypt results")]
#[command(version)]
struct Args {
    /// Ring degree of the server's BFV parameters (8192 or 16384)
    #[arg(long, default_value = "8192", global = true)]
    ring_dim: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a secret seed and print the poll's {pk, rlk} as JSON
    Keygen {
        /// File to write the hex secret seed to
        #[arg(long)]
        seed_out: PathBuf,
    },
    /// Encrypt an availability vector
    Encrypt {
        /// Poll public key (base64)
        #[arg(long, conflicts_with = "seed", required_unless_present = "seed")]
        pk: Option<String>,

        /// Secret seed file of the poll owner
        #[arg(long)]
        seed: Option<PathBuf>,

        /// Comma-separated 0/1 values
        #[arg(long, value_delimiter = ',')]
        values: Vec<u64>,
    },
    /// Decrypt a poll result
    Decrypt {
        /// Secret seed file of the poll owner
        #[arg(long)]
        seed: PathBuf,

        /// Result ciphertext (base64)
        #[arg(long)]
        ct: String,
    },
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let params = PollParams::from_degree(args.ring_dim).ok_or_else(|| {
        eyre::eyre!(
            "Invalid ring dimension: {}. Must be 8192 or 16384",
            args.ring_dim
        )
    })?;
    let bfv = params
        .build()
        .with_context(|| "Failed to instantiate BFV parameters")?;

    match args.command {
        Command::Keygen { seed_out } => {
            let mut seed = [0u8; 32];
            rand::rngs::OsRng.unwrap_err().fill_bytes(&mut seed);
            fs::write(&seed_out, hex::encode(seed))
                .with_context(|| format!("Failed to write seed: {}", seed_out.display()))?;
            info!("Secret seed written to {}", seed_out.display());

            let keys = PollClient::from_seed(bfv, seed).generate_keys()?;
            println!("{}", serde_json::to_string(&keys)?);
        }
        Command::Encrypt { pk, seed, values } => {
            let values: [u64; VECTOR_LEN] = values
                .try_into()
                .map_err(|v: Vec<u64>| eyre::eyre!("Expected {} values, got {}", VECTOR_LEN, v.len()))?;
            if values.iter().any(|&v| v > 1) {
                return Err(eyre::eyre!("Availability values must be 0 or 1"));
            }

            let client = match (pk, seed) {
                (Some(pk), _) => PollClient::from_public_key_text(bfv, &pk)?,
                (None, Some(path)) => PollClient::from_seed(bfv, read_seed(&path)?),
                (None, None) => return Err(eyre::eyre!("Either --pk or --seed is required")),
            };
            println!("{}", client.encrypt_availabilities(&values)?);
        }
        Command::Decrypt { seed, ct } => {
            let client = PollClient::from_seed(bfv, read_seed(&seed)?);
            let values = client.decrypt_results(ct.trim())?;
            println!("{}", serde_json::to_string(&values)?);
        }
    }

    Ok(())
}

fn read_seed(path: &PathBuf) -> Result<[u8; 32]> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed: {}", path.display()))?;
    let bytes = hex::decode(text.trim()).with_context(|| "Seed file is not hex")?;
    bytes
        .try_into()
        .map_err(|_| eyre::eyre!("Seed must be 32 bytes"))
}
