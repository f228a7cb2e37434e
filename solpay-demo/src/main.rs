//! Simulated Solana Pay checkout.
//!
//! # Usage
//!
//! ```bash
//! # Pay the merchant given on the command line
//! cargo run -p solpay-demo -- 36vqn1tAJrWC6DcxZtKp7wpTqtP6jhr2DDJJbjs6AUUY
//!
//! # Use a custom config and key file
//! CONFIG=/path/to/solpay.toml SOLPAY_KEYPAIR=/path/to/key.json cargo run -p solpay-demo
//!
//! # Configure logging level
//! RUST_LOG=debug cargo run -p solpay-demo -- <RECIPIENT>
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `solpay.toml`)
//! - `SOLPAY_KEYPAIR` - Override the paying key file (default: `key.json`)
//! - `SOLPAY_POLL_INTERVAL_MS` - Override the poll interval (default: `250`)
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::path::PathBuf;

use clap::Parser;
use solpay::Address;
use tracing_subscriber::EnvFilter;

use solpay_demo::config::DEFAULT_CONFIG_PATH;
use solpay_demo::keypair::read_keypair_file;
use solpay_demo::shutdown::Interrupt;
use solpay_demo::{DemoConfig, DemoError};

/// Simulate a Solana Pay checkout, wallet payment and confirmation.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Merchant address receiving the payment. Defaults to `merchant` from
    /// the configuration.
    recipient: Option<Address>,

    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Path to the paying key file.
    #[arg(long, env = "SOLPAY_KEYPAIR")]
    keypair: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing with RUST_LOG env filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = DemoConfig::load_from(&cli.config)?;
    if let Some(keypair) = cli.keypair {
        config.keypair_path = keypair;
    }
    tracing::info!(
        path = %cli.config.display(),
        cluster = %config.cluster,
        poll_interval_ms = config.poll_interval_ms,
        "Loaded configuration"
    );

    let recipient = cli
        .recipient
        .or(config.merchant)
        .ok_or(DemoError::MissingRecipient)?;
    let payer = read_keypair_file(&config.keypair_path).map_err(DemoError::from)?;

    let interrupt = Interrupt::try_new()?;
    let outcome = solpay_demo::flow::run(
        &config,
        recipient,
        &payer,
        interrupt.cancellation_token(),
    )
    .await;
    interrupt.close().await;

    outcome?;
    Ok(())
}
