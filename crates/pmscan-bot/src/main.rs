//! pmscan: prediction-market screening, regime and cascade scanner.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Prediction-market microstructure scanner
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PMSCAN_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON Lines snapshot file, overrides `snapshots_path` from the config
    #[arg(short, long)]
    snapshots: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    pmscan_telemetry::init_logging()?;

    info!("Starting pmscan v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > PMSCAN_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("PMSCAN_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let mut config = pmscan_bot::AppConfig::from_file(&config_path)?;
    if let Some(path) = args.snapshots {
        config.snapshots_path = path;
    }
    info!(
        ?config.mode,
        snapshots = %config.snapshots_path.display(),
        "Configuration loaded"
    );

    let app = pmscan_bot::Application::new(config)?;
    app.run(args.once).await?;

    Ok(())
}
