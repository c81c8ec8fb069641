//! Landex ETL - landing-schema batch loader

use anyhow::Result;
use clap::Parser;
use landex_common::logging::{init_logging, LogConfig, LogLevel};
use landex_etl::orchestrator::Orchestrator;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "landex-etl")]
#[command(author, version, about = "Extract remote sources into the landing schema")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

// The pipeline is sequential by design; a single-threaded runtime is
// all it needs.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?;
    log_config.log_file_prefix = "landex-etl".to_string();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }

    init_logging(&log_config)?;

    let orchestrator = Orchestrator::from_config_file(&cli.config)?;
    orchestrator.extract_all().await?;

    info!("Extraction complete");
    Ok(())
}
