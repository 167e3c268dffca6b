//! Raster ingestion task planner CLI.
//!
//! Plans the tiling tasks for one ingestion request and submits them to an
//! in-process job store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use job_store::InMemoryJobStore;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Plans tiling tasks for raster layer ingestion")]
struct Args {
    /// Configuration file path (falls back to TASKER_* variables)
    #[arg(short, long, env = "TASKER_CONFIG")]
    config: Option<PathBuf>,

    /// Ingestion request JSON file
    #[arg(short, long)]
    request: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);

    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    info!("Starting raster ingestion planner");

    let config = ingester::load_config(args.config.as_deref())?;
    let request = ingester::read_request(&args.request)?;
    info!(
        product_id = %request.product().product_id,
        version = %request.product().product_version,
        "Loaded ingestion request"
    );

    let store = Arc::new(InMemoryJobStore::new());
    let report = ingester::run(config, &request, store).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
