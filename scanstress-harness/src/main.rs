//! # Scanstress
//!
//! Concurrency-stress harness for an HTTP tabular-query service.
//!
//! Boots the service under test in-process from a JSON model file (or points
//! at an already-running endpoint), dispatches a fixed number of parallel
//! scan units against it, and prints the aggregate counters once every unit
//! has joined cleanly. Any unit failure fails the whole run and suppresses
//! the report line.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use scanstress_harness::{DEFAULT_UNITS, RunAggregate, StressRun};
use scanstress_server::{Catalog, DEFAULT_FRAME_SIZE, serve};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scanstress")]
#[command(about = "Drive parallel full-table scans against an HTTP query service")]
struct Cli {
    /// JSON model file describing the catalog served by the in-process
    /// endpoint. Required unless --url points at an external endpoint.
    #[arg(long, env = "SCANSTRESS_MODEL", required_unless_present = "url")]
    model: Option<PathBuf>,

    /// Target schema; only objects in this schema are scanned
    /// (case-insensitive match)
    #[arg(long, env = "SCANSTRESS_SCHEMA", default_value = "SALES")]
    schema: String,

    /// Number of parallel scan units
    #[arg(long, env = "SCANSTRESS_UNITS", default_value_t = DEFAULT_UNITS)]
    units: usize,

    /// Scan an already-running endpoint instead of starting one in-process
    #[arg(long, env = "SCANSTRESS_URL", conflicts_with = "model")]
    url: Option<String>,

    /// Rows per fetch frame served by the in-process endpoint
    #[arg(long, default_value_t = DEFAULT_FRAME_SIZE)]
    frame_size: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let (service, base_url) = match cli.url.clone() {
        Some(url) => (None, url),
        None => {
            let model = cli
                .model
                .as_ref()
                .context("--model is required when no --url is given")?;
            let catalog = Catalog::from_model_file(model)
                .with_context(|| format!("loading model {}", model.display()))?;
            let handle = serve(catalog, cli.frame_size).await?;
            let url = handle.base_url().to_owned();
            (Some(handle), url)
        }
    };

    info!(
        endpoint = %base_url,
        schema = %cli.schema,
        units = cli.units,
        "starting stress run"
    );

    let totals = Arc::new(RunAggregate::new());
    let run = StressRun::new(base_url, cli.schema).with_units(cli.units);
    let report = run
        .execute(Arc::clone(&totals))
        .await
        .context("stress run failed")?;

    println!("{report}");

    if let Some(handle) = service {
        handle.shutdown().await;
    }
    Ok(())
}
