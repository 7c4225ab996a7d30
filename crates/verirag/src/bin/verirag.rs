//! Batch evaluation CLI

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use verirag::{ExperimentConfig, Runner};

#[derive(Parser, Debug)]
#[command(name = "verirag", version, about = "Run hallucination-mitigation solvers over evaluation datasets")]
struct Args {
    /// Path to the experiment YAML configuration
    #[arg(short, long, default_value = "experiment.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = ExperimentConfig::from_yaml_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    tracing::info!(
        datasets = config.datasets.len(),
        solvers = config.solvers.len(),
        output = %config.output_dir.display(),
        "experiment configured"
    );

    let runner = Runner::from_config(&config).context("building solvers")?;
    let summary = runner.run(&config).await.context("running experiment")?;

    tracing::info!(
        solved = summary.solved,
        skipped = summary.skipped,
        failed = summary.failed,
        "experiment complete"
    );

    Ok(())
}
