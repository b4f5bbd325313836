// logline - format line-delimited JSON logs from stdin

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use logline::log::{Pipeline, PipelineConfig};

/// Diagnostics go to stderr so stdout only carries formatted output
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config file: {}", path))?,
        None => PipelineConfig::default(),
    };
    cli.apply(&mut config);

    let pipeline = Pipeline::new(config)?;
    let stats = pipeline.run(tokio::io::stdin()).await?;
    tracing::debug!(?stats, "done");

    Ok(())
}
