mod config;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use account_sieve_client::HttpAccountSource;
use account_sieve_core::Pipeline;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Overrides, SieveConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "sieve")]
#[command(about = "Walk the account listing and report the youngest accounts with a phone number")]
struct Cli {
    /// YAML or JSON settings file.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    base_url: Option<String>,
    /// Number of accounts to keep.
    #[arg(long)]
    limit: Option<usize>,
    /// Cap on concurrent detail requests per page.
    #[arg(long)]
    max_concurrent: Option<usize>,
    /// Retries for a failed page request.
    #[arg(long)]
    retries: Option<u32>,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn resolve_config(&self) -> Result<SieveConfig> {
        let base = match &self.config {
            Some(path) => SieveConfig::load(path)?,
            None => SieveConfig::default(),
        };
        let config = base.with_overrides(Overrides {
            base_url: self.base_url.clone(),
            limit: self.limit,
            max_concurrent: self.max_concurrent,
            retries: self.retries,
        });
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn setup_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::builder().with_default_directive(level.parse()?).from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli.log_level)?;
    let config = cli.resolve_config()?;

    let source = Arc::new(
        HttpAccountSource::new(&config.client).context("failed to build account client")?,
    );
    let pipeline = Pipeline::from_shared(Arc::clone(&source), source, config.pipeline);

    let mut transitions = pipeline.transitions();
    tokio::spawn(async move {
        while let Ok(state) = transitions.recv().await {
            debug!(state = %state, "pipeline state changed");
        }
    });

    let outcome = pipeline.spawn().wait().await.context("pipeline failed")?;
    if let Some(reason) = &outcome.incomplete {
        warn!(reason = %reason, "result only covers the pages retrieved before the failure");
    }

    match cli.format {
        Format::Text => print!("{}", report::render_text(&outcome)),
        Format::Json => println!("{}", report::render_json(&outcome)?),
    }
    Ok(())
}
