use std::net::SocketAddr;
use std::path::PathBuf;

use account_sieve_service::{serve, Dataset};
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "account-sieve-service")]
#[command(about = "Local HTTP stand-in for the account listing and detail endpoints")]
struct Args {
    /// JSON dataset `{ "page_size", "accounts", "unavailable" }`; a built-in
    /// sample is served when omitted.
    #[arg(long)]
    dataset: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:4020")]
    bind: SocketAddr,
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn setup_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::builder().with_default_directive(level.parse()?).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(&args.log_level)?;

    let dataset = match &args.dataset {
        Some(path) => Dataset::load(path)?,
        None => Dataset::sample(),
    };
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        accounts = dataset.accounts.len(),
        page_size = dataset.page_size,
        "serving accounts"
    );
    serve(listener, dataset).await?;
    Ok(())
}
