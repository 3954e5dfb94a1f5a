// Standalone stub of the MetaMapa API for running the portal locally without
// the real backend.
use anyhow::{Context, Result};
use clap::Parser;
use metamapa_test_harness::StubApi;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stub-api")]
#[command(about = "Serve canned MetaMapa API responses")]
struct Args {
    /// Address to listen on (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// JSON file with the fact list returned by GET /api/interna/hechos
    #[arg(long)]
    facts: Option<PathBuf>,

    /// JSON file with the run list returned by GET /api/admin/importaciones
    #[arg(long)]
    imports: Option<PathBuf>,
}

fn load_json(path: &PathBuf) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let stub = StubApi::spawn_on(args.bind).await?;
    if let Some(path) = &args.facts {
        stub.set_facts(load_json(path)?);
    }
    if let Some(path) = &args.imports {
        stub.set_imports(load_json(path)?);
    }
    info!(base_url = %stub.base_url(), "stub api listening");

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!(
        requests = stub.requests().len(),
        "stub api shutting down"
    );
    Ok(())
}
