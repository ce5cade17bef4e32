//! p11tap - transparent inspection proxy for the PKCS#11 RPC wire protocol.
//!
//! Sits between a PKCS#11 RPC client and its server, forwards every byte
//! unmodified, and decodes a copy of each message for trace output.

use clap::Parser;
use p11tap_proxy::{Config, ProxyServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "p11tap")]
#[command(about = "Transparent inspection proxy for the PKCS#11 RPC wire protocol")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Address of the real PKCS#11 RPC server
    #[arg(short, long)]
    upstream: Option<SocketAddr>,

    /// Accept wait timeout in seconds
    #[arg(long)]
    accept_timeout: Option<u64>,

    /// Path to a YAML config file
    #[arg(short, long, env = "P11TAP_CONFIG")]
    config: Option<PathBuf>,

    /// Log decoded values and diagnostic notes, not just call names
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // File (if any), then env overrides, then CLI flags.
    let mut config = match &cli.config {
        Some(path) => {
            let mut c = Config::from_file(path)?;
            c.apply_env_overrides();
            c
        }
        None => Config::load()?,
    };
    if let Some(listen) = cli.listen {
        config.listen.bind_addr = listen;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream.addr = upstream;
    }
    if let Some(secs) = cli.accept_timeout {
        config.listen.accept_timeout_secs = secs;
    }

    tracing::info!("Starting p11tap");
    tracing::info!("  Listen address: {}", config.listen.bind_addr);
    tracing::info!("  Upstream address: {}", config.upstream.addr);

    let server = Arc::new(ProxyServer::new(config));

    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping proxy...");
        shutdown_server.shutdown();
    });

    server.run().await?;

    let stats = server.stats();
    tracing::info!(
        "Proxy stopped ({} connections, {} frames relayed, {} decode failures)",
        stats
            .connections_total
            .load(std::sync::atomic::Ordering::Relaxed),
        stats
            .frames_relayed
            .load(std::sync::atomic::Ordering::Relaxed),
        stats
            .decode_failures
            .load(std::sync::atomic::Ordering::Relaxed)
    );
    Ok(())
}
