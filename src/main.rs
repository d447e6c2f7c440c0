//! Logstash Exporter - Prometheus exporter for Logstash node statistics
//!
//! Every request to the telemetry path fetches `/_node/stats` from each
//! configured Logstash node and renders the flattened tree.
//!
//! # Usage
//! ```sh
//! LOGSTASH_HOSTS=ls-1:9600,ls-2:9600 cargo run -- --web.listen-address :9304
//! ```

use clap::Parser;
use logstash_exporter::config::Args;
use logstash_exporter::infrastructure::MetricsServer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading any variable
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("Logstash Exporter {} starting...", env!("CARGO_PKG_VERSION"));

    let config = args.load_config()?;
    info!(
        "Configuration loaded: hosts={:?}, timeout={:?}, max_depth={}, instance_label={}",
        config.logstash.hosts,
        config.logstash.timeout,
        config.logstash.max_depth,
        config.instance_label()
    );

    let server = MetricsServer::from_config(&config)?;
    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Shutdown complete.");
    Ok(())
}
