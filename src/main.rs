//! Tubely - video ingestion service
//!
//! Accepts video and thumbnail uploads for existing video records.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tubely::metrics::server::MetricsServer;
use tubely::{config::Config, server::Server};

/// Tubely - video upload ingestion into S3
#[derive(Parser, Debug)]
#[command(name = "tubely")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level or filter directive; `RUST_LOG` takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Tubely v{}", tubely::VERSION);

    let config = Config::load(&args.config)?;
    config.validate()?;
    info!("Loaded configuration from {:?}", args.config);

    let mut metrics_server = if config.metrics.enabled {
        let mut server = MetricsServer::new(format!("0.0.0.0:{}", config.metrics.port));
        let addr = server.start().await?;
        info!("Metrics available at http://{}/metrics", addr);
        Some(server)
    } else {
        None
    };

    let server = Server::from_config(config).await?;
    server.run().await?;

    if let Some(metrics) = metrics_server.as_mut() {
        metrics.shutdown().await;
    }

    Ok(())
}
