//! Wagerline API Server Binary

use clap::Parser;
use std::sync::Arc;
use tracing::info;
use wagerline::api::ApiServer;
use wagerline::common::config::{generate_sample_config, ConfigLoader};
use wagerline::ServiceBuilder;

#[derive(Parser, Debug)]
#[command(name = "wagerline")]
#[command(about = "Wagerline betting core API server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// API server host (overrides the configuration file)
    #[arg(long)]
    host: Option<String>,

    /// API server port (overrides the configuration file)
    #[arg(long)]
    port: Option<u16>,

    /// Allowed CORS origins (comma-separated, use * for all)
    #[arg(long)]
    cors_origins: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write a sample configuration to this path and exit
    #[arg(long)]
    generate_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wagerline=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    if let Some(path) = args.generate_config {
        generate_sample_config(&path)?;
        info!("Sample configuration written to {}", path);
        return Ok(());
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(origins) = args.cors_origins {
        config.server.cors_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Some(timeout) = args.timeout {
        config.server.request_timeout_secs = timeout;
    }

    let server_config = config.server.clone();
    let services = Arc::new(ServiceBuilder::new().with_config(config).build()?);

    ApiServer::new(server_config, services).run().await?;
    Ok(())
}
