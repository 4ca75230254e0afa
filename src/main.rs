//! Signals relay CLI.

use anyhow::Result;
use clap::Parser;
use signals_relay::{http, Config, Relay};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "signals-relay")]
#[command(about = "Threat response relay for Auth0 Signals - enrich IP observables with reputation data")]
#[command(version)]
struct Args {
    /// Path to configuration file (defaults plus environment when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides server.listen (e.g. "0.0.0.0:9090")
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: String,

    /// Print example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --print-config
    if args.print_config {
        println!("{}", Config::example());
        return Ok(());
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            Config::load(path)?
        }
        None => Config::default(),
    };
    config.apply_env();
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    config.validate()?;

    // Handle --validate
    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    // Create relay
    let listen = config.server.listen.clone();
    let relay = Arc::new(Relay::new(config)?);

    // Serve until Ctrl-C
    http::run_http_server(relay, &listen, shutdown_signal()).await?;

    info!("Signals relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
