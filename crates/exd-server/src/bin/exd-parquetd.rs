//! Parquet External Data Reader Daemon
//!
//! The `exd-parquetd` binary:
//! - Creates the reader and its session registry
//! - Starts the gRPC server for ODS server connections
//! - Handles graceful shutdown on SIGTERM/SIGINT
//!
//! # Usage
//!
//! ```bash
//! # Start server with default settings
//! exd-parquetd
//!
//! # Start on custom port
//! exd-parquetd --port 50052
//!
//! # Use configuration file
//! exd-parquetd --config /etc/exd/exd-parquetd.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use exd_server::config::ServerConfig;
use exd_server::grpc::GrpcServer;
use exd_server::reader::Reader;

/// Parquet External Data Reader Daemon
#[derive(Parser, Debug)]
#[command(
    name = "exd-parquetd",
    version,
    about = "ASAM ODS external data reader for Parquet files",
    long_about = "Serves the ods.external_data.ExternalDataReader gRPC service.\n\n\
                  Parquet files are opened by URL, described as one group of channels, \
                  and read in row windows."
)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "EXD_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, env = "EXD_PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", env = "EXD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "EXD_LOG_LEVEL")]
    log_level: String,

    /// Maximum gRPC message size in MB
    #[arg(long, env = "EXD_MAX_MESSAGE_SIZE_MB")]
    max_message_size_mb: Option<usize>,

    /// Print configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    run_server(config).await
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else {
        args.log_level.as_str()
    };

    let filter = EnvFilter::try_new(format!("exd_server={level},exd_parquetd={level}"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = if let Some(path) = &args.config {
        ServerConfig::from_file(path).context("Failed to load config file")?
    } else {
        ServerConfig::default()
    };

    // Command-line arguments win over the file
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(size) = args.max_message_size_mb {
        config.max_message_size_mb = size;
    }

    Ok(config)
}

async fn run_server(config: ServerConfig) -> Result<()> {
    let reader = Arc::new(Reader::new());

    info!(
        "exd-parquetd v{} starting on {}",
        env!("CARGO_PKG_VERSION"),
        config.socket_addr()
    );
    info!("  Max message size: {} MB", config.max_message_size_mb);
    info!(
        "  Concurrency per connection: {}",
        config.concurrency_limit_per_connection
    );
    info!("  Request timeout: {} s", config.request_timeout_secs);
    info!("Press Ctrl+C to shutdown");

    let server = GrpcServer::new(Arc::clone(&reader), config);
    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        error!("Server error: {}", e);
        return Err(anyhow::anyhow!("Server error: {}", e));
    }

    info!("Shutting down gracefully...");

    let stats = reader.stats();
    if stats.open_sessions > 0 {
        warn!(
            "{} sessions still open on {} sources",
            stats.open_sessions, stats.cached_sources
        );
    }
    info!(
        "Served {} sessions in {:?}. Goodbye!",
        stats.total_sessions, stats.uptime
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
