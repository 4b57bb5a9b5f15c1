//! PyTutor server
//!
//! Backend for a browser-based Python learning tool: a streaming chat
//! relay and a sandboxed code executor behind a small HTTP API.

use anyhow::Result;
use clap::Parser;
use pytutor_server::{
    config::{Environment, Settings},
    logging::RollingFileWriter,
    server::App,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// PyTutor server
///
/// Streaming chat relay and sandboxed Python execution for the editor.
#[derive(Parser, Debug)]
#[command(name = "pytutor-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT env var)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST env var)
    #[arg(long)]
    host: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Environment: dev, staging, prod (overrides ENVIRONMENT env var)
    #[arg(short, long)]
    env: Option<Environment>,

    /// Log file path for JSON logs (enables file logging with rotation)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first so logging can use its log_level.
    let mut settings = Settings::load()?;

    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(env) = args.env {
        settings.environment = env;
    }

    init_tracing(&settings.log_level, args.log_file.as_ref());

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        host = %settings.host,
        port = %settings.port,
        isolation = %settings.executor.isolation,
        "Starting application"
    );

    let app = App::new(settings).await?;

    app.run_with_graceful_shutdown().await?;

    tracing::info!("Application shutdown complete");

    Ok(())
}

/// Initialize the tracing subscriber with the specified log level.
/// Optionally writes JSON logs to a size-rotated file as well.
fn init_tracing(log_level: &str, log_file: Option<&PathBuf>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let console_layer = fmt::layer().json().with_filter(filter);

    let subscriber = tracing_subscriber::registry().with(console_layer);

    if let Some(path) = log_file {
        let file_writer =
            RollingFileWriter::with_defaults(path).expect("Failed to create log file writer");

        let file_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_filter(file_filter);

        subscriber.with(file_layer).init();

        eprintln!("Logging to file: {}", path.display());
    } else {
        subscriber.init();
    }
}
