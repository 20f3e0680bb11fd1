//! Source Finder gateway
//!
//! Command-line entry point: loads configuration, initializes logging and
//! runs the selected subcommand.

use std::process;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use source_finder::cli::{handle_cache, handle_config, handle_rate, handle_serve, Cli, Commands};
use source_finder::config::{AppConfig, LoggingConfig};
use source_finder::errors::{AppError, Result};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error [{}]: {}", e.category(), e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let mut config = AppConfig::load(cli.global.config.clone()).await?;
    if let Commands::Serve(args) = &cli.command {
        config.apply_overrides(&args.overrides());
    }

    let _guard = init_logging(&cli, &config.logging)?;
    info!("Source Finder v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve(_) => handle_serve(config).await,
        Commands::Rate(args) => handle_rate(config, args).await,
        Commands::Cache(args) => handle_cache(config, args).await,
        Commands::Config(args) => handle_config(config, args).await,
    }
}

/// Console logging, plus capped daily files when enabled
///
/// The returned guard flushes the file writer on drop and must live until
/// the program exits.
fn init_logging(cli: &Cli, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| logging.level.clone());
    let directive = format!("source_finder={}", level)
        .parse()
        .map_err(|e| AppError::generic(format!("Invalid log level '{}': {}", level, e)))?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    let (file_layer, guard) = if logging.file_logging {
        let (writer, guard) = tracing_appender::non_blocking(logging.file_appender()?);
        (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}
