//! Command-line argument parsing for Source Finder
//!
//! This module defines the CLI structure using clap derive macros: the
//! gateway itself, a one-shot exchange rate lookup, cache maintenance and
//! configuration management.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ConfigOverrides;

/// Source Finder - reverse image product search gateway
#[derive(Parser, Debug)]
#[command(
    name = "source_finder",
    version,
    about = "Find the source listing of a product photo on 1688 and taobao",
    long_about = "A duplex gateway that accepts product images from clients, searches them on
image search providers one request at a time, caches the results and converts
prices to the client's currency."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (trace level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the gateway
    Serve(ServeArgs),

    /// Fetch the exchange rate once and print it
    Rate(RateArgs),

    /// Result cache maintenance
    Cache(CacheArgs),

    /// Configuration file management
    Config(ConfigArgs),
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Result cache directory
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

impl ServeArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind,
            port: self.port,
            cache_dir: self.cache_dir.clone(),
        }
    }
}

/// Arguments for the rate command
#[derive(Args, Debug, Clone, Default)]
pub struct RateArgs {
    /// Source currency (default from config)
    #[arg(long, value_name = "CUR")]
    pub from: Option<String>,

    /// Target currency (default from config)
    #[arg(long, value_name = "CUR")]
    pub to: Option<String>,
}

#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Result cache directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Show stored and still valid entry counts
    Stats,

    /// Remove expired entries
    Purge,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Write the default configuration file to the user config directory
    Init,

    /// Print the effective configuration
    Show,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Level chosen by the verbosity flags; `None` defers to the config
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::TRACE)
        } else if self.global.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }
}
