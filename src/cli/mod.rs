//! Command-line interface components
//!
//! Argument parsing and the handlers behind each subcommand.

pub mod args;
pub mod commands;

pub use args::{
    CacheAction, CacheArgs, Cli, Commands, ConfigAction, ConfigArgs, GlobalArgs, RateArgs, ServeArgs,
};
pub use commands::{handle_cache, handle_config, handle_rate, handle_serve};
