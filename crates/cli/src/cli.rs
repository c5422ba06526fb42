//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// PhotoDream Hub - coordination authority for slideshow tablets
#[derive(Parser, Debug)]
#[command(
    name = "photodream-hub",
    author,
    version,
    about = "Coordination hub for PhotoDream slideshow tablets",
    long_about = "Coordinates a fleet of PhotoDream tablets against a shared photo source.\n\n\
                  Serves the status webhook, tracks per-device liveness, pushes profile \n\
                  and display configuration, and exposes service commands over an admin API."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PHOTODREAM_HUB_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PHOTODREAM_HUB_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the coordination hub
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "hub.toml", env = "PHOTODREAM_HUB_CONFIG")]
    pub config: PathBuf,

    /// Override listen address from configuration
    #[arg(long, env = "PHOTODREAM_HUB_BIND")]
    pub bind: Option<String>,

    /// Validate configuration and exit without running the hub
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "PHOTODREAM_HUB_METRICS_PORT")]
    pub metrics_port: u16,

    /// Skip the staggered fleet config refresh on startup
    #[arg(long)]
    pub no_startup_refresh: bool,

    /// Seconds between per-device refreshes during a fleet refresh
    #[arg(long, default_value = "25", env = "PHOTODREAM_HUB_REFRESH_STAGGER")]
    pub refresh_stagger: u64,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "hub.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "hub.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show configured devices
    #[arg(long)]
    pub devices: bool,

    /// Show configured profiles
    #[arg(long)]
    pub profiles: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
