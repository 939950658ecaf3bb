//! CLI command implementations.

pub mod config;
pub mod render;
pub mod routes;

use clap::{Args, Subcommand};

/// Arguments for the render command.
#[derive(Args)]
pub struct RenderArgs {
    /// Path and query to render, e.g. `/stream?_bot`.
    #[arg(default_value = "/stream")]
    pub path: String,

    /// Force buffered delivery by adding the override flag.
    #[arg(long)]
    pub bot: bool,

    /// User-Agent header to send.
    #[arg(short = 'A', long)]
    pub user_agent: Option<String>,

    /// Extra request headers as `name=value`.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Render the side channel instead of the HTML document.
    #[arg(long)]
    pub flight: bool,

    /// Cancel the render after this many milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Print chunk sizes and timings only, not their content.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Get a config value.
    Get {
        /// Config key (dot-separated).
        key: String,
    },
    /// Set a config value.
    Set {
        /// Config key (dot-separated).
        key: String,
        /// Value to set.
        value: String,
    },
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
