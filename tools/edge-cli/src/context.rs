//! CLI execution context.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use edge_core::RenderConfig;

use crate::config::find_config_file;
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Renderer configuration.
    pub config: RenderConfig,
    /// File the configuration was loaded from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        // Try to find config in current directory or parent directories
        let config_path = match config_path {
            Some(path) => Some(PathBuf::from(path)),
            None => find_config_file(&cwd),
        };

        let config = match &config_path {
            Some(path) => RenderConfig::load(&path.to_string_lossy())?,
            None => RenderConfig::default(),
        };

        if let Some(path) = &config_path {
            output.debug(&format!("Loaded config from {}", path.display()));
        }

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }
}
