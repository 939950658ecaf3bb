//! Demo workload for the streaming server-component renderer.
//!
//! This workload shows:
//! - Shell-first streaming with out-of-order boundary resolution
//! - Full buffering for bots (`?_bot` or a crawler user agent)
//! - Head metadata declared inside delayed content
//! - The raw side channel at `/react?state={"pathname":...}`
//!
//! Pages are plain functions; the Spin handler is compiled for wasm only.

pub mod pages;

#[cfg(target_arch = "wasm32")]
mod handler;
#[cfg(target_arch = "wasm32")]
mod transport;

#[cfg(target_arch = "wasm32")]
pub use transport::SpinTransport;

use anyhow::{Context, Result};
use edge_sdk::edge_core::RenderConfig;

/// Renderer settings bundled with the workload.
pub const RENDER_TOML: &str = include_str!("../render.toml");

/// Load the bundled settings.
pub fn render_config() -> Result<RenderConfig> {
    parse_render_config(RENDER_TOML).context("Failed to load bundled render.toml")
}

/// Parse and validate renderer settings.
pub fn parse_render_config(content: &str) -> Result<RenderConfig> {
    let config = RenderConfig::from_toml(content)?;
    config.validate()?;
    Ok(config)
}
