//! Renderer configuration.

use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the rendering pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Bot classification policy.
    #[serde(default)]
    pub bot: BotConfig,

    /// Document shell settings.
    #[serde(default)]
    pub document: DocumentConfig,

    /// Side-channel settings.
    #[serde(default)]
    pub flight: FlightConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

impl RenderConfig {
    /// Load config from a TOML or JSON file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            Self::from_toml(&content).with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Parse config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.bot.query_param.is_empty() {
            anyhow::bail!("bot.query_param must not be empty");
        }
        if !is_js_identifier(&self.flight.global) {
            anyhow::bail!("flight.global is not a valid identifier: {}", self.flight.global);
        }
        if self.document.root_id.is_empty() {
            anyhow::bail!("document.root_id must not be empty");
        }
        Ok(())
    }
}

fn is_js_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Bot classification policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Whether user-agent detection is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Query parameter that forces buffered delivery.
    #[serde(default = "default_query_param")]
    pub query_param: String,

    /// Extra user-agent substrings treated as bots.
    #[serde(default)]
    pub extra_user_agents: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_query_param() -> String {
    "_bot".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            query_param: default_query_param(),
            extra_user_agents: Vec::new(),
        }
    }
}

/// Document shell settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Default `<html lang>`.
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Id of the root container element.
    #[serde(default = "default_root_id")]
    pub root_id: String,

    /// Title used when no component declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_title: Option<String>,
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_root_id() -> String {
    "root".to_string()
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            root_id: default_root_id(),
            default_title: None,
        }
    }
}

/// Side-channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightConfig {
    /// Name of the global array that receives push records.
    #[serde(default = "default_global")]
    pub global: String,
}

fn default_global() -> String {
    "__flight".to_string()
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            global: default_global(),
        }
    }
}

/// Log level for structured logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (for production/log aggregation).
    #[default]
    Json,
    /// Human-readable format (for development).
    Human,
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert!(config.bot.enabled);
        assert_eq!(config.bot.query_param, "_bot");
        assert_eq!(config.document.lang, "en");
        assert_eq!(config.document.root_id, "root");
        assert_eq!(config.flight.global, "__flight");
        assert_eq!(config.log.level, LogLevel::Info);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RenderConfig::from_toml(
            r#"
            [bot]
            extra_user_agents = ["acme-preview"]

            [log]
            level = "debug"
            format = "human"
            "#,
        )
        .unwrap();

        assert_eq!(config.bot.query_param, "_bot");
        assert_eq!(config.bot.extra_user_agents, vec!["acme-preview".to_string()]);
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Human);
        assert_eq!(config.flight.global, "__flight");
    }

    #[test]
    fn test_toml_roundtrip_preserves_values() {
        let mut config = RenderConfig::default();
        config.document.lang = "ja".into();
        config.document.default_title = Some("Shop".into());
        let parsed = RenderConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_bad_global() {
        let mut config = RenderConfig::default();
        config.flight.global = "1bad-name".into();
        assert!(config.validate().is_err());

        config.flight.global = "$flight_1".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = RenderConfig::load("/nonexistent/edge.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Error > LogLevel::Warn);
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
    }
}
