//! Config file discovery and key access.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use edge_core::{LogFormat, LogLevel, RenderConfig};

/// File names searched for, in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["render.toml", ".render.toml", "render.json"];

/// Find a config file in `start` or its parents.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in &CONFIG_FILE_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Save config as TOML or JSON, by extension.
pub fn save_config(config: &RenderConfig, path: &Path) -> Result<()> {
    let content = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::to_string_pretty(config)?
    } else {
        config.to_toml()?
    };
    std::fs::write(path, content)?;
    Ok(())
}

/// Read a value by dot-separated key, formatted as TOML.
pub fn get_config_value(config: &RenderConfig, key: &str) -> Result<String> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["bot", "enabled"] => Ok(config.bot.enabled.to_string()),
        ["bot", "query_param"] => Ok(format!("\"{}\"", config.bot.query_param)),
        ["bot", "extra_user_agents"] => Ok(format!("{:?}", config.bot.extra_user_agents)),
        ["document", "lang"] => Ok(format!("\"{}\"", config.document.lang)),
        ["document", "root_id"] => Ok(format!("\"{}\"", config.document.root_id)),
        ["document", "default_title"] => Ok(config
            .document
            .default_title
            .as_ref()
            .map(|t| format!("\"{}\"", t))
            .unwrap_or_else(|| "null".to_string())),
        ["flight", "global"] => Ok(format!("\"{}\"", config.flight.global)),
        ["log", "level"] => Ok(format!("\"{}\"", config.log.level.to_string().to_lowercase())),
        ["log", "format"] => Ok(format!("\"{}\"", log_format_name(config.log.format))),
        _ => bail!("Unknown config key: {}", key),
    }
}

/// Set a value by dot-separated key.
pub fn set_config_value(config: &mut RenderConfig, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["bot", "enabled"] => config.bot.enabled = value.parse()?,
        ["bot", "query_param"] => config.bot.query_param = value.to_string(),
        ["bot", "extra_user_agents"] => {
            config.bot.extra_user_agents = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        }
        ["document", "lang"] => config.document.lang = value.to_string(),
        ["document", "root_id"] => config.document.root_id = value.to_string(),
        ["document", "default_title"] => config.document.default_title = Some(value.to_string()),
        ["flight", "global"] => config.flight.global = value.to_string(),
        ["log", "level"] => config.log.level = parse_log_level(value)?,
        ["log", "format"] => {
            config.log.format = match value {
                "json" => LogFormat::Json,
                "human" => LogFormat::Human,
                _ => bail!("log.format must be json or human: {}", value),
            }
        }
        _ => bail!("Unknown config key: {}", key),
    }

    Ok(())
}

fn parse_log_level(value: &str) -> Result<LogLevel> {
    Ok(match value.to_lowercase().as_str() {
        "trace" => LogLevel::Trace,
        "debug" => LogLevel::Debug,
        "info" => LogLevel::Info,
        "warn" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => bail!("log.level must be one of trace, debug, info, warn, error: {}", value),
    })
}

fn log_format_name(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Json => "json",
        LogFormat::Human => "human",
    }
}

/// Generate a commented default config file.
pub fn generate_default_config() -> String {
    r#"# Renderer configuration

[bot]
# Detect crawlers by user agent. The override flag works either way.
enabled = true
# Query parameter that forces a fully buffered response (`?_bot`).
# `?_bot=0` or `?_bot=false` forces streaming.
query_param = "_bot"
# Extra case-insensitive user-agent substrings treated as bots.
extra_user_agents = []

[document]
lang = "en"
root_id = "root"
# default_title = "My Site"

[flight]
# Global array that receives side-channel push records.
global = "__flight"

[log]
# trace | debug | info | warn | error
level = "info"
# json | human
format = "json"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = RenderConfig::from_toml(&generate_default_config()).unwrap();
        assert_eq!(config, RenderConfig::default());
    }

    #[test]
    fn test_get_set_round() {
        let mut config = RenderConfig::default();
        set_config_value(&mut config, "log.level", "debug").unwrap();
        set_config_value(&mut config, "bot.extra_user_agents", "acme, preview-bot").unwrap();
        set_config_value(&mut config, "document.default_title", "Shop").unwrap();

        assert_eq!(get_config_value(&config, "log.level").unwrap(), "\"debug\"");
        assert_eq!(config.bot.extra_user_agents, vec!["acme", "preview-bot"]);
        assert_eq!(get_config_value(&config, "document.default_title").unwrap(), "\"Shop\"");
    }

    #[test]
    fn test_unknown_keys_fail() {
        let mut config = RenderConfig::default();
        assert!(get_config_value(&config, "bot.nope").is_err());
        assert!(set_config_value(&mut config, "log.level", "loud").is_err());
        assert!(set_config_value(&mut config, "bot.enabled", "maybe").is_err());
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = std::env::temp_dir().join(format!("edge-cli-{}", std::process::id()));
        let nested = dir.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.join("render.toml"), generate_default_config()).unwrap();

        assert_eq!(find_config_file(&nested), Some(dir.join("render.toml")));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
