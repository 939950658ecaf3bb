//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};
use edge_core::RenderConfig;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, get_config_value, save_config, set_config_value};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Get { key } => get_config(&key, ctx).await,
        ConfigCommand::Set { key, value } => set_config(&key, &value, ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    print!("\n{}", ctx.config.to_toml()?);
    Ok(())
}

async fn get_config(key: &str, ctx: &Context) -> Result<()> {
    let value = get_config_value(&ctx.config, key)?;

    if ctx.output.is_json() {
        println!(r#"{{"key": "{}", "value": {}}}"#, key, value);
    } else {
        println!("{}", value);
    }

    Ok(())
}

async fn set_config(key: &str, value: &str, ctx: &Context) -> Result<()> {
    let Some(config_path) = &ctx.config_path else {
        bail!("No config file found. Run `edge config init` to create one.");
    };

    let mut config = RenderConfig::load(&config_path.to_string_lossy())?;
    set_config_value(&mut config, key, value)?;
    config.validate()?;
    save_config(&config, config_path)?;

    ctx.output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join("render.toml");

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config())?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let mut warnings: Vec<String> = Vec::new();

    if !ctx.config.bot.enabled {
        warnings.push(format!(
            "bot.enabled is false: crawlers are only buffered with ?{}",
            ctx.config.bot.query_param
        ));
    }

    for (i, pattern) in ctx.config.bot.extra_user_agents.iter().enumerate() {
        if pattern.trim().is_empty() {
            warnings.push(format!("bot.extra_user_agents[{}] is empty and matches every agent", i));
        }
    }

    if ctx.config.document.lang.is_empty() {
        warnings.push("document.lang is empty".to_string());
    }

    if let Err(e) = ctx.config.validate() {
        ctx.output.error(&format!("Error: {}", e));
        bail!("Configuration is invalid");
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
    } else {
        ctx.output.success("Configuration is valid (with warnings)");
    }

    Ok(())
}
