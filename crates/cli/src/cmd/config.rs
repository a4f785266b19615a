//! Configuration management command
//!
//! Provides CLI interface to view and edit the config file.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use quell_core::MAX_DEBOUNCE_DELAY_MS;

/// List all configuration values
pub fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    println!("{}", "Quell Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[debounce]".yellow());
    println!(
        "  {} = {}",
        "rest_patterns".cyan(),
        format_list(&config.debounce.rest_patterns)
    );
    println!(
        "  {} = {}",
        "graphql_operation_patterns".cyan(),
        format_list(&config.debounce.graphql_operation_patterns)
    );
    println!(
        "  {} = {} {}",
        "delay_ms".cyan(),
        config.debounce.debounce_delay_ms,
        if config.debounce.debounce_delay_ms == 0 {
            "(next tick)".dimmed().to_string()
        } else {
            format!("({}ms)", config.debounce.debounce_delay_ms).dimmed().to_string()
        }
    );

    if config.debounce.is_inert() {
        println!("  {}", "No patterns set; every call is forwarded directly".dimmed());
    }

    println!("\n{}", "[log]".yellow());
    println!("  {} = {}", "level".cyan(), config.log.level);

    println!("\n{}", "Valid Ranges:".bold());
    println!("  delay_ms: 0-{}", MAX_DEBOUNCE_DELAY_MS);
    println!("  level: error, warn, info, debug, trace");

    Ok(())
}

/// Get a single configuration value
pub fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", get_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;
    set_value(&mut config, key, value)?;

    // Validate before saving
    config.validate()
        .context("Invalid configuration value")?;

    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), get_value(&config, key)?);
    Ok(())
}

/// Show the config file path and optionally create it
pub fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}

fn get_value(config: &SystemConfig, key: &str) -> Result<String> {
    let value = match key {
        "debounce.rest_patterns" => config.debounce.rest_patterns.join(","),
        "debounce.graphql_operation_patterns" => config.debounce.graphql_operation_patterns.join(","),
        "debounce.delay_ms" => config.debounce.debounce_delay_ms.to_string(),
        "log.level" => config.log.level.clone(),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'quell config list' to see available keys.",
            key
        ),
    };
    Ok(value)
}

fn set_value(config: &mut SystemConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "debounce.rest_patterns" => {
            config.debounce.rest_patterns = split_list(value);
        }
        "debounce.graphql_operation_patterns" => {
            config.debounce.graphql_operation_patterns = split_list(value);
        }
        "debounce.delay_ms" => {
            let val: u64 = value.parse()
                .context("Invalid value: must be a non-negative integer")?;
            config.debounce.debounce_delay_ms = val;
        }
        "log.level" => {
            config.log.level = value.trim().to_ascii_lowercase();
        }
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'quell config list' to see available keys.",
            key
        ),
    }
    Ok(())
}

/// Comma-separated patterns, trimmed, empties dropped
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".dimmed().to_string();
    }
    items
        .iter()
        .map(|item| format!("\"{}\"", item))
        .collect::<Vec<_>>()
        .join(", ")
}
