//! System-wide configuration
//!
//! Stored as TOML at `<config_dir>/quell/config.toml`. The `QUELL_CONFIG`
//! environment variable points at a different file.

use anyhow::{Context, Result};
use quell_core::{Settings, SettingsCell, SettingsProvider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "QUELL_CONFIG";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub debounce: Settings,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Max level when `--verbose` is not given
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<()> {
        self.debounce.validate().map_err(anyhow::Error::msg)?;

        if !LOG_LEVELS.contains(&self.log.level.as_str()) {
            anyhow::bail!(
                "log.level must be one of {} (got '{}')",
                LOG_LEVELS.join(", "),
                self.log.level
            );
        }
        Ok(())
    }
}

/// Location of the config file
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("quell").join("config.toml"))
}

/// Load the config file, falling back to defaults when it does not exist
pub fn load() -> Result<SystemConfig> {
    let path = config_file_path().context("Could not determine config file path")?;
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<SystemConfig> {
    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SystemConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub fn save(config: &SystemConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    save_to(&path, config)
}

pub fn save_to(path: &Path, config: &SystemConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    Ok(())
}

/// Write a default config file if none exists
pub fn init_if_missing() -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save_to(&path, &SystemConfig::default())?;
    }
    Ok(())
}

pub fn example_config() -> String {
    r#"# Quell configuration

[debounce]
# URL substrings whose REST calls are debounced
rest_patterns = ["/api/search", "/api/autosave"]

# GraphQL operation names; `*` and `?` are wildcards, `*` alone matches all
graphql_operation_patterns = ["Search*", "UpdateDraft"]

# Quiet period in milliseconds (0-60000)
debounce_delay_ms = 300

[log]
# error, warn, info, debug or trace
level = "warn"
"#
    .to_string()
}

/// Settings provider backed by the config file
///
/// The file is read once on open and again on every [`reload`](Self::reload);
/// each read publishes a fresh snapshot to the inner [`SettingsCell`].
pub struct FileSettings {
    path: PathBuf,
    cell: SettingsCell,
}

impl FileSettings {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let settings = Self {
            path: path.into(),
            cell: SettingsCell::empty(),
        };
        settings.reload()?;
        Ok(settings)
    }

    pub fn reload(&self) -> Result<()> {
        let config = load_from(&self.path)?;
        tracing::debug!("Loaded debounce settings from {}", self.path.display());
        self.cell.publish(config.debounce);
        Ok(())
    }

    pub fn cell(&self) -> &SettingsCell {
        &self.cell
    }
}

impl SettingsProvider for FileSettings {
    fn snapshot(&self) -> Option<Arc<Settings>> {
        self.cell.snapshot()
    }
}
