//! Configuration loading and discovery for `spritesheet.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::SpritesheetConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for when no explicit config path is given
pub const CONFIG_FILE_NAME: &str = "spritesheet.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse spritesheet.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// No config file was found
    #[error("No spritesheet.toml found in {} or any parent directory", .0.display())]
    NotFound(PathBuf),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// A parsed configuration together with the directory it was loaded from.
///
/// Every relative path in the configuration resolves against `root`.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The validated configuration
    pub config: SpritesheetConfig,
    /// Project root (directory containing the config file)
    pub root: PathBuf,
    /// Path of the config file itself
    pub path: PathBuf,
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override packing padding
    pub padding: Option<u32>,
    /// Override the name prefix
    pub class_prefix: Option<String>,
    /// Override the sheet reference prefix
    pub sprite_img_prefix: Option<String>,
}

/// Find spritesheet.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    find_config_from(cwd)
}

/// Find spritesheet.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a spritesheet.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file.
///
/// # Returns
/// - `Ok(LoadedConfig)` on success
/// - `Err(ConfigError)` if the file is missing, cannot be parsed, or is invalid
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => find_config().ok_or_else(|| {
            ConfigError::NotFound(env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
        })?,
    };

    let contents = fs::read_to_string(&config_path)?;
    let config = parse_config(&contents)?;

    let root = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => env::current_dir()?,
    };

    tracing::debug!(config = %config_path.display(), root = %root.display(), "loaded config");

    Ok(LoadedConfig { config, root, path: config_path })
}

/// Parse and validate configuration text.
pub fn parse_config(contents: &str) -> Result<SpritesheetConfig, ConfigError> {
    let config: SpritesheetConfig = toml::from_str(contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Merge CLI overrides into every task of a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut SpritesheetConfig, overrides: &CliOverrides) {
    for task in config.tasks.values_mut() {
        if let Some(padding) = overrides.padding {
            task.packing.padding = Some(padding);
        }

        if let Some(ref prefix) = overrides.class_prefix {
            task.class_prefix = Some(prefix.clone());
        }

        if let Some(ref prefix) = overrides.sprite_img_prefix {
            task.sprite_img_prefix = Some(prefix.clone());
        }
    }
}
