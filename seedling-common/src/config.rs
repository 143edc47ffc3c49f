//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "SEEDLING_ROOT_FOLDER";

/// Logging configuration shared by every service's TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Root folder resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `root_folder` key of the TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, env_var_name: &str) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Ok(config_path) = default_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    default_root_folder()
}

/// Locate the default configuration file for the platform
///
/// Linux checks `~/.config/seedling/config.toml` then `/etc/seedling/config.toml`.
pub fn default_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("seedling").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/seedling/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("seedling"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\seedling"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("seedling"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/seedling"))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join("seedling"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/seedling"))
    }
}

/// Load and parse a TOML file into `T`
///
/// A missing file is not an error: it yields `Ok(None)` and a warning so
/// the caller can continue on compiled defaults. A file that exists but
/// does not parse is a configuration error.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        warn!("Config file not found: {} (using defaults)", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str::<T>(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    Ok(Some(parsed))
}

/// Resolve `path` against `root` unless it is already absolute
pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
