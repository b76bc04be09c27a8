//! Configuration loading and model path resolution

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::batch::BatchColumns;
use crate::{Error, Result};

/// Environment variable overriding the model artifact location
pub const MODEL_PATH_ENV: &str = "HSP_MODEL_PATH";

/// File name of the compiled-default model artifact
pub const DEFAULT_MODEL_FILE: &str = "popularity_model.json";

/// Contents of `config.toml`
///
/// Every field is optional; a missing or unreadable file yields defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub model_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub batch: BatchColumns,
}

impl TomlConfig {
    /// Parse a config file, failing on I/O or syntax errors
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load `path` (or the default location), falling back to defaults
    ///
    /// Missing configuration never stops startup; problems are logged.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => return Self::default(),
        };

        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }
}

/// Default configuration file path for the platform
///
/// `<config_dir>/hsp/config.toml`, e.g. `~/.config/hsp/config.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hsp").join("config.toml"))
}

/// OS-dependent default model artifact path
pub fn default_model_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hsp"))
        .unwrap_or_else(|| PathBuf::from("./hsp_data"))
        .join(DEFAULT_MODEL_FILE)
}

/// Model path resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable `HSP_MODEL_PATH`
/// 3. TOML config `model_path`
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_model_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(MODEL_PATH_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.model_path {
        return path.clone();
    }

    default_model_path()
}
