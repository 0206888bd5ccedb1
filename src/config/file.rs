//! TOML configuration file loading
//!
//! Supports `~/.config/chatkeeper/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Data directory holding the database and export working files
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Export engine settings
    #[serde(default)]
    pub export: ExportFileConfig,

    /// Telegram Bot API settings
    #[serde(default)]
    pub telegram: TelegramFileConfig,
}

/// Export engine settings
#[derive(Debug, Default, Deserialize)]
pub struct ExportFileConfig {
    /// Message count used when no argument is given
    pub default_count: Option<u32>,

    /// Root for per-export working directories
    pub work_dir: Option<String>,

    /// Minimum seconds between status edits
    pub progress_interval_secs: Option<u64>,

    /// Deliver a labelled partial archive when an export is stopped
    pub deliver_partial: Option<bool>,

    /// Messages requested per history page
    pub page_size: Option<usize>,

    /// Retries for a failed history page
    pub page_retries: Option<u32>,

    /// Status edit cadence while collecting (messages)
    pub collect_report_every: Option<usize>,

    /// Status edit cadence while fetching media (messages)
    pub media_report_every: Option<usize>,
}

/// Telegram Bot API settings
#[derive(Debug, Default, Deserialize)]
pub struct TelegramFileConfig {
    pub bot_token: Option<String>,
    pub delivery_chat: Option<i64>,
    pub api_base: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    config_file_path().map_or_else(ConfigFile::default, |path| load_from_path(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_from_path(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/chatkeeper/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("chatkeeper").join("config.toml"))
}
