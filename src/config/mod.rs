//! Configuration management for Chatkeeper

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::export::{DEFAULT_COUNT, DEFAULT_PROGRESS_INTERVAL};
use crate::export::walker::DEFAULT_PAGE_SIZE;
use crate::retry::RetryPolicy;
use crate::{Error, Result};
use file::ConfigFile;

/// Chatkeeper configuration
#[derive(Debug)]
pub struct Config {
    /// Path to data directory (database, working files)
    pub data_dir: PathBuf,

    /// Export engine configuration
    pub export: ExportConfig,

    /// Telegram Bot API configuration
    pub telegram: TelegramConfig,
}

/// Export engine configuration
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Root for per-export working directories and archives
    pub work_dir: PathBuf,

    /// Count used when the export argument is omitted
    pub default_count: u32,

    /// Minimum spacing between non-terminal status edits
    pub progress_interval: Duration,

    /// Hand off a `(STOPPED)`-labelled partial archive when an export is
    /// stopped, instead of discarding it
    pub deliver_partial: bool,

    /// Messages requested per history page
    pub page_size: usize,

    /// Retry policy for history pages
    pub page_retry: RetryPolicy,

    /// Emit a collection status every N accepted messages
    pub collect_report_every: usize,

    /// Emit a media status every N rendered messages
    pub media_report_every: usize,
}

impl ExportConfig {
    /// Defaults rooted at `work_dir`
    #[must_use]
    pub fn with_work_dir(work_dir: PathBuf) -> Self {
        Self {
            work_dir,
            default_count: DEFAULT_COUNT,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            deliver_partial: false,
            page_size: DEFAULT_PAGE_SIZE,
            page_retry: RetryPolicy::default(),
            collect_report_every: 50,
            media_report_every: 20,
        }
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Default)]
pub struct TelegramConfig {
    /// Bot token (`TELEGRAM_BOT_TOKEN`)
    pub bot_token: Option<SecretString>,

    /// Chat that receives finished archives and status messages
    pub delivery_chat: Option<i64>,

    /// Bot API base URL override, e.g. a self-hosted Bot API server
    pub api_base: Option<String>,
}

impl Config {
    /// Load configuration: env > config file > defaults
    ///
    /// # Errors
    ///
    /// Returns error if an environment override is malformed
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if an environment override is malformed
    pub fn from_sources(fc: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Data directory (~/.local/share/chatkeeper on Linux)
        let data_dir = env("CHATKEEPER_DATA_DIR")
            .or(fc.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        let work_dir = env("CHATKEEPER_WORK_DIR")
            .or(fc.export.work_dir)
            .map_or_else(|| data_dir.join("work"), PathBuf::from);

        let mut export = ExportConfig::with_work_dir(work_dir);

        if let Some(count) = parse_env::<u32>(&env, "CHATKEEPER_DEFAULT_COUNT")?.or(fc.export.default_count) {
            if count == 0 {
                return Err(Error::Config("default export count must be positive".to_string()));
            }
            export.default_count = count;
        }
        if let Some(secs) = fc.export.progress_interval_secs {
            export.progress_interval = Duration::from_secs(secs);
        }
        if let Some(flag) = parse_bool_env(&env, "CHATKEEPER_DELIVER_PARTIAL").or(fc.export.deliver_partial) {
            export.deliver_partial = flag;
        }
        if let Some(size) = fc.export.page_size {
            export.page_size = size.max(1);
        }
        if let Some(retries) = fc.export.page_retries {
            export.page_retry.max_retries = retries;
        }
        if let Some(every) = fc.export.collect_report_every {
            export.collect_report_every = every.max(1);
        }
        if let Some(every) = fc.export.media_report_every {
            export.media_report_every = every.max(1);
        }

        let telegram = TelegramConfig {
            bot_token: env("TELEGRAM_BOT_TOKEN")
                .or(fc.telegram.bot_token)
                .map(SecretString::from),
            delivery_chat: parse_env::<i64>(&env, "CHATKEEPER_DELIVERY_CHAT")?
                .or(fc.telegram.delivery_chat),
            api_base: env("TELEGRAM_API_BASE").or(fc.telegram.api_base),
        };

        Ok(Self {
            data_dir,
            export,
            telegram,
        })
    }

    /// Path of the `SQLite` store
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("chatkeeper.db")
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from(".chatkeeper"), |d| d.data_dir().join("chatkeeper"))
}

fn parse_env<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    env(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key}: cannot parse {raw:?}")))
        })
        .transpose()
}

fn parse_bool_env(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    env(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}
