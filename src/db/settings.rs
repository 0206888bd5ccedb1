//! Key/value settings repository

use rusqlite::OptionalExtension;

use super::DbPool;
use crate::{Error, Result};

/// Setting holding the forwarding destination chat ID, or "off"
pub const DEST_CHANNEL_KEY: &str = "dest_channel";

/// Repository for agent settings
#[derive(Debug, Clone)]
pub struct SettingsRepo {
    pool: DbPool,
}

impl SettingsRepo {
    /// Create a new repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a setting value
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let value = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(value)
    }

    /// Set a setting value, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;

        tracing::debug!(key, value, "setting updated");
        Ok(())
    }

    /// Forwarding destination, `None` when unset or switched off
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails or the stored value is not
    /// a chat ID
    pub fn dest_channel(&self) -> Result<Option<i64>> {
        match self.get(DEST_CHANNEL_KEY)? {
            None => Ok(None),
            Some(v) if v.eq_ignore_ascii_case("off") => Ok(None),
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| Error::Config(format!("invalid {DEST_CHANNEL_KEY} setting: {v}"))),
        }
    }

    /// Set the forwarding destination, `None` switches forwarding off
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn set_dest_channel(&self, chat_id: Option<i64>) -> Result<()> {
        let value = chat_id.map_or_else(|| "off".to_string(), |id| id.to_string());
        self.set(DEST_CHANNEL_KEY, &value)
    }
}
