//! Append-only message log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DbPool;
use crate::{Error, Result};

/// Whether a logged message was received or sent by the account owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Incoming,
    Outgoing,
}

impl MessageDirection {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

/// A message log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMessage {
    pub date: DateTime<Utc>,
    pub chat_id: i64,
    /// 0 when the sender is unknown
    pub sender_id: i64,
    pub text: String,
    pub direction: MessageDirection,
}

/// Repository for the message log
#[derive(Debug, Clone)]
pub struct MessageLogRepo {
    pool: DbPool,
}

impl MessageLogRepo {
    /// Create a new repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append an entry
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn log(&self, entry: &LoggedMessage) -> Result<()> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO messages (date, chat_id, sender_id, text, direction)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                entry.date.to_rfc3339(),
                entry.chat_id,
                entry.sender_id,
                entry.text,
                entry.direction.as_str(),
            ],
        )?;

        Ok(())
    }

    /// Total number of logged messages
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn count(&self) -> Result<u64> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Number of logged messages for one chat
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn count_for_chat(&self, chat_id: i64) -> Result<u64> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE chat_id = ?1",
            [chat_id],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
