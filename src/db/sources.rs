//! Watched source channels repository

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::DbPool;
use crate::{Error, Result};

/// A channel whose posts are forwarded to the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub chat_id: i64,
    pub title: String,
}

/// Repository for watched sources
#[derive(Debug, Clone)]
pub struct SourceRepo {
    pool: DbPool,
}

impl SourceRepo {
    /// Create a new repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add a source, updating its title if already present
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn add(&self, chat_id: i64, title: &str) -> Result<()> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO sources (chat_id, title) VALUES (?1, ?2)
             ON CONFLICT(chat_id) DO UPDATE SET title = excluded.title",
            rusqlite::params![chat_id, title],
        )?;

        tracing::info!(chat_id, title, "source added");
        Ok(())
    }

    /// Remove a source
    ///
    /// Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn remove(&self, chat_id: i64) -> Result<bool> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let removed = conn.execute("DELETE FROM sources WHERE chat_id = ?1", [chat_id])?;
        Ok(removed > 0)
    }

    /// List sources in the order they were added
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self) -> Result<Vec<Source>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare("SELECT chat_id, title FROM sources ORDER BY added_at, chat_id")?;
        let sources = stmt
            .query_map([], |row| {
                Ok(Source {
                    chat_id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sources)
    }

    /// IDs of every watched source
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn ids(&self) -> Result<HashSet<i64>> {
        Ok(self.list()?.into_iter().map(|s| s.chat_id).collect())
    }
}
