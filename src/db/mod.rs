//! Local store for agent settings, watched sources and the message log

mod message_log;
mod schema;
mod settings;
mod sources;

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::{Error, Result};

pub use message_log::{LoggedMessage, MessageDirection, MessageLogRepo};
pub use schema::SCHEMA_VERSION;
pub use settings::{DEST_CHANNEL_KEY, SettingsRepo};
pub use sources::{Source, SourceRepo};

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled database connection
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Open (creating if needed) the store at `path` and bring its schema up
/// to date
///
/// # Errors
///
/// Returns error if the file cannot be opened or migrated
pub fn init<P: AsRef<Path>>(path: P) -> Result<DbPool> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(path)
        .with_init(|c| c.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;"));
    let pool = build_pool(manager, 4)?;

    tracing::info!(path = %path.display(), version = SCHEMA_VERSION, "store opened");
    Ok(pool)
}

/// Private in-memory store; a single connection so every repo sees the
/// same data
///
/// # Errors
///
/// Returns error if the schema cannot be created
pub fn init_memory() -> Result<DbPool> {
    build_pool(SqliteConnectionManager::memory(), 1)
}

fn build_pool(manager: SqliteConnectionManager, max_size: u32) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;
    Ok(pool)
}
