//! Collaborator contracts consumed by the export engine

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::HistoryMessage;
use crate::Result;

/// Reverse-chronological message history provider
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch up to `limit` messages strictly older than `before`
    /// (or the newest messages when `before` is `None`), newest first.
    ///
    /// An empty page means the history is exhausted.
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot be fetched
    async fn history_page(
        &self,
        chat_id: i64,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>>;

    /// Download a message's attachment into `dest_dir`, returning the
    /// created file's path
    ///
    /// # Errors
    ///
    /// Returns error if the message has no media or the download fails
    async fn download_media(&self, message: &HistoryMessage, dest_dir: &Path) -> Result<PathBuf>;
}

/// Destination for finished archives
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Hand off `file` with a caption
    ///
    /// # Errors
    ///
    /// Returns error if the upload fails
    async fn send_document(&self, file: &Path, caption: &str) -> Result<()>;
}

/// Editable status line shown to the user
#[async_trait]
pub trait ProgressSurface: Send + Sync {
    /// Replace the status text
    ///
    /// # Errors
    ///
    /// Returns error if the edit fails; callers treat this as best-effort
    async fn edit_status(&self, text: &str) -> Result<()>;
}

/// Progress surface that writes status lines to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSurface;

#[async_trait]
impl ProgressSurface for LogSurface {
    async fn edit_status(&self, text: &str) -> Result<()> {
        tracing::info!(status = text, "export progress");
        Ok(())
    }
}
