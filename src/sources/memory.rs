//! In-memory message source

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::export::{HistoryMessage, MessageSource};
use crate::{Error, Result};

/// Message source over a fixed set of messages for a single chat.
///
/// Media `file_ref`s are resolved against `media_root` when relative.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    /// Newest first
    messages: Vec<HistoryMessage>,
    media_root: Option<PathBuf>,
}

impl MemorySource {
    /// Create a source; messages may be given in any order.
    ///
    /// IDs are the paging cursor, so of several messages sharing an ID only
    /// the newest is kept.
    #[must_use]
    pub fn new(mut messages: Vec<HistoryMessage>) -> Self {
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        let before = messages.len();
        let mut ids = HashSet::with_capacity(before);
        messages.retain(|m| ids.insert(m.id));
        if messages.len() < before {
            tracing::warn!(dropped = before - messages.len(), "history contains repeated message IDs");
        }

        Self {
            messages,
            media_root: None,
        }
    }

    /// Resolve relative media references against `root`
    #[must_use]
    pub fn with_media_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.media_root = Some(root.into());
        self
    }

    /// Number of messages held
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the source holds no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages held, newest first
    #[must_use]
    pub fn messages(&self) -> &[HistoryMessage] {
        &self.messages
    }

    fn resolve(&self, file_ref: &str) -> PathBuf {
        let path = Path::new(file_ref);
        match &self.media_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn history_page(
        &self,
        _chat_id: i64,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>> {
        let start = match before {
            None => 0,
            Some(id) => match self.messages.iter().position(|m| m.id == id) {
                Some(pos) => pos + 1,
                None => return Ok(Vec::new()),
            },
        };

        Ok(self
            .messages
            .iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn download_media(&self, message: &HistoryMessage, dest_dir: &Path) -> Result<PathBuf> {
        let media = message
            .media
            .as_ref()
            .ok_or_else(|| Error::Fetch(format!("message {} has no media", message.id)))?;

        let src = self.resolve(&media.file_ref);
        let name = media
            .file_name
            .clone()
            .or_else(|| src.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| format!("{}.bin", media.kind));
        let dest = dest_dir.join(format!("{}_{}", message.id, sanitize_file_name(&name)));

        tokio::fs::copy(&src, &dest).await.map_err(|e| {
            Error::Fetch(format!("media for message {} ({}): {e}", message.id, src.display()))
        })?;

        Ok(dest)
    }
}

/// Replace path separators and control characters in a file name
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
