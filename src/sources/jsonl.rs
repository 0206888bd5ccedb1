//! JSON-lines history dumps

use std::path::Path;

use super::MemorySource;
use crate::export::HistoryMessage;
use crate::{Error, Result};

/// Load a history dump with one `HistoryMessage` object per line.
///
/// Blank lines are skipped. Relative media references resolve against the
/// dump's directory.
///
/// # Errors
///
/// Returns error if the file cannot be read or a line is not a valid message
pub fn load_jsonl(path: &Path) -> Result<MemorySource> {
    let content = std::fs::read_to_string(path)?;

    let mut messages = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message: HistoryMessage = serde_json::from_str(line).map_err(|e| {
            Error::Fetch(format!("{}:{}: invalid message: {e}", path.display(), idx + 1))
        })?;
        messages.push(message);
    }

    tracing::info!(path = %path.display(), count = messages.len(), "loaded history dump");

    let root = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(MemorySource::new(messages).with_media_root(root))
}
