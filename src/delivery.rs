//! Local delivery sink
//!
//! Stand-in for a chat upload when exporting from the command line: the
//! archive is copied into an output directory next to a caption file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::export::DeliverySink;
use crate::{Error, Result};

/// Copies delivered archives into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    out_dir: PathBuf,
}

impl DirectorySink {
    /// Deliver into `out_dir`, created on first use
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Where archives land
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

#[async_trait]
impl DeliverySink for DirectorySink {
    async fn send_document(&self, file: &Path, caption: &str) -> Result<()> {
        let name = file
            .file_name()
            .ok_or_else(|| Error::Channel(format!("not a file: {}", file.display())))?;

        tokio::fs::create_dir_all(&self.out_dir).await?;
        let dest = self.out_dir.join(name);
        let bytes = tokio::fs::copy(file, &dest).await?;
        tokio::fs::write(dest.with_extension("txt"), caption).await?;

        tracing::info!(path = %dest.display(), bytes, "archive delivered");
        Ok(())
    }
}
