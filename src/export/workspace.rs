//! Scoped filesystem resources owned by one export job
//!
//! The job removes both with `close`, off the runtime thread. Drop deletes
//! whatever `close` never reached, so a failure or an unwinding panic still
//! cleans up.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::Result;

/// Working directory removed on drop
#[derive(Debug)]
pub struct ScopedDir {
    path: PathBuf,
}

impl ScopedDir {
    /// Create `<root>/backup_<chat>_<unix-seconds>`, adding a numeric suffix
    /// if a leftover directory with that name still exists.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub async fn create(root: &Path, chat_id: i64, created_at: DateTime<Utc>) -> Result<Self> {
        tokio::fs::create_dir_all(root).await?;

        let base = format!("backup_{chat_id}_{}", created_at.timestamp());
        let mut candidate = root.join(&base);
        let mut suffix = 1u32;
        loop {
            match tokio::fs::create_dir(&candidate).await {
                Ok(()) => break,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    candidate = root.join(format!("{base}_{suffix}"));
                    suffix += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::debug!(path = %candidate.display(), "working directory created");
        Ok(Self { path: candidate })
    }

    /// Remove the directory without blocking the runtime. Drop only falls
    /// back to a synchronous removal when this was never reached.
    pub async fn close(mut self) {
        let path = std::mem::take(&mut self.path);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "working directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove working directory"
            ),
        }
    }

    /// Directory path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path for this directory's archive: `<dir>.zip`
    #[must_use]
    pub fn artifact_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "backup".to_string());
        self.path.with_file_name(format!("{name}.zip"))
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "working directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove working directory"
            ),
        }
    }
}

/// Single file removed on drop
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    /// Take ownership of `path`; it need not exist yet
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// File path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file without blocking the runtime
    pub async fn close(mut self) {
        let path = std::mem::take(&mut self.path);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "artifact removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact"),
        }
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "artifact removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove artifact"
            ),
        }
    }
}
