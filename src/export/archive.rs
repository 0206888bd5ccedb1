//! Archive packager: writes the transcript and zips the working directory

use std::path::Path;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use super::render::TRANSCRIPT_FILE;
use super::workspace::{ScopedDir, ScopedFile};
use crate::{Error, Result};

/// Write the rendered transcript into the working directory
///
/// # Errors
///
/// Returns `Error::Archive` if the file cannot be written
pub async fn write_transcript(dir: &Path, html: &str) -> Result<()> {
    let path = dir.join(TRANSCRIPT_FILE);
    tokio::fs::write(&path, html)
        .await
        .map_err(|e| Error::Archive(format!("write {}: {e}", path.display())))
}

/// Compress the working directory into `<dir>.zip`.
///
/// The returned guard deletes the archive when dropped; a partially written
/// archive is removed if compression fails.
///
/// # Errors
///
/// Returns `Error::Archive` if the directory cannot be read or compressed
pub async fn package(dir: &ScopedDir) -> Result<ScopedFile> {
    let artifact = ScopedFile::new(dir.artifact_path());
    let source = dir.path().to_path_buf();
    let destination = artifact.path().to_path_buf();

    tokio::task::spawn_blocking(move || zip_directory(&source, &destination))
        .await
        .map_err(|e| Error::Archive(format!("archive task failed: {e}")))?
        .map_err(|e| Error::Archive(e.to_string()))?;

    tracing::debug!(path = %artifact.path().display(), "archive written");
    Ok(artifact)
}

/// Create a deterministic ZIP of `source_dir` at `destination`.
///
/// Entries are sorted and stored with `/`-separated relative paths.
fn zip_directory(source_dir: &Path, destination: &Path) -> Result<()> {
    let file = std::fs::File::create(destination)?;
    let mut zip = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Archive(format!("walk {}: {e}", source_dir.display())))?;
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| Error::Archive(e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
        } else {
            zip.start_file(name, options)?;
            let mut f = std::fs::File::open(entry.path())?;
            std::io::copy(&mut f, &mut zip)?;
        }
    }

    zip.finish()?;
    Ok(())
}
