//! Media materializer: fetches attachments into the export's working directory

use std::path::Path;

use super::render::escape_html;
use super::{HistoryMessage, MaterializedMedia, MediaKind, MessageSource};

/// Subdirectory of the working directory that holds attachments
pub const MEDIA_DIR: &str = "media";

/// How an attachment is embedded in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Embed {
    Image,
    Video,
    Audio,
    Link,
}

impl Embed {
    /// Embed strategy for a media kind; anything unrecognised is a link
    #[must_use]
    pub const fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Photo => Self::Image,
            MediaKind::Video | MediaKind::VideoNote => Self::Video,
            MediaKind::Voice | MediaKind::Audio => Self::Audio,
            MediaKind::Document
            | MediaKind::Sticker
            | MediaKind::Animation
            | MediaKind::Other => Self::Link,
        }
    }
}

/// Fetch a message's attachment into `<working_dir>/media`.
///
/// Returns `None` when the message has no media or the fetch fails; a
/// single bad attachment never aborts the export.
pub async fn materialize(
    source: &dyn MessageSource,
    message: &HistoryMessage,
    working_dir: &Path,
) -> Option<MaterializedMedia> {
    let media = message.media.as_ref()?;
    let media_dir = working_dir.join(MEDIA_DIR);

    if let Err(e) = tokio::fs::create_dir_all(&media_dir).await {
        tracing::warn!(error = %e, dir = %media_dir.display(), "cannot create media directory");
        return None;
    }

    let path = match source.download_media(message, &media_dir).await {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(
                message_id = message.id,
                kind = %media.kind,
                error = %e,
                "media fetch failed, exporting message without it"
            );
            return None;
        }
    };

    // Sources may only write directly inside the media directory
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    if path.parent() != Some(media_dir.as_path()) {
        tracing::warn!(
            message_id = message.id,
            path = %path.display(),
            "media written outside the media directory, skipping"
        );
        return None;
    }

    Some(MaterializedMedia {
        source_message_id: message.id,
        relative_path: format!("{MEDIA_DIR}/{file_name}"),
        file_name,
        kind: media.kind,
    })
}

/// HTML snippet embedding a materialized attachment
#[must_use]
pub fn embed_html(media: &MaterializedMedia) -> String {
    let src = escape_html(&media.relative_path);
    match Embed::for_kind(media.kind) {
        Embed::Image => format!(r#"<a href="{src}"><img src="{src}"></a>"#),
        Embed::Video => format!(r#"<video controls><source src="{src}"></video>"#),
        Embed::Audio => format!(r#"<audio controls><source src="{src}"></audio>"#),
        Embed::Link => format!(
            r#"<a href="{src}">📎 {}</a>"#,
            escape_html(&media.file_name)
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::export::MediaDescriptor;
    use crate::sources::MemorySource;

    fn media(kind: MediaKind, name: &str) -> MaterializedMedia {
        MaterializedMedia {
            source_message_id: 1,
            relative_path: format!("media/{name}"),
            file_name: name.to_string(),
            kind,
        }
    }

    fn with_media(id: i64, file_ref: &str, kind: MediaKind) -> HistoryMessage {
        HistoryMessage {
            id,
            timestamp: Utc::now(),
            sender: None,
            is_self_authored: false,
            text: None,
            media: Some(MediaDescriptor {
                kind,
                file_ref: file_ref.to_string(),
                file_name: None,
                size: None,
            }),
        }
    }

    #[test]
    fn classification_is_total() {
        assert_eq!(Embed::for_kind(MediaKind::Photo), Embed::Image);
        assert_eq!(Embed::for_kind(MediaKind::Video), Embed::Video);
        assert_eq!(Embed::for_kind(MediaKind::VideoNote), Embed::Video);
        assert_eq!(Embed::for_kind(MediaKind::Voice), Embed::Audio);
        assert_eq!(Embed::for_kind(MediaKind::Audio), Embed::Audio);
        assert_eq!(Embed::for_kind(MediaKind::Document), Embed::Link);
        assert_eq!(Embed::for_kind(MediaKind::Other), Embed::Link);
    }

    #[test]
    fn embeds_by_kind() {
        assert_eq!(
            embed_html(&media(MediaKind::Photo, "1_a.jpg")),
            r#"<a href="media/1_a.jpg"><img src="media/1_a.jpg"></a>"#
        );
        assert!(embed_html(&media(MediaKind::VideoNote, "v.mp4")).starts_with("<video controls>"));
        assert!(embed_html(&media(MediaKind::Voice, "v.ogg")).starts_with("<audio controls>"));
        assert_eq!(
            embed_html(&media(MediaKind::Document, "a&b.pdf")),
            r#"<a href="media/a&amp;b.pdf">📎 a&amp;b.pdf</a>"#
        );
    }

    #[tokio::test]
    async fn materializes_into_media_dir() {
        let root = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("clip.mp4"), b"mp4").unwrap();

        let msg = with_media(3, "clip.mp4", MediaKind::Video);
        let source = MemorySource::new(vec![msg.clone()]).with_media_root(root.path());

        let materialized = materialize(&source, &msg, work.path()).await.unwrap();
        assert_eq!(materialized.relative_path, "media/3_clip.mp4");
        assert_eq!(materialized.kind, MediaKind::Video);
        assert!(work.path().join(&materialized.relative_path).is_file());
    }

    #[tokio::test]
    async fn failed_fetch_yields_none() {
        let work = tempfile::tempdir().unwrap();
        let msg = with_media(4, "/does/not/exist.ogg", MediaKind::Voice);
        let source = MemorySource::new(vec![msg.clone()]);

        assert!(materialize(&source, &msg, work.path()).await.is_none());
    }

    #[tokio::test]
    async fn message_without_media_yields_none() {
        let work = tempfile::tempdir().unwrap();
        let mut msg = with_media(5, "x", MediaKind::Photo);
        msg.media = None;
        let source = MemorySource::new(vec![msg.clone()]);

        assert!(materialize(&source, &msg, work.path()).await.is_none());
    }
}
