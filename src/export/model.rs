//! Data types flowing through the export pipeline

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SelectionBound;

/// Author of a history message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Platform user id
    pub id: i64,
    /// Display name shown in the transcript
    pub display_name: String,
}

/// Kind of attachment carried by a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    VideoNote,
    Voice,
    Audio,
    Document,
    Sticker,
    Animation,
    #[serde(other)]
    Other,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::VideoNote => "video_note",
            Self::Voice => "voice",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Sticker => "sticker",
            Self::Animation => "animation",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Attachment reference; `file_ref` is opaque to the engine and only
/// interpreted by the message source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    pub file_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Read-only snapshot of one message pulled from the message source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// Absent for deleted accounts and anonymous admins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    #[serde(default)]
    pub is_self_authored: bool,
    /// Message text or media caption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaDescriptor>,
}

/// Attachment copied into an export's working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedMedia {
    pub source_message_id: i64,
    /// Path relative to the working directory, always `/`-separated
    pub relative_path: String,
    pub file_name: String,
    pub kind: MediaKind,
}

/// Validated export parameters, fixed once admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub chat_id: i64,
    pub selection: SelectionBound,
    pub requested_at: DateTime<Utc>,
}

/// Lifecycle of an export job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Collecting,
    Rendering,
    Archiving,
    Done,
    Stopped,
    Failed,
}

impl JobStatus {
    /// Whether no further transition can happen
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collecting => "collecting",
            Self::Rendering => "rendering",
            Self::Archiving => "archiving",
            Self::Done => "done",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runtime state of one export
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub request: ExportRequest,
    pub status: JobStatus,
    pub collected_count: usize,
    pub working_dir: PathBuf,
}

impl ExportJob {
    /// Start a job in the `Collecting` state
    #[must_use]
    pub const fn new(request: ExportRequest, working_dir: PathBuf) -> Self {
        Self {
            request,
            status: JobStatus::Collecting,
            collected_count: 0,
            working_dir,
        }
    }

    /// Move to `next`, ignoring transitions out of a terminal state
    pub fn transition(&mut self, next: JobStatus) {
        if self.status.is_terminal() {
            tracing::warn!(
                chat_id = self.request.chat_id,
                from = %self.status,
                to = %next,
                "ignoring transition out of terminal state"
            );
            return;
        }
        tracing::debug!(
            chat_id = self.request.chat_id,
            from = %self.status,
            to = %next,
            "export status changed"
        );
        self.status = next;
    }
}

/// How a finished export ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Archive handed to the delivery sink
    Delivered { messages: usize, bytes: u64 },
    /// Nothing matched the selection bound
    NothingFound,
    /// Stop was requested; `partial_delivered` when a labelled partial
    /// archive was still handed off
    Stopped {
        collected: usize,
        partial_delivered: bool,
    },
    /// A pipeline stage failed
    Failed(String),
}

/// Final report of one export job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub chat_id: i64,
    pub status: JobStatus,
    pub outcome: ExportOutcome,
}
