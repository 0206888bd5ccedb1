//! Chat export engine
//!
//! Walks a chat's history under a selection bound, fetches attachments,
//! renders an HTML transcript, zips it, and hands the archive to a delivery
//! sink. Exports are cancellable and at most one runs per chat.
//!
//! ```text
//! args ─► SelectionBound ─► registry admit ─► HistoryWalker ─► materialize + render
//!                                                                     │
//!            registry release ◄─ cleanup ◄─ deliver ◄─ package ◄──────┘
//! ```

pub mod archive;
mod engine;
pub mod media;
mod model;
mod progress;
mod registry;
pub mod render;
mod selection;
mod source;
pub mod walker;
pub mod workspace;

pub use engine::{ExportEngine, StartedExport, build_caption};
pub use model::{
    ExportJob, ExportOutcome, ExportReport, ExportRequest, HistoryMessage, JobStatus,
    MaterializedMedia, MediaDescriptor, MediaKind, Sender,
};
pub use progress::{DEFAULT_PROGRESS_INTERVAL, ProgressReporter, human_bytes, progress_bar};
pub use registry::{Admission, CancelToken, CancellationRegistry};
pub use selection::{DEFAULT_COUNT, SelectionBound, SelectionError};
pub use source::{DeliverySink, LogSurface, MessageSource, ProgressSurface};
pub use walker::{HistoryWalker, WalkStep};
