//! Chatkeeper - personal messaging agent with cancellable chat exports
//!
//! The centrepiece is the export engine: it walks a chat's history under a
//! count or date-range bound, downloads attachments, renders a
//! self-contained HTML transcript, zips it, and delivers the archive.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  CLI / Telegram                      │
//! │   export  │  stop (Ctrl-C)  │  sources  │  stats     │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │                 Export engine                        │
//! │  selection │ registry │ walker │ render │ archive    │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │   MessageSource  │  DeliverySink  │  ProgressSurface │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod config;
pub mod db;
pub mod delivery;
pub mod error;
pub mod export;
pub mod retry;
pub mod sources;

pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
pub use export::{
    CancellationRegistry, ExportEngine, ExportOutcome, ExportReport, JobStatus, SelectionBound,
};
