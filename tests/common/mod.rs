//! Shared test utilities

#![allow(dead_code)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chatkeeper::config::ExportConfig;
use chatkeeper::export::{
    CancellationRegistry, DeliverySink, HistoryMessage, MediaDescriptor, MediaKind, MessageSource,
    ProgressSurface, Sender,
};
use chatkeeper::retry::RetryPolicy;
use chatkeeper::sources::MemorySource;
use chatkeeper::{DbPool, Error, Result, db};
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{Mutex, Notify};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Export settings for tests: no throttling, no retry delays
#[must_use]
pub fn test_config(work_dir: &Path) -> ExportConfig {
    let mut config = ExportConfig::with_work_dir(work_dir.to_path_buf());
    config.progress_interval = Duration::ZERO;
    config.page_size = 5;
    config.page_retry = RetryPolicy::none();
    config
}

/// Midnight UTC on the given day of November 2024 plus `hours`
#[must_use]
pub fn nov(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, day, hour, 0, 0).unwrap()
}

/// A plain text message
#[must_use]
pub fn text_message(id: i64, timestamp: DateTime<Utc>) -> HistoryMessage {
    HistoryMessage {
        id,
        timestamp,
        sender: Some(Sender {
            id: if id % 2 == 0 { 1 } else { 2 },
            display_name: if id % 2 == 0 { "Me" } else { "Alice" }.to_string(),
        }),
        is_self_authored: id % 2 == 0,
        text: Some(format!("message {id}")),
        media: None,
    }
}

/// A message carrying an attachment stored at `file_ref`
#[must_use]
pub fn media_message(id: i64, timestamp: DateTime<Utc>, kind: MediaKind, file_ref: &str) -> HistoryMessage {
    HistoryMessage {
        media: Some(MediaDescriptor {
            kind,
            file_ref: file_ref.to_string(),
            file_name: None,
            size: None,
        }),
        text: None,
        ..text_message(id, timestamp)
    }
}

/// `count` messages one hour apart starting Nov 1 00:00, IDs from 1
#[must_use]
pub fn hourly_history(count: i64) -> Vec<HistoryMessage> {
    (0..count)
        .map(|i| text_message(i + 1, nov(1, 0) + chrono::Duration::hours(i)))
        .collect()
}

// -- delivery -----------------------------------------------------------------

/// A delivered archive captured in memory
#[derive(Debug, Clone)]
pub struct Delivery {
    pub file_name: String,
    pub caption: String,
    pub bytes: Vec<u8>,
}

impl Delivery {
    /// Names of every entry in the archive
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        let archive = zip::ZipArchive::new(std::io::Cursor::new(self.bytes.clone())).unwrap();
        archive.file_names().map(ToString::to_string).collect()
    }

    /// Contents of one archive entry as text
    #[must_use]
    pub fn read_entry(&self, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(self.bytes.clone())).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    /// Rendered transcript
    #[must_use]
    pub fn transcript(&self) -> String {
        self.read_entry("index.html")
    }
}

/// Sink that records what it was given
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<Delivery>>,
    fail: AtomicBool,
}

impl RecordingSink {
    /// Sink whose uploads always fail
    #[must_use]
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.fail.store(true, Ordering::SeqCst);
        sink
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn send_document(&self, file: &Path, caption: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Channel("upload rejected".to_string()));
        }
        let bytes = tokio::fs::read(file).await?;
        self.deliveries.lock().await.push(Delivery {
            file_name: file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            caption: caption.to_string(),
            bytes,
        });
        Ok(())
    }
}

// -- progress -----------------------------------------------------------------

/// Surface that records every status edit
#[derive(Default)]
pub struct RecordingSurface {
    texts: Mutex<Vec<String>>,
}

impl RecordingSurface {
    pub async fn texts(&self) -> Vec<String> {
        self.texts.lock().await.clone()
    }

    pub async fn last(&self) -> Option<String> {
        self.texts.lock().await.last().cloned()
    }
}

#[async_trait]
impl ProgressSurface for RecordingSurface {
    async fn edit_status(&self, text: &str) -> Result<()> {
        self.texts.lock().await.push(text.to_string());
        Ok(())
    }
}

// -- sources ------------------------------------------------------------------

/// Requests a stop for `chat_id` while serving page number `stop_on_page`
/// (zero-based). Stops only once.
pub struct StoppingSource {
    pub inner: MemorySource,
    pub registry: CancellationRegistry,
    pub chat_id: i64,
    pub stop_on_page: usize,
    pages: AtomicUsize,
    fired: AtomicBool,
}

impl StoppingSource {
    #[must_use]
    pub fn new(inner: MemorySource, registry: CancellationRegistry, chat_id: i64, stop_on_page: usize) -> Self {
        Self {
            inner,
            registry,
            chat_id,
            stop_on_page,
            pages: AtomicUsize::new(0),
            fired: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl MessageSource for StoppingSource {
    async fn history_page(
        &self,
        chat_id: i64,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>> {
        let page = self.pages.fetch_add(1, Ordering::SeqCst);
        if page == self.stop_on_page && !self.fired.swap(true, Ordering::SeqCst) {
            self.registry.request_stop(self.chat_id);
        }
        self.inner.history_page(chat_id, before, limit).await
    }

    async fn download_media(&self, message: &HistoryMessage, dest_dir: &Path) -> Result<PathBuf> {
        self.inner.download_media(message, dest_dir).await
    }
}

/// Holds every page request until `open` is called
pub struct GatedSource {
    pub inner: MemorySource,
    gate: Notify,
    open: AtomicBool,
}

impl GatedSource {
    #[must_use]
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            gate: Notify::new(),
            open: AtomicBool::new(false),
        }
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.gate.notify_waiters();
    }
}

#[async_trait]
impl MessageSource for GatedSource {
    async fn history_page(
        &self,
        chat_id: i64,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>> {
        while !self.open.load(Ordering::SeqCst) {
            let notified = self.gate.notified();
            if self.open.load(Ordering::SeqCst) {
                break;
            }
            // Re-check periodically in case the wakeup raced the registration
            let _ = tokio::time::timeout(Duration::from_millis(20), notified).await;
        }
        self.inner.history_page(chat_id, before, limit).await
    }

    async fn download_media(&self, message: &HistoryMessage, dest_dir: &Path) -> Result<PathBuf> {
        self.inner.download_media(message, dest_dir).await
    }
}

/// History that can never be read
pub struct UnreachableSource;

#[async_trait]
impl MessageSource for UnreachableSource {
    async fn history_page(
        &self,
        _chat_id: i64,
        _before: Option<i64>,
        _limit: usize,
    ) -> Result<Vec<HistoryMessage>> {
        Err(Error::Fetch("chat history unavailable".to_string()))
    }

    async fn download_media(&self, _message: &HistoryMessage, _dest_dir: &Path) -> Result<PathBuf> {
        Err(Error::Fetch("chat history unavailable".to_string()))
    }
}

/// Deletes the export's working directory from under it on the first media
/// fetch, so nothing can be written there afterwards
pub struct VanishingWorkdirSource {
    pub inner: MemorySource,
}

#[async_trait]
impl MessageSource for VanishingWorkdirSource {
    async fn history_page(
        &self,
        chat_id: i64,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>> {
        self.inner.history_page(chat_id, before, limit).await
    }

    async fn download_media(&self, _message: &HistoryMessage, dest_dir: &Path) -> Result<PathBuf> {
        if let Some(workdir) = dest_dir.parent() {
            tokio::fs::remove_dir_all(workdir).await?;
        }
        Err(Error::Fetch("storage went away".to_string()))
    }
}

/// Number of entries directly inside `dir` (0 if it does not exist)
#[must_use]
pub fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, Iterator::count)
}

/// Shorthand for building an `Arc<MemorySource>`
#[must_use]
pub fn memory(messages: Vec<HistoryMessage>) -> Arc<MemorySource> {
    Arc::new(MemorySource::new(messages))
}
