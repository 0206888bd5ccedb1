//! Export engine: admission, the job pipeline, and guaranteed cleanup

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;

use super::archive::{package, write_transcript};
use super::media::materialize;
use super::render::TranscriptBuilder;
use super::walker::{HistoryWalker, WalkStep};
use super::workspace::ScopedDir;
use super::{
    Admission, CancelToken, CancellationRegistry, DeliverySink, ExportJob, ExportOutcome,
    ExportReport, ExportRequest, HistoryMessage, JobStatus, MessageSource, ProgressReporter,
    ProgressSurface, SelectionBound, human_bytes, progress_bar,
};
use crate::config::ExportConfig;
use crate::{Error, Result};

/// An admitted export running in the background
#[derive(Debug)]
pub struct StartedExport {
    pub request: ExportRequest,
    pub handle: JoinHandle<ExportReport>,
}

/// Chat export engine.
///
/// Cheap to clone; clones share the same registry and collaborators.
#[derive(Clone)]
pub struct ExportEngine {
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn DeliverySink>,
    registry: CancellationRegistry,
    config: Arc<ExportConfig>,
}

impl ExportEngine {
    /// Create an engine with its own registry
    #[must_use]
    pub fn new(
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn DeliverySink>,
        config: ExportConfig,
    ) -> Self {
        Self::with_registry(source, sink, config, CancellationRegistry::new())
    }

    /// Create an engine sharing an existing registry
    #[must_use]
    pub fn with_registry(
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn DeliverySink>,
        config: ExportConfig,
        registry: CancellationRegistry,
    ) -> Self {
        Self {
            source,
            sink,
            registry,
            config: Arc::new(config),
        }
    }

    /// Registry of in-flight exports
    #[must_use]
    pub const fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    /// Validate `raw_args`, admit the export, and spawn it.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad argument and
    /// `Error::AlreadyRunning` when the chat already has an export in flight.
    /// In both cases no state is created.
    pub fn start_export(
        &self,
        chat_id: i64,
        raw_args: Option<&str>,
        surface: Arc<dyn ProgressSurface>,
    ) -> Result<StartedExport> {
        let selection = SelectionBound::parse(raw_args, self.config.default_count)?;
        let admission = self
            .registry
            .try_admit(chat_id)
            .ok_or(Error::AlreadyRunning(chat_id))?;

        let request = ExportRequest {
            chat_id,
            selection,
            requested_at: Utc::now(),
        };
        tracing::info!(
            chat_id,
            selection = %selection,
            in_flight = self.registry.len(),
            "export started"
        );

        let engine = self.clone();
        let handle = tokio::spawn(async move { engine.run(request, admission, surface).await });

        Ok(StartedExport { request, handle })
    }

    /// Ask the export for `chat_id` to stop.
    ///
    /// Returns `false` when nothing was running.
    pub fn request_stop(&self, chat_id: i64) -> bool {
        self.registry.request_stop(chat_id)
    }

    /// Run an admitted export to completion.
    ///
    /// The working directory, the archive and the registry slot are all
    /// released before this returns, whatever the outcome.
    pub async fn run(
        &self,
        request: ExportRequest,
        admission: Admission,
        surface: Arc<dyn ProgressSurface>,
    ) -> ExportReport {
        let chat_id = request.chat_id;
        let token = admission.token();
        let mut reporter = ProgressReporter::new(surface, self.config.progress_interval);

        reporter
            .update(&format!("⏳ Backup started... ({})", request.selection))
            .await;

        let workspace = ScopedDir::create(&self.config.work_dir, chat_id, request.requested_at).await;
        let (status, outcome) = match workspace {
            Ok(dir) => {
                let mut job = ExportJob::new(request, dir.path().to_path_buf());
                let outcome = match self.pipeline(&mut job, &dir, &token, &mut reporter).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(chat_id, status = %job.status, error = %e, "export failed");
                        job.transition(JobStatus::Failed);
                        ExportOutcome::Failed(e.to_string())
                    }
                };
                dir.close().await;
                (job.status, outcome)
            }
            Err(e) => {
                tracing::error!(chat_id, error = %e, "cannot create working directory");
                (JobStatus::Failed, ExportOutcome::Failed(e.to_string()))
            }
        };

        drop(admission);
        reporter.finish(&terminal_text(&outcome)).await;
        tracing::info!(chat_id, %status, ?outcome, "export finished");

        ExportReport {
            chat_id,
            status,
            outcome,
        }
    }

    async fn pipeline(
        &self,
        job: &mut ExportJob,
        dir: &ScopedDir,
        token: &CancelToken,
        reporter: &mut ProgressReporter,
    ) -> Result<ExportOutcome> {
        let chat_id = job.request.chat_id;

        // -- collecting -------------------------------------------------------
        let (mut messages, mut stopped) = self.collect(job, token, reporter).await?;

        if messages.is_empty() {
            if stopped {
                job.transition(JobStatus::Stopped);
                return Ok(ExportOutcome::Stopped {
                    collected: 0,
                    partial_delivered: false,
                });
            }
            job.transition(JobStatus::Done);
            return Ok(ExportOutcome::NothingFound);
        }
        if stopped && !self.config.deliver_partial {
            job.transition(JobStatus::Stopped);
            return Ok(ExportOutcome::Stopped {
                collected: messages.len(),
                partial_delivered: false,
            });
        }

        // Source delivers newest first; the transcript reads oldest first
        messages.reverse();

        // -- rendering --------------------------------------------------------
        job.transition(JobStatus::Rendering);
        let total = messages.len();
        let mut builder = TranscriptBuilder::new(&format!("Chat {chat_id}"));

        for (i, message) in messages.iter().enumerate() {
            if !stopped && token.is_cancelled() {
                if !self.config.deliver_partial {
                    job.transition(JobStatus::Stopped);
                    return Ok(ExportOutcome::Stopped {
                        collected: total,
                        partial_delivered: false,
                    });
                }
                stopped = true;
            }

            if i % self.config.media_report_every.max(1) == 0 {
                reporter
                    .update(&format!("⏳ Fetching media: {i}/{total}\n{}", progress_bar(i, total)))
                    .await;
            }

            // Once stopped, remaining messages are rendered without fetching media
            let media = if stopped || message.media.is_none() {
                None
            } else {
                materialize(self.source.as_ref(), message, dir.path()).await
            };
            builder.push(message, media.as_ref());
        }

        debug_assert_eq!(builder.blocks(), total);
        let html = builder.finish();

        // -- archiving --------------------------------------------------------
        if !stopped && token.is_cancelled() {
            if !self.config.deliver_partial {
                job.transition(JobStatus::Stopped);
                return Ok(ExportOutcome::Stopped {
                    collected: total,
                    partial_delivered: false,
                });
            }
            stopped = true;
        }

        job.transition(JobStatus::Archiving);
        reporter.update("🗜 Archiving...").await;
        write_transcript(dir.path(), &html).await?;
        let artifact = package(dir).await?;
        let bytes = tokio::fs::metadata(artifact.path())
            .await
            .map(|m| m.len())
            .unwrap_or_default();

        let caption = build_caption(&job.request, total, bytes, stopped);
        reporter.update("📤 Sending...").await;
        self.sink
            .send_document(artifact.path(), &caption)
            .await
            .map_err(|e| Error::Channel(format!("archive delivery failed: {e}")))?;
        artifact.close().await;

        if stopped {
            job.transition(JobStatus::Stopped);
            Ok(ExportOutcome::Stopped {
                collected: total,
                partial_delivered: true,
            })
        } else {
            job.transition(JobStatus::Done);
            Ok(ExportOutcome::Delivered {
                messages: total,
                bytes,
            })
        }
    }

    /// Walk the history; returns messages newest first and whether a stop
    /// was observed
    async fn collect(
        &self,
        job: &mut ExportJob,
        token: &CancelToken,
        reporter: &mut ProgressReporter,
    ) -> Result<(Vec<HistoryMessage>, bool)> {
        let mut walker = HistoryWalker::new(self.source.as_ref(), job.request.selection, token.clone())
            .with_page_size(self.config.page_size)
            .with_retry(self.config.page_retry.clone());

        let mut messages = Vec::new();
        loop {
            match walker.next_step().await? {
                WalkStep::Accepted(message) => {
                    messages.push(message);
                    job.collected_count = messages.len();
                    if messages.len() % self.config.collect_report_every.max(1) == 0 {
                        reporter
                            .update(&format!("⏳ Collecting: {} messages...", messages.len()))
                            .await;
                    }
                }
                WalkStep::Finished => return Ok((messages, false)),
                WalkStep::Stopped => {
                    tracing::info!(
                        chat_id = job.request.chat_id,
                        collected = messages.len(),
                        "stop observed while collecting"
                    );
                    return Ok((messages, true));
                }
            }
        }
    }
}

/// Caption attached to a delivered archive
#[must_use]
pub fn build_caption(request: &ExportRequest, messages: usize, bytes: u64, stopped: bool) -> String {
    let prefix = if stopped { "(STOPPED) " } else { "" };
    let mut caption = format!(
        "{prefix}📦 Backup: {}\n📊 {messages} messages\n🎯 {}",
        request.chat_id, request.selection
    );
    if bytes > 0 {
        caption.push_str(&format!("\n💾 {}", human_bytes(bytes)));
    }
    caption
}

fn terminal_text(outcome: &ExportOutcome) -> String {
    match outcome {
        ExportOutcome::Delivered { messages, .. } => format!("✅ Backup sent: {messages} messages"),
        ExportOutcome::NothingFound => "❌ No messages found.".to_string(),
        ExportOutcome::Stopped {
            partial_delivered: true,
            collected,
        } => format!("🛑 Stopped. Partial backup sent: {collected} messages"),
        ExportOutcome::Stopped { .. } => "🛑 Stopped.".to_string(),
        ExportOutcome::Failed(e) => format!("❌ Backup failed: {e}"),
    }
}
