//! Rate-limited status reporting for long-running exports

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::ProgressSurface;

/// Minimum spacing between non-terminal status edits
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(3);

const BAR_CELLS: usize = 10;

/// Throttles status edits to one per interval.
///
/// The first update and the terminal update always go through. Edit
/// failures are logged and dropped: a status line is never worth failing
/// the export over.
pub struct ProgressReporter {
    surface: Arc<dyn ProgressSurface>,
    interval: Duration,
    last_sent: Option<Instant>,
}

impl ProgressReporter {
    /// Create a reporter over `surface`
    #[must_use]
    pub fn new(surface: Arc<dyn ProgressSurface>, interval: Duration) -> Self {
        Self {
            surface,
            interval,
            last_sent: None,
        }
    }

    /// Send a non-terminal update unless throttled.
    ///
    /// Returns `true` when the edit was attempted.
    pub async fn update(&mut self, text: &str) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_sent
            && now.duration_since(last) < self.interval
        {
            return false;
        }

        self.last_sent = Some(now);
        self.send(text).await;
        true
    }

    /// Send the terminal update, bypassing the throttle
    pub async fn finish(&mut self, text: &str) {
        self.last_sent = Some(Instant::now());
        self.send(text).await;
    }

    async fn send(&self, text: &str) {
        if let Err(e) = self.surface.edit_status(text).await {
            tracing::debug!(error = %e, "status edit failed, ignoring");
        }
    }
}

/// Format a byte count with binary units (`1.50 KiB`). Zero renders empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_bytes(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    if size == 0 {
        return String::new();
    }
    if size < 1024 {
        return format!("{size} B");
    }

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.2} {}", UNITS[unit])
}

/// Ten-cell progress bar with percentage, e.g. `[■■■□□□□□□□] 30.0%`
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(current: usize, total: usize) -> String {
    let percentage = if total == 0 {
        100.0
    } else {
        (current.min(total) as f64 * 100.0) / total as f64
    };
    let filled = ((percentage / 10.0).floor() as usize).min(BAR_CELLS);

    format!(
        "[{}{}] {percentage:.1}%",
        "■".repeat(filled),
        "□".repeat(BAR_CELLS - filled)
    )
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::{Error, Result};

    #[derive(Default)]
    struct RecordingSurface {
        edits: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ProgressSurface for RecordingSurface {
        async fn edit_status(&self, text: &str) -> Result<()> {
            self.edits.lock().await.push(text.to_string());
            if self.fail {
                return Err(Error::Channel("edit rejected".to_string()));
            }
            Ok(())
        }
    }

    // -- throttling -----------------------------------------------------------

    #[tokio::test]
    async fn first_update_always_sent() {
        let surface = Arc::new(RecordingSurface::default());
        let mut reporter = ProgressReporter::new(surface.clone(), Duration::from_secs(3600));

        assert!(reporter.update("one").await);
        assert_eq!(*surface.edits.lock().await, vec!["one"]);
    }

    #[tokio::test]
    async fn updates_within_interval_are_dropped() {
        let surface = Arc::new(RecordingSurface::default());
        let mut reporter = ProgressReporter::new(surface.clone(), Duration::from_secs(3600));

        assert!(reporter.update("one").await);
        assert!(!reporter.update("two").await);
        assert!(!reporter.update("three").await);
        assert_eq!(surface.edits.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn terminal_update_bypasses_throttle() {
        let surface = Arc::new(RecordingSurface::default());
        let mut reporter = ProgressReporter::new(surface.clone(), Duration::from_secs(3600));

        reporter.update("start").await;
        reporter.finish("done").await;
        assert_eq!(*surface.edits.lock().await, vec!["start", "done"]);
    }

    #[tokio::test]
    async fn zero_interval_sends_everything() {
        let surface = Arc::new(RecordingSurface::default());
        let mut reporter = ProgressReporter::new(surface.clone(), Duration::ZERO);

        for i in 0..5 {
            assert!(reporter.update(&i.to_string()).await);
        }
        assert_eq!(surface.edits.lock().await.len(), 5);
    }

    #[tokio::test]
    async fn surface_failures_are_swallowed() {
        let surface = Arc::new(RecordingSurface {
            fail: true,
            ..RecordingSurface::default()
        });
        let mut reporter = ProgressReporter::new(surface.clone(), Duration::ZERO);

        assert!(reporter.update("x").await);
        reporter.finish("y").await;
        assert_eq!(surface.edits.lock().await.len(), 2);
    }

    // -- formatting -----------------------------------------------------------

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(0), "");
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KiB");
        assert_eq!(human_bytes(1536), "1.50 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.00 MiB");
    }

    #[test]
    fn progress_bar_fills_by_tenths() {
        assert_eq!(progress_bar(0, 10), "[□□□□□□□□□□] 0.0%");
        assert_eq!(progress_bar(3, 10), "[■■■□□□□□□□] 30.0%");
        assert_eq!(progress_bar(10, 10), "[■■■■■■■■■■] 100.0%");
    }

    #[test]
    fn progress_bar_handles_empty_total() {
        assert_eq!(progress_bar(0, 0), "[■■■■■■■■■■] 100.0%");
    }
}
