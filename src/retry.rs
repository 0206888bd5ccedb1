//! Bounded retries for history page fetches and archive uploads

use std::future::Future;
use std::time::{Duration, SystemTime};

/// How often, and how patiently, a failed network operation is retried
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each one after
    pub base_delay: Duration,
    /// Upper bound for any single delay, including server hints
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait before retry number `attempt` (zero-based).
    ///
    /// A server-supplied `hint` replaces the computed backoff. Computed
    /// delays get up to 25% jitter so parallel exports don't retry in step.
    #[must_use]
    pub fn backoff(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint.min(self.max_delay);
        }

        let doubled = self
            .base_delay
            .saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
            .min(self.max_delay);
        (doubled + doubled.mul_f64(jitter_fraction())).min(self.max_delay)
    }

    /// Run `op` until it succeeds or the retries are used up, returning the
    /// last error. `label` names the operation in logs.
    ///
    /// # Errors
    ///
    /// Returns the final attempt's error
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => e.to_string(),
            };

            let delay = self.backoff(attempt, None);
            attempt += 1;
            tracing::warn!(
                operation = label,
                attempt,
                max_retries = self.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "operation failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// 0.0..0.25 taken from the clock's sub-second nanos
fn jitter_fraction() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 250) / 1000.0
}

/// Whether a failed HTTP exchange is worth repeating: rate limiting,
/// server-side failures, or a network error echoed in the body
#[must_use]
pub fn is_transient(status: u16, body: &str) -> bool {
    if status == 429 || (500..=599).contains(&status) {
        return true;
    }
    let body = body.to_ascii_lowercase();
    ["connection reset", "timed out", "dns error"]
        .iter()
        .any(|needle| body.contains(needle))
}

/// Wait requested by a Bot API error body (`parameters.retry_after`)
#[must_use]
pub fn retry_after_hint(body: &str) -> Option<Duration> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/parameters/retry_after")?
        .as_u64()
        .map(Duration::from_secs)
}
