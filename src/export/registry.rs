//! Process-wide registry of in-flight exports
//!
//! Membership doubles as the stop signal: an export keeps running while its
//! conversation is present, and removing the entry (by a stop request or by
//! the job's own cleanup) is how cancellation is observed.
//!
//! Each admission is stamped with a generation so that a job which was
//! stopped and then superseded by a fresh admission for the same chat still
//! sees itself as cancelled, and its late cleanup cannot evict the newcomer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    active: Mutex<HashMap<i64, u64>>,
    next_generation: AtomicU64,
}

/// Shared set of conversations with an export in flight
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    inner: Arc<Inner>,
}

impl CancellationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit an export for `chat_id` unless one is already running.
    ///
    /// The returned guard releases the slot when dropped.
    #[must_use]
    pub fn try_admit(&self, chat_id: i64) -> Option<Admission> {
        let mut map = self.lock();
        if map.contains_key(&chat_id) {
            return None;
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        map.insert(chat_id, generation);
        drop(map);

        tracing::debug!(chat_id, generation, "export admitted");
        Some(Admission {
            token: CancelToken {
                registry: self.clone(),
                chat_id,
                generation,
            },
        })
    }

    /// Whether an export is currently registered for `chat_id`
    #[must_use]
    pub fn is_running(&self, chat_id: i64) -> bool {
        self.lock().contains_key(&chat_id)
    }

    /// Stop signal as seen by callers holding only the chat id
    #[must_use]
    pub fn is_cancelled(&self, chat_id: i64) -> bool {
        !self.is_running(chat_id)
    }

    /// Remove `chat_id` unconditionally. Idempotent.
    pub fn release(&self, chat_id: i64) {
        self.lock().remove(&chat_id);
    }

    /// Request that the export for `chat_id` stop.
    ///
    /// Returns `false` when nothing was running.
    pub fn request_stop(&self, chat_id: i64) -> bool {
        let removed = self.lock().remove(&chat_id).is_some();
        if removed {
            tracing::info!(chat_id, "export stop requested");
        }
        removed
    }

    /// Number of exports in flight
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no export is in flight
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn holds(&self, chat_id: i64, generation: u64) -> bool {
        self.lock().get(&chat_id) == Some(&generation)
    }

    fn release_generation(&self, chat_id: i64, generation: u64) {
        let mut map = self.lock();
        if map.get(&chat_id) == Some(&generation) {
            map.remove(&chat_id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, u64>> {
        self.inner.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Stop signal handed to each pipeline stage of one export
#[derive(Debug, Clone)]
pub struct CancelToken {
    registry: CancellationRegistry,
    chat_id: i64,
    generation: u64,
}

impl CancelToken {
    /// Conversation this token belongs to
    #[must_use]
    pub const fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// True once the export's registry entry is gone or was replaced
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        !self.registry.holds(self.chat_id, self.generation)
    }
}

/// Registry slot held for the lifetime of one export job
#[derive(Debug)]
pub struct Admission {
    token: CancelToken,
}

impl Admission {
    /// Token to thread through the pipeline
    #[must_use]
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.token
            .registry
            .release_generation(self.token.chat_id, self.token.generation);
        tracing::debug!(chat_id = self.token.chat_id, "export slot released");
    }
}
