//! History walker: pages backwards through a chat under a selection bound

use std::collections::{HashSet, VecDeque};

use super::{CancelToken, HistoryMessage, MessageSource, SelectionBound};
use crate::retry::RetryPolicy;
use crate::{Error, Result};

/// Default number of messages requested per history page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Result of one walker step
#[derive(Debug)]
pub enum WalkStep {
    /// A message that satisfies the bound
    Accepted(HistoryMessage),
    /// The bound is satisfied or the history is exhausted
    Finished,
    /// Cancellation was observed
    Stopped,
}

/// Lazy, non-restartable walk over one chat's history, newest first
pub struct HistoryWalker<'a> {
    source: &'a dyn MessageSource,
    chat_id: i64,
    bound: SelectionBound,
    token: CancelToken,
    page_size: usize,
    retry: RetryPolicy,
    buffer: VecDeque<HistoryMessage>,
    cursor: Option<i64>,
    /// IDs already pulled; a source replaying them cannot extend the walk
    seen: HashSet<i64>,
    exhausted: bool,
    accepted: usize,
    finished: bool,
}

impl<'a> HistoryWalker<'a> {
    /// Create a walker for `token.chat_id()`
    #[must_use]
    pub fn new(source: &'a dyn MessageSource, bound: SelectionBound, token: CancelToken) -> Self {
        Self {
            source,
            chat_id: token.chat_id(),
            bound,
            token,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            buffer: VecDeque::new(),
            cursor: None,
            seen: HashSet::new(),
            exhausted: false,
            accepted: 0,
            finished: false,
        }
    }

    /// Override the page size requested from the source
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Override how failed page fetches are retried
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Number of messages accepted so far
    #[must_use]
    pub const fn accepted(&self) -> usize {
        self.accepted
    }

    /// Advance to the next accepted message.
    ///
    /// Date-range walks skip messages newer than the end and finish at the
    /// first message older than the start. Cancellation is checked before
    /// every pull, so a stop lands at most one message after it was requested.
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` once a page fails beyond the retry budget
    pub async fn next_step(&mut self) -> Result<WalkStep> {
        if self.finished {
            return Ok(WalkStep::Finished);
        }

        loop {
            if let SelectionBound::Count(n) = self.bound
                && self.accepted >= n as usize
            {
                self.finished = true;
                return Ok(WalkStep::Finished);
            }

            if self.token.is_cancelled() {
                self.finished = true;
                return Ok(WalkStep::Stopped);
            }

            let Some(message) = self.pull().await? else {
                self.finished = true;
                return Ok(WalkStep::Finished);
            };

            if let SelectionBound::DateRange { start, end } = self.bound {
                if message.timestamp > end {
                    continue;
                }
                if message.timestamp < start {
                    self.finished = true;
                    return Ok(WalkStep::Finished);
                }
            }

            self.accepted += 1;
            return Ok(WalkStep::Accepted(message));
        }
    }

    async fn pull(&mut self) -> Result<Option<HistoryMessage>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }
        Ok(self.buffer.pop_front())
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let source = self.source;
        let chat_id = self.chat_id;
        let before = self.cursor;
        let limit = self.page_size;

        let page = self
            .retry
            .run("history_page", || source.history_page(chat_id, before, limit))
            .await
            .map_err(|e| Error::Fetch(format!("history page for chat {chat_id}: {e}")))?;

        let next_cursor = page.last().map(|m| m.id);
        if page.is_empty() || next_cursor == before {
            self.exhausted = true;
            return Ok(());
        }

        let fetched = page.len();
        let fresh: Vec<_> = page.into_iter().filter(|m| self.seen.insert(m.id)).collect();
        if fresh.is_empty() {
            tracing::warn!(chat_id, ?before, "history page repeated earlier messages, ending walk");
            self.exhausted = true;
            return Ok(());
        }
        if fresh.len() < fetched {
            tracing::debug!(chat_id, skipped = fetched - fresh.len(), "dropped repeated messages");
        }

        tracing::trace!(chat_id, count = fresh.len(), ?before, "history page fetched");
        self.cursor = next_cursor;
        self.buffer.extend(fresh);
        Ok(())
    }
}
