//! Telegram channel adapter
//!
//! Delivers finished archives with sendDocument and keeps an editable
//! status message up to date while an export runs.

mod api;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use crate::Result;
use crate::export::{DeliverySink, ProgressSurface};
use crate::retry::RetryPolicy;

pub use types::BotUser;

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramChannel {
    token: Arc<SecretString>,
    api_base: String,
    client: Client,
    retry: RetryPolicy,
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl TelegramChannel {
    /// Create a client for the public Bot API
    #[must_use]
    pub fn new(token: SecretString) -> Self {
        Self {
            token: Arc::new(token),
            api_base: types::API_BASE.to_string(),
            client: Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Point at a different Bot API server (e.g. a self-hosted one that
    /// accepts larger uploads)
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Post a status message in `chat_id` and return a surface that edits it
    ///
    /// # Errors
    ///
    /// Returns error if the initial message cannot be sent
    pub async fn open_status(&self, chat_id: i64, text: &str) -> Result<TelegramStatus> {
        let message_id = self.send_message_returning_id(chat_id, text).await?;
        Ok(TelegramStatus {
            channel: self.clone(),
            chat_id,
            message_id,
        })
    }

    /// Delivery sink that uploads into `chat_id`
    #[must_use]
    pub fn delivery(&self, chat_id: i64) -> TelegramDelivery {
        TelegramDelivery {
            channel: self.clone(),
            chat_id,
        }
    }
}

/// Uploads finished archives to a fixed chat
#[derive(Debug, Clone)]
pub struct TelegramDelivery {
    channel: TelegramChannel,
    chat_id: i64,
}

#[async_trait]
impl DeliverySink for TelegramDelivery {
    async fn send_document(&self, file: &Path, caption: &str) -> Result<()> {
        self.channel.send_document(self.chat_id, file, caption).await
    }
}

/// An editable status message
#[derive(Debug, Clone)]
pub struct TelegramStatus {
    channel: TelegramChannel,
    chat_id: i64,
    message_id: i64,
}

impl TelegramStatus {
    /// Chat and message the status lives in
    #[must_use]
    pub const fn handle(&self) -> (i64, i64) {
        (self.chat_id, self.message_id)
    }
}

#[async_trait]
impl ProgressSurface for TelegramStatus {
    async fn edit_status(&self, text: &str) -> Result<()> {
        self.channel
            .edit_message_text(self.chat_id, self.message_id, text)
            .await
    }
}
