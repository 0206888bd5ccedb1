//! Raw Telegram Bot API calls

use std::path::Path;

use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;

use super::types::{
    BotUser, EditMessageTextRequest, SendMessageRequest, SentMessage, TelegramResponse,
};
use crate::retry::{is_transient, retry_after_hint};
use crate::{Error, Result};

impl super::TelegramChannel {
    pub(super) fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token.expose_secret())
    }

    /// Verify the token by calling getMe
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the token is rejected
    pub async fn get_me(&self) -> Result<BotUser> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram getMe error: {e}")))?;

        let parsed: TelegramResponse<BotUser> = response
            .json()
            .await
            .map_err(|e| Error::Channel(format!("Telegram getMe parse error: {e}")))?;

        parsed.result.ok_or_else(|| {
            Error::Channel(format!(
                "Telegram getMe error: {}",
                parsed.description.unwrap_or_default()
            ))
        })
    }

    /// Send a plain-text message and return its message ID
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the response lacks a message ID
    pub async fn send_message_returning_id(&self, chat_id: i64, text: &str) -> Result<i64> {
        let request = SendMessageRequest {
            chat_id,
            text,
            disable_notification: Some(true),
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram API error: {e}")))?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::Channel(format!("Telegram response read error: {e}")))?;

        let parsed: TelegramResponse<SentMessage> = serde_json::from_str(&body)
            .map_err(|e| Error::Channel(format!("Telegram response parse error: {e}")))?;

        parsed.result.map(|m| m.message_id).ok_or_else(|| {
            Error::Channel(format!(
                "Telegram API error: {}",
                parsed.description.unwrap_or_default()
            ))
        })
    }

    /// Edit an existing message's text
    ///
    /// "message is not modified" responses count as success.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        let request = EditMessageTextRequest {
            chat_id,
            message_id,
            text,
        };

        let response = self
            .client
            .post(self.method_url("editMessageText"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("Telegram editMessageText error: {e}")))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Common when two progress updates carry the same text
        if body.to_lowercase().contains("message is not modified") {
            return Ok(());
        }

        Err(Error::Channel(format!(
            "Telegram editMessageText error: {status} - {body}"
        )))
    }

    /// Upload a file with a caption via sendDocument.
    ///
    /// Rate limits and server errors are retried with backoff, honouring
    /// `retry_after` when Telegram supplies it.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the upload keeps failing
    pub async fn send_document(&self, chat_id: i64, file: &Path, caption: &str) -> Result<()> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "backup.zip".to_string());

        let mut attempt = 0;
        loop {
            let handle = tokio::fs::File::open(file).await?;
            let len = handle.metadata().await?.len();
            let part = Part::stream_with_length(reqwest::Body::from(handle), len)
                .file_name(file_name.clone())
                .mime_str("application/zip")
                .map_err(|e| Error::Channel(format!("Telegram sendDocument error: {e}")))?;
            let form = Form::new()
                .text("chat_id", chat_id.to_string())
                .text("caption", caption.to_string())
                .part("document", part);

            let response = self
                .client
                .post(self.method_url("sendDocument"))
                .multipart(form)
                .send()
                .await
                .map_err(|e| Error::Channel(format!("Telegram sendDocument error: {e}")))?;

            let status = response.status();
            if status.is_success() {
                tracing::info!(chat_id, file = %file_name, bytes = len, "Telegram document sent");
                return Ok(());
            }

            let body = response.text().await.unwrap_or_default();
            if attempt >= self.retry.max_retries || !is_transient(status.as_u16(), &body) {
                return Err(Error::Channel(format!(
                    "Telegram sendDocument error: {status} - {body}"
                )));
            }

            let delay = self.retry.backoff(attempt, retry_after_hint(&body));
            tracing::warn!(
                chat_id,
                attempt = attempt + 1,
                status = status.as_u16(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Telegram sendDocument failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
