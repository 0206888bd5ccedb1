//! Telegram Bot API request/response types

use serde::{Deserialize, Serialize};

/// Telegram Bot API base URL
pub(crate) const API_BASE: &str = "https://api.telegram.org";

/// Telegram sendMessage request
#[derive(Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_notification: Option<bool>,
}

/// Telegram editMessageText request
#[derive(Serialize)]
pub(crate) struct EditMessageTextRequest<'a> {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: &'a str,
}

/// Response from sendMessage / sendDocument containing the sent message
#[derive(Debug, Deserialize)]
pub(crate) struct SentMessage {
    pub message_id: i64,
}

/// Bot identity from getMe
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// Telegram API response wrapper
#[derive(Debug, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_error_response() {
        let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        let parsed: TelegramResponse<SentMessage> = serde_json::from_str(body).unwrap();
        assert!(!parsed.ok);
        assert!(parsed.result.is_none());
        assert_eq!(parsed.description.as_deref(), Some("Bad Request: chat not found"));
    }

    #[test]
    fn parses_sent_message() {
        let body = r#"{"ok":true,"result":{"message_id":77,"chat":{"id":1}}}"#;
        let parsed: TelegramResponse<SentMessage> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.result.unwrap().message_id, 77);
    }

    #[test]
    fn serializes_edit_request() {
        let req = EditMessageTextRequest {
            chat_id: 5,
            message_id: 9,
            text: "⏳",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["chat_id"], 5);
        assert_eq!(json["message_id"], 9);
    }
}
