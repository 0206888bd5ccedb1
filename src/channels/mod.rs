//! Messaging channel adapters

pub mod telegram;

pub use telegram::{TelegramChannel, TelegramDelivery, TelegramStatus};
