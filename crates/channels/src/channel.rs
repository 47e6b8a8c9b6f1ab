//! Channel trait: the abstraction over chat platforms.
//!
//! A Channel delivers operator messages to the relay and carries replies
//! back. The platform client itself (gateway connection, rate limits) sits
//! behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A message received from a chat platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Platform-specific user ID
    pub sender_id: String,

    /// Human-readable sender name (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// Whether the sender is itself a bot
    #[serde(default)]
    pub from_bot: bool,

    /// The text content
    pub content: String,

    /// Where replies go
    pub chat_id: String,
}

impl ChannelMessage {
    pub fn new(sender_id: impl Into<String>, chat_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: None,
            from_bot: false,
            content: content.into(),
            chat_id: chat_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Message delivery failed to {chat_id}: {reason}")]
    DeliveryFailed { chat_id: String, reason: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),
}

pub type MessageStream = mpsc::Receiver<Result<ChannelMessage, ChannelError>>;

#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Connect and return the stream of inbound messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a reply to a chat.
    async fn send(&self, chat_id: &str, content: &str) -> Result<(), ChannelError>;

    /// Whether `sender_id` may issue commands.
    fn is_allowed(&self, sender_id: &str) -> bool;

    async fn stop(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
