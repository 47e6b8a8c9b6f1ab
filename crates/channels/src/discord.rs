//! Discord channel adapter (stub).
//!
//! Implements the Channel trait for the Discord Bot API. The gateway
//! connection is not wired in yet: messages are injected in-process and
//! replies are kept in an outbox, which is what the relay tests drive.

use async_trait::async_trait;
use kitsmith_config::DiscordConfig;
use tokio::sync::{Mutex, mpsc};
use tracing::info;

use crate::channel::{Channel, ChannelError, ChannelMessage, MessageStream};

/// A reply sent through the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: String,
    pub content: String,
}

pub struct DiscordChannel {
    config: DiscordConfig,
    inject_tx: Mutex<Option<mpsc::Sender<Result<ChannelMessage, ChannelError>>>>,
    outbox: Mutex<Vec<SentMessage>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            inject_tx: Mutex::new(None),
            outbox: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &DiscordConfig {
        &self.config
    }

    /// Inject a message as if it came from Discord.
    pub async fn inject_message(&self, msg: ChannelMessage) -> Result<(), ChannelError> {
        let guard = self.inject_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            tx.send(Ok(msg))
                .await
                .map_err(|_| ChannelError::ConnectionLost("Message channel closed".into()))
        } else {
            Err(ChannelError::ConnectionLost("Channel not started".into()))
        }
    }

    /// Everything sent so far, oldest first.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        if self.config.token.as_deref().is_none_or(str::is_empty) {
            return Err(ChannelError::NotConfigured("discord token missing".into()));
        }
        info!("Discord channel starting (stub mode)");
        let (tx, rx) = mpsc::channel(64);
        *self.inject_tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn send(&self, chat_id: &str, content: &str) -> Result<(), ChannelError> {
        info!(chat_id = %chat_id, content_len = content.len(), "Discord send (stub)");
        self.outbox.lock().await.push(SentMessage {
            chat_id: chat_id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        if self.config.allowed_users.is_empty() {
            return false;
        }
        if self.config.allowed_users.iter().any(|u| u == "*") {
            return true;
        }
        self.config.allowed_users.iter().any(|u| u == sender_id)
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Discord channel stopping");
        *self.inject_tx.lock().await = None;
        Ok(())
    }
}
