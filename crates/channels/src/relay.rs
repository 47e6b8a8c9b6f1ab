//! The relay loop: reads channel messages, filters them, and dispatches
//! commands.
//!
//! Each command runs on its own task so `!cancel` and `!status` are
//! answered while a run is in flight. Commands that need the actor are
//! still serialised by the [`Controller`] and answer `Busy` when it is
//! taken.

use kitsmith_config::DiscordConfig;
use kitsmith_workflow::Controller;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::{Channel, ChannelError, ChannelMessage};
use crate::command::Command;
use crate::dispatch::Dispatcher;

pub struct Relay {
    channel: Arc<dyn Channel>,
    dispatcher: Dispatcher,
    prefix: String,
    ignore_bots: bool,
}

impl Relay {
    pub fn new(channel: Arc<dyn Channel>, controller: Controller, config: &DiscordConfig) -> Self {
        Self {
            channel,
            dispatcher: Dispatcher::new(controller),
            prefix: config.prefix.clone(),
            ignore_bots: config.ignore_bots,
        }
    }

    /// Relay messages until the channel closes or `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ChannelError> {
        let mut rx = self.channel.start().await?;
        info!(channel = %self.channel.name(), prefix = %self.prefix, "Command relay started");

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = rx.recv() => next,
            };
            match next {
                Some(Ok(msg)) => {
                    self.accept(msg);
                }
                Some(Err(e)) => warn!(channel = %self.channel.name(), error = %e, "Channel error"),
                None => break,
            }
        }

        info!(channel = %self.channel.name(), "Command relay stopped");
        self.channel.stop().await
    }

    /// Filter one message and spawn its command. Returns the task handle
    /// when a reply will be sent.
    pub fn accept(&self, msg: ChannelMessage) -> Option<JoinHandle<()>> {
        if self.ignore_bots && msg.from_bot {
            return None;
        }
        let parsed = Command::parse(&self.prefix, &msg.content)?;
        if !self.channel.is_allowed(&msg.sender_id) {
            warn!(sender = %msg.sender_id, "Ignoring command from sender not on the allowlist");
            return None;
        }
        debug!(sender = %msg.sender_id, content = %msg.content, "Command received");

        let channel = Arc::clone(&self.channel);
        let dispatcher = self.dispatcher.clone();
        let chat_id = msg.chat_id;
        Some(tokio::spawn(async move {
            match parsed {
                Ok(command) => dispatcher.handle(command, channel.as_ref(), &chat_id).await,
                Err(e) => {
                    if let Err(send_err) = channel.send(&chat_id, &e.to_string()).await {
                        warn!(chat_id = %chat_id, error = %send_err, "Failed to send reply");
                    }
                }
            }
        }))
    }
}
