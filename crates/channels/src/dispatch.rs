//! Maps chat commands onto the [`Controller`] and renders the replies.

use kitsmith_core::SequenceState;
use kitsmith_workflow::{Controller, ControllerStatus};
use tracing::{info, warn};

use crate::channel::Channel;
use crate::command::{Command, HELP_TEXT};

#[derive(Clone)]
pub struct Dispatcher {
    controller: Controller,
}

impl Dispatcher {
    pub fn new(controller: Controller) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Run `command` and send its replies to `chat_id`.
    ///
    /// `!sequence` first announces where the kit comes from, then reports
    /// the result once the run ends.
    pub async fn handle(&self, command: Command, channel: &dyn Channel, chat_id: &str) {
        info!(command = %command, chat_id = %chat_id, "Handling chat command");
        if command == Command::Sequence {
            let announcement = match self.controller.kit().await {
                Ok(kit) if kit.is_empty() => {
                    "Reference kit is not set, reading it from the reference chest before starting."
                        .to_string()
                }
                Ok(kit) => format!("Starting sequence with kit: {kit}"),
                Err(e) => {
                    reply(channel, chat_id, &format!("Error: {e}")).await;
                    return;
                }
            };
            reply(channel, chat_id, &announcement).await;
        }

        let text = self.respond(command).await;
        reply(channel, chat_id, &text).await;
    }

    /// Run `command` and return its single status line.
    pub async fn respond(&self, command: Command) -> String {
        let c = &self.controller;
        let result = match command {
            Command::ScanChests => c.scan().await.map(|r| r.to_string()),
            Command::ReadReference => c.read_reference().await.map(|r| r.to_string()),
            Command::PlaceShulkers => c.place_containers().await.map(|r| r.to_string()),
            Command::FillShulkers => c.fill().await.map(|r| r.to_string()),
            Command::GrabItem(item) => c.acquire(&item).await.map(|r| r.to_string()),
            Command::BreakItemShulker => c.dispose_working_source().await.map(|r| r.to_string()),
            Command::BreakShulkers => c.finalize().await.map(|r| r.to_string()),
            Command::Sequence => c.run_sequence().await.map(|r| r.to_string()),
            Command::SetKit(items) => c
                .set_kit(items)
                .await
                .map(|kit| format!("Reference kit set with {} items: {kit}", kit.len())),
            Command::Kit => c.kit().await.map(|kit| {
                if kit.is_empty() {
                    "Reference kit is empty".to_string()
                } else {
                    format!("Reference kit ({} items): {kit}", kit.len())
                }
            }),
            Command::Cancel => Ok(if c.cancel() {
                "Cancelling the current run".to_string()
            } else {
                "Nothing is running".to_string()
            }),
            Command::Status => Ok(status_line(&c.status().await)),
            Command::Help => Ok(HELP_TEXT.to_string()),
        };
        result.unwrap_or_else(|e| format!("Error: {e}"))
    }
}

async fn reply(channel: &dyn Channel, chat_id: &str, text: &str) {
    if let Err(e) = channel.send(chat_id, text).await {
        warn!(chat_id = %chat_id, error = %e, "Failed to send reply");
    }
}

fn status_line(status: &ControllerStatus) -> String {
    let progress = &status.progress;
    if !status.busy {
        return match &progress.last_message {
            Some(last) => format!("Idle. Last run: {last}"),
            None => "Idle".to_string(),
        };
    }

    let mut line = String::from("Busy");
    if progress.state != SequenceState::Idle {
        line.push_str(&format!(" | state: {}", progress.state));
    }
    if let Some(stage) = progress.stage {
        line.push_str(&format!(" | stage: {stage}"));
    }
    if let Some(item) = &progress.current_item {
        line.push_str(&format!(" | item: {item}"));
    }
    line
}
