//! Chat-command control surface for kitsmith.
//!
//! Operators drive the pipeline from a chat platform with prefixed
//! commands (`!scanchests`, `!grabitem golden_apple`, `!sequence`, ...).
//! The [`Relay`] reads messages from a [`Channel`], drops anything from
//! senders off the allowlist, parses the rest into [`Command`]s and hands
//! them to the [`Dispatcher`], which calls the workflow `Controller` and
//! replies with the stage's status line.

pub mod channel;
pub mod command;
pub mod discord;
pub mod dispatch;
pub mod relay;

pub use channel::{Channel, ChannelError, ChannelMessage};
pub use command::{Command, CommandError, HELP_TEXT};
pub use discord::DiscordChannel;
pub use dispatch::Dispatcher;
pub use relay::Relay;
