//! Run event system — decoupled progress reporting.
//!
//! Stages and the sequencer publish events as they make progress. Control
//! surfaces (the gateway WebSocket, chat relays) subscribe to relay status
//! without being coupled to the orchestration code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

use crate::report::{SequenceState, Stage, Status};

/// All run events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RunEvent {
    /// A stage began
    StageStarted {
        stage: Stage,
        timestamp: DateTime<Utc>,
    },

    /// A stage produced its report
    StageFinished {
        stage: Stage,
        status: Status,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The sequencer moved to a new state
    StateChanged {
        run_id: String,
        state: SequenceState,
        timestamp: DateTime<Utc>,
    },

    /// A kit item finished its acquire → fill → dispose cycle
    ItemProcessed {
        run_id: String,
        item: String,
        status: Status,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A sequence run ended successfully
    SequenceCompleted {
        run_id: String,
        result: String,
        timestamp: DateTime<Utc>,
    },

    /// A sequence run ended in the failed state
    SequenceError {
        run_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for run events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<RunEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers, returning how many received it.
    pub fn publish(&self, event: RunEvent) -> usize {
        match self.sender.send(Arc::new(event)) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                trace!(event = ?event, "No subscribers, event dropped");
                0
            }
        }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RunEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
