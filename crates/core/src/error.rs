//! Error types for the kitsmith domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use std::time::Duration;
use thiserror::Error;

use crate::position::Position;

/// The top-level error type for kitsmith operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Actuation errors ---
    #[error("World error: {0}")]
    World(#[from] WorldError),

    // --- Stage errors ---
    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    // --- Location Index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by the world collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error("Cannot reach {target}: still {distance:.1} blocks away")]
    Unreachable { target: Position, distance: f64 },

    #[error("Opening container at {position} timed out after {}ms", .timeout.as_millis())]
    ContainerTimeout { position: Position, timeout: Duration },

    #[error("No container at {0}")]
    NotAContainer(Position),

    #[error("No block loaded at {0}")]
    NoBlock(Position),

    #[error("Item {0} not held")]
    NotHeld(String),

    #[error("{action} failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("Actor disconnected: {0}")]
    Disconnected(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl WorldError {
    pub fn action(action: impl Into<String>, reason: impl Into<String>) -> Self {
        WorldError::ActionFailed {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Whether a retry policy may repeat the failed call.
    ///
    /// Timeouts, cancellation and disconnects are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorldError::Unreachable { .. } | WorldError::ActionFailed { .. } | WorldError::NoBlock(_)
        )
    }
}

/// Failures of a single stage invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error("Cannot reach {target}: still {distance:.1} blocks away")]
    Unreachable { target: Position, distance: f64 },

    #[error("Timed out opening container at {0}")]
    ContainerTimeout(Position),

    #[error("Not enough {item}: need {requested}, container holds {available}")]
    InsufficientStock {
        item: String,
        requested: u32,
        available: u32,
    },

    #[error("Item {item} (ID: {id}) not found in any indexed container")]
    IndexMiss { item: String, id: u32 },

    #[error("No valid placement cell found near {0}")]
    PlacementSiteExhausted(Position),

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("No packaged container found in the container at {0}")]
    NoPackagedContainer(Position),

    #[error("{item} at {position} is behind another container of the same type")]
    ShadowedContainer { item: String, position: Position },

    #[error("No working source has been placed")]
    NoWorkingSource,

    #[error("Nothing could be withdrawn from {0}")]
    NothingWithdrawn(Position),

    #[error("Reference kit is empty and could not be read from the reference container")]
    EmptyKit,

    #[error("A run is already in progress")]
    Busy,

    #[error("Run cancelled")]
    Cancelled,

    #[error("Location index unavailable: {0}")]
    Index(String),

    #[error("{0}")]
    World(WorldError),
}

impl From<IndexError> for StageError {
    fn from(err: IndexError) -> Self {
        StageError::Index(err.to_string())
    }
}

impl From<WorldError> for StageError {
    fn from(err: WorldError) -> Self {
        match err {
            WorldError::Unreachable { target, distance } => {
                StageError::Unreachable { target, distance }
            }
            WorldError::ContainerTimeout { position, .. } => StageError::ContainerTimeout(position),
            WorldError::Cancelled => StageError::Cancelled,
            other => StageError::World(other),
        }
    }
}

/// Location Index persistence failures.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt index snapshot: {0}")]
    Corrupt(String),
}
