//! Typed stage outcomes.
//!
//! Every stage returns a [`StageReport`] instead of a bare string. The
//! `Display` impl renders the human-readable status line that control
//! surfaces relay to users.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::position::Position;

/// The pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scan,
    Reference,
    Placement,
    Acquire,
    Fill,
    Dispose,
    Finalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scan => "scan",
            Stage::Reference => "reference",
            Stage::Placement => "placement",
            Stage::Acquire => "acquire",
            Stage::Fill => "fill",
            Stage::Dispose => "dispose",
            Stage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Coarse outcome of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    /// Completed, but some per-entity steps failed.
    Partial,
    Failure,
}

/// Structured stage payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StagePayload {
    None,
    Scan {
        found: usize,
        candidates: usize,
        visited: usize,
        indexed: usize,
        failed: Vec<Position>,
    },
    Reference {
        items: Vec<String>,
    },
    Placement {
        withdrawn: u32,
        placed: u32,
        returned: u32,
        /// Candidate sites skipped because the cell above was occupied.
        skipped: u32,
        positions: Vec<Position>,
    },
    Acquire {
        item: String,
        source: Position,
        working_source: Position,
        first_content: Option<String>,
    },
    Fill {
        item: Option<String>,
        per_container: u32,
        filled: u32,
        failed: Vec<Position>,
    },
    Dispose {
        deposited: u32,
    },
    Finalize {
        broken: u32,
        deposited: u32,
        outstanding: u32,
    },
}

/// The outcome of one stage invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: Status,
    pub message: String,
    pub payload: StagePayload,
}

impl StageReport {
    pub fn success(stage: Stage, message: impl Into<String>, payload: StagePayload) -> Self {
        Self {
            stage,
            status: Status::Success,
            message: message.into(),
            payload,
        }
    }

    pub fn partial(stage: Stage, message: impl Into<String>, payload: StagePayload) -> Self {
        Self {
            stage,
            status: Status::Partial,
            message: message.into(),
            payload,
        }
    }

    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: Status::Failure,
            message: message.into(),
            payload: StagePayload::None,
        }
    }

    pub fn with_payload(mut self, payload: StagePayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == Status::Failure
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Status::Failure => write!(f, "Error: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// States of the sequencer state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    Idle,
    ReferenceCheck,
    ScanIfNeeded,
    Placement,
    PerItem,
    Finalize,
    Done,
    Failed,
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of one kit item within a sequence run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item: String,
    pub status: Status,
    /// The stage the item reached (where it failed, or `Dispose` on success).
    pub stage: Stage,
    pub message: String,
}

/// Outcome of a full sequence run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceReport {
    /// Terminal state: `Done` or `Failed`.
    pub state: SequenceState,
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<StageReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<StageReport>,
    #[serde(default)]
    pub items: Vec<ItemOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalize: Option<StageReport>,
}

impl SequenceReport {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: SequenceState::Failed,
            status: Status::Failure,
            message: message.into(),
            scan: None,
            placement: None,
            items: Vec::new(),
            finalize: None,
        }
    }

    pub fn succeeded_items(&self) -> usize {
        self.items.iter().filter(|o| o.status == Status::Success).count()
    }
}

impl fmt::Display for SequenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            SequenceState::Failed => write!(f, "Sequence failed: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}
