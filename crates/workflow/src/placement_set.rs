//! Containers placed during the current run and their lifecycle counters.

use kitsmith_core::Position;
use serde::Serialize;

/// Invariant: `placed <= withdrawn` at every observation point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlacementSet {
    positions: Vec<Position>,
    withdrawn: u32,
    placed: u32,
    broken: u32,
}

impl PlacementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_withdrawn(&mut self) {
        self.withdrawn += 1;
    }

    /// Record a verified placement. Refused once every withdrawn container
    /// has been placed.
    pub fn record_placed(&mut self, position: Position) -> bool {
        if self.placed >= self.withdrawn || self.positions.contains(&position) {
            return false;
        }
        self.placed += 1;
        self.positions.push(position);
        true
    }

    pub fn record_broken(&mut self) {
        self.broken += 1;
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn withdrawn(&self) -> u32 {
        self.withdrawn
    }

    pub fn placed(&self) -> u32 {
        self.placed
    }

    pub fn broken(&self) -> u32 {
        self.broken
    }

    /// Withdrawn containers that never made it into the world.
    pub fn surplus(&self) -> u32 {
        self.withdrawn - self.placed
    }
}
