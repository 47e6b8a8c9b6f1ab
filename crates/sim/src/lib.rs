//! Simulated world for kitsmith.
//!
//! [`SimWorld`] implements the `World` actuation traits entirely in memory:
//! blocks, containers with slots, the actor's inventory, dropped items, and
//! an item registry. Faults (unreachable targets, hanging container opens,
//! failing placements or breaks, slow drop pickup) can be injected per
//! position so the workflow's recovery paths can be exercised
//! deterministically.

pub mod container;
pub mod fixture;
pub mod registry;
pub mod world;

mod inventory;
mod state;

pub use container::SimContainer;
pub use fixture::{ContainerFixture, FixtureError, WorldFixture};
pub use registry::Registry;
pub use state::SimAction;
pub use world::{SimWorld, SimWorldBuilder};

/// Interaction reach of the simulated actor, in blocks.
pub const REACH: f64 = 4.5;

/// Slots in the actor's inventory.
pub const ACTOR_SLOTS: usize = 36;
