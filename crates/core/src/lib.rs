//! # kitsmith core
//!
//! Domain types, actuation traits, and error definitions for the kitsmith
//! kit-assembly runtime. Every other crate depends inward on this one.
//!
//! ## Design Philosophy
//!
//! The world the actor operates in is an external collaborator. It is defined
//! here only as the [`World`] and [`ContainerHandle`] traits; implementations
//! (a protocol client, the in-memory simulator used by tests) live elsewhere.
//! The orchestration crates only ever talk to these traits.

pub mod error;
pub mod event;
pub mod item;
pub mod position;
pub mod report;
pub mod world;

// Re-export key types at crate root for ergonomics
pub use error::{Error, IndexError, Result, StageError, WorldError};
pub use event::{EventBus, RunEvent};
pub use item::{Block, BlockQuery, ChestKind, DroppedItem, Facing, ItemId, ItemInfo, ItemStack};
pub use position::Position;
pub use report::{ItemOutcome, SequenceReport, SequenceState, Stage, StagePayload, StageReport, Status};
pub use world::{ContainerHandle, EquipSlot, World};
