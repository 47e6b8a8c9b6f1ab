//! Kit-assembly workflow: the session, its stages, and the sequencer.
//!
//! A [`Session`] carries the state shared across stages (Reference Kit,
//! Placement Set, Working Source). Stages run one at a time against it:
//!
//! ```text
//! scan → read_reference → place_containers → (acquire → fill → dispose)* → finalize
//! ```
//!
//! Every actuation goes through an [`Actuator`], which applies the session's
//! [`RetryPolicies`], the container-open timeout and the cancellation token.
//! The [`Controller`] serialises access for control surfaces.

pub mod actuator;
pub mod controller;
pub mod kit;
pub mod placement_set;
pub mod retry;
pub mod sequencer;
pub mod session;
pub mod wait;

mod stages;

pub use actuator::Actuator;
pub use controller::{Controller, ControllerStatus};
pub use kit::{KIT_SLOTS, ReferenceKit};
pub use placement_set::PlacementSet;
pub use retry::{RetryPolicies, RetryPolicy};
pub use session::{RunProgress, Session};
