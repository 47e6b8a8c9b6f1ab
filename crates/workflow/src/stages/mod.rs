//! Pipeline stages.
//!
//! Each stage is a `run` function over a mutably borrowed [`Session`]
//! returning `Result<StageReport, StageError>`. The session's public entry
//! points turn errors into failure reports.
//!
//! [`Session`]: crate::Session

pub(crate) mod acquire;
pub(crate) mod dispose;
pub(crate) mod fill;
pub(crate) mod finalize;
pub(crate) mod placement;
pub(crate) mod reference;
pub(crate) mod scan;

use kitsmith_core::{ContainerHandle, ItemStack, WorldError};

use crate::actuator::Actuator;

/// Read a container's slots, then close it whatever the read returned.
pub(crate) async fn read_and_close(
    act: &Actuator,
    handle: &mut Box<dyn ContainerHandle>,
) -> Result<Vec<ItemStack>, WorldError> {
    let slots = act.call(handle.slots()).await;
    act.close(handle).await?;
    slots
}

/// Packaged containers that a by-type withdrawal can actually reach: the
/// lowest slot of each container type.
pub(crate) fn withdrawable(slots: &[ItemStack]) -> Vec<&ItemStack> {
    let mut packaged: Vec<&ItemStack> = slots.iter().filter(|s| s.is_packaged_container()).collect();
    packaged.sort_by_key(|s| s.slot);
    let mut seen = Vec::new();
    packaged.retain(|s| {
        if seen.contains(&s.id) {
            false
        } else {
            seen.push(s.id);
            true
        }
    });
    packaged
}
