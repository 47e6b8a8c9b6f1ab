use kitsmith_core::{Stage, StageError, StagePayload, StageReport};

use super::read_and_close;
use crate::kit::{KIT_SLOTS, ReferenceKit};
use crate::session::Session;

/// Read the reference container's first slots into the Reference Kit.
///
/// The kit is only replaced once the read has succeeded.
pub(crate) async fn run(session: &mut Session) -> Result<StageReport, StageError> {
    let act = session.actuator();
    let position = session.config.locations.reference;

    act.approach(position).await?;
    let mut handle = act.open(position).await?;
    let mut slots = read_and_close(&act, &mut handle).await?;

    slots.retain(|s| s.slot < KIT_SLOTS);
    slots.sort_by_key(|s| s.slot);
    let kit = ReferenceKit::new(slots.into_iter().map(|s| s.name).collect());

    let message = format!("Reference kit loaded with {} items: {}", kit.len(), kit);
    let items = kit.items().to_vec();
    session.kit = kit;

    Ok(StageReport::success(
        Stage::Reference,
        message,
        StagePayload::Reference { items },
    ))
}
