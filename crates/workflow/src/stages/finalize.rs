use kitsmith_core::{Position, Stage, StageError, StagePayload, StageReport, WorldError};
use tracing::{info, warn};

use crate::actuator::Actuator;
use crate::session::Session;

/// Break every placed container and deliver the results to the destination.
///
/// Consumes the Placement Set: it is reset once the break loop is done.
pub(crate) async fn run(session: &mut Session) -> Result<StageReport, StageError> {
    let act = session.actuator();
    let destination = session.config.locations.destination;
    let positions = session.placement.positions().to_vec();

    let mut broken_at = Vec::new();
    for position in positions {
        match break_one(&act, position).await {
            Ok(()) => {
                session.placement.record_broken();
                broken_at.push(position);
            }
            Err(WorldError::Cancelled) => return Err(StageError::Cancelled),
            Err(e) => warn!(position = %position, error = %e, "Failed to break container, skipping"),
        }
    }
    let broken = session.placement.broken();
    session.placement.reset();
    info!(broken, "Broke placed containers");

    let mut deposited = 0;
    if broken > 0 {
        act.collect_drops(&broken_at).await?;

        act.approach(destination).await?;
        let mut handle = act.open(destination).await?;
        let drained = act.drain_packaged(&mut handle, broken, false).await;
        act.close(&mut handle).await?;
        deposited = drained?;
    }

    let outstanding = broken.saturating_sub(deposited);
    let payload = StagePayload::Finalize {
        broken,
        deposited,
        outstanding,
    };
    if outstanding > 0 {
        warn!(outstanding, "Some broken containers never reached the destination");
        return Ok(StageReport::partial(
            Stage::Finalize,
            format!("Broke {broken} shulkers, {outstanding} could not be deposited"),
            payload,
        ));
    }
    Ok(StageReport::success(
        Stage::Finalize,
        format!("Broke {broken} shulkers"),
        payload,
    ))
}

async fn break_one(act: &Actuator, position: Position) -> Result<(), WorldError> {
    act.approach(position).await?;
    act.equip_break_tool().await?;
    act.break_block(position).await
}
