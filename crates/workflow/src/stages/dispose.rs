use kitsmith_core::{Stage, StageError, StagePayload, StageReport};
use tracing::info;

use crate::session::Session;

/// Break the Working Source and send the emptied container to discard.
///
/// A failed break ends the stage; missed drops do not.
pub(crate) async fn run(session: &mut Session) -> Result<StageReport, StageError> {
    let act = session.actuator();
    let source = session.working_source.ok_or(StageError::NoWorkingSource)?;
    let discard = session.config.locations.discard;

    act.approach(source).await?;
    let tool = act.equip_break_tool().await?;
    act.break_block(source).await?;
    session.working_source = None;
    info!(position = %source, tool = ?tool, "Broke working source");

    act.collect_drops(&[source]).await?;

    act.approach(discard).await?;
    let mut handle = act.open(discard).await?;
    let deposited = act.drain_packaged(&mut handle, 1, true).await;
    act.close(&mut handle).await?;
    let deposited = deposited?;

    let payload = StagePayload::Dispose { deposited };
    if deposited == 0 {
        return Ok(StageReport::partial(
            Stage::Dispose,
            "Broke item shulker but nothing reached the discard chest",
            payload,
        ));
    }
    Ok(StageReport::success(
        Stage::Dispose,
        "Successfully broke item shulker and deposited in discard chest",
        payload,
    ))
}
