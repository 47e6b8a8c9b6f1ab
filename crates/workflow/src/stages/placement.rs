use kitsmith_core::{
    BlockQuery, ContainerHandle, ItemStack, Position, Stage, StageError, StagePayload,
    StageReport, WorldError,
};
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::placement_set::PlacementSet;
use crate::session::Session;

fn is_empty_packaged(stack: &ItemStack) -> bool {
    stack.is_packaged_container() && stack.contents.is_empty()
}

pub(crate) async fn run(session: &mut Session) -> Result<StageReport, StageError> {
    let act = session.actuator();
    let supply = session.config.locations.supply;
    let config = session.config.placement.clone();

    session.placement.reset();

    act.approach(supply).await?;
    let mut handle = act.open(supply).await?;
    let withdrawal = withdraw_empty(&act, &mut handle, config.capacity, &mut session.placement).await;
    act.close(&mut handle).await?;
    withdrawal?;

    let withdrawn = session.placement.withdrawn();
    if withdrawn == 0 {
        return Err(StageError::NothingWithdrawn(supply));
    }
    info!(withdrawn, "Withdrew empty containers from supply");

    let sites = act
        .call(act.world().find_blocks(
            BlockQuery::Named(config.ground_block.clone()),
            config.search_radius,
            withdrawn as usize,
        ))
        .await?;

    let mut skipped = 0;
    for ground in sites {
        if session.placement.placed() >= withdrawn {
            break;
        }
        let target = ground.above();
        if act.is_occupied(target).await? {
            debug!(position = %target, "Site occupied, skipping");
            skipped += 1;
            continue;
        }

        match place_one(&act, ground, target).await {
            Ok(()) if session.placement.record_placed(target) => {
                debug!(position = %target, placed = session.placement.placed(), "Placed container");
            }
            Ok(()) => warn!(position = %target, "Placed container could not be tracked"),
            Err(WorldError::Cancelled) => return Err(StageError::Cancelled),
            Err(e) => warn!(position = %target, error = %e, "Failed to place container"),
        }
    }

    let placed = session.placement.placed();
    let surplus = session.placement.surplus();
    let returned = if surplus > 0 {
        return_surplus(&act, supply, surplus).await?
    } else {
        0
    };

    let payload = StagePayload::Placement {
        withdrawn,
        placed,
        returned,
        skipped,
        positions: session.placement.positions().to_vec(),
    };

    if placed == 0 {
        let mut report =
            StageReport::failure(Stage::Placement, "Could not find anywhere to place shulkers.");
        report.payload = payload;
        return Ok(report);
    }

    let message = format!("Placed {placed} shulkers.");
    if placed < withdrawn {
        Ok(StageReport::partial(Stage::Placement, message, payload))
    } else {
        Ok(StageReport::success(Stage::Placement, message, payload))
    }
}

/// Withdraw empty packaged containers one at a time, up to `capacity`.
async fn withdraw_empty(
    act: &Actuator,
    handle: &mut Box<dyn ContainerHandle>,
    capacity: u32,
    placement: &mut PlacementSet,
) -> Result<(), WorldError> {
    while placement.withdrawn() < capacity {
        let slots = act.call(handle.slots()).await?;
        let Some(stack) = slots.iter().find(|s| is_empty_packaged(s)) else {
            debug!(withdrawn = placement.withdrawn(), "Supply has no more empty containers");
            break;
        };

        match act.call(handle.withdraw(stack.id, 1)).await {
            Ok(()) => {
                placement.record_withdrawn();
                act.converge().await?;
            }
            Err(WorldError::Cancelled) => return Err(WorldError::Cancelled),
            Err(e) => {
                warn!(position = %handle.position(), error = %e, "Withdraw failed");
                break;
            }
        }
    }
    Ok(())
}

async fn place_one(act: &Actuator, ground: Position, target: Position) -> Result<(), WorldError> {
    act.approach(target).await?;
    act.equip_matching("empty shulker box", is_empty_packaged).await?;
    act.place(ground, target).await
}

/// Deposit withdrawn-but-unplaced containers back into supply.
async fn return_surplus(act: &Actuator, supply: Position, surplus: u32) -> Result<u32, StageError> {
    act.approach(supply).await?;
    let mut handle = act.open(supply).await?;

    let mut returned = 0;
    while returned < surplus {
        let held = act.inventory().await?;
        let Some(stack) = held.iter().find(|s| is_empty_packaged(s)) else {
            break;
        };
        match act.call(handle.deposit(stack.id, 1)).await {
            Ok(()) => {
                returned += 1;
                act.converge().await?;
            }
            Err(WorldError::Cancelled) => return Err(StageError::Cancelled),
            Err(e) => {
                warn!(position = %supply, error = %e, "Failed to return container to supply");
                break;
            }
        }
    }
    act.close(&mut handle).await?;

    if returned < surplus {
        warn!(returned, surplus, "Not all surplus containers were returned");
    }
    Ok(returned)
}
