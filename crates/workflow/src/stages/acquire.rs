use kitsmith_core::{
    ContainerHandle, ItemInfo, ItemStack, Position, Stage, StageError, StagePayload, StageReport,
    WorldError,
};
use tracing::{debug, info, warn};

use super::{read_and_close, withdrawable};
use crate::actuator::Actuator;
use crate::session::Session;

pub(crate) async fn run(
    session: &mut Session,
    name: &str,
    count: u32,
) -> Result<StageReport, StageError> {
    let act = session.actuator();
    let info = act
        .world()
        .item_by_name(name)
        .ok_or_else(|| StageError::UnknownItem(name.to_string()))?;

    let index = session.store.load().await?;
    let actor = act.actor_position().await?;
    let source = session
        .selector
        .select(&index, info.id, actor)
        .ok_or_else(|| StageError::IndexMiss {
            item: info.name.clone(),
            id: info.id.0,
        })?;
    info!(item = %info.name, source = %source, selector = session.selector.name(), "Acquiring item");

    act.approach(source).await?;
    let mut handle = act.open(source).await?;
    let taken = take_packaged(&act, &mut handle, &info, count).await;
    act.close(&mut handle).await?;
    let packaged = taken?;

    act.equip_matching(&packaged.name, |s| s.id == packaged.id).await?;

    let actor = act.actor_position().await?;
    let radius = session.config.placement.working_source_search_radius;
    let target = placement_cell(&act, actor, radius)
        .await?
        .ok_or(StageError::PlacementSiteExhausted(actor))?;
    act.place(target.below(), target).await?;
    session.working_source = Some(target);

    let first_content = match first_content(&act, target).await {
        Ok(first) => first,
        Err(WorldError::Cancelled) => return Err(StageError::Cancelled),
        Err(e) => {
            debug!(position = %target, error = %e, "Could not reopen working source, using its summary");
            packaged.contents.first().map(|c| c.name.clone())
        }
    };

    let payload = StagePayload::Acquire {
        item: info.name.clone(),
        source,
        working_source: target,
        first_content: first_content.clone(),
    };
    match first_content {
        Some(content) => Ok(StageReport::success(
            Stage::Acquire,
            format!("Successfully placed Shulker box containing {content} at {target}"),
            payload,
        )),
        None => Ok(StageReport::partial(
            Stage::Acquire,
            format!("Placed Shulker box at {target}, but it is empty"),
            payload,
        )),
    }
}

/// Withdraw one packaged container holding `info`, after checking it holds
/// enough to cover `count`.
async fn take_packaged(
    act: &Actuator,
    handle: &mut Box<dyn ContainerHandle>,
    info: &ItemInfo,
    count: u32,
) -> Result<ItemStack, StageError> {
    let position = handle.position();
    let slots = act.call(handle.slots()).await?;
    let reachable = withdrawable(&slots);

    let holds = |s: &ItemStack| s.contents.iter().any(|c| c.id == info.id);
    let packaged = match reachable.iter().find(|s| holds(s)) {
        Some(found) => *found,
        None if slots.iter().any(|s| s.is_packaged_container() && holds(s)) => {
            return Err(StageError::ShadowedContainer {
                item: info.name.clone(),
                position,
            });
        }
        None => reachable
            .first()
            .copied()
            .ok_or(StageError::NoPackagedContainer(position))?,
    };

    let available = packaged.contents.len() as u32 * info.stack_size;
    if available < count {
        return Err(StageError::InsufficientStock {
            item: info.name.clone(),
            requested: count,
            available,
        });
    }

    act.call(handle.withdraw(packaged.id, 1)).await?;
    act.converge().await?;
    Ok(packaged.clone())
}

/// The cell east of the actor if it is usable, else the nearest usable
/// cell within `radius`.
async fn placement_cell(
    act: &Actuator,
    actor: Position,
    radius: u32,
) -> Result<Option<Position>, WorldError> {
    let default = actor.offset(1, 0, 0);
    if is_valid_cell(act, actor, default).await? {
        return Ok(Some(default));
    }

    let r = radius as i32;
    let mut cells: Vec<Position> = (-r..=r)
        .flat_map(|dx| (-r..=r).flat_map(move |dy| (-r..=r).map(move |dz| actor.offset(dx, dy, dz))))
        .filter(|cell| *cell != default)
        .collect();
    cells.sort_by(|a, b| actor.distance_to(*a).total_cmp(&actor.distance_to(*b)).then(a.cmp(b)));

    for cell in cells {
        if is_valid_cell(act, actor, cell).await? {
            debug!(position = %cell, "Using fallback placement cell");
            return Ok(Some(cell));
        }
    }
    warn!(actor = %actor, radius, "No valid placement cell nearby");
    Ok(None)
}

/// Solid support below, an empty target, and not where the actor stands.
async fn is_valid_cell(act: &Actuator, actor: Position, cell: Position) -> Result<bool, WorldError> {
    if cell == actor || cell == actor.above() {
        return Ok(false);
    }
    Ok(!act.is_occupied(cell).await? && act.is_occupied(cell.below()).await?)
}

async fn first_content(act: &Actuator, position: Position) -> Result<Option<String>, WorldError> {
    let mut handle = act.open(position).await?;
    let mut slots = read_and_close(act, &mut handle).await?;
    slots.sort_by_key(|s| s.slot);
    Ok(slots.into_iter().next().map(|s| s.name))
}
