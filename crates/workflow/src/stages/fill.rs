use kitsmith_core::{
    ContainerHandle, ItemId, Position, Stage, StageError, StagePayload, StageReport, WorldError,
};
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::session::Session;

/// Stacks taken out of the Working Source.
struct Withdrawal {
    item: ItemId,
    name: String,
    counts: Vec<u32>,
}

pub(crate) async fn run(session: &mut Session, item: Option<&str>) -> Result<StageReport, StageError> {
    let act = session.actuator();
    let source = session.working_source.ok_or(StageError::NoWorkingSource)?;
    let wanted = match item {
        Some(name) => Some(
            act.world()
                .item_by_name(name)
                .ok_or_else(|| StageError::UnknownItem(name.to_string()))?
                .id,
        ),
        None => None,
    };
    let positions = session.placement.positions().to_vec();
    let limit = session.placement.placed();

    act.approach(source).await?;
    let mut handle = act.open(source).await?;
    let withdrawal = withdraw_stacks(&act, &mut handle, wanted, limit).await;
    act.close(&mut handle).await?;

    let Some(withdrawal) = withdrawal? else {
        return Err(StageError::NothingWithdrawn(source));
    };
    let per_container = withdrawal.counts.iter().copied().min().unwrap_or(0);
    info!(
        item = %withdrawal.name,
        stacks = withdrawal.counts.len(),
        per_container,
        targets = positions.len(),
        "Filling placed containers"
    );

    let mut filled = 0;
    let mut failed = Vec::new();
    for position in positions {
        match deposit_into(&act, position, withdrawal.item, per_container).await {
            Ok(()) => {
                filled += 1;
                debug!(position = %position, "Filled container");
            }
            Err(WorldError::Cancelled) => return Err(StageError::Cancelled),
            Err(e) => {
                warn!(position = %position, error = %e, "Failed to fill container");
                failed.push(position);
            }
        }
    }

    let message = format!(
        "Filled {filled} shulkers with {per_container} items each. Failed to fill {} shulkers.",
        failed.len()
    );
    let payload = StagePayload::Fill {
        item: Some(withdrawal.name),
        per_container,
        filled,
        failed: failed.clone(),
    };
    if failed.is_empty() {
        Ok(StageReport::success(Stage::Fill, message, payload))
    } else {
        Ok(StageReport::partial(Stage::Fill, message, payload))
    }
}

/// Withdraw up to `limit` whole stacks of one item type.
///
/// The type is `wanted` if given, else that of the first occupied slot.
/// Returns `None` if nothing could be withdrawn.
async fn withdraw_stacks(
    act: &Actuator,
    handle: &mut Box<dyn ContainerHandle>,
    wanted: Option<ItemId>,
    limit: u32,
) -> Result<Option<Withdrawal>, WorldError> {
    let mut slots = act.call(handle.slots()).await?;
    slots.sort_by_key(|s| s.slot);

    let Some(first) = slots.iter().find(|s| wanted.is_none_or(|id| s.id == id)) else {
        return Ok(None);
    };
    let item = first.id;
    let name = first.name.clone();
    let stacks: Vec<u32> = slots
        .iter()
        .filter(|s| s.id == item)
        .map(|s| s.count)
        .take(limit as usize)
        .collect();

    let mut counts = Vec::new();
    for count in stacks {
        match act.call(handle.withdraw(item, count)).await {
            Ok(()) => {
                counts.push(count);
                act.converge().await?;
            }
            Err(WorldError::Cancelled) => return Err(WorldError::Cancelled),
            Err(e) => {
                warn!(position = %handle.position(), error = %e, "Withdraw from working source failed");
                break;
            }
        }
    }

    if counts.is_empty() {
        return Ok(None);
    }
    Ok(Some(Withdrawal { item, name, counts }))
}

async fn deposit_into(
    act: &Actuator,
    position: Position,
    item: ItemId,
    count: u32,
) -> Result<(), WorldError> {
    act.approach(position).await?;
    let mut handle = act.open(position).await?;
    let deposited = act.call(handle.deposit(item, count)).await;
    if deposited.is_ok() {
        act.converge().await?;
    }
    act.close(&mut handle).await?;
    deposited
}
