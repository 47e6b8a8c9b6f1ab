use kitsmith_core::{
    BlockQuery, ItemId, Position, Stage, StageError, StagePayload, StageReport, WorldError,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{read_and_close, withdrawable};
use crate::actuator::Actuator;
use crate::session::Session;

pub(crate) async fn run(session: &mut Session) -> Result<StageReport, StageError> {
    let act = session.actuator();
    let scan = session.config.scan.clone();

    let found = act
        .call(act.world().find_blocks(
            BlockQuery::AnyOf(scan.container_blocks.clone()),
            scan.radius,
            scan.max_containers,
        ))
        .await?;
    if found.is_empty() {
        return Ok(StageReport::failure(
            Stage::Scan,
            format!("No chests found within {} blocks.", scan.radius),
        ));
    }
    info!(found = found.len(), radius = scan.radius, "Scanning storage containers");

    let mut index = session.store.load().await?;
    let mut visited: HashSet<Position> = HashSet::new();
    let mut candidates = Vec::new();

    for &position in &found {
        if visited.contains(&position) {
            continue;
        }
        visited.insert(position);

        let Some(block) = act.call(act.world().block_at(position)).await? else {
            debug!(position = %position, "Chunk not loaded, skipping");
            continue;
        };
        match block.paired_half() {
            Some(other) => {
                visited.insert(other);
                // Keep whichever half is already indexed so rescans stay stable
                let key = if index.contains(&position) {
                    position
                } else if index.contains(&other) {
                    other
                } else {
                    position.min(other)
                };
                candidates.push(key);
            }
            None if scan.include_single_containers => candidates.push(position),
            None => debug!(position = %position, "Skipping single container"),
        }
    }

    let mut indexed = 0;
    let mut failed = Vec::new();
    for &key in &candidates {
        match inspect(&act, key).await {
            Ok(ids) if ids.is_empty() => {
                debug!(position = %key, "No packaged container inside, skipping");
            }
            Ok(ids) => {
                debug!(position = %key, ids = ids.len(), "Indexed container");
                index.record(key, ids);
                indexed += 1;
            }
            Err(WorldError::Cancelled) => return Err(StageError::Cancelled),
            Err(e) => {
                warn!(position = %key, error = %e, "Failed to inspect container, skipping");
                failed.push(key);
            }
        }
    }

    session.store.save(&index).await?;

    let message = format!(
        "Finished scanning all {} double chests in a {} block radius.",
        candidates.len(),
        scan.radius
    );
    let payload = StagePayload::Scan {
        found: found.len(),
        candidates: candidates.len(),
        visited: visited.len(),
        indexed,
        failed: failed.clone(),
    };
    if failed.is_empty() {
        Ok(StageReport::success(Stage::Scan, message, payload))
    } else {
        Ok(StageReport::partial(
            Stage::Scan,
            format!("{message} {} could not be inspected.", failed.len()),
            payload,
        ))
    }
}

/// One representative item id per withdrawable packaged container stored
/// at `position`.
async fn inspect(act: &Actuator, position: Position) -> Result<Vec<ItemId>, WorldError> {
    act.approach(position).await?;
    let mut handle = act.open(position).await?;
    let slots = read_and_close(act, &mut handle).await?;

    Ok(withdrawable(&slots)
        .into_iter()
        .filter_map(|s| s.contents.first().map(|c| c.id))
        .collect())
}
