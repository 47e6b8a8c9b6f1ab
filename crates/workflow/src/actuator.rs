//! Actuation helpers shared by every stage.
//!
//! Wraps the raw [`World`] calls with the session's retry policies, the
//! container-open timeout, convergence delays and the cancellation token.

use kitsmith_config::TimingConfig;
use kitsmith_core::{ContainerHandle, EquipSlot, ItemId, ItemStack, Position, World, WorldError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::retry::RetryPolicies;
use crate::wait::{settle, wait_until};

/// Initial goal tolerance when walking to a position.
pub const APPROACH_TOLERANCE: u32 = 2;

/// Distance within which the actor can interact with a block.
pub const REACH: f64 = 4.0;

#[derive(Clone)]
pub struct Actuator {
    world: Arc<dyn World>,
    policies: RetryPolicies,
    timing: TimingConfig,
    break_tools: Vec<String>,
    cancel: CancellationToken,
}

impl Actuator {
    pub fn new(
        world: Arc<dyn World>,
        policies: RetryPolicies,
        timing: TimingConfig,
        break_tools: Vec<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            world,
            policies,
            timing,
            break_tools,
            cancel,
        }
    }

    pub fn world(&self) -> &Arc<dyn World> {
        &self.world
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Race a world call against cancellation.
    pub async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, WorldError>>,
    ) -> Result<T, WorldError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(WorldError::Cancelled),
            result = fut => result,
        }
    }

    pub async fn settle(&self, duration: Duration) -> Result<(), WorldError> {
        settle(&self.cancel, duration).await
    }

    /// Convergence delay after a withdraw or deposit.
    pub async fn converge(&self) -> Result<(), WorldError> {
        self.settle(self.timing.convergence()).await
    }

    pub async fn actor_position(&self) -> Result<Position, WorldError> {
        self.call(self.world.actor_position()).await
    }

    pub async fn inventory(&self) -> Result<Vec<ItemStack>, WorldError> {
        self.call(self.world.inventory()).await
    }

    /// Walk to within reach of `target`.
    ///
    /// A move that ends out of reach is retried with a narrower goal until
    /// the movement policy runs out of attempts.
    pub async fn approach(&self, target: Position) -> Result<(), WorldError> {
        let policy = &self.policies.movement;
        let mut tolerance = APPROACH_TOLERANCE;
        let mut attempt = 1;

        loop {
            match self.call(self.world.move_to(target, tolerance)).await {
                Ok(()) => {}
                Err(e @ (WorldError::Cancelled | WorldError::Disconnected(_))) => return Err(e),
                Err(e) => debug!(target = %target, attempt, error = %e, "Move failed"),
            }

            let distance = self.actor_position().await?.distance_to(target);
            if distance <= REACH {
                return Ok(());
            }
            if !policy.allows_retry(attempt) {
                return Err(WorldError::Unreachable { target, distance });
            }

            let narrowed = (distance.floor() as u32).saturating_sub(1);
            tolerance = narrowed.min(tolerance.saturating_sub(1));
            warn!(target = %target, distance, tolerance, "Out of reach, retrying with a narrower goal");
            self.settle(policy.backoff(attempt - 1)).await?;
            attempt += 1;
        }
    }

    /// Open the container at `position`.
    ///
    /// Each attempt races the container-open timeout. A timeout is reported
    /// as [`WorldError::ContainerTimeout`] and never retried.
    pub async fn open(&self, position: Position) -> Result<Box<dyn ContainerHandle>, WorldError> {
        let policy = &self.policies.container_open;
        let timeout = self.timing.container_open_timeout();
        let mut attempt = 1;

        loop {
            let opened = tokio::time::timeout(timeout, self.call(self.world.open_container(position)))
                .await
                .unwrap_or(Err(WorldError::ContainerTimeout { position, timeout }));

            match opened {
                Ok(handle) => return Ok(handle),
                Err(e) if e.is_retryable() && policy.allows_retry(attempt) => {
                    warn!(position = %position, attempt, error = %e, "Container did not open, retrying");
                    self.settle(policy.backoff(attempt - 1)).await?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Close a container window and let the world settle.
    pub async fn close(&self, handle: &mut Box<dyn ContainerHandle>) -> Result<(), WorldError> {
        let position = handle.position();
        if let Err(e) = self.call(handle.close()).await {
            if e == WorldError::Cancelled {
                return Err(e);
            }
            warn!(position = %position, error = %e, "Failed to close container");
        }
        self.settle(self.timing.close_settle()).await
    }

    pub async fn equip(&self, item: ItemId) -> Result<(), WorldError> {
        self.call(self.world.equip(item, EquipSlot::Hand)).await
    }

    /// Equip the first held stack matching `pick`.
    pub async fn equip_matching(
        &self,
        what: &str,
        pick: impl Fn(&ItemStack) -> bool,
    ) -> Result<ItemStack, WorldError> {
        let stack = self
            .inventory()
            .await?
            .into_iter()
            .find(|s| pick(s))
            .ok_or_else(|| WorldError::NotHeld(what.to_string()))?;
        self.equip(stack.id).await?;
        Ok(stack)
    }

    /// Equip the most preferred breaking tool the actor holds, if any.
    pub async fn equip_break_tool(&self) -> Result<Option<String>, WorldError> {
        let held = self.inventory().await?;
        for tool in &self.break_tools {
            if let Some(stack) = held.iter().find(|s| s.name == *tool) {
                self.equip(stack.id).await?;
                return Ok(Some(tool.clone()));
            }
        }
        debug!("No breaking tool held");
        Ok(None)
    }

    /// Whether the cell at `position` holds a solid block.
    pub async fn is_occupied(&self, position: Position) -> Result<bool, WorldError> {
        Ok(self
            .call(self.world.block_at(position))
            .await?
            .is_some_and(|b| !b.is_empty()))
    }

    /// Place the held block into `target`, resting on `reference`.
    ///
    /// Success is confirmed by polling the target cell until the block shows
    /// up. Failed attempts follow the placement policy.
    pub async fn place(&self, reference: Position, target: Position) -> Result<(), WorldError> {
        let policy = &self.policies.placement;
        let face = Position::new(
            target.x - reference.x,
            target.y - reference.y,
            target.z - reference.z,
        );
        let mut attempt = 1;

        loop {
            let error = match self.call(self.world.place_block(reference, face)).await {
                Ok(()) => {
                    if self.block_appears(target).await? {
                        return Ok(());
                    }
                    WorldError::action("place", format!("no block appeared at {target}"))
                }
                Err(e @ (WorldError::Cancelled | WorldError::Disconnected(_))) => return Err(e),
                Err(e) => {
                    // The world may have applied the placement even though the call failed
                    if self.is_occupied(target).await? {
                        debug!(target = %target, error = %e, "Placement reported failure but block is present");
                        return Ok(());
                    }
                    e
                }
            };

            if !error.is_retryable() || !policy.allows_retry(attempt) {
                return Err(error);
            }
            warn!(target = %target, attempt, error = %error, "Placement failed, retrying");
            self.settle(policy.backoff(attempt - 1)).await?;
            attempt += 1;
        }
    }

    async fn block_appears(&self, target: Position) -> Result<bool, WorldError> {
        let world = Arc::clone(&self.world);
        wait_until(
            &self.cancel,
            self.timing.poll_interval(),
            self.timing.poll_timeout(),
            move || {
                let world = Arc::clone(&world);
                async move { Ok(world.block_at(target).await?.is_some_and(|b| !b.is_empty())) }
            },
        )
        .await
    }

    pub async fn break_block(&self, position: Position) -> Result<(), WorldError> {
        self.call(self.world.break_block(position)).await
    }

    /// Wait for drops to land, then walk over each of `spots` and any drop
    /// still in sight. Failures to reach a drop are logged and skipped.
    pub async fn collect_drops(&self, spots: &[Position]) -> Result<u32, WorldError> {
        self.settle(self.timing.drop_settle()).await?;

        let mut visited = 0;
        for &spot in spots {
            match self.call(self.world.move_to(spot, 0)).await {
                Ok(()) => visited += 1,
                Err(WorldError::Cancelled) => return Err(WorldError::Cancelled),
                Err(e) => warn!(position = %spot, error = %e, "Could not reach drop"),
            }
        }

        let remaining = self.call(self.world.nearby_drops()).await?;
        for dropped in remaining {
            match self.call(self.world.move_to(dropped.position, 0)).await {
                Ok(()) => visited += 1,
                Err(WorldError::Cancelled) => return Err(WorldError::Cancelled),
                Err(e) => warn!(position = %dropped.position, error = %e, "Could not reach drop"),
            }
        }
        Ok(visited)
    }

    /// Deposit held packaged containers into `handle`, one unit at a time.
    ///
    /// Keeps polling the inventory until `expected` units went in, giving up
    /// after `drain_idle_passes` passes without progress. With `exhaust`
    /// set, also deposits whatever packaged containers remain held after
    /// that. Returns the number deposited.
    pub async fn drain_packaged(
        &self,
        handle: &mut Box<dyn ContainerHandle>,
        expected: u32,
        exhaust: bool,
    ) -> Result<u32, WorldError> {
        let idle_limit = self.timing.drain_idle_passes.max(1);
        let mut deposited = 0;
        let mut idle = 0;

        loop {
            if deposited >= expected && !exhaust {
                break;
            }
            let next = self
                .inventory()
                .await?
                .into_iter()
                .find(ItemStack::is_packaged_container);

            let Some(stack) = next else {
                if deposited >= expected {
                    break;
                }
                idle += 1;
                if idle >= idle_limit {
                    warn!(deposited, expected, "Gave up waiting for containers to reach the inventory");
                    break;
                }
                debug!(deposited, expected, idle, "No containers held yet, polling again");
                self.settle(self.timing.poll_interval()).await?;
                continue;
            };

            match self.call(handle.deposit(stack.id, 1)).await {
                Ok(()) => {
                    deposited += 1;
                    idle = 0;
                    self.converge().await?;
                }
                Err(WorldError::Cancelled) => return Err(WorldError::Cancelled),
                Err(e) => {
                    warn!(position = %handle.position(), error = %e, "Deposit failed");
                    idle += 1;
                    if idle >= idle_limit {
                        break;
                    }
                    self.settle(self.timing.poll_interval()).await?;
                }
            }
        }
        Ok(deposited)
    }
}
