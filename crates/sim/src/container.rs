//! Open-container handle for the simulated world.

use async_trait::async_trait;
use kitsmith_core::{ContainerHandle, ItemId, ItemStack, Position, WorldError};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::inventory;
use crate::registry::Registry;
use crate::state::{SimAction, SimState};
use crate::ACTOR_SLOTS;

pub struct SimContainer {
    pub(crate) state: Arc<Mutex<SimState>>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) position: Position,
    /// Primary half for double containers.
    pub(crate) canonical: Position,
}

#[async_trait]
impl ContainerHandle for SimContainer {
    fn position(&self) -> Position {
        self.position
    }

    async fn slots(&self) -> Result<Vec<ItemStack>, WorldError> {
        let state = self.state.lock().await;
        state
            .containers
            .get(&self.canonical)
            .map(|c| c.slots.clone())
            .ok_or(WorldError::NotAContainer(self.position))
    }

    async fn withdraw(&mut self, item: ItemId, count: u32) -> Result<(), WorldError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.actions.push(SimAction::Withdraw {
            at: self.position,
            item,
            count,
        });

        let container = state
            .containers
            .get_mut(&self.canonical)
            .ok_or(WorldError::NotAContainer(self.position))?;
        let taken = inventory::take(&mut container.slots, item, count).ok_or_else(|| {
            WorldError::action(
                "withdraw",
                format!("container at {} holds fewer than {count} of item {item}", self.position),
            )
        })?;

        let registry = &self.registry;
        if !inventory::put(
            &mut state.inventory,
            taken.clone(),
            |id| registry.stack_size(id),
            ACTOR_SLOTS,
        ) {
            // Put the items back where they came from
            inventory::put(&mut container.slots, taken, |id| registry.stack_size(id), usize::MAX);
            return Err(WorldError::action("withdraw", "actor inventory is full"));
        }
        Ok(())
    }

    async fn deposit(&mut self, item: ItemId, count: u32) -> Result<(), WorldError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.actions.push(SimAction::Deposit {
            at: self.position,
            item,
            count,
        });

        let container = state
            .containers
            .get_mut(&self.canonical)
            .ok_or(WorldError::NotAContainer(self.position))?;
        let taken = inventory::take(&mut state.inventory, item, count).ok_or_else(|| {
            WorldError::action("deposit", format!("actor holds fewer than {count} of item {item}"))
        })?;

        let registry = &self.registry;
        if !inventory::put(
            &mut container.slots,
            taken.clone(),
            |id| registry.stack_size(id),
            container.capacity,
        ) {
            inventory::put(&mut state.inventory, taken, |id| registry.stack_size(id), usize::MAX);
            return Err(WorldError::action(
                "deposit",
                format!("container at {} is full", self.position),
            ));
        }
        state.release_held_if_gone();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), WorldError> {
        self.state.lock().await.actions.push(SimAction::Close(self.position));
        Ok(())
    }
}
