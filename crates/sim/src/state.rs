use kitsmith_core::{Block, DroppedItem, ItemId, ItemStack, Position};
use std::collections::{HashMap, HashSet};

use crate::inventory;
use crate::registry::Registry;
use crate::ACTOR_SLOTS;

/// One actuation observed by the simulated world, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimAction {
    Move(Position),
    Open(Position),
    Close(Position),
    Withdraw { at: Position, item: ItemId, count: u32 },
    Deposit { at: Position, item: ItemId, count: u32 },
    Equip(ItemId),
    Place(Position),
    Break(Position),
}

#[derive(Debug, Clone)]
pub(crate) struct ContainerState {
    pub capacity: usize,
    pub slots: Vec<ItemStack>,
}

/// Injected failures. Counted faults fire that many times, then clear.
#[derive(Debug, Default)]
pub(crate) struct Faults {
    pub unreachable: HashMap<Position, u32>,
    pub short_stops: HashMap<Position, u32>,
    pub open_failures: HashMap<Position, u32>,
    pub place_failures: HashMap<Position, u32>,
    pub break_failures: HashMap<Position, u32>,
    pub hanging_opens: HashSet<Position>,
    pub pickup_delay: u32,
}

impl Faults {
    /// Consume one occurrence of a counted fault.
    pub fn trip(map: &mut HashMap<Position, u32>, position: Position) -> bool {
        match map.get_mut(&position) {
            Some(n) if *n > 0 => {
                if *n != u32::MAX {
                    *n -= 1;
                }
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct SimState {
    pub actor: Position,
    pub blocks: HashMap<Position, Block>,
    pub containers: HashMap<Position, ContainerState>,
    /// Secondary half of a double container → its primary half.
    pub links: HashMap<Position, Position>,
    pub inventory: Vec<ItemStack>,
    pub held: Option<ItemId>,
    pub drops: Vec<DroppedItem>,
    /// Picked-up items that appear after this many more inventory polls.
    pub pending: Vec<(u32, ItemStack)>,
    pub next_entity: u64,
    pub faults: Faults,
    pub actions: Vec<SimAction>,
}

impl SimState {
    pub fn canonical(&self, position: Position) -> Position {
        self.links.get(&position).copied().unwrap_or(position)
    }

    pub fn spawn_drop(&mut self, position: Position, item: ItemStack) {
        self.next_entity += 1;
        self.drops.push(DroppedItem {
            entity_id: self.next_entity,
            position,
            item,
        });
    }

    /// Pick up drops within two blocks of the actor.
    pub fn collect_drops(&mut self, registry: &Registry) {
        let actor = self.actor;
        let (near, far): (Vec<_>, Vec<_>) = std::mem::take(&mut self.drops)
            .into_iter()
            .partition(|d| d.position.distance_to(actor) <= 2.0);
        self.drops = far;

        for dropped in near {
            if self.faults.pickup_delay > 0 {
                self.pending.push((self.faults.pickup_delay, dropped.item));
            } else if !inventory::put(
                &mut self.inventory,
                vec![dropped.item.clone()],
                |id| registry.stack_size(id),
                ACTOR_SLOTS,
            ) {
                self.drops.push(dropped);
            }
        }
    }

    /// Advance delayed pickups by one inventory poll.
    pub fn tick_pending(&mut self, registry: &Registry) {
        let mut still_pending = Vec::new();
        for (polls, item) in std::mem::take(&mut self.pending) {
            if polls > 1 {
                still_pending.push((polls - 1, item));
            } else if !inventory::put(
                &mut self.inventory,
                vec![item.clone()],
                |id| registry.stack_size(id),
                ACTOR_SLOTS,
            ) {
                still_pending.push((1, item));
            }
        }
        self.pending = still_pending;
    }

    pub fn release_held_if_gone(&mut self) {
        if let Some(id) = self.held
            && inventory::count(&self.inventory, id) == 0
        {
            self.held = None;
        }
    }
}
