//! The simulated world and its builder.

use async_trait::async_trait;
use kitsmith_core::{
    Block, BlockQuery, ChestKind, ContainerHandle, DroppedItem, EquipSlot, Facing, ItemId,
    ItemInfo, ItemStack, Position, World, WorldError,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::container::SimContainer;
use crate::inventory;
use crate::registry::Registry;
use crate::state::{ContainerState, Faults, SimAction, SimState};
use crate::REACH;

const SINGLE_SLOTS: usize = 27;
const DOUBLE_SLOTS: usize = 54;
const DROP_SIGHT: f64 = 16.0;

/// An in-memory world. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SimWorld {
    state: Arc<Mutex<SimState>>,
    registry: Arc<Registry>,
}

impl SimWorld {
    /// Start building a world over the standard registry.
    pub fn builder() -> SimWorldBuilder {
        SimWorldBuilder::new(Registry::standard())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // --- Observation ---

    pub async fn actor(&self) -> Position {
        self.state.lock().await.actor
    }

    pub async fn block(&self, position: Position) -> Option<Block> {
        self.state.lock().await.blocks.get(&position).cloned()
    }

    /// Slots of the container at `position` (either half of a double one).
    pub async fn container_slots(&self, position: Position) -> Option<Vec<ItemStack>> {
        let state = self.state.lock().await;
        let canonical = state.canonical(position);
        state.containers.get(&canonical).map(|c| c.slots.clone())
    }

    /// Total count of a named item inside a container.
    pub async fn container_count(&self, position: Position, name: &str) -> u32 {
        let Some(info) = self.registry.get(name) else {
            return 0;
        };
        self.container_slots(position)
            .await
            .map(|slots| inventory::count(&slots, info.id))
            .unwrap_or(0)
    }

    /// Total count of a named item held by the actor, without advancing
    /// delayed pickups.
    pub async fn held_count(&self, name: &str) -> u32 {
        let Some(info) = self.registry.get(name) else {
            return 0;
        };
        inventory::count(&self.state.lock().await.inventory, info.id)
    }

    pub async fn drops(&self) -> Vec<DroppedItem> {
        self.state.lock().await.drops.clone()
    }

    /// Every actuation so far, in call order.
    pub async fn actions(&self) -> Vec<SimAction> {
        self.state.lock().await.actions.clone()
    }

    pub async fn clear_actions(&self) {
        self.state.lock().await.actions.clear();
    }

    // --- Mutation between steps ---

    pub async fn set_container_slots(&self, position: Position, slots: Vec<ItemStack>) {
        let mut state = self.state.lock().await;
        let canonical = state.canonical(position);
        if let Some(container) = state.containers.get_mut(&canonical) {
            container.slots = slots
                .into_iter()
                .enumerate()
                .map(|(slot, stack)| stack.in_slot(slot))
                .collect();
        }
    }

    // --- Fault injection ---

    /// Moves towards `target` fail outright `times` times.
    pub async fn fail_moves(&self, target: Position, times: u32) {
        self.state.lock().await.faults.unreachable.insert(target, times);
    }

    /// Moves towards `target` report success but leave the actor where it
    /// was, `times` times.
    pub async fn stop_short(&self, target: Position, times: u32) {
        self.state.lock().await.faults.short_stops.insert(target, times);
    }

    pub async fn fail_opens(&self, position: Position, times: u32) {
        self.state.lock().await.faults.open_failures.insert(position, times);
    }

    /// Opening the container at `position` never completes.
    pub async fn hang_opens(&self, position: Position) {
        self.state.lock().await.faults.hanging_opens.insert(position);
    }

    /// Placements into the cell `target` fail `times` times.
    pub async fn fail_places(&self, target: Position, times: u32) {
        self.state.lock().await.faults.place_failures.insert(target, times);
    }

    pub async fn fail_breaks(&self, position: Position, times: u32) {
        self.state.lock().await.faults.break_failures.insert(position, times);
    }

    /// Picked-up drops appear in the inventory only after `polls` further
    /// inventory reads.
    pub async fn delay_pickups(&self, polls: u32) {
        self.state.lock().await.faults.pickup_delay = polls;
    }
}

#[async_trait]
impl World for SimWorld {
    async fn actor_position(&self) -> Result<Position, WorldError> {
        Ok(self.state.lock().await.actor)
    }

    async fn move_to(&self, target: Position, tolerance: u32) -> Result<(), WorldError> {
        let mut state = self.state.lock().await;
        state.actions.push(SimAction::Move(target));

        if Faults::trip(&mut state.faults.unreachable, target) {
            let distance = state.actor.distance_to(target);
            return Err(WorldError::Unreachable { target, distance });
        }
        if Faults::trip(&mut state.faults.short_stops, target) {
            debug!(target = %target, "Simulated move stopped short");
            return Ok(());
        }

        state.actor = if tolerance == 0 { target } else { target.above() };
        state.collect_drops(&self.registry);
        Ok(())
    }

    async fn find_blocks(
        &self,
        query: BlockQuery,
        max_distance: u32,
        max_count: usize,
    ) -> Result<Vec<Position>, WorldError> {
        let state = self.state.lock().await;
        let actor = state.actor;
        let mut found: Vec<Position> = state
            .blocks
            .values()
            .filter(|b| query.matches(b) && actor.distance_to(b.position) <= f64::from(max_distance))
            .map(|b| b.position)
            .collect();
        found.sort_by(|a, b| {
            actor
                .distance_to(*a)
                .total_cmp(&actor.distance_to(*b))
                .then(a.cmp(b))
        });
        found.truncate(max_count);
        Ok(found)
    }

    async fn block_at(&self, position: Position) -> Result<Option<Block>, WorldError> {
        let state = self.state.lock().await;
        Ok(Some(
            state
                .blocks
                .get(&position)
                .cloned()
                .unwrap_or_else(|| Block::air(position)),
        ))
    }

    async fn open_container(
        &self,
        position: Position,
    ) -> Result<Box<dyn ContainerHandle>, WorldError> {
        let hang = {
            let mut state = self.state.lock().await;
            state.actions.push(SimAction::Open(position));
            state.faults.hanging_opens.contains(&position)
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock().await;
        let canonical = state.canonical(position);
        if !state.containers.contains_key(&canonical) {
            return Err(WorldError::NotAContainer(position));
        }
        if Faults::trip(&mut state.faults.open_failures, position) {
            return Err(WorldError::action("open container", "window did not open"));
        }
        let distance = state.actor.distance_to(position);
        if distance > REACH {
            return Err(WorldError::action(
                "open container",
                format!("{position} is {distance:.1} blocks away"),
            ));
        }

        Ok(Box::new(SimContainer {
            state: Arc::clone(&self.state),
            registry: Arc::clone(&self.registry),
            position,
            canonical,
        }))
    }

    async fn equip(&self, item: ItemId, _slot: EquipSlot) -> Result<(), WorldError> {
        let mut state = self.state.lock().await;
        state.actions.push(SimAction::Equip(item));
        if inventory::count(&state.inventory, item) == 0 {
            let name = self
                .registry
                .by_id(item)
                .map(|info| info.name.clone())
                .unwrap_or_else(|| item.to_string());
            return Err(WorldError::NotHeld(name));
        }
        state.held = Some(item);
        Ok(())
    }

    async fn place_block(&self, reference: Position, face: Position) -> Result<(), WorldError> {
        let target = reference.offset(face.x, face.y, face.z);
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.actions.push(SimAction::Place(target));

        state.release_held_if_gone();
        let held = state
            .held
            .ok_or_else(|| WorldError::NotHeld("placeable block".into()))?;

        if Faults::trip(&mut state.faults.place_failures, target) {
            return Err(WorldError::action("place", "block update was not confirmed"));
        }
        let support_solid = state.blocks.get(&reference).is_some_and(|b| b.solid);
        if !support_solid {
            return Err(WorldError::action("place", format!("no solid block at {reference}")));
        }
        if state.blocks.get(&target).is_some_and(|b| b.solid) {
            return Err(WorldError::action("place", format!("{target} is occupied")));
        }

        let mut taken = inventory::take(&mut state.inventory, held, 1)
            .ok_or_else(|| WorldError::NotHeld(held.to_string()))?;
        let Some(stack) = taken.pop() else {
            return Err(WorldError::NotHeld(held.to_string()));
        };

        state.blocks.insert(target, Block::new(target, &stack.name));
        if stack.is_packaged_container() {
            state.containers.insert(
                target,
                ContainerState {
                    capacity: SINGLE_SLOTS,
                    slots: stack.contents,
                },
            );
        }
        state.release_held_if_gone();
        Ok(())
    }

    async fn break_block(&self, position: Position) -> Result<(), WorldError> {
        let mut state = self.state.lock().await;
        state.actions.push(SimAction::Break(position));

        if Faults::trip(&mut state.faults.break_failures, position) {
            return Err(WorldError::action("dig", format!("digging {position} was interrupted")));
        }
        let block = match state.blocks.remove(&position) {
            Some(b) if b.solid => b,
            Some(b) => {
                state.blocks.insert(position, b);
                return Err(WorldError::NoBlock(position));
            }
            None => return Err(WorldError::NoBlock(position)),
        };

        let contents = state
            .containers
            .remove(&position)
            .map(|c| c.slots)
            .unwrap_or_default();

        if let Some(info) = self.registry.get(&block.name) {
            let mut item = ItemStack::new(info.id, &info.name, 1);
            if block.is_packaged_container() {
                item = item.with_contents(contents);
            }
            state.spawn_drop(position, item);
        }
        Ok(())
    }

    async fn inventory(&self) -> Result<Vec<ItemStack>, WorldError> {
        let mut state = self.state.lock().await;
        state.tick_pending(&self.registry);
        Ok(state.inventory.clone())
    }

    async fn nearby_drops(&self) -> Result<Vec<DroppedItem>, WorldError> {
        let state = self.state.lock().await;
        let actor = state.actor;
        Ok(state
            .drops
            .iter()
            .filter(|d| d.position.distance_to(actor) <= DROP_SIGHT)
            .cloned()
            .collect())
    }

    fn item_by_name(&self, name: &str) -> Option<ItemInfo> {
        self.registry.get(name).cloned()
    }

    fn item_by_id(&self, id: ItemId) -> Option<ItemInfo> {
        self.registry.by_id(id).cloned()
    }

    fn items(&self) -> Vec<ItemInfo> {
        self.registry.all().to_vec()
    }
}

/// Builds a [`SimWorld`] before it is shared.
pub struct SimWorldBuilder {
    registry: Registry,
    state: SimState,
}

impl SimWorldBuilder {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            state: SimState::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn actor_at(mut self, position: Position) -> Self {
        self.state.actor = position;
        self
    }

    pub fn block(mut self, position: Position, name: &str) -> Self {
        self.state.blocks.insert(position, Block::new(position, name));
        self
    }

    /// Insert a fully specified block.
    pub fn raw_block(mut self, block: Block) -> Self {
        self.state.blocks.insert(block.position, block);
        self
    }

    /// Fill every position with the same block.
    pub fn blocks(mut self, positions: impl IntoIterator<Item = Position>, name: &str) -> Self {
        for position in positions {
            self.state.blocks.insert(position, Block::new(position, name));
        }
        self
    }

    /// A single-width chest.
    pub fn chest(self, position: Position, slots: Vec<ItemStack>) -> Self {
        self.container(Block::new(position, "chest"), SINGLE_SLOTS, slots)
    }

    /// A double-width chest whose primary (left) half is at `position`.
    pub fn double_chest(mut self, position: Position, facing: Facing, slots: Vec<ItemStack>) -> Self {
        let left = Block {
            facing,
            chest: ChestKind::Left,
            ..Block::new(position, "chest")
        };
        if let Some(other) = left.paired_half() {
            let right = Block {
                facing,
                chest: ChestKind::Right,
                ..Block::new(other, "chest")
            };
            self.state.blocks.insert(other, right);
            self.state.links.insert(other, position);
        }
        self.container(left, DOUBLE_SLOTS, slots)
    }

    /// Any container block. Secondary double-chest halves link to their
    /// partner.
    pub fn container(mut self, block: Block, capacity: usize, slots: Vec<ItemStack>) -> Self {
        let position = block.position;
        if block.chest == ChestKind::Right
            && let Some(primary) = block.paired_half()
        {
            self.state.links.insert(position, primary);
            self.state.blocks.insert(position, block);
            return self;
        }
        self.state.blocks.insert(position, block);
        let slots = slots
            .into_iter()
            .enumerate()
            .map(|(slot, stack)| stack.in_slot(slot))
            .collect();
        self.state
            .containers
            .insert(position, ContainerState { capacity, slots });
        self
    }

    /// Put items into the actor's inventory.
    pub fn give(mut self, stacks: Vec<ItemStack>) -> Self {
        let registry = &self.registry;
        inventory::put(
            &mut self.state.inventory,
            stacks,
            |id| registry.stack_size(id),
            usize::MAX,
        );
        self
    }

    pub fn build(self) -> SimWorld {
        debug!(
            blocks = self.state.blocks.len(),
            containers = self.state.containers.len(),
            "Simulated world built"
        );
        SimWorld {
            state: Arc::new(Mutex::new(self.state)),
            registry: Arc::new(self.registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apples(world: &SimWorldBuilder, n: u32) -> ItemStack {
        world.registry().stack("golden_apple", n).unwrap()
    }

    #[tokio::test]
    async fn withdraw_and_deposit_move_items() {
        let chest = Position::new(3, 64, 0);
        let builder = SimWorld::builder();
        let stack = apples(&builder, 64);
        let world = builder.chest(chest, vec![stack]).build();
        let apple = world.item_by_name("golden_apple").unwrap().id;

        world.move_to(chest, 2).await.unwrap();
        let mut handle = world.open_container(chest).await.unwrap();
        handle.withdraw(apple, 10).await.unwrap();
        assert_eq!(world.held_count("golden_apple").await, 10);
        assert_eq!(world.container_count(chest, "golden_apple").await, 54);

        handle.deposit(apple, 4).await.unwrap();
        assert_eq!(world.container_count(chest, "golden_apple").await, 58);
        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn opening_far_containers_fails() {
        let chest = Position::new(30, 64, 0);
        let world = SimWorld::builder().chest(chest, vec![]).build();
        let err = world.open_container(chest).await.err().unwrap();
        assert!(matches!(err, WorldError::ActionFailed { .. }));
    }

    #[tokio::test]
    async fn double_chest_halves_share_inventory() {
        let left = Position::new(2, 64, 2);
        let builder = SimWorld::builder();
        let stack = apples(&builder, 5);
        let world = builder.double_chest(left, Facing::North, vec![stack]).build();
        let right = world.block(left).await.unwrap().paired_half().unwrap();

        assert_eq!(world.container_count(right, "golden_apple").await, 5);
        assert_eq!(world.block(right).await.unwrap().paired_half(), Some(left));
    }

    #[tokio::test]
    async fn placed_packaged_container_keeps_contents() {
        let ground = Position::new(1, 63, 0);
        let builder = SimWorld::builder().block(ground, "smooth_stone");
        let shulker = builder
            .registry()
            .packaged_full_of("shulker_box", "ender_pearl", 2)
            .unwrap();
        let world = builder.give(vec![shulker]).build();
        let id = world.item_by_name("shulker_box").unwrap().id;

        world.equip(id, EquipSlot::Hand).await.unwrap();
        world.place_block(ground, Position::new(0, 1, 0)).await.unwrap();

        let placed = ground.above();
        assert!(world.block(placed).await.unwrap().is_packaged_container());
        assert_eq!(world.container_count(placed, "ender_pearl").await, 32);
        assert_eq!(world.held_count("shulker_box").await, 0);
    }

    #[tokio::test]
    async fn broken_container_drops_with_contents_and_is_collected() {
        let ground = Position::new(1, 63, 0);
        let builder = SimWorld::builder()
            .actor_at(Position::new(0, 64, 0))
            .block(ground, "smooth_stone");
        let shulker = builder
            .registry()
            .packaged_full_of("shulker_box", "arrow", 1)
            .unwrap();
        let world = builder.give(vec![shulker]).build();
        let id = world.item_by_name("shulker_box").unwrap().id;
        world.equip(id, EquipSlot::Hand).await.unwrap();
        world.place_block(ground, Position::new(0, 1, 0)).await.unwrap();

        let placed = ground.above();
        world.break_block(placed).await.unwrap();
        let drops = world.nearby_drops().await.unwrap();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].item.contents.len(), 1);

        world.move_to(drops[0].position, 0).await.unwrap();
        assert_eq!(world.held_count("shulker_box").await, 1);
        assert!(world.drops().await.is_empty());
    }

    #[tokio::test]
    async fn delayed_pickups_surface_after_polls() {
        let ground = Position::new(1, 63, 0);
        let world = SimWorld::builder().block(ground, "smooth_stone").build();
        world.delay_pickups(2).await;
        world.break_block(ground).await.unwrap();
        world.move_to(ground, 0).await.unwrap();

        assert_eq!(world.inventory().await.unwrap().len(), 0);
        assert_eq!(world.inventory().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn injected_move_faults() {
        let target = Position::new(10, 64, 10);
        let world = SimWorld::builder().build();
        world.fail_moves(target, 1).await;
        assert!(matches!(
            world.move_to(target, 2).await,
            Err(WorldError::Unreachable { .. })
        ));
        world.move_to(target, 2).await.unwrap();
        assert_eq!(world.actor().await, target.above());

        world.stop_short(Position::ORIGIN, 1).await;
        world.move_to(Position::ORIGIN, 2).await.unwrap();
        assert_eq!(world.actor().await, target.above());
    }

    #[tokio::test]
    async fn find_blocks_is_nearest_first() {
        let world = SimWorld::builder()
            .actor_at(Position::new(0, 64, 0))
            .blocks(
                [
                    Position::new(9, 63, 0),
                    Position::new(2, 63, 0),
                    Position::new(5, 63, 0),
                ],
                "smooth_stone",
            )
            .block(Position::new(1, 63, 0), "stone")
            .build();
        let found = world
            .find_blocks(BlockQuery::Named("smooth_stone".into()), 8, 10)
            .await
            .unwrap();
        assert_eq!(found, vec![Position::new(2, 63, 0), Position::new(5, 63, 0)]);
    }
}
