//! World trait — the abstraction over the actor and the environment it acts in.
//!
//! Every method is an asynchronous suspension point. Callers must await each
//! call to completion before issuing the next one: later steps depend on the
//! physical consequences of earlier ones.

use async_trait::async_trait;

use crate::error::WorldError;
use crate::item::{Block, BlockQuery, DroppedItem, ItemId, ItemInfo, ItemStack};
use crate::position::Position;

/// Equipment slot for [`World::equip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipSlot {
    Hand,
    OffHand,
}

/// An open container window.
///
/// Obtained from [`World::open_container`]; must be closed before the actor
/// opens another one.
#[async_trait]
pub trait ContainerHandle: Send + Sync {
    /// Position of the container block.
    fn position(&self) -> Position;

    /// Occupied container slots, refreshed after every mutation.
    async fn slots(&self) -> Result<Vec<ItemStack>, WorldError>;

    /// Move `count` items of type `item` from the container to the actor.
    async fn withdraw(&mut self, item: ItemId, count: u32) -> Result<(), WorldError>;

    /// Move `count` items of type `item` from the actor into the container.
    async fn deposit(&mut self, item: ItemId, count: u32) -> Result<(), WorldError>;

    /// Close the window.
    async fn close(&mut self) -> Result<(), WorldError>;
}

/// The actuation and sensing capability consumed from the environment.
#[async_trait]
pub trait World: Send + Sync {
    /// Current actor position.
    async fn actor_position(&self) -> Result<Position, WorldError>;

    /// Path towards `target` until within `tolerance` cells.
    async fn move_to(&self, target: Position, tolerance: u32) -> Result<(), WorldError>;

    /// Search for matching blocks within `max_distance` of the actor,
    /// nearest first, returning at most `max_count` positions.
    async fn find_blocks(
        &self,
        query: BlockQuery,
        max_distance: u32,
        max_count: usize,
    ) -> Result<Vec<Position>, WorldError>;

    /// The block at a position, or `None` if the chunk is not loaded.
    async fn block_at(&self, position: Position) -> Result<Option<Block>, WorldError>;

    /// Open the container at a position.
    async fn open_container(&self, position: Position)
    -> Result<Box<dyn ContainerHandle>, WorldError>;

    /// Hold an inventory item.
    async fn equip(&self, item: ItemId, slot: EquipSlot) -> Result<(), WorldError>;

    /// Place the held block against `reference` on the face given by `face`
    /// (a unit offset, e.g. `0,1,0` for the top face).
    async fn place_block(&self, reference: Position, face: Position) -> Result<(), WorldError>;

    /// Break the block at a position with the held tool.
    async fn break_block(&self, position: Position) -> Result<(), WorldError>;

    /// Items currently held by the actor.
    async fn inventory(&self) -> Result<Vec<ItemStack>, WorldError>;

    /// Dropped item entities near the actor.
    async fn nearby_drops(&self) -> Result<Vec<DroppedItem>, WorldError>;

    /// Registry lookup by item name.
    fn item_by_name(&self, name: &str) -> Option<ItemInfo>;

    /// Registry lookup by id.
    fn item_by_id(&self, id: ItemId) -> Option<ItemInfo>;

    /// The full item registry.
    fn items(&self) -> Vec<ItemInfo>;
}
