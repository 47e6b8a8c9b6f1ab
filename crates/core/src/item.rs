//! Items, blocks and dropped entities as seen through the world collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::position::Position;

/// Numeric item-type identifier from the world's item registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry entry for an item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "default_stack_size")]
    pub stack_size: u32,
}

fn default_stack_size() -> u32 {
    64
}

impl ItemInfo {
    /// Display name, falling back to a title-cased form of the registry name.
    pub fn label(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => self
                .name
                .split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// A stack of items occupying one slot.
///
/// Packaged containers carry their content summary in `contents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub id: ItemId,
    pub name: String,
    pub count: u32,
    #[serde(default)]
    pub slot: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<ItemStack>,
}

impl ItemStack {
    pub fn new(id: ItemId, name: impl Into<String>, count: u32) -> Self {
        Self {
            id,
            name: name.into(),
            count,
            slot: 0,
            contents: Vec::new(),
        }
    }

    pub fn in_slot(mut self, slot: usize) -> Self {
        self.slot = slot;
        self
    }

    pub fn with_contents(mut self, contents: Vec<ItemStack>) -> Self {
        self.contents = contents;
        self
    }

    /// Whether this item is a packaged container (any colour of shulker box).
    pub fn is_packaged_container(&self) -> bool {
        is_packaged_container_name(&self.name)
    }
}

/// Name predicate shared by items and placed blocks.
pub fn is_packaged_container_name(name: &str) -> bool {
    name.ends_with("shulker_box")
}

/// Horizontal facing of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    #[default]
    North,
    South,
    East,
    West,
}

impl Facing {
    /// The direction obtained by turning clockwise when seen from above.
    pub fn clockwise(self) -> Facing {
        match self {
            Facing::North => Facing::East,
            Facing::East => Facing::South,
            Facing::South => Facing::West,
            Facing::West => Facing::North,
        }
    }

    pub fn counter_clockwise(self) -> Facing {
        self.clockwise().clockwise().clockwise()
    }

    fn step(self) -> (i32, i32) {
        match self {
            Facing::North => (0, -1),
            Facing::South => (0, 1),
            Facing::East => (1, 0),
            Facing::West => (-1, 0),
        }
    }
}

/// Which half of a storage container a block is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChestKind {
    #[default]
    Single,
    Left,
    Right,
}

/// A block in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub position: Position,
    pub name: String,
    /// Whether the block has a non-empty collision box.
    #[serde(default = "default_solid")]
    pub solid: bool,
    #[serde(default)]
    pub facing: Facing,
    #[serde(default)]
    pub chest: ChestKind,
}

fn default_solid() -> bool {
    true
}

impl Block {
    pub fn new(position: Position, name: impl Into<String>) -> Self {
        let name = name.into();
        let solid = name != "air";
        Self {
            position,
            name,
            solid,
            facing: Facing::default(),
            chest: ChestKind::default(),
        }
    }

    pub fn air(position: Position) -> Self {
        Self::new(position, "air")
    }

    /// Whether the cell is free for placement.
    pub fn is_empty(&self) -> bool {
        !self.solid
    }

    /// Double-width container predicate.
    pub fn is_double_chest(&self) -> bool {
        matches!(self.chest, ChestKind::Left | ChestKind::Right)
    }

    pub fn is_packaged_container(&self) -> bool {
        is_packaged_container_name(&self.name)
    }

    /// Position of the other half of a double-width container.
    ///
    /// A left half connects clockwise of its facing, a right half
    /// counter-clockwise.
    pub fn paired_half(&self) -> Option<Position> {
        let dir = match self.chest {
            ChestKind::Single => return None,
            ChestKind::Left => self.facing.clockwise(),
            ChestKind::Right => self.facing.counter_clockwise(),
        };
        let (dx, dz) = dir.step();
        Some(self.position.offset(dx, 0, dz))
    }
}

/// Query passed to the world's block search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockQuery {
    /// Blocks with this registry name.
    Named(String),
    /// Blocks with any of these names.
    AnyOf(Vec<String>),
}

impl BlockQuery {
    pub fn matches(&self, block: &Block) -> bool {
        match self {
            BlockQuery::Named(name) => block.name == *name,
            BlockQuery::AnyOf(names) => names.iter().any(|n| *n == block.name),
        }
    }
}

/// A dropped item entity lying in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedItem {
    pub entity_id: u64,
    pub position: Position,
    pub item: ItemStack,
}
