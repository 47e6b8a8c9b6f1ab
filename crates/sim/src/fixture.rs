//! JSON world fixtures for dry runs (`kitsmith --world fixture.json`).

use kitsmith_core::{Block, ItemInfo, ItemStack, Position};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::registry::Registry;
use crate::world::{SimWorld, SimWorldBuilder};

fn default_capacity() -> usize {
    27
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerFixture {
    /// The container block. A `right` chest half links to its partner and
    /// its own slots are ignored.
    pub block: Block,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub slots: Vec<ItemStack>,
}

/// A whole simulated world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldFixture {
    #[serde(default)]
    pub actor: Position,
    /// Item registry; empty means the standard registry.
    #[serde(default)]
    pub items: Vec<ItemInfo>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub containers: Vec<ContainerFixture>,
    #[serde(default)]
    pub inventory: Vec<ItemStack>,
}

impl WorldFixture {
    pub fn to_json(&self) -> Result<String, FixtureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(input: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), FixtureError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn into_world(self) -> SimWorld {
        let registry = if self.items.is_empty() {
            Registry::standard()
        } else {
            Registry::new(self.items)
        };

        let mut builder = SimWorldBuilder::new(registry).actor_at(self.actor);
        for block in self.blocks {
            builder = builder.raw_block(block);
        }
        for container in self.containers {
            builder = builder.container(container.block, container.capacity, container.slots);
        }
        builder.give(self.inventory).build()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
