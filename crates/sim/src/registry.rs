//! Item registry used by the simulated world.

use kitsmith_core::{ItemId, ItemInfo, ItemStack};
use std::collections::HashMap;

/// Item-type registry with name and id lookups.
#[derive(Debug, Clone)]
pub struct Registry {
    items: Vec<ItemInfo>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<ItemId, usize>,
}

impl Registry {
    pub fn new(items: Vec<ItemInfo>) -> Self {
        let by_name = items
            .iter()
            .enumerate()
            .map(|(i, info)| (info.name.clone(), i))
            .collect();
        let by_id = items.iter().enumerate().map(|(i, info)| (info.id, i)).collect();
        Self {
            items,
            by_name,
            by_id,
        }
    }

    /// A small registry covering the blocks, tools and kit items the
    /// workflow touches.
    pub fn standard() -> Self {
        const ITEMS: &[(u32, &str, u32)] = &[
            (1, "stone", 64),
            (2, "smooth_stone", 64),
            (3, "chest", 64),
            (4, "trapped_chest", 64),
            (5, "cobblestone", 64),
            (6, "obsidian", 64),
            (10, "golden_apple", 64),
            (11, "ender_pearl", 16),
            (12, "totem_of_undying", 1),
            (13, "arrow", 64),
            (14, "end_crystal", 64),
            (15, "experience_bottle", 64),
            (16, "enchanted_golden_apple", 64),
            (20, "diamond_pickaxe", 1),
            (21, "netherite_pickaxe", 1),
            (30, "shulker_box", 1),
            (31, "white_shulker_box", 1),
            (32, "red_shulker_box", 1),
            (33, "black_shulker_box", 1),
        ];
        Self::new(
            ITEMS
                .iter()
                .map(|&(id, name, stack_size)| ItemInfo {
                    id: ItemId(id),
                    name: name.to_string(),
                    display_name: None,
                    stack_size,
                })
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&ItemInfo> {
        self.by_name.get(name).map(|&i| &self.items[i])
    }

    pub fn by_id(&self, id: ItemId) -> Option<&ItemInfo> {
        self.by_id.get(&id).map(|&i| &self.items[i])
    }

    pub fn all(&self) -> &[ItemInfo] {
        &self.items
    }

    /// Stack size of an item type; unknown ids stack to 64.
    pub fn stack_size(&self, id: ItemId) -> u32 {
        self.by_id(id).map(|info| info.stack_size).unwrap_or(64)
    }

    /// A stack of a registered item.
    pub fn stack(&self, name: &str, count: u32) -> Option<ItemStack> {
        self.get(name).map(|info| ItemStack::new(info.id, &info.name, count))
    }

    /// A packaged container item carrying `contents`, one slot per stack.
    pub fn packaged(&self, name: &str, contents: Vec<ItemStack>) -> Option<ItemStack> {
        let contents = contents
            .into_iter()
            .enumerate()
            .map(|(slot, stack)| stack.in_slot(slot))
            .collect();
        self.stack(name, 1).map(|stack| stack.with_contents(contents))
    }

    /// A packaged container holding `slots` full stacks of `item`.
    pub fn packaged_full_of(&self, name: &str, item: &str, slots: usize) -> Option<ItemStack> {
        let info = self.get(item)?;
        let contents = (0..slots)
            .map(|_| ItemStack::new(info.id, &info.name, info.stack_size))
            .collect();
        self.packaged(name, contents)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}
