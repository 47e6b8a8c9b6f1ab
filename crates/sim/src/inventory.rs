//! Slot bookkeeping shared by containers and the actor inventory.

use kitsmith_core::{ItemId, ItemStack};

pub(crate) fn count(stacks: &[ItemStack], id: ItemId) -> u32 {
    stacks.iter().filter(|s| s.id == id).map(|s| s.count).sum()
}

/// Remove exactly `amount` items of `id`, front to back.
///
/// Returns `None` and leaves `stacks` untouched if fewer are present.
pub(crate) fn take(stacks: &mut Vec<ItemStack>, id: ItemId, amount: u32) -> Option<Vec<ItemStack>> {
    if amount == 0 || count(stacks, id) < amount {
        return None;
    }

    let mut taken = Vec::new();
    let mut remaining = amount;
    let mut i = 0;
    while remaining > 0 && i < stacks.len() {
        if stacks[i].id != id {
            i += 1;
            continue;
        }
        if stacks[i].count <= remaining {
            remaining -= stacks[i].count;
            taken.push(stacks.remove(i));
        } else {
            stacks[i].count -= remaining;
            let mut part = stacks[i].clone();
            part.count = remaining;
            taken.push(part);
            remaining = 0;
        }
    }
    renumber(stacks);
    Some(taken)
}

/// Add stacks, merging plain items up to their stack size.
///
/// Packaged containers never merge. Returns `false` and leaves `stacks`
/// untouched if the result would exceed `capacity` slots.
pub(crate) fn put(
    stacks: &mut Vec<ItemStack>,
    incoming: Vec<ItemStack>,
    stack_size: impl Fn(ItemId) -> u32,
    capacity: usize,
) -> bool {
    let mut next = stacks.clone();
    for stack in incoming {
        let size = stack_size(stack.id).max(1);
        if !stack.contents.is_empty() || size == 1 {
            for _ in 0..stack.count {
                let mut unit = stack.clone();
                unit.count = 1;
                next.push(unit);
            }
            continue;
        }

        let mut remaining = stack.count;
        for existing in next
            .iter_mut()
            .filter(|s| s.id == stack.id && s.contents.is_empty())
        {
            let room = size.saturating_sub(existing.count);
            let moved = room.min(remaining);
            existing.count += moved;
            remaining -= moved;
            if remaining == 0 {
                break;
            }
        }
        while remaining > 0 {
            let moved = remaining.min(size);
            let mut fresh = stack.clone();
            fresh.count = moved;
            next.push(fresh);
            remaining -= moved;
        }
    }

    if next.len() > capacity {
        return false;
    }
    renumber(&mut next);
    *stacks = next;
    true
}

fn renumber(stacks: &mut [ItemStack]) {
    for (slot, stack) in stacks.iter_mut().enumerate() {
        stack.slot = slot;
    }
}
