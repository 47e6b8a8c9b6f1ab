use kitsmith_core::{ItemId, Position};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Position → ordered, de-duplicated item ids.
///
/// Serializes as a JSON object keyed by the textual `x,y,z` position. Keys
/// iterate in ascending `(x, y, z)` order, which is the index's only notion
/// of "first".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationIndex {
    entries: BTreeMap<Position, Vec<ItemId>>,
}

impl LocationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the ids recorded for a container. Duplicates are dropped,
    /// first-seen order is kept. An empty list removes the entry.
    pub fn record(&mut self, position: Position, ids: impl IntoIterator<Item = ItemId>) {
        let mut unique = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            self.entries.remove(&position);
        } else {
            self.entries.insert(position, unique);
        }
    }

    /// Append a single id to a container's entry.
    pub fn insert(&mut self, position: Position, id: ItemId) {
        let ids = self.entries.entry(position).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    pub fn get(&self, position: &Position) -> Option<&[ItemId]> {
        self.entries.get(position).map(Vec::as_slice)
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.entries.contains_key(position)
    }

    /// Every container position holding `id`, in index order.
    pub fn positions_for(&self, id: ItemId) -> impl Iterator<Item = Position> + '_ {
        self.entries
            .iter()
            .filter(move |(_, ids)| ids.contains(&id))
            .map(|(pos, _)| *pos)
    }

    /// The first container holding `id`.
    pub fn find(&self, id: ItemId) -> Option<Position> {
        self.positions_for(id).next()
    }

    /// Distinct item ids across all containers.
    pub fn item_ids(&self) -> BTreeSet<ItemId> {
        self.entries.values().flatten().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Position, &[ItemId])> {
        self.entries.iter().map(|(pos, ids)| (pos, ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<(Position, Vec<ItemId>)> for LocationIndex {
    fn from_iter<T: IntoIterator<Item = (Position, Vec<ItemId>)>>(iter: T) -> Self {
        let mut index = LocationIndex::new();
        for (pos, ids) in iter {
            index.record(pos, ids);
        }
        index
    }
}
