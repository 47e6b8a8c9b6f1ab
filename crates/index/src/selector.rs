//! Source-selection policy: which indexed container to fetch an item from
//! when several hold it.

use kitsmith_core::{ItemId, Position};

use crate::LocationIndex;

pub trait SourceSelector: Send + Sync {
    fn name(&self) -> &str;

    /// Pick a container holding `item`, given the actor's current position.
    fn select(&self, index: &LocationIndex, item: ItemId, actor: Position) -> Option<Position>;
}

/// First position in index iteration order (ascending `x,y,z`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatch;

impl SourceSelector for FirstMatch {
    fn name(&self) -> &str {
        "first_match"
    }

    fn select(&self, index: &LocationIndex, item: ItemId, _actor: Position) -> Option<Position> {
        index.find(item)
    }
}

/// Closest position to the actor. Ties keep index order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nearest;

impl SourceSelector for Nearest {
    fn name(&self) -> &str {
        "nearest"
    }

    fn select(&self, index: &LocationIndex, item: ItemId, actor: Position) -> Option<Position> {
        index.positions_for(item).min_by(|a, b| {
            actor
                .distance_to(*a)
                .total_cmp(&actor.distance_to(*b))
        })
    }
}

/// Resolve a configured policy name.
pub fn selector_by_name(name: &str) -> Option<Box<dyn SourceSelector>> {
    match name {
        "first_match" => Some(Box::new(FirstMatch)),
        "nearest" => Some(Box::new(Nearest)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> LocationIndex {
        [
            (Position::new(-50, 64, 0), vec![ItemId(5)]),
            (Position::new(3, 64, 0), vec![ItemId(5)]),
            (Position::new(40, 64, 0), vec![ItemId(6)]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn first_match_ignores_distance() {
        let pos = FirstMatch.select(&index(), ItemId(5), Position::new(0, 64, 0));
        assert_eq!(pos, Some(Position::new(-50, 64, 0)));
    }

    #[test]
    fn nearest_prefers_closest() {
        let pos = Nearest.select(&index(), ItemId(5), Position::new(0, 64, 0));
        assert_eq!(pos, Some(Position::new(3, 64, 0)));
    }

    #[test]
    fn missing_item_selects_nothing() {
        assert!(Nearest.select(&index(), ItemId(77), Position::ORIGIN).is_none());
        assert!(FirstMatch.select(&index(), ItemId(77), Position::ORIGIN).is_none());
    }

    #[test]
    fn selectors_resolve_by_name() {
        assert_eq!(selector_by_name("nearest").unwrap().name(), "nearest");
        assert_eq!(selector_by_name("first_match").unwrap().name(), "first_match");
        assert!(selector_by_name("random").is_none());
    }
}
