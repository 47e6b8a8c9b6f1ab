//! The Reference Kit: the ordered item-type names one kit must contain.

use serde::{Deserialize, Serialize};

/// Slots in a packaged container, and therefore in a kit layout.
pub const KIT_SLOTS: usize = 27;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceKit {
    items: Vec<String>,
}

impl ReferenceKit {
    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    /// Build a kit from a slot layout. Empty slots are dropped, order is kept.
    pub fn from_slots<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            items: slots
                .into_iter()
                .flatten()
                .map(Into::into)
                .filter(|name: &String| !name.trim().is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list (`golden_apple, ender_pearl`).
    pub fn parse_list(list: &str) -> Self {
        Self {
            items: list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Replace the kit wholesale.
    pub fn replace(&mut self, items: Vec<String>) {
        self.items = items;
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl std::fmt::Display for ReferenceKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.items.join(", "))
    }
}
