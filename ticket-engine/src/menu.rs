//! Menu catalog
//!
//! Read-only view of menu items and categories loaded from the backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::models::{Category, MenuItem};

/// Menu file shape used to seed an in-process backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuSeed {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, Default)]
pub struct MenuCatalog {
    items: BTreeMap<i64, MenuItem>,
    categories: Vec<Category>,
}

impl MenuCatalog {
    pub fn new(items: Vec<MenuItem>, categories: Vec<Category>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            categories,
        }
    }

    pub fn item(&self, id: i64) -> Option<&MenuItem> {
        self.items.get(&id)
    }

    pub fn price(&self, id: i64) -> Option<i64> {
        self.item(id).map(|item| item.price)
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.item(id).map(|item| item.name.as_str())
    }

    pub fn items(&self) -> impl Iterator<Item = &MenuItem> {
        self.items.values()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose name contains `search` (case-insensitive), optionally
    /// restricted to one category
    pub fn filter(&self, search: &str, category_id: Option<i64>) -> Vec<&MenuItem> {
        let needle = search.trim().to_lowercase();
        self.items
            .values()
            .filter(|item| category_id.is_none() || item.category_id == category_id)
            .filter(|item| needle.is_empty() || item.name.to_lowercase().contains(&needle))
            .collect()
    }
}

impl From<MenuSeed> for MenuCatalog {
    fn from(seed: MenuSeed) -> Self {
        Self::new(seed.items, seed.categories)
    }
}
