//! Menu Item Model

use serde::{Deserialize, Serialize};

/// Menu item entity
///
/// `price` is in whole đồng and never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub category_id: Option<i64>,
}

impl MenuItem {
    pub fn new(id: i64, name: impl Into<String>, price: i64, category_id: Option<i64>) -> Self {
        Self {
            id,
            name: name.into(),
            price: price.max(0),
            category_id,
        }
    }
}
