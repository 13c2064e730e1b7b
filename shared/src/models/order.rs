//! Order Model

use serde::{Deserialize, Serialize};

/// Order status
///
/// An order moves from `Open` to `Paid` exactly once and never back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Open,
    Paid,
}

impl OrderStatus {
    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!((self, next), (OrderStatus::Open, OrderStatus::Paid))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Paid => "paid",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order item row
///
/// `menu_item_id` is null when the menu item was deleted after the order
/// was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: i64,
    pub menu_item_id: Option<i64>,
    pub quantity: u32,
}

/// Order entity (one per table visit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub table_name: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
}

impl Order {
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }
}

/// Upsert line for an order's item set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemUpsert {
    pub menu_item_id: i64,
    pub quantity: u32,
}
