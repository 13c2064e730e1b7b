//! Cart Store
//!
//! Draft quantities for the table being served, plus the quantities that
//! have already gone to the kitchen.

use std::collections::BTreeMap;

use shared::models::Order;

use crate::docket::{Docket, diff};

/// Item id → quantity, iterated in ascending item id
pub type Quantities = BTreeMap<i64, u32>;

/// Draft cart and last-printed snapshot
///
/// A key is present only while its quantity is at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartStore {
    cart: Quantities,
    snapshot: Quantities,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change an item's quantity by `delta`, returning the new quantity
    ///
    /// Never goes below zero; reaching zero removes the item.
    pub fn adjust(&mut self, item_id: i64, delta: i64) -> u32 {
        let current = i64::from(self.quantity(item_id));
        let next = current
            .saturating_add(delta)
            .clamp(0, i64::from(u32::MAX)) as u32;

        if next == 0 {
            self.cart.remove(&item_id);
        } else {
            self.cart.insert(item_id, next);
        }
        next
    }

    /// Replace cart and snapshot with the order's items
    ///
    /// Both end up equal, so an order just opened has nothing pending for
    /// the kitchen. Rows without a menu item or with quantity 0 are skipped.
    pub fn hydrate(&mut self, order: &Order) {
        let mut quantities = Quantities::new();
        for item in &order.order_items {
            let Some(item_id) = item.menu_item_id else {
                continue;
            };
            if item.quantity == 0 {
                continue;
            }
            let entry = quantities.entry(item_id).or_insert(0);
            *entry = entry.saturating_add(item.quantity);
        }
        self.snapshot = quantities.clone();
        self.cart = quantities;
    }

    pub fn reset(&mut self) {
        self.cart.clear();
        self.snapshot.clear();
    }

    /// Overwrite the snapshot with the full set that was just printed
    pub fn mark_printed(&mut self, printed: Quantities) {
        self.snapshot = printed;
    }

    pub fn cart(&self) -> &Quantities {
        &self.cart
    }

    pub fn snapshot(&self) -> &Quantities {
        &self.snapshot
    }

    pub fn quantity(&self, item_id: i64) -> u32 {
        self.cart.get(&item_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// Lines not yet sent to the kitchen
    pub fn pending(&self) -> Docket {
        diff(&self.cart, &self.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OrderItem, OrderStatus};

    fn order_with(items: &[(Option<i64>, u32)]) -> Order {
        Order {
            id: 1,
            table_name: "Bàn 1".to_string(),
            status: OrderStatus::Open,
            order_items: items
                .iter()
                .map(|(id, qty)| OrderItem {
                    order_id: 1,
                    menu_item_id: *id,
                    quantity: *qty,
                })
                .collect(),
        }
    }

    #[test]
    fn test_adjust_never_stores_zero() {
        let mut cart = CartStore::new();
        assert_eq!(cart.adjust(1, 1), 1);
        assert_eq!(cart.adjust(1, 1), 2);
        assert_eq!(cart.adjust(1, -1), 1);
        assert_eq!(cart.adjust(1, -1), 0);
        assert!(!cart.cart().contains_key(&1));
        assert_eq!(cart.adjust(1, -1), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_adjust_sequences_keep_positive_keys() {
        let mut cart = CartStore::new();
        let deltas = [1, -1, -1, 1, 1, 1, -1, 1, -1, -1, -1, -1, 1];
        for (step, delta) in deltas.iter().enumerate() {
            cart.adjust((step % 3) as i64, *delta);
            assert!(cart.cart().values().all(|q| *q >= 1));
        }
    }

    #[test]
    fn test_adjust_saturates() {
        let mut cart = CartStore::new();
        cart.adjust(9, i64::from(u32::MAX));
        assert_eq!(cart.adjust(9, 1), u32::MAX);
    }

    #[test]
    fn test_hydrate_sets_snapshot_equal() {
        let mut cart = CartStore::new();
        cart.adjust(42, 1);
        cart.hydrate(&order_with(&[(Some(1), 2), (Some(2), 0), (None, 3), (Some(1), 1)]));

        assert_eq!(cart.cart(), &Quantities::from([(1, 3)]));
        assert_eq!(cart.cart(), cart.snapshot());
        assert!(cart.pending().is_empty());
    }

    #[test]
    fn test_reset_clears_both() {
        let mut cart = CartStore::new();
        cart.hydrate(&order_with(&[(Some(1), 2)]));
        cart.adjust(3, 1);
        cart.reset();
        assert!(cart.is_empty());
        assert!(cart.snapshot().is_empty());
    }

    #[test]
    fn test_mark_printed_overwrites() {
        let mut cart = CartStore::new();
        cart.adjust(1, 1);
        cart.adjust(2, 1);
        cart.mark_printed(cart.cart().clone());
        cart.adjust(2, -1);
        assert_eq!(cart.snapshot(), &Quantities::from([(1, 1), (2, 1)]));
        cart.mark_printed(cart.cart().clone());
        assert_eq!(cart.snapshot(), &Quantities::from([(1, 1)]));
    }
}
