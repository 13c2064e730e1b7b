//! Session event bus
//!
//! Observers (screens, logs, tests) subscribe to what a table session
//! does instead of watching a shared store.

use shared::models::PrintFunction;
use tokio::sync::broadcast;

use crate::printing::PrintReport;

/// Default channel capacity
pub const DEFAULT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TableOpened {
        table: String,
        order_id: Option<i64>,
        items: usize,
    },
    CartChanged {
        table: String,
        item_id: i64,
        quantity: u32,
    },
    OrderSaved {
        table: String,
        order_id: i64,
        lines: usize,
    },
    RemoteFailed {
        table: String,
        operation: &'static str,
        message: String,
    },
    /// Save succeeded but the kitchen had already seen everything
    NothingNewToPrint { table: String },
    Printed {
        table: String,
        report: PrintReport,
    },
    PrintFailed {
        table: String,
        function: PrintFunction,
        message: String,
    },
    OrderPaid {
        table: String,
        order_id: i64,
        final_total: i64,
    },
}

impl SessionEvent {
    pub fn table(&self) -> &str {
        match self {
            SessionEvent::TableOpened { table, .. }
            | SessionEvent::CartChanged { table, .. }
            | SessionEvent::OrderSaved { table, .. }
            | SessionEvent::RemoteFailed { table, .. }
            | SessionEvent::NothingNewToPrint { table }
            | SessionEvent::Printed { table, .. }
            | SessionEvent::PrintFailed { table, .. }
            | SessionEvent::OrderPaid { table, .. } => table,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to all current subscribers; returns how many received it
    pub fn publish(&self, event: SessionEvent) -> usize {
        // No subscribers is not an error
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        assert_eq!(
            bus.publish(SessionEvent::NothingNewToPrint {
                table: "Bàn 1".into()
            }),
            0
        );

        let mut rx = bus.subscribe();
        let delivered = bus.publish(SessionEvent::CartChanged {
            table: "Bàn 2".into(),
            item_id: 4,
            quantity: 1,
        });
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table(), "Bàn 2");
    }
}
