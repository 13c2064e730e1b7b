//! Order synchronization
//!
//! Translates cart state into remote order calls. The remote database
//! sits behind [`OrderBackend`]; [`MemoryBackend`] is the in-process
//! implementation used by the CLI and tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use shared::models::{Category, MenuItem, Order, OrderItem, OrderItemUpsert, OrderStatus};
use tracing::{error, info, instrument};

use crate::cart::Quantities;
use crate::error::{BackendError, EngineResult};
use crate::menu::{MenuCatalog, MenuSeed};

pub type BackendResult<T> = Result<T, BackendError>;

/// Remote order/menu persistence
#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn fetch_open_order(&self, table: &str) -> BackendResult<Option<Order>>;

    async fn create_order(&self, table: &str) -> BackendResult<Order>;

    async fn upsert_order_items(
        &self,
        order_id: i64,
        items: &[OrderItemUpsert],
    ) -> BackendResult<()>;

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> BackendResult<()>;

    async fn fetch_menu_items(&self) -> BackendResult<Vec<MenuItem>>;

    async fn fetch_categories(&self) -> BackendResult<Vec<Category>>;

    /// Table names with an open order; may contain duplicates
    async fn fetch_active_tables(&self) -> BackendResult<Vec<String>>;
}

/// Backend operation, used for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    FetchOpenOrder,
    CreateOrder,
    UpsertItems,
    UpdateStatus,
    FetchMenu,
    FetchActiveTables,
}

#[derive(Debug, Default)]
struct MemoryState {
    orders: BTreeMap<i64, Order>,
    next_order_id: i64,
    menu: MenuSeed,
    failing: HashSet<BackendOp>,
    calls: HashMap<BackendOp, usize>,
}

/// In-process backend
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_menu(seed: MenuSeed) -> Self {
        let backend = Self::new();
        backend.lock().menu = seed;
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call of `op` fail until [`recover`](Self::recover)
    pub fn fail_on(&self, op: BackendOp) {
        self.lock().failing.insert(op);
    }

    pub fn recover(&self) {
        self.lock().failing.clear();
    }

    pub fn order(&self, order_id: i64) -> Option<Order> {
        self.lock().orders.get(&order_id).cloned()
    }

    /// Number of calls made for `op`, failed ones included
    pub fn calls(&self, op: BackendOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    fn enter(&self, op: BackendOp) -> BackendResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if state.failing.contains(&op) {
            return Err(BackendError::Unavailable(format!("{:?} failed", op)));
        }
        Ok(state)
    }
}

#[async_trait]
impl OrderBackend for MemoryBackend {
    async fn fetch_open_order(&self, table: &str) -> BackendResult<Option<Order>> {
        let state = self.enter(BackendOp::FetchOpenOrder)?;
        Ok(state
            .orders
            .values()
            .find(|o| o.is_open() && o.table_name == table)
            .cloned())
    }

    async fn create_order(&self, table: &str) -> BackendResult<Order> {
        let mut state = self.enter(BackendOp::CreateOrder)?;
        state.next_order_id += 1;
        let order = Order {
            id: state.next_order_id,
            table_name: table.to_string(),
            status: OrderStatus::Open,
            order_items: Vec::new(),
        };
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn upsert_order_items(
        &self,
        order_id: i64,
        items: &[OrderItemUpsert],
    ) -> BackendResult<()> {
        let mut state = self.enter(BackendOp::UpsertItems)?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(BackendError::OrderNotFound(order_id))?;

        for upsert in items {
            match order
                .order_items
                .iter_mut()
                .find(|row| row.menu_item_id == Some(upsert.menu_item_id))
            {
                Some(row) => row.quantity = upsert.quantity,
                None => order.order_items.push(OrderItem {
                    order_id,
                    menu_item_id: Some(upsert.menu_item_id),
                    quantity: upsert.quantity,
                }),
            }
        }
        Ok(())
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> BackendResult<()> {
        let mut state = self.enter(BackendOp::UpdateStatus)?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(BackendError::OrderNotFound(order_id))?;

        if !order.status.can_transition_to(status) {
            return Err(BackendError::InvalidTransition {
                order_id,
                from: order.status,
                to: status,
            });
        }
        order.status = status;
        Ok(())
    }

    async fn fetch_menu_items(&self) -> BackendResult<Vec<MenuItem>> {
        Ok(self.enter(BackendOp::FetchMenu)?.menu.items.clone())
    }

    async fn fetch_categories(&self) -> BackendResult<Vec<Category>> {
        Ok(self.enter(BackendOp::FetchMenu)?.menu.categories.clone())
    }

    async fn fetch_active_tables(&self) -> BackendResult<Vec<String>> {
        let state = self.enter(BackendOp::FetchActiveTables)?;
        Ok(state
            .orders
            .values()
            .filter(|o| o.is_open())
            .map(|o| o.table_name.clone())
            .collect())
    }
}

/// Result of persisting a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub order_id: i64,
    /// Item rows written
    pub lines: usize,
}

/// Cart ↔ remote order translation
pub struct OrderSync {
    backend: Arc<dyn OrderBackend>,
    active_tables: RwLock<BTreeSet<String>>,
}

impl OrderSync {
    pub fn new(backend: Arc<dyn OrderBackend>) -> Self {
        Self {
            backend,
            active_tables: RwLock::new(BTreeSet::new()),
        }
    }

    pub async fn fetch_open_order(&self, table: &str) -> EngineResult<Option<Order>> {
        let order = self
            .backend
            .fetch_open_order(table)
            .await
            .map_err(|e| remote_failed("fetch_open_order", e))?;
        Ok(order)
    }

    /// Id of the table's open order, creating one if needed
    #[instrument(skip(self))]
    pub async fn ensure_order(&self, table: &str) -> EngineResult<i64> {
        let order = match self.fetch_open_order(table).await? {
            Some(order) => order,
            None => {
                let order = self
                    .backend
                    .create_order(table)
                    .await
                    .map_err(|e| remote_failed("create_order", e))?;
                info!(order_id = order.id, "Created order");
                order
            }
        };

        self.write_cache().insert(table.to_string());
        Ok(order.id)
    }

    /// Upsert every cart line against the order
    #[instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn save_items(&self, order_id: i64, cart: &Quantities) -> EngineResult<SaveOutcome> {
        let items: Vec<OrderItemUpsert> = cart
            .iter()
            .map(|(id, qty)| OrderItemUpsert {
                menu_item_id: *id,
                quantity: *qty,
            })
            .collect();

        self.backend
            .upsert_order_items(order_id, &items)
            .await
            .map_err(|e| remote_failed("upsert_order_items", e))?;

        Ok(SaveOutcome {
            order_id,
            lines: items.len(),
        })
    }

    /// Move the order to `paid` and drop its table from the active view
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: i64, table: &str) -> EngineResult<()> {
        self.backend
            .update_order_status(order_id, OrderStatus::Paid)
            .await
            .map_err(|e| remote_failed("update_order_status", e))?;

        self.write_cache().remove(table);
        info!("Order paid");
        Ok(())
    }

    /// Refresh and return the tables with an open order, sorted
    pub async fn active_tables(&self) -> EngineResult<Vec<String>> {
        let names = self
            .backend
            .fetch_active_tables()
            .await
            .map_err(|e| remote_failed("fetch_active_tables", e))?;

        let mut cache = self.write_cache();
        *cache = names.into_iter().collect();
        Ok(cache.iter().cloned().collect())
    }

    /// Last known active tables without a remote call
    pub fn cached_active_tables(&self) -> Vec<String> {
        self.active_tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub async fn load_menu(&self) -> EngineResult<MenuCatalog> {
        let items = self
            .backend
            .fetch_menu_items()
            .await
            .map_err(|e| remote_failed("fetch_menu_items", e))?;
        let categories = self
            .backend
            .fetch_categories()
            .await
            .map_err(|e| remote_failed("fetch_categories", e))?;
        Ok(MenuCatalog::new(items, categories))
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, BTreeSet<String>> {
        self.active_tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn remote_failed(operation: &str, e: BackendError) -> BackendError {
    error!(operation, error = %e, "Remote call failed");
    e
}
