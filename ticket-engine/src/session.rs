//! Table session
//!
//! One table being served: its cart, the order it belongs to, and the
//! two flows that leave the device (kitchen docket, payment). Cart edits
//! are plain `&mut self` calls; everything remote goes through
//! [`OrderSync`] and every print through the session's [`PrintQueue`].

use std::sync::Arc;

use chrono_tz::Tz;
use shared::models::{PrintFunction, Settings};
use tracing::{error, info, instrument, warn};

use crate::bill::{BillTotals, Percent};
use crate::cart::CartStore;
use crate::docket::{DocketOutcome, diff};
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::events::{EventBus, SessionEvent};
use crate::menu::MenuCatalog;
use crate::printing::{PrintError, PrintQueue, PrintReport, TicketDocument};
use crate::sync::{OrderSync, SaveOutcome};

/// Shared collaborators of every table session
#[derive(Clone)]
pub struct SessionContext {
    pub sync: Arc<OrderSync>,
    pub queue: PrintQueue,
    pub menu: Arc<MenuCatalog>,
    pub settings: Settings,
    pub bus: EventBus,
    pub timezone: Tz,
}

/// Result of "save & print kitchen"
#[derive(Debug, Clone, PartialEq)]
pub struct KitchenFlow {
    pub save: SaveOutcome,
    pub docket: DocketOutcome,
}

/// Result of "print & pay"
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentFlow {
    pub print: PrintReport,
    pub totals: BillTotals,
}

pub struct TableSession {
    table: String,
    order_id: Option<i64>,
    cart: CartStore,
    discount_input: String,
    ctx: SessionContext,
}

impl TableSession {
    /// Open a table, loading its open order if it has one
    #[instrument(skip(ctx))]
    pub async fn open(ctx: SessionContext, table: &str) -> EngineResult<Self> {
        let mut session = Self {
            table: table.to_string(),
            order_id: None,
            cart: CartStore::new(),
            discount_input: String::new(),
            ctx,
        };

        let order = session
            .ctx
            .sync
            .fetch_open_order(table)
            .await
            .inspect_err(|e| session.remote_failed("fetch_open_order", e))?;

        match order {
            Some(order) => {
                session.cart.hydrate(&order);
                session.order_id = Some(order.id);
            }
            None => session.cart.reset(),
        }

        info!(order_id = ?session.order_id, items = session.cart.cart().len(), "Table opened");
        session.publish(SessionEvent::TableOpened {
            table: session.table.clone(),
            order_id: session.order_id,
            items: session.cart.cart().len(),
        });
        Ok(session)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn order_id(&self) -> Option<i64> {
        self.order_id
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn discount_input(&self) -> &str {
        &self.discount_input
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    /// Use new settings for subsequent totals and prints
    pub fn set_settings(&mut self, settings: Settings) {
        self.ctx.settings = settings;
    }

    /// Change an item's quantity; returns the new quantity
    pub fn adjust(&mut self, item_id: i64, delta: i64) -> u32 {
        let quantity = self.cart.adjust(item_id, delta);
        self.publish(SessionEvent::CartChanged {
            table: self.table.clone(),
            item_id,
            quantity,
        });
        quantity
    }

    /// Store the discount text as typed; it is parsed leniently
    pub fn set_discount_input(&mut self, text: impl Into<String>) {
        self.discount_input = text.into();
    }

    pub fn discount(&self) -> Percent {
        Percent::lenient(&self.discount_input)
    }

    pub fn totals(&self) -> BillTotals {
        BillTotals::for_cart(
            self.cart.cart(),
            &self.ctx.menu,
            &self.discount_input,
            &self.ctx.settings,
        )
    }

    /// Persist the cart, then print what the kitchen has not seen yet
    ///
    /// A failed save changes nothing locally. Once saved, the snapshot
    /// becomes the cart as it was dispatched, whichever path printed it.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn save_and_print_kitchen(&mut self) -> EngineResult<KitchenFlow> {
        if self.cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }

        let order_id = self
            .ctx
            .sync
            .ensure_order(&self.table)
            .await
            .inspect_err(|e| self.remote_failed("ensure_order", e))?;
        let save = self
            .ctx
            .sync
            .save_items(order_id, self.cart.cart())
            .await
            .inspect_err(|e| self.remote_failed("save_items", e))?;

        self.order_id = Some(order_id);
        self.publish(SessionEvent::OrderSaved {
            table: self.table.clone(),
            order_id,
            lines: save.lines,
        });

        let at_dispatch = self.cart.cart().clone();
        let docket = diff(&at_dispatch, self.cart.snapshot());
        if docket.is_empty() {
            return Ok(self.nothing_new(save));
        }

        let document = TicketDocument::kitchen(
            &self.table,
            docket.lines(),
            &self.ctx.menu,
            &self.ctx.settings,
            self.ctx.timezone,
        );
        if document.lines.is_empty() {
            // Only items the menu no longer knows; never print a blank docket
            warn!(items = docket.len(), "Docket has no printable lines");
            self.cart.mark_printed(at_dispatch);
            return Ok(self.nothing_new(save));
        }

        let result = self
            .ctx
            .queue
            .submit(document, self.ctx.settings.clone())
            .await;

        let outcome = match result {
            Ok(report) => {
                self.cart.mark_printed(at_dispatch);
                self.published_report(&report);
                DocketOutcome::Printed { docket, report }
            }
            Err(PrintError::QueueClosed) => return Err(PrintError::QueueClosed.into()),
            Err(error) => {
                // The job was attempted; the kitchen must not get it twice
                self.cart.mark_printed(at_dispatch);
                self.print_failed(PrintFunction::Kitchen, &error);
                DocketOutcome::Failed { docket, error }
            }
        };

        Ok(KitchenFlow {
            save,
            docket: outcome,
        })
    }

    /// Print the bill, then close the order
    ///
    /// The order is only marked paid after the bill went somewhere. On a
    /// remote failure the cart stays as it is so the user can retry.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn print_and_pay(&mut self) -> EngineResult<PaymentFlow> {
        if self.cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        let order_id = self
            .order_id
            .ok_or_else(|| ValidationError::NoOrder(self.table.clone()))?;

        let totals = self.totals();
        let document = TicketDocument::payment(
            &self.table,
            self.cart.cart(),
            &self.ctx.menu,
            &self.ctx.settings,
            totals,
            self.ctx.timezone,
        );

        let print = match self
            .ctx
            .queue
            .submit(document, self.ctx.settings.clone())
            .await
        {
            Ok(report) => report,
            Err(error) => {
                self.print_failed(PrintFunction::Payment, &error);
                return Err(EngineError::Print(error));
            }
        };
        self.published_report(&print);

        self.ctx
            .sync
            .mark_paid(order_id, &self.table)
            .await
            .inspect_err(|e| self.remote_failed("mark_paid", e))?;

        self.cart.reset();
        self.order_id = None;
        self.discount_input.clear();

        info!(order_id, final_total = totals.final_total, "Order paid");
        self.publish(SessionEvent::OrderPaid {
            table: self.table.clone(),
            order_id,
            final_total: totals.final_total,
        });

        Ok(PaymentFlow { print, totals })
    }

    fn nothing_new(&self, save: SaveOutcome) -> KitchenFlow {
        info!("Nothing new for the kitchen");
        self.publish(SessionEvent::NothingNewToPrint {
            table: self.table.clone(),
        });
        KitchenFlow {
            save,
            docket: DocketOutcome::NothingNew,
        }
    }

    fn publish(&self, event: SessionEvent) {
        self.ctx.bus.publish(event);
    }

    fn published_report(&self, report: &PrintReport) {
        if let Some(reason) = report.fallback_reason() {
            warn!(job_id = %report.job_id, %reason, "Printed via fallback");
        }
        self.publish(SessionEvent::Printed {
            table: self.table.clone(),
            report: report.clone(),
        });
    }

    fn print_failed(&self, function: PrintFunction, error: &PrintError) {
        error!(function = function.as_str(), error = %error, "Print failed");
        self.publish(SessionEvent::PrintFailed {
            table: self.table.clone(),
            function,
            message: error.to_string(),
        });
    }

    fn remote_failed(&self, operation: &'static str, error: &EngineError) {
        self.publish(SessionEvent::RemoteFailed {
            table: self.table.clone(),
            operation,
            message: error.to_string(),
        });
    }
}

impl std::fmt::Debug for TableSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSession")
            .field("table", &self.table)
            .field("order_id", &self.order_id)
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}
