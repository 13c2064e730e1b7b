//! Order Ticket Engine
//!
//! The part of the point-of-sale client that decides what goes to the
//! kitchen, what the guest pays, and where each document is printed.
//!
//! # Layout
//!
//! ```text
//! TableSession ──▶ CartStore ──▶ bill::compute_totals
//!      │               └───────▶ docket::diff
//!      ├──▶ OrderSync ──▶ OrderBackend (remote database)
//!      ├──▶ PrintQueue ──▶ PrintDispatcher ──▶ Transport (TCP) | FallbackRenderer
//!      └──▶ EventBus (observers)
//! ```

pub mod bill;
pub mod cart;
pub mod config;
pub mod docket;
pub mod error;
pub mod events;
pub mod logger;
pub mod menu;
pub mod printing;
pub mod session;
pub mod settings;
pub mod sync;

// Re-exports
pub use bill::{BillTotals, Percent, compute_totals, format_money};
pub use cart::{CartStore, Quantities};
pub use config::EngineConfig;
pub use docket::{Docket, DocketOutcome, diff};
pub use error::{BackendError, EngineError, EngineResult, SettingsError, ValidationError};
pub use events::{EventBus, SessionEvent};
pub use logger::init_logger;
pub use menu::{MenuCatalog, MenuSeed};
pub use printing::{
    FallbackReason, FallbackRenderer, MemoryRenderer, PrintDispatcher, PrintError, PrintOutcome,
    PrintQueue, PrintReport, SpoolRenderer, TcpTransport, TicketDocument, Transport,
};
pub use session::{KitchenFlow, PaymentFlow, SessionContext, TableSession};
pub use settings::{SettingsStore, TableList};
pub use sync::{BackendOp, MemoryBackend, OrderBackend, OrderSync, SaveOutcome};
