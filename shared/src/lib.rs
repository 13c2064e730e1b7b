//! Shared types for the Ốc Na point-of-sale client
//!
//! Plain data shared by the printer and ticket-engine crates:
//! menu catalog rows, remote orders, and the persisted settings aggregate.

pub mod models;

// Re-exports
pub use models::*;
pub use serde::{Deserialize, Serialize};
