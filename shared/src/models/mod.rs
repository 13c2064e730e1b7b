//! Data models
//!
//! Rows mirror the remote database; settings mirror the JSON document
//! persisted on the device. All IDs are `i64`, money is `i64` in đồng.

pub mod category;
pub mod menu_item;
pub mod order;
pub mod printer;
pub mod settings;

// Re-exports
pub use category::*;
pub use menu_item::*;
pub use order::*;
pub use printer::*;
pub use settings::*;
