//! Error types for the ticket engine

use shared::models::OrderStatus;
use thiserror::Error;

use crate::printing::PrintError;

/// Input rejected before any side effect happened
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("No open order for table: {0}")]
    NoOrder(String),

    #[error("Invalid percent: {0:?}")]
    InvalidPercent(String),

    #[error("Percent out of range (0-100): {0}")]
    PercentOutOfRange(String),
}

/// Remote database failure, surfaced verbatim to the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Remote call failed: {0}")]
    Unavailable(String),
}

/// Settings or table list file failure
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Top-level error for session operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] BackendError),

    #[error(transparent)]
    Print(#[from] PrintError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub type EngineResult<T> = Result<T, EngineError>;
