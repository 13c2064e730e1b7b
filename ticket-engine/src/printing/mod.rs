//! Ticket printing
//!
//! ```text
//! TicketDocument ──▶ PrintQueue ──▶ PrintDispatcher
//!                                     ├─ route   (assignment → printer slot)
//!                                     ├─ validate (host, port 1-65535)
//!                                     ├─ send    (ESC/POS over TCP)
//!                                     └─ fallback (FallbackRenderer)
//! ```
//!
//! A job always completes through one of the two paths unless the
//! fallback renderer itself fails.

mod dispatcher;
mod document;
mod fallback;
mod queue;
mod renderer;
mod transport;

pub use dispatcher::PrintDispatcher;
pub use document::{DocumentLine, ShopHeader, TicketDocument};
pub use fallback::{FallbackRenderer, MemoryRenderer, SpoolRenderer, render_plain_text};
pub use queue::PrintQueue;
pub use renderer::TicketRenderer;
pub use transport::{TcpTransport, Transport};

use shared::models::{PrintFunction, SinkId};
use thiserror::Error;
use uuid::Uuid;

/// Why a job went to the fallback renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The function has no printer assigned
    Unassigned,
    /// Assigned printer has an empty host or a bad port
    InvalidEndpoint { sink: SinkId, host: String, port: String },
    /// Connect, write, timeout or encoding failure
    Network { sink: SinkId, message: String },
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Unassigned => f.write_str("no printer assigned"),
            FallbackReason::InvalidEndpoint { sink, host, port } => {
                write!(f, "{} has invalid address {:?}:{:?}", sink, host, port)
            }
            FallbackReason::Network { sink, message } => write!(f, "{}: {}", sink, message),
        }
    }
}

/// Which path completed the job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintOutcome {
    Network { sink: SinkId, bytes: usize },
    Fallback {
        reason: FallbackReason,
        /// Where the fallback renderer put the document
        location: String,
    },
}

/// Completed print job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintReport {
    pub job_id: Uuid,
    pub function: PrintFunction,
    pub outcome: PrintOutcome,
}

impl PrintReport {
    pub fn is_network(&self) -> bool {
        matches!(self.outcome, PrintOutcome::Network { .. })
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match &self.outcome {
            PrintOutcome::Fallback { reason, .. } => Some(reason),
            PrintOutcome::Network { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrintError {
    /// Both the printer path and the fallback renderer failed
    #[error("Fallback renderer failed for job {job_id} ({reason}): {message}")]
    Fallback {
        job_id: Uuid,
        reason: FallbackReason,
        message: String,
    },

    /// The queue worker has stopped; the job never ran
    #[error("Print queue closed")]
    QueueClosed,
}
