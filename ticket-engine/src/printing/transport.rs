//! Printer transport
//!
//! The seam between the dispatcher and the network, so a job's routing
//! can be observed without a real printer.

use std::time::Duration;

use async_trait::async_trait;
use ocna_printer::{DEFAULT_TIMEOUT, NetworkPrinter, PrintResult, Printer};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one encoded document to `host:port`
    async fn send(&self, host: &str, port: u16, data: &[u8]) -> PrintResult<()>;
}

/// Raw TCP, one connection per job
#[derive(Debug, Clone)]
pub struct TcpTransport {
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, host: &str, port: u16, data: &[u8]) -> PrintResult<()> {
        NetworkPrinter::new(host, port)
            .with_timeout(self.timeout)
            .print(data)
            .await
    }
}
