//! Printer adapters for sending ESC/POS data
//!
//! Network printers only: raw TCP, usually port 9100.

use crate::error::{PrintError, PrintResult};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument};

/// Connect and write budget for a single job
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send raw ESC/POS data to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;
}

/// Network printer (TCP port 9100)
///
/// Most thermal printers support raw TCP printing on port 9100.
/// The host may be an IP literal or a resolvable name.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    host: String,
    port: u16,
    timeout: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the timeout covering connect plus write
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn send(&self, data: &[u8]) -> PrintResult<()> {
        if self.host.is_empty() || self.port == 0 {
            return Err(PrintError::InvalidConfig(format!(
                "Invalid address: {}",
                self.target()
            )));
        }

        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.target(), e)))?;

        info!("Connected, sending {} bytes", data.len());

        stream.write_all(data).await.map_err(|e| {
            PrintError::Io(std::io::Error::new(
                e.kind(),
                format!("Write failed: {}", e),
            ))
        })?;
        stream.flush().await?;
        // Half-close so the printer sees end of job
        stream.shutdown().await?;

        Ok(())
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(self, data), fields(host = %self.host, port = self.port, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        info!("Connecting to printer");

        tokio::time::timeout(self.timeout, self.send(data))
            .await
            .map_err(|_| {
                PrintError::Timeout(format!("{} after {:?}", self.target(), self.timeout))
            })??;

        info!("Print job sent successfully");
        Ok(())
    }
}
