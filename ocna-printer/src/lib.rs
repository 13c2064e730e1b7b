//! # ocna-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building
//! - Windows-1258 encoding for Vietnamese text
//! - Network printing (raw TCP, usually port 9100)
//! - Image/logo processing
//!
//! WHAT to print (kitchen dockets, payment bills) stays in `ticket-engine`.
//!
//! ## Example
//!
//! ```ignore
//! use ocna_printer::{EscPosBuilder, NetworkPrinter, Printer};
//!
//! let mut builder = EscPosBuilder::new(48);
//! builder.center();
//! builder.double_size();
//! builder.line("BẾP");
//! builder.reset_size();
//! builder.sep_double();
//! builder.left();
//! builder.line("Bàn: Bàn 5");
//! builder.cut_feed(3);
//!
//! let printer = NetworkPrinter::new("192.168.1.100", 9100);
//! printer.print(&builder.build()).await?;
//! ```

mod encoding;
mod error;
mod escpos;
mod printer;

// Re-exports
pub use encoding::{convert_to_cp1258, pad_width, text_width, truncate_width, CODE_PAGE_WPC1258};
pub use error::{PrintError, PrintResult};
pub use escpos::{EscPosBuilder, QR_MAX_BYTES};
pub use printer::{DEFAULT_TIMEOUT, NetworkPrinter, Printer};

#[cfg(feature = "image")]
pub use escpos::process_logo;
