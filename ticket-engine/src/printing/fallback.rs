//! Fallback renderers
//!
//! Used when a job has no usable printer. The spool renderer leaves a
//! plain-text copy on disk for the generic system print dialog.

use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use ocna_printer::{pad_width, text_width};
use shared::models::PrintFunction;
use tracing::info;

use super::document::TicketDocument;
use crate::bill::format_money;

#[async_trait]
pub trait FallbackRenderer: Send + Sync {
    /// Render the document, returning where it ended up
    async fn render(&self, doc: &TicketDocument) -> io::Result<String>;
}

/// Plain-text rendition of a document, `width` columns wide
pub fn render_plain_text(doc: &TicketDocument, width: usize) -> String {
    let mut out = String::new();
    let center = |s: &str| {
        let pad = width.saturating_sub(text_width(s)) / 2;
        format!("{}{}\n", " ".repeat(pad), s)
    };
    let lr = |l: &str, r: &str| {
        let room = width.saturating_sub(text_width(r)).max(text_width(l) + 1);
        format!("{}{}\n", pad_width(l, room, false), r)
    };
    let double = format!("{}\n", "=".repeat(width));
    let single = format!("{}\n", "-".repeat(width));

    match doc.function {
        PrintFunction::Kitchen => {
            out.push_str(&center(&doc.title()));
            out.push_str(&double);
            out.push_str(&format!("Bàn: {}\n", doc.table_name));
            out.push_str(&format!("Thời gian: {}\n", doc.printed_at));
            out.push_str(&single);
            for line in &doc.lines {
                out.push_str(&lr(&line.name, &format!("x{}", line.quantity)));
            }
        }
        PrintFunction::Payment => {
            out.push_str(&center(&doc.header.shop_name));
            out.push_str(&center(&doc.header.address));
            out.push_str(&center(&format!("SĐT: {}", doc.header.phone)));
            out.push_str(&single);
            out.push_str(&format!("Bàn: {}\n", doc.table_name));
            out.push_str(&format!("Thời gian: {}\n", doc.printed_at));
            out.push_str(&single);
            for line in &doc.lines {
                out.push_str(&format!("{}\n", line.name));
                out.push_str(&lr(
                    &format!("  {} x{}", format_money(line.unit_price), line.quantity),
                    &format_money(line.amount),
                ));
            }
            if let Some(totals) = &doc.totals {
                out.push_str(&single);
                out.push_str(&lr("Tiền hàng:", &format_money(totals.subtotal)));
                out.push_str(&lr(
                    "Giảm giá:",
                    &format!("-{}", format_money(totals.discount_amount)),
                ));
                out.push_str(&lr("VAT:", &format!("+{}", format_money(totals.vat_amount))));
                out.push_str(&double);
                out.push_str(&lr("TỔNG:", &format_money(totals.final_total)));
            }
            if let Some(qr) = &doc.qr_code {
                out.push_str(&format!("QR: {}\n", qr));
            }
        }
    }

    out.push_str(&single);
    out.push_str(&center(&doc.footer));
    out
}

/// Writes each document as a text file in a spool directory
#[derive(Debug, Clone)]
pub struct SpoolRenderer {
    dir: PathBuf,
    width: usize,
}

impl SpoolRenderer {
    pub fn new(dir: impl Into<PathBuf>, width: usize) -> Self {
        Self {
            dir: dir.into(),
            width,
        }
    }
}

#[async_trait]
impl FallbackRenderer for SpoolRenderer {
    async fn render(&self, doc: &TicketDocument) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("{}-{}.txt", doc.function.as_str(), doc.job_id));
        tokio::fs::write(&path, render_plain_text(doc, self.width)).await?;

        info!(path = %path.display(), "Document spooled");
        Ok(path.display().to_string())
    }
}

/// Keeps rendered documents in memory
#[derive(Debug, Default)]
pub struct MemoryRenderer {
    documents: Mutex<Vec<TicketDocument>>,
    failing: bool,
}

impl MemoryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer whose every call fails
    pub fn failing() -> Self {
        Self {
            documents: Mutex::default(),
            failing: true,
        }
    }

    pub fn documents(&self) -> Vec<TicketDocument> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl FallbackRenderer for MemoryRenderer {
    async fn render(&self, doc: &TicketDocument) -> io::Result<String> {
        if self.failing {
            return Err(io::Error::other("renderer unavailable"));
        }
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        documents.push(doc.clone());
        Ok(format!("memory#{}", documents.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Quantities;
    use crate::menu::MenuCatalog;
    use shared::models::{MenuItem, Settings};
    use tempfile::TempDir;

    fn kitchen_doc() -> TicketDocument {
        TicketDocument::kitchen(
            "Bàn 8",
            &Quantities::from([(1, 3)]),
            &MenuCatalog::new(vec![MenuItem::new(1, "Sò điệp nướng", 60_000, None)], vec![]),
            &Settings::default(),
            chrono_tz::Asia::Ho_Chi_Minh,
        )
    }

    #[test]
    fn test_plain_text_layout() {
        let text = render_plain_text(&kitchen_doc(), 32);
        assert!(text.contains("Ốc Na V2 - BẾP"));
        assert!(text.contains("Bàn: Bàn 8"));
        let item = text.lines().find(|l| l.starts_with("Sò điệp")).unwrap();
        assert!(item.ends_with("x3"));
        assert_eq!(text_width(item), 32);
    }

    #[tokio::test]
    async fn test_spool_renderer_writes_file() {
        let dir = TempDir::new().unwrap();
        let renderer = SpoolRenderer::new(dir.path().join("spool"), 48);
        let doc = kitchen_doc();

        let location = renderer.render(&doc).await.unwrap();
        assert!(location.ends_with(&format!("kitchen-{}.txt", doc.job_id)));

        let written = std::fs::read_to_string(&location).unwrap();
        assert!(written.contains("Vui lòng chế biến"));
    }

    #[tokio::test]
    async fn test_memory_renderer() {
        let renderer = MemoryRenderer::new();
        assert_eq!(renderer.render(&kitchen_doc()).await.unwrap(), "memory#1");
        assert_eq!(renderer.documents().len(), 1);

        assert!(MemoryRenderer::failing().render(&kitchen_doc()).await.is_err());
    }
}
