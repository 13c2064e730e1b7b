//! ESC/POS ticket renderer
//!
//! Encodes a [`TicketDocument`] for a thermal printer.

use ocna_printer::{EscPosBuilder, PrintResult, text_width, truncate_width};
use shared::models::PrintFunction;

use super::document::TicketDocument;
use crate::bill::format_money;

/// Module size of the payment QR code
const QR_MODULE_SIZE: u8 = 6;

#[derive(Debug, Clone)]
pub struct TicketRenderer {
    width: usize,
    /// Pre-rasterized logo, printed on top of payment bills
    logo: Option<Vec<u8>>,
}

impl TicketRenderer {
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize) -> Self {
        Self { width, logo: None }
    }

    pub fn with_logo(mut self, logo: Option<Vec<u8>>) -> Self {
        self.logo = logo;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Render to ESC/POS bytes
    ///
    /// Fails only when the QR payload cannot be encoded.
    pub fn render(&self, doc: &TicketDocument) -> PrintResult<Vec<u8>> {
        let mut b = EscPosBuilder::new(self.width);
        match doc.function {
            PrintFunction::Kitchen => self.render_kitchen(&mut b, doc),
            PrintFunction::Payment => self.render_payment(&mut b, doc)?,
        }
        b.cut_feed(4);
        Ok(b.build())
    }

    fn render_kitchen(&self, b: &mut EscPosBuilder, doc: &TicketDocument) {
        b.center();
        b.bold();
        b.line(&doc.title());
        b.bold_off();
        b.left();
        b.sep_double();

        b.double_height();
        b.line(&format!("Bàn: {}", doc.table_name));
        b.reset_size();
        b.line(&format!("Thời gian: {}", doc.printed_at));
        b.sep_single();

        b.double_height();
        b.bold();
        for line in &doc.lines {
            self.render_name_qty(b, &line.name, line.quantity);
        }
        b.bold_off();
        b.reset_size();

        b.sep_single();
        b.center();
        b.line(&doc.footer);
        b.left();
    }

    fn render_payment(&self, b: &mut EscPosBuilder, doc: &TicketDocument) -> PrintResult<()> {
        if let Some(logo) = &self.logo {
            b.raw(logo);
        }

        b.center();
        b.double_size();
        b.bold();
        b.line(&doc.header.shop_name);
        b.bold_off();
        b.reset_size();
        b.line(&doc.header.address);
        b.bold();
        b.line(&format!("SĐT: {}", doc.header.phone));
        b.bold_off();
        b.left();
        b.sep_single();

        b.line(&format!("Bàn: {}", doc.table_name));
        b.line(&format!("Thời gian: {}", doc.printed_at));
        b.sep_single();

        for line in &doc.lines {
            b.line(&line.name);
            b.line_lr(
                &format!("  {} x{}", format_money(line.unit_price), line.quantity),
                &format_money(line.amount),
            );
        }
        b.sep_single();

        if let Some(totals) = &doc.totals {
            b.line_lr("Tiền hàng:", &format_money(totals.subtotal));
            b.line_lr(
                "Giảm giá:",
                &format!("-{}", format_money(totals.discount_amount)),
            );
            b.line_lr("VAT:", &format!("+{}", format_money(totals.vat_amount)));
            b.sep_double();
            b.bold();
            b.double_height();
            b.line_lr("TỔNG:", &format_money(totals.final_total));
            b.reset_size();
            b.bold_off();
        }

        if let Some(qr) = &doc.qr_code {
            b.newline();
            b.center();
            b.qr_code(qr, QR_MODULE_SIZE)?;
            b.left();
        }

        b.newline();
        b.center();
        b.line(&doc.footer);
        b.left();
        Ok(())
    }

    /// `Ốc hương xào bơ           x2`, truncating long names
    fn render_name_qty(&self, b: &mut EscPosBuilder, name: &str, quantity: u32) {
        let qty = format!("x{}", quantity);
        // Double-height keeps single width, so the column count is unchanged
        let max_name = self.width.saturating_sub(text_width(&qty) + 1);
        let name = truncate_width(name, max_name);
        b.line_lr(&name, &qty);
    }
}

impl Default for TicketRenderer {
    fn default() -> Self {
        Self::new(48)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::BillTotals;
    use crate::printing::document::{DocumentLine, KITCHEN_FOOTER, ShopHeader};
    use ocna_printer::convert_to_cp1258;
    use uuid::Uuid;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn doc(function: PrintFunction, qr: Option<&str>) -> TicketDocument {
        TicketDocument {
            job_id: Uuid::new_v4(),
            function,
            table_name: "Bàn 5".to_string(),
            printed_at: "22/01/2024 14:32:15".to_string(),
            header: ShopHeader {
                shop_name: "Ốc Na V2".to_string(),
                address: "123 Đường ABC, Q1, TPHCM".to_string(),
                phone: "0901234567".to_string(),
            },
            lines: vec![DocumentLine {
                item_id: 1,
                name: "Ốc hương".to_string(),
                quantity: 2,
                unit_price: 50_000,
                amount: 100_000,
            }],
            totals: (function == PrintFunction::Payment).then_some(BillTotals {
                subtotal: 100_000,
                discount_amount: 10_000,
                vat_amount: 7_200,
                final_total: 97_200,
            }),
            qr_code: qr.map(str::to_string),
            footer: match function {
                PrintFunction::Kitchen => KITCHEN_FOOTER.to_string(),
                PrintFunction::Payment => "Cảm ơn quý khách!".to_string(),
            },
        }
    }

    #[test]
    fn test_stream_framing() {
        let data = TicketRenderer::new(48)
            .render(&doc(PrintFunction::Kitchen, None))
            .unwrap();
        assert_eq!(&data[..5], &[0x1B, 0x40, 0x1B, 0x74, 52]);
        assert_eq!(&data[data.len() - 4..], &[0x1D, 0x56, 0x42, 4]);
    }

    #[test]
    fn test_kitchen_content() {
        let data = TicketRenderer::new(32)
            .render(&doc(PrintFunction::Kitchen, None))
            .unwrap();
        assert!(contains(&data, &convert_to_cp1258("Bàn: Bàn 5")));
        assert!(contains(&data, &convert_to_cp1258("x2\n")));
        assert!(contains(&data, &convert_to_cp1258("Vui lòng")));
        assert!(!contains(&data, &convert_to_cp1258("Cảm ơn")));
        // Kitchen dockets carry no prices
        assert!(!contains(&data, b"50.000"));
    }

    #[test]
    fn test_payment_content() {
        let data = TicketRenderer::new(48)
            .render(&doc(PrintFunction::Payment, Some("00020101021238")))
            .unwrap();
        assert!(contains(&data, &convert_to_cp1258("100.000đ")));
        assert!(contains(&data, &convert_to_cp1258("-10.000đ")));
        assert!(contains(&data, &convert_to_cp1258("97.200đ")));
        assert!(contains(&data, b"00020101021238"));
        assert!(contains(&data, &convert_to_cp1258("Cảm ơn quý khách!")));
    }

    #[test]
    fn test_logo_prepended() {
        let logo = vec![0x1D, 0x76, 0x30, 0x00, 0xAA];
        let data = TicketRenderer::new(48)
            .with_logo(Some(logo.clone()))
            .render(&doc(PrintFunction::Payment, None))
            .unwrap();
        assert_eq!(&data[5..10], logo.as_slice());
    }

    #[test]
    fn test_bad_qr_is_an_error() {
        let result = TicketRenderer::new(48).render(&doc(PrintFunction::Payment, Some("chuyển khoản")));
        assert!(result.is_err());
    }
}
