//! Printable ticket documents
//!
//! A document is built once and then either encoded to ESC/POS or handed
//! to the fallback renderer, so both paths print the same content.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use shared::models::{PrintFunction, Settings};
use uuid::Uuid;

use crate::bill::BillTotals;
use crate::cart::Quantities;
use crate::menu::MenuCatalog;

pub const KITCHEN_FOOTER: &str = "Vui lòng chế biến";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopHeader {
    pub shop_name: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLine {
    pub item_id: i64,
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
    /// `unit_price × quantity`
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketDocument {
    pub job_id: Uuid,
    pub function: PrintFunction,
    pub table_name: String,
    /// Local time in the configured timezone, `dd/mm/yyyy HH:MM:SS`
    pub printed_at: String,
    pub header: ShopHeader,
    pub lines: Vec<DocumentLine>,
    /// Payment bills only
    pub totals: Option<BillTotals>,
    /// Payment bills only, when the shop configured a QR payload
    pub qr_code: Option<String>,
    pub footer: String,
}

impl TicketDocument {
    /// Kitchen docket for the lines not yet sent
    pub fn kitchen(
        table_name: &str,
        lines: &Quantities,
        menu: &MenuCatalog,
        settings: &Settings,
        timezone: Tz,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            function: PrintFunction::Kitchen,
            table_name: table_name.to_string(),
            printed_at: format_timestamp(Utc::now(), timezone),
            header: header_of(settings),
            lines: document_lines(lines, menu),
            totals: None,
            qr_code: None,
            footer: KITCHEN_FOOTER.to_string(),
        }
    }

    /// Full payment bill for the cart
    pub fn payment(
        table_name: &str,
        cart: &Quantities,
        menu: &MenuCatalog,
        settings: &Settings,
        totals: BillTotals,
        timezone: Tz,
    ) -> Self {
        let qr = settings.qr_code_data.trim();
        Self {
            job_id: Uuid::new_v4(),
            function: PrintFunction::Payment,
            table_name: table_name.to_string(),
            printed_at: format_timestamp(Utc::now(), timezone),
            header: header_of(settings),
            lines: document_lines(cart, menu),
            totals: Some(totals),
            qr_code: (!qr.is_empty()).then(|| qr.to_string()),
            footer: settings.thank_you_message.clone(),
        }
    }

    /// `"Ốc Na V2 - BẾP"` for kitchen dockets, the shop name otherwise
    pub fn title(&self) -> String {
        match self.function {
            PrintFunction::Kitchen => format!("{} - BẾP", self.header.shop_name),
            PrintFunction::Payment => self.header.shop_name.clone(),
        }
    }
}

fn header_of(settings: &Settings) -> ShopHeader {
    ShopHeader {
        shop_name: settings.shop_name.clone(),
        address: settings.address.clone(),
        phone: settings.phone.clone(),
    }
}

/// Items missing from the menu are left out
fn document_lines(quantities: &Quantities, menu: &MenuCatalog) -> Vec<DocumentLine> {
    quantities
        .iter()
        .filter_map(|(id, qty)| {
            let item = menu.item(*id)?;
            Some(DocumentLine {
                item_id: *id,
                name: item.name.clone(),
                quantity: *qty,
                unit_price: item.price,
                amount: item.price.saturating_mul(i64::from(*qty)),
            })
        })
        .collect()
}

pub fn format_timestamp(at: DateTime<Utc>, timezone: Tz) -> String {
    at.with_timezone(&timezone)
        .format("%d/%m/%Y %H:%M:%S")
        .to_string()
}
