//! Settings Model
//!
//! The whole settings screen is persisted as one JSON document and
//! updated by merging partial patches into it.

use serde::{Deserialize, Deserializer, Serialize};

use super::printer::{PrintFunction, PrinterConfig, SinkId};

/// Persisted settings aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub shop_name: String,
    pub address: String,
    pub phone: String,
    pub thank_you_message: String,
    /// Payload encoded into the payment QR code (empty = no QR)
    pub qr_code_data: String,

    pub is_vat_enabled: bool,
    /// VAT percent as entered; parsed when a bill is computed
    #[serde(deserialize_with = "string_or_number")]
    pub vat_percent: String,

    pub printer1: PrinterConfig,
    pub printer2: PrinterConfig,

    pub kitchen_printer_id: SinkId,
    pub payment_printer_id: SinkId,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shop_name: "Ốc Na V2".to_string(),
            address: "123 Đường ABC, Q1, TPHCM".to_string(),
            phone: "0901234567".to_string(),
            thank_you_message: "Cảm ơn quý khách!".to_string(),
            qr_code_data: String::new(),
            is_vat_enabled: false,
            vat_percent: "10".to_string(),
            printer1: PrinterConfig::default(),
            printer2: PrinterConfig::default(),
            kitchen_printer_id: SinkId::None,
            payment_printer_id: SinkId::None,
        }
    }
}

impl Settings {
    /// Sink assigned to a print function
    pub fn assignment(&self, function: PrintFunction) -> SinkId {
        match function {
            PrintFunction::Kitchen => self.kitchen_printer_id,
            PrintFunction::Payment => self.payment_printer_id,
        }
    }

    /// Printer slot behind a sink id
    pub fn printer(&self, sink: SinkId) -> Option<&PrinterConfig> {
        match sink {
            SinkId::None => None,
            SinkId::Printer1 => Some(&self.printer1),
            SinkId::Printer2 => Some(&self.printer2),
        }
    }

    /// Merge a partial update; fields left `None` keep their value
    pub fn apply(&mut self, patch: SettingsPatch) {
        let SettingsPatch {
            shop_name,
            address,
            phone,
            thank_you_message,
            qr_code_data,
            is_vat_enabled,
            vat_percent,
            printer1,
            printer2,
            kitchen_printer_id,
            payment_printer_id,
        } = patch;

        if let Some(v) = shop_name {
            self.shop_name = v;
        }
        if let Some(v) = address {
            self.address = v;
        }
        if let Some(v) = phone {
            self.phone = v;
        }
        if let Some(v) = thank_you_message {
            self.thank_you_message = v;
        }
        if let Some(v) = qr_code_data {
            self.qr_code_data = v;
        }
        if let Some(v) = is_vat_enabled {
            self.is_vat_enabled = v;
        }
        if let Some(v) = vat_percent {
            self.vat_percent = v;
        }
        if let Some(v) = printer1 {
            self.printer1 = v;
        }
        if let Some(v) = printer2 {
            self.printer2 = v;
        }
        if let Some(v) = kitchen_printer_id {
            self.kitchen_printer_id = v;
        }
        if let Some(v) = payment_printer_id {
            self.payment_printer_id = v;
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub shop_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub thank_you_message: Option<String>,
    pub qr_code_data: Option<String>,
    pub is_vat_enabled: Option<bool>,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub vat_percent: Option<String>,
    pub printer1: Option<PrinterConfig>,
    pub printer2: Option<PrinterConfig>,
    #[serde(deserialize_with = "opt_sink")]
    pub kitchen_printer_id: Option<SinkId>,
    #[serde(deserialize_with = "opt_sink")]
    pub payment_printer_id: Option<SinkId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl From<TextOrNumber> for String {
    fn from(v: TextOrNumber) -> Self {
        match v {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(TextOrNumber::deserialize(deserializer)?.into())
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(String::from))
}

/// A present `null` means "unassign", so it must not collapse into `None`
fn opt_sink<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SinkId>, D::Error> {
    SinkId::deserialize(deserializer).map(Some)
}
