//! Bill calculation
//!
//! Money is whole đồng (`i64`). Percent arithmetic is done with
//! `rust_decimal` and every derived amount is truncated toward zero the
//! moment it is produced, so the printed lines always add up.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use shared::models::Settings;

use crate::cart::Quantities;
use crate::error::ValidationError;
use crate::menu::MenuCatalog;

/// A non-negative percentage parsed from user text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Percent = Percent(Decimal::ZERO);
    pub const FULL: Percent = Percent(Decimal::ONE_HUNDRED);

    /// Parse the way the order screen always has: never fails
    ///
    /// Leading numeric text is used (`"10%"` is 10), anything else is 0.
    /// Whitespace is ignored, a decimal comma is accepted and negative
    /// values become 0.
    pub fn lenient(text: &str) -> Self {
        parse_leading(text)
            .map(|d| Percent(d.max(Decimal::ZERO)))
            .unwrap_or_default()
    }

    /// Parse the whole text, rejecting junk and values outside 0-100
    pub fn strict(text: &str) -> Result<Self, ValidationError> {
        let normalized = normalize(text);
        let value = Decimal::from_str(&normalized)
            .map_err(|_| ValidationError::InvalidPercent(text.to_string()))?;
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(ValidationError::PercentOutOfRange(text.trim().to_string()));
        }
        Ok(Percent(value))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    /// `amount × self / 100`, truncated toward zero
    ///
    /// Saturates at the `i64` bounds instead of overflowing.
    pub fn of(self, amount: i64) -> i64 {
        let saturated = if amount < 0 { i64::MIN } else { i64::MAX };
        Decimal::from(amount)
            .checked_mul(self.0)
            .and_then(|d| d.checked_div(Decimal::ONE_HUNDRED))
            .and_then(|d| d.trunc().to_i64())
            .unwrap_or(saturated)
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

fn normalize(text: &str) -> String {
    let mut s = text.trim().replace(',', ".");
    if s.starts_with('.') {
        s.insert(0, '0');
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// Longest numeric prefix, like a float parser that stops at junk
fn parse_leading(text: &str) -> Option<Decimal> {
    let normalized = normalize(text);
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, c) in normalized.char_indices() {
        match c {
            '-' | '+' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    let mut number = normalized[..end].to_string();
    if number.ends_with('.') {
        number.pop();
    }
    Decimal::from_str(&number).ok()
}

/// Monetary breakdown of a bill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillTotals {
    pub subtotal: i64,
    pub discount_amount: i64,
    pub vat_amount: i64,
    pub final_total: i64,
}

impl BillTotals {
    pub fn after_discount(&self) -> i64 {
        self.subtotal - self.discount_amount
    }

    /// Totals for a cart priced from the menu, using the settings' VAT
    pub fn for_cart(
        cart: &Quantities,
        menu: &MenuCatalog,
        discount_input: &str,
        settings: &Settings,
    ) -> Self {
        compute_totals(
            cart,
            |id| menu.price(id),
            Percent::lenient(discount_input),
            settings.is_vat_enabled,
            Percent::lenient(&settings.vat_percent),
        )
    }
}

/// Compute the bill for `cart`
///
/// Items missing from `price` count as 0. Discount and VAT percentages
/// above 100% are capped at 100%.
pub fn compute_totals(
    cart: &Quantities,
    price: impl Fn(i64) -> Option<i64>,
    discount: Percent,
    vat_enabled: bool,
    vat: Percent,
) -> BillTotals {
    let subtotal = cart.iter().fold(0i64, |acc, (id, qty)| {
        let line = price(*id)
            .unwrap_or(0)
            .max(0)
            .saturating_mul(i64::from(*qty));
        acc.saturating_add(line)
    });

    let discount_amount = discount.min(Percent::FULL).of(subtotal);

    let vat_amount = if vat_enabled {
        vat.min(Percent::FULL).of(subtotal - discount_amount)
    } else {
        0
    };

    BillTotals {
        subtotal,
        discount_amount,
        vat_amount,
        final_total: (subtotal - discount_amount).saturating_add(vat_amount),
    }
}

/// `126360` → `"126.360đ"`
pub fn format_money(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        grouped.insert(0, '-');
    }
    grouped.push('đ');
    grouped
}
