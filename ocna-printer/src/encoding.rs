//! Windows-1258 encoding utilities for Vietnamese thermal printers
//!
//! Vietnamese printers expose the WPC1258 code page. It has the base
//! letters with hat/breve/horn (â ê ô ă ơ ư đ) as single bytes and
//! carries tone marks as separate combining bytes, so a precomposed
//! letter like `ố` goes out as `ô` followed by the acute accent.
//!
//! This module provides utilities for:
//! - Calculating printed column widths
//! - Truncating/padding strings to a column width
//! - Converting UTF-8 text to WPC1258 bytes

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::{compose, is_combining_mark};

/// `ESC t n` table index of WPC1258 on Epson-compatible printers
pub const CODE_PAGE_WPC1258: u8 = 52;

/// Printed column width of a string
///
/// Combining marks print over the previous column and take no width.
pub fn text_width(s: &str) -> usize {
    s.chars().filter(|c| !is_combining_mark(*c)).count()
}

/// Truncate a string to fit within a column width
pub fn truncate_width(s: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let w = usize::from(!is_combining_mark(c));
        if width + w > max_width {
            break;
        }
        result.push(c);
        width += w;
    }
    result
}

/// Pad a string to a specific column width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_width(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_width(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

/// Convert UTF-8 text to WPC1258 bytes
///
/// ASCII passes through unchanged. Characters the code page cannot hold
/// even after decomposition are replaced by `?`.
pub fn convert_to_cp1258(s: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii() {
            result.push(c as u8);
        } else {
            encode_char(c, &mut result);
        }
    }
    result
}

fn encode_char(c: char, out: &mut Vec<u8>) {
    if let Some(b) = single_byte(c) {
        out.push(b);
        return;
    }

    let mut decomposed = std::iter::once(c).nfd();
    let Some(mut base) = decomposed.next() else {
        return;
    };

    // Fold marks into the base while the result still fits the code page
    let mut marks = Vec::new();
    for mark in decomposed {
        match compose(base, mark) {
            Some(composed) if single_byte(composed).is_some() => base = composed,
            _ => marks.push(mark),
        }
    }

    out.push(single_byte(base).unwrap_or(b'?'));
    out.extend(marks.into_iter().filter_map(single_byte));
}

fn single_byte(c: char) -> Option<u8> {
    let mut tmp = [0u8; 4];
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1258.encode(c.encode_utf8(&mut tmp));
    match (had_errors, bytes.as_ref()) {
        (false, [b]) => Some(*b),
        _ => None,
    }
}
