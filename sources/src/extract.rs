//! Price extraction from fetched provider documents.
//!
//! The providers publish rates inside ordinary markup rather than an API, so
//! extraction is pattern-based: find number-like tokens, normalize the
//! decimal separator, and keep only values inside the provider's plausible
//! band. The band is what separates a rate from phone numbers, years, and
//! other numeric noise on the page.

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

fn price_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+[.,]\d{2,6}").expect("static pattern"))
}

/// Parse a price token, accepting a comma as decimal separator.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    raw.replace(',', ".").parse().ok()
}

/// All price-like tokens in `text` strictly inside `(min, max)`, in
/// document order.
pub fn prices_in_band(text: &str, min: Decimal, max: Decimal) -> Vec<Decimal> {
    price_pattern()
        .find_iter(text)
        .filter_map(|m| parse_price(m.as_str()))
        .filter(|value| *value > min && *value < max)
        .collect()
}

/// First price-like token in `text` strictly inside `(min, max)`.
pub fn first_price_in_band(text: &str, min: Decimal, max: Decimal) -> Option<Decimal> {
    prices_in_band(text, min, max).into_iter().next()
}

/// First banded price following `label` (for "compra"/"venta" style markup).
///
/// The label match is case-insensitive and tolerates separators and a
/// currency sign between label and value.
pub fn labeled_price(text: &str, label: &str, min: Decimal, max: Decimal) -> Option<Decimal> {
    let pattern = Regex::new(&format!(
        r"(?i){}[\s:]*\$?\s*(\d+[.,]\d{{2,4}})",
        regex::escape(label)
    ))
    .ok()?;

    let result = pattern
        .captures_iter(text)
        .filter_map(|caps| parse_price(caps.get(1)?.as_str()))
        .find(|value| *value > min && *value < max);
    result
}
