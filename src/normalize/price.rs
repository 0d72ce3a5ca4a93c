use crate::common::constants::PRICE_UNAVAILABLE;
use once_cell::sync::Lazy;
use regex::Regex;

static PRICE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-)?[$€£]?\s*(-)?(\d[\d,]*(?:\.\d+)?)").unwrap());

/// Parse a price out of free-form currency text.
///
/// The first number in the text wins; thousands separators are dropped.
/// Text without a number (`"N/A"`, `""`, `"Call for price"`) and signed
/// amounts (`"-5.00"`, `"$-5"`) yield `None`.
pub fn parse_price(text: &str) -> Option<f64> {
    let caps = PRICE_NUMBER.captures(text)?;
    if caps.get(1).is_some() || caps.get(2).is_some() {
        return None;
    }
    let digits = caps.get(3)?.as_str().replace(',', "");
    digits
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Render a price for reports and listings
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(value) => format!("${value:.2}"),
        None => PRICE_UNAVAILABLE.to_string(),
    }
}
