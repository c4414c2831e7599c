//! Word-level enrichment: font size estimation and content typing.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::WordContentType;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(https?://|www\.)").unwrap());
static PHONE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s\-()+]{7,}$").unwrap());
static THREE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{3}").unwrap());
static CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[$€£¥]?\s*\d+([,.]\d+)*(\.\d{2})?$").unwrap());
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|\d{4}[/-]\d{1,2}[/-]\d{1,2})$").unwrap()
});
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+([,.]\d+)*$").unwrap());

/// Estimated point size from a box height in pixels.
pub fn font_size_from_height(height: f64) -> u32 {
    (height * 0.75).round().max(0.0) as u32
}

/// Assign a content type by the first matching pattern.
///
/// The evaluation order is part of the contract; later patterns only see
/// words that every earlier pattern rejected.
pub fn classify_word(text: &str) -> WordContentType {
    if EMAIL.is_match(text) {
        WordContentType::Email
    } else if URL.is_match(text) {
        WordContentType::Url
    } else if PHONE_SHAPE.is_match(text) && THREE_DIGITS.is_match(text) {
        WordContentType::Phone
    } else if CURRENCY.is_match(text) {
        WordContentType::Currency
    } else if DATE.is_match(text) {
        WordContentType::Date
    } else if NUMBER.is_match(text) {
        WordContentType::Number
    } else {
        WordContentType::Text
    }
}
