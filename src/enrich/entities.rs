//! Notable-data extraction: a full-document pass of typed patterns.
//!
//! Pattern order is load-bearing. Dutch BTW numbers are matched before IBAN
//! so a BTW value is never misclassified, and routing numbers require a
//! keyword nearby so bare nine-digit numbers stay plain. Credit-card and SSN
//! values keep their raw digits in `value` and expose a mask in
//! `display_value`; anything user-facing must render the mask.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Entity, NotableData};

static BTW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{2}\d{9}B\d{2}$").unwrap());
static IBAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}\d{2}[A-Z0-9]{11,30}$").unwrap());
static SWIFT_BIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{4}[A-Z]{2}[A-Z0-9]{2}(?:[A-Z0-9]{3})?$").unwrap());

static CREDIT_CARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d[ \-]?){15}\d\b").unwrap());
static SSN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static EIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{2}-\d{7}\b").unwrap());
static VAT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bvat\s*(?:no\.?|number|reg(?:istration)?\s*no\.?)?\s*:?\s*([A-Z]{2}\d{8,12}|\d{7,12})")
        .unwrap()
});
static PERCENTAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+(?:\.\d+)?%").unwrap());
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b").unwrap()
});
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?\d{1,2}[\s.\-]?)?\(?\d{3}\)?[\s.\-]\d{3}[\s.\-]?\d{4}\b|\+\d{7,14}\b")
        .unwrap()
});
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bhttps?://[^\s<>"]+|\bwww\.[^\s<>"]+"#).unwrap());
static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})\b").unwrap());

static DATE_NUMERIC_DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-]\d{2,4}\b").unwrap());
static DATE_NUMERIC_YMD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}[/-](\d{1,2})[/-](\d{1,2})\b").unwrap());
static DATE_DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\w*\s+\d{2,4}\b")
        .unwrap()
});
static DATE_MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\w*\s+(\d{1,2}),?\s+\d{2,4}\b")
        .unwrap()
});

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:reference|ref|confirmation)\s*(?:no\.?|number|#)?\s*:?\s*([A-Z0-9][A-Z0-9\-]{3,})")
        .unwrap()
});
static SERIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:serial\s*(?:no\.?|number|#)?|s/n)\s*:?\s*([A-Z0-9][A-Z0-9\-]{3,})")
        .unwrap()
});
static ROUTING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{9}\b").unwrap());
static ROUTING_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)routing|aba|rtn").unwrap());

/// Five currency families: symbol-before, symbol-after, ISO code, spelled
/// name, parenthesized negative.
static CURRENCY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let amount = r"\d+(?:[.,]\d{3})*(?:\.\d{1,2})?";
    vec![
        Regex::new(&format!(r"[$€£¥]\s?{amount}")).unwrap(),
        Regex::new(&format!(r"\b{amount}\s?[$€£¥]")).unwrap(),
        Regex::new(&format!(
            r"\b(?:USD|EUR|GBP|JPY|CHF|CAD|AUD)\s?{amount}\b|\b{amount}\s?(?:USD|EUR|GBP|JPY|CHF|CAD|AUD)\b"
        ))
        .unwrap(),
        Regex::new(&format!(r"(?i)\b{amount}\s?(?:dollars?|euros?|pounds?|yen)\b")).unwrap(),
        Regex::new(&format!(r"\(\s?[$€£¥]?\s?{amount}\s?\)")).unwrap(),
    ]
});

/// Window, in characters, searched around a nine-digit number for a routing
/// keyword.
const ROUTING_WINDOW: usize = 20;

/// Run the full extraction pass over the document text.
pub fn extract_notable_data(text: &str) -> NotableData {
    let mut entities = Vec::new();
    let mut currency_amounts = Vec::new();
    let mut dates = Vec::new();
    let mut identifiers = Vec::new();

    // Token-shaped identifiers first; BTW must win over IBAN.
    for token in text.split_whitespace() {
        let token = token.trim_matches(|c: char| ",.;:()[]{}<>\"'".contains(c));
        if token.is_empty() {
            continue;
        }

        if BTW.is_match(token) {
            entities.push(Entity::plain("vat", token));
        } else if IBAN.is_match(token) {
            entities.push(Entity::plain("iban", token));
        } else if SWIFT_BIC.is_match(token) && token.chars().any(|c| c.is_ascii_digit()) {
            entities.push(Entity::plain("swift_bic", token));
        }
    }

    for m in CREDIT_CARD.find_iter(text) {
        let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() == 16 {
            entities.push(Entity::masked("credit_card", &digits, mask_credit_card(&digits)));
        }
    }

    for m in SSN.find_iter(text) {
        entities.push(Entity::masked("ssn", m.as_str(), mask_ssn(m.as_str())));
    }

    for m in EIN.find_iter(text) {
        // SSNs have a 3-2-4 shape and never collide with the 2-7 EIN shape.
        entities.push(Entity::plain("ein", m.as_str()));
    }

    for captures in VAT_KEYWORD.captures_iter(text) {
        if let Some(value) = captures.get(1) {
            entities.push(Entity::plain("vat", value.as_str()));
        }
    }

    for m in PERCENTAGE.find_iter(text) {
        entities.push(Entity::plain("percentage", m.as_str()));
    }

    for m in EMAIL.find_iter(text) {
        entities.push(Entity::plain("email", m.as_str()));
    }

    for m in PHONE.find_iter(text) {
        let digits = m.as_str().chars().filter(|c| c.is_ascii_digit()).count();
        if (7..=15).contains(&digits) {
            entities.push(Entity::plain("phone", m.as_str().trim()));
        }
    }

    for m in URL.find_iter(text) {
        entities.push(Entity::plain("url", m.as_str()));
    }

    for captures in IPV4.captures_iter(text) {
        let valid = (1..=4).all(|i| {
            captures
                .get(i)
                .and_then(|o| o.as_str().parse::<u32>().ok())
                .map(|octet| octet <= 255)
                .unwrap_or(false)
        });
        if valid {
            entities.push(Entity::plain("ipv4", &captures[0]));
        }
    }

    collect_dates(text, &mut dates);

    for captures in REFERENCE.captures_iter(text) {
        identifiers.push(Entity::plain("reference_number", &captures[1]));
    }

    for captures in SERIAL.captures_iter(text) {
        identifiers.push(Entity::plain("serial_number", &captures[1]));
    }

    for m in ROUTING.find_iter(text) {
        if ROUTING_KEYWORD.is_match(&char_window(text, m.start(), m.end(), ROUTING_WINDOW)) {
            identifiers.push(Entity::plain("routing_number", m.as_str()));
        }
    }

    for pattern in CURRENCY_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            currency_amounts.push(Entity::plain("currency_amount", m.as_str().trim()));
        }
    }

    NotableData {
        entities: dedupe(entities),
        currency_amounts: dedupe(currency_amounts),
        dates: dedupe(dates),
        identifiers: dedupe(identifiers),
    }
}

/// Four date families with range validation on day and month components.
fn collect_dates(text: &str, dates: &mut Vec<Entity>) {
    for captures in DATE_NUMERIC_DMY.captures_iter(text) {
        let a: u32 = captures[1].parse().unwrap_or(0);
        let b: u32 = captures[2].parse().unwrap_or(0);
        // Either order of month and day is accepted.
        let valid = (1..=12).contains(&a) && (1..=31).contains(&b)
            || (1..=31).contains(&a) && (1..=12).contains(&b);
        if valid {
            dates.push(Entity::plain("date", &captures[0]));
        }
    }

    for captures in DATE_NUMERIC_YMD.captures_iter(text) {
        let month: u32 = captures[1].parse().unwrap_or(0);
        let day: u32 = captures[2].parse().unwrap_or(0);
        if (1..=12).contains(&month) && (1..=31).contains(&day) {
            dates.push(Entity::plain("date", &captures[0]));
        }
    }

    for captures in DATE_DAY_MONTH.captures_iter(text) {
        let day: u32 = captures[1].parse().unwrap_or(0);
        if (1..=31).contains(&day) {
            dates.push(Entity::plain("date", &captures[0]));
        }
    }

    for captures in DATE_MONTH_DAY.captures_iter(text) {
        let day: u32 = captures[1].parse().unwrap_or(0);
        if (1..=31).contains(&day) {
            dates.push(Entity::plain("date", &captures[0]));
        }
    }
}

/// Mask all but the last four digits, grouped like a card number.
fn mask_credit_card(digits: &str) -> String {
    let last_four = &digits[digits.len().saturating_sub(4)..];
    format!("****-****-****-{}", last_four)
}

/// Mask all but the last four digits of an SSN.
fn mask_ssn(ssn: &str) -> String {
    let last_four = &ssn[ssn.len().saturating_sub(4)..];
    format!("***-**-{}", last_four)
}

/// A character-boundary-safe window around a byte span.
fn char_window(text: &str, start: usize, end: usize, margin: usize) -> String {
    let before: String = text[..start]
        .chars()
        .rev()
        .take(margin)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let after: String = text[end..].chars().take(margin).collect();
    format!("{}{}{}", before, &text[start..end], after)
}

/// Collapse duplicates of the same (type, value), keeping first occurrence
/// order.
fn dedupe(entities: Vec<Entity>) -> Vec<Entity> {
    let mut seen = std::collections::HashSet::new();
    entities
        .into_iter()
        .filter(|e| seen.insert((e.entity_type.clone(), e.value.clone())))
        .collect()
}
