//! Key-value pair extraction and smart field detection.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Block, BoundingBox, KeyValuePair, SmartField};

static COLON_PAIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([^:]+):\s*(.+)$").unwrap());
static DASH_PAIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([^-]+)\s*-\s*(.+)$").unwrap());

const MAX_KEY_LEN: usize = 50;
const MAX_VALUE_LEN: usize = 200;

/// Domain patterns, tried in order; the first hit wins per field type.
static SMART_PATTERNS: LazyLock<Vec<(&'static str, &'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "Invoice Number",
            "invoice_number",
            Regex::new(r"(?i)(invoice|inv|bill)\s*#?\s*:?\s*([A-Z0-9\-]+)").unwrap(),
        ),
        (
            "PO Number",
            "po_number",
            Regex::new(r"(?i)\b(p\.?o\.?|purchase\s+order)\s*(?:#|no\.?|number)?\s*:?\s*([A-Z0-9\-]+)")
                .unwrap(),
        ),
        (
            "Total",
            "total",
            Regex::new(r"(?i)(grand total|amount due|total)\s*:?\s*\$?\s*([\d,]+\.?\d{0,2})")
                .unwrap(),
        ),
        (
            "Subtotal",
            "subtotal",
            Regex::new(r"(?i)(subtotal|sub total)\s*:?\s*\$?\s*([\d,]+\.?\d{0,2})").unwrap(),
        ),
        (
            "Tax",
            "tax",
            Regex::new(r"(?i)\b(tax|vat|gst)\s*:?\s*\$?\s*([\d,]+\.?\d{0,2})").unwrap(),
        ),
        (
            "Date",
            "date",
            Regex::new(
                r"(?xi)
                (\d{1,2}[/-]\d{1,2}[/-]\d{2,4})
                | (\d{4}[/-]\d{1,2}[/-]\d{1,2})
                | (\d{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\w*\s+\d{2,4})
                | ((?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\w*\s+\d{1,2},?\s+\d{2,4})",
            )
            .unwrap(),
        ),
    ]
});

/// Key substrings that promote a key-value pair to a typed smart field.
static KEYED_FIELDS: LazyLock<Vec<(&'static str, Vec<&'static str>)>> = LazyLock::new(|| {
    vec![
        ("email", vec!["email"]),
        ("phone", vec!["phone", "tel"]),
        ("address", vec!["address"]),
        ("customer", vec!["customer", "bill to"]),
        ("vendor", vec!["vendor", "from"]),
    ]
});

/// Extract `key: value` and `key - value` pairs from every line.
///
/// Key and value boxes are approximated by splitting the line's words 40/60,
/// which is close enough for highlighting in a viewer.
pub fn extract_key_value_pairs(blocks: &[Block]) -> Vec<KeyValuePair> {
    let mut pairs = Vec::new();

    for line in blocks
        .iter()
        .flat_map(|b| &b.paragraphs)
        .flat_map(|p| &p.lines)
    {
        let captures = COLON_PAIR
            .captures(&line.text)
            .or_else(|| DASH_PAIR.captures(&line.text));
        let Some(captures) = captures else {
            continue;
        };

        let key = captures[1].trim().to_string();
        let value = captures[2].trim().to_string();

        if key.is_empty() || key.len() >= MAX_KEY_LEN {
            continue;
        }
        if value.is_empty() || value.len() >= MAX_VALUE_LEN {
            continue;
        }

        let (key_bbox, value_bbox) = split_line_bbox(line);
        pairs.push(KeyValuePair {
            key,
            value,
            key_bbox,
            value_bbox,
        });
    }

    pairs
}

/// Approximate key/value boxes as the first 40% and last 60% of line words.
fn split_line_bbox(line: &crate::models::Line) -> (BoundingBox, BoundingBox) {
    let n = line.words.len();
    if n == 0 {
        return (line.bbox, line.bbox);
    }

    let split = ((n as f64 * 0.4).ceil() as usize).clamp(1, n);
    let union = |words: &[crate::models::Word]| -> Option<BoundingBox> {
        let first = words.first()?;
        Some(
            words
                .iter()
                .skip(1)
                .fold(first.bbox, |acc, w| acc.union(&w.bbox)),
        )
    };

    let key_bbox = union(&line.words[..split]).unwrap_or(line.bbox);
    let value_bbox = union(&line.words[split.min(n.saturating_sub(1))..]).unwrap_or(line.bbox);
    (key_bbox, value_bbox)
}

/// Detect smart fields from domain patterns and keyed pairs.
///
/// Pattern hits come first (one per field type), then key-value pairs whose
/// key names a known field are promoted.
pub fn extract_smart_fields(text: &str, pairs: &[KeyValuePair]) -> Vec<SmartField> {
    let mut fields = Vec::new();

    for (name, field_type, pattern) in SMART_PATTERNS.iter() {
        let Some(captures) = pattern.captures(text) else {
            continue;
        };

        // Date alternations capture the whole match; the others capture the
        // value in group 2.
        let value = if *field_type == "date" {
            captures.get(0).map(|m| m.as_str())
        } else {
            captures.get(2).map(|m| m.as_str())
        };

        if let Some(value) = value {
            fields.push(SmartField {
                name: name.to_string(),
                value: value.trim().to_string(),
                field_type: field_type.to_string(),
            });
        }
    }

    for pair in pairs {
        let key_lower = pair.key.to_lowercase();
        for (field_type, needles) in KEYED_FIELDS.iter() {
            if needles.iter().any(|needle| key_lower.contains(needle)) {
                fields.push(SmartField {
                    name: pair.key.clone(),
                    value: pair.value.clone(),
                    field_type: field_type.to_string(),
                });
                break;
            }
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BlockType, Line, LineAlignment, Paragraph, TextType, Word, WordContentType,
    };

    fn line_of(text: &str) -> Line {
        let words: Vec<Word> = text
            .split_whitespace()
            .enumerate()
            .map(|(i, token)| Word {
                text: token.to_string(),
                bbox: BoundingBox::from_origin_size(i as f64 * 60.0, 100.0, 50.0, 12.0),
                confidence: 90.0,
                font_size: 9,
                content_type: WordContentType::Text,
            })
            .collect();
        Line {
            text: text.to_string(),
            bbox: BoundingBox::from_origin_size(0.0, 100.0, 60.0 * words.len() as f64, 12.0),
            confidence: 90.0,
            alignment: LineAlignment::Left,
            words,
        }
    }

    fn block_of(lines: Vec<Line>) -> Block {
        let bbox = lines[0].bbox;
        Block {
            text: lines
                .iter()
                .map(|l| l.text.clone())
                .collect::<Vec<_>>()
                .join("\n"),
            bbox,
            confidence: 90.0,
            block_type: BlockType::Text,
            reading_order: 1,
            paragraphs: vec![Paragraph {
                text: String::new(),
                bbox,
                confidence: 90.0,
                text_type: TextType::Body,
                level: None,
                lines,
            }],
        }
    }

    #[test]
    fn test_colon_pairs() {
        let blocks = [block_of(vec![line_of("Customer Name: ACME Corp")])];
        let pairs = extract_key_value_pairs(&blocks);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key, "Customer Name");
        assert_eq!(pairs[0].value, "ACME Corp");
    }

    #[test]
    fn test_dash_pairs() {
        let blocks = [block_of(vec![line_of("Reference - ABC 123")])];
        let pairs = extract_key_value_pairs(&blocks);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key, "Reference");
        assert_eq!(pairs[0].value, "ABC 123");
    }

    #[test]
    fn test_length_bounds() {
        let long_key = format!("{}: v", "k".repeat(60));
        let long_value = format!("k: {}", "v".repeat(250));
        let blocks = [block_of(vec![
            line_of(&long_key),
            line_of(&long_value),
            line_of("plain line without a separator at all"),
        ])];
        assert!(extract_key_value_pairs(&blocks).is_empty());
    }

    #[test]
    fn test_key_value_boxes_split_words() {
        let blocks = [block_of(vec![line_of("Total: $99.00")])];
        let pairs = extract_key_value_pairs(&blocks);
        let pair = &pairs[0];
        assert!(pair.key_bbox.x1 <= pair.value_bbox.x1);
        assert!(pair.key_bbox.x0 < pair.value_bbox.x0);
    }

    #[test]
    fn test_invoice_and_total_fields() {
        let fields = extract_smart_fields("Invoice #INV-2041\nTotal: $1,499.00", &[]);
        let invoice = fields.iter().find(|f| f.field_type == "invoice_number");
        assert_eq!(invoice.unwrap().value, "INV-2041");
        let total = fields.iter().find(|f| f.field_type == "total");
        assert_eq!(total.unwrap().value, "1,499.00");
    }

    #[test]
    fn test_date_field_variants() {
        for sample in [
            "Date: 12/31/2024",
            "Date: 2024-12-31",
            "Issued 31 December 2024",
            "Issued December 31, 2024",
        ] {
            let fields = extract_smart_fields(sample, &[]);
            assert!(
                fields.iter().any(|f| f.field_type == "date"),
                "no date found in {sample:?}"
            );
        }
    }

    #[test]
    fn test_first_hit_wins_per_type() {
        let fields = extract_smart_fields("Invoice A-1\nInvoice B-2", &[]);
        let hits: Vec<_> = fields
            .iter()
            .filter(|f| f.field_type == "invoice_number")
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, "A-1");
    }

    #[test]
    fn test_keyed_pair_promotion() {
        let pairs = vec![
            KeyValuePair {
                key: "Contact Email".to_string(),
                value: "billing@acme.test".to_string(),
                key_bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                value_bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            },
            KeyValuePair {
                key: "Bill To".to_string(),
                value: "ACME Corp".to_string(),
                key_bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                value_bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            },
            KeyValuePair {
                key: "Irrelevant".to_string(),
                value: "nothing".to_string(),
                key_bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                value_bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            },
        ];

        let fields = extract_smart_fields("", &pairs);
        assert!(fields
            .iter()
            .any(|f| f.field_type == "email" && f.value == "billing@acme.test"));
        assert!(fields
            .iter()
            .any(|f| f.field_type == "customer" && f.value == "ACME Corp"));
        assert!(!fields.iter().any(|f| f.name == "Irrelevant"));
    }
}
