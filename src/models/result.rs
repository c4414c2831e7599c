//! Result document produced by the enrichment pipeline.
//!
//! The tree mirrors the recognition hierarchy (block, paragraph, line, word)
//! and adds derived structure: tables, key-value pairs, typed entities, and a
//! document-class label. The whole tree is serialized to JSON and stored in
//! the job row; it is immutable once written.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x + width,
            y1: y + height,
            width,
            height,
        }
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Content category inferred for a single word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordContentType {
    Text,
    Number,
    Date,
    Email,
    Url,
    Currency,
    Phone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub text: String,
    pub bbox: BoundingBox,
    /// Recognition confidence, 0-100.
    pub confidence: f64,
    /// Estimated point size derived from the box height.
    pub font_size: u32,
    pub content_type: WordContentType,
}

/// Horizontal alignment of a line relative to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineAlignment {
    Left,
    Center,
    Right,
    Justified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub alignment: LineAlignment,
    pub words: Vec<Word>,
}

/// Role a paragraph plays on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextType {
    Heading,
    Body,
    List,
    Caption,
    Footer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub text_type: TextType,
    /// Heading level 1-6, present only for headings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    pub lines: Vec<Line>,
}

/// Role a block plays in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Text,
    Heading,
    List,
    Table,
    Header,
    Footer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub block_type: BlockType,
    /// 1-based position in reading order.
    pub reading_order: u32,
    pub paragraphs: Vec<Paragraph>,
}

/// A table reconstructed from line spacing and word column clusters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedTable {
    pub rows: usize,
    pub cols: usize,
    /// Whether the first row of `cells` looks like a header row.
    pub has_header: bool,
    pub cells: Vec<Vec<String>>,
    pub bbox: BoundingBox,
}

/// A list reconstructed from consecutive list-classified paragraphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedList {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
    pub key_bbox: BoundingBox,
    pub value_bbox: BoundingBox,
}

/// A named field recognized by domain patterns (invoice number, total, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartField {
    pub name: String,
    pub value: String,
    pub field_type: String,
}

/// A typed value extracted from the full document text.
///
/// For sensitive kinds (credit card, SSN) `value` holds the raw digits and
/// `display_value` a mask; UI callers must render `display_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub value: String,
    pub display_value: String,
}

impl Entity {
    pub fn plain(entity_type: &str, value: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            value: value.to_string(),
            display_value: value.to_string(),
        }
    }

    pub fn masked(entity_type: &str, value: &str, display_value: String) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            value: value.to_string(),
            display_value,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotableData {
    pub entities: Vec<Entity>,
    pub currency_amounts: Vec<Entity>,
    pub dates: Vec<Entity>,
    pub identifiers: Vec<Entity>,
}

/// Coarse document class inferred from structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentClass {
    Invoice,
    Receipt,
    Form,
    Report,
    Letter,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayout {
    pub columns: u32,
    pub has_header: bool,
    pub has_footer: bool,
    /// Fraction of the used page area covered by paragraph boxes, 0-1.
    pub text_density: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStructure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub headings: Vec<String>,
    pub lists: Vec<DetectedList>,
    pub tables: Vec<DetectedTable>,
    pub key_value_pairs: Vec<KeyValuePair>,
    pub smart_fields: Vec<SmartField>,
    pub notable_data: NotableData,
    pub document_type: DocumentClass,
    pub page_layout: PageLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub language: String,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub word_count: usize,
    pub line_count: usize,
    pub avg_confidence: f64,
}

/// The complete enriched result stored in `jobs.ocr_result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrOutput {
    /// Block text concatenated in reading order.
    pub text: String,
    /// Mean word confidence, 0-100.
    pub confidence: f64,
    pub blocks: Vec<Block>,
    pub structure: DocumentStructure,
    pub metadata: ResultMetadata,
}
