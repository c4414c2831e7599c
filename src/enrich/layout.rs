//! Positional classification: line alignment, paragraph and block roles,
//! and whole-page layout measures.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    Block, BlockType, BoundingBox, LineAlignment, PageLayout, Paragraph, TextType,
};

use super::words::font_size_from_height;

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\d.)\-•*]\s").unwrap());

/// Minimum x-gap between block starts that counts as a column break.
const COLUMN_GAP: f64 = 50.0;

/// Classify a line's alignment from its box and the page width.
pub fn line_alignment(bbox: &BoundingBox, page_width: f64) -> LineAlignment {
    if page_width <= 0.0 {
        return LineAlignment::Left;
    }

    let center_x = bbox.center_x();
    let page_center = page_width / 2.0;
    let left_margin = bbox.x0;
    let right_margin = page_width - bbox.x1;

    if (center_x - page_center).abs() < 0.10 * page_width {
        LineAlignment::Center
    } else if right_margin < 0.10 * page_width && left_margin > 0.20 * page_width {
        LineAlignment::Right
    } else if (left_margin - right_margin).abs() < 0.05 * page_width
        && left_margin < 0.10 * page_width
        && right_margin < 0.10 * page_width
    {
        LineAlignment::Justified
    } else {
        LineAlignment::Left
    }
}

/// Classify a paragraph's role; headings also get a level.
///
/// Position rules run before font-size rules: text in the top tenth of the
/// page is a heading no matter its size, text in the bottom tenth a footer.
pub fn classify_paragraph(
    text: &str,
    bbox: &BoundingBox,
    page_height: f64,
) -> (TextType, Option<u8>) {
    let font_size = font_size_from_height(bbox.height);

    if bbox.y0 < 0.10 * page_height {
        let level = if font_size > 16 { 1 } else { 2 };
        return (TextType::Heading, Some(level));
    }

    if bbox.y0 > 0.90 * page_height {
        return (TextType::Footer, None);
    }

    if font_size > 24 {
        return (TextType::Heading, Some(1));
    }
    if font_size > 20 {
        return (TextType::Heading, Some(2));
    }
    if font_size > 16 {
        return (TextType::Heading, Some(3));
    }

    if LIST_MARKER.is_match(text) {
        return (TextType::List, None);
    }

    if text.len() < 100 && (bbox.y0 < 0.15 * page_height || bbox.y0 > 0.85 * page_height) {
        return (TextType::Caption, None);
    }

    (TextType::Body, None)
}

/// Classify a block from its paragraphs' positions and roles.
pub fn classify_block(paragraphs: &[Paragraph], page_height: f64) -> BlockType {
    if paragraphs.is_empty() {
        return BlockType::Text;
    }

    if paragraphs.iter().all(|p| p.bbox.y0 < 0.10 * page_height) {
        return BlockType::Header;
    }
    if paragraphs.iter().all(|p| p.bbox.y0 > 0.90 * page_height) {
        return BlockType::Footer;
    }
    if paragraphs.iter().any(|p| p.text_type == TextType::Heading) {
        return BlockType::Heading;
    }
    if paragraphs.iter().any(|p| p.text_type == TextType::List) {
        return BlockType::List;
    }

    BlockType::Text
}

/// Whole-page layout measures over the final block list.
pub fn page_layout(blocks: &[Block]) -> PageLayout {
    let mut x_starts: Vec<f64> = blocks.iter().map(|b| b.bbox.x0).collect();
    x_starts.sort_by(|a, b| a.total_cmp(b));

    let column_breaks = x_starts
        .windows(2)
        .filter(|pair| pair[1] - pair[0] > COLUMN_GAP)
        .count();

    let paragraphs: Vec<&Paragraph> = blocks.iter().flat_map(|b| &b.paragraphs).collect();

    let covered: f64 = paragraphs.iter().map(|p| p.bbox.area()).sum();
    let extent = paragraphs
        .iter()
        .map(|p| p.bbox.x1 * p.bbox.y1)
        .fold(0.0f64, f64::max);
    let text_density = if extent > 0.0 { covered / extent } else { 0.0 };

    PageLayout {
        columns: 1 + column_breaks as u32,
        has_header: blocks.iter().any(|b| b.block_type == BlockType::Header),
        has_footer: blocks.iter().any(|b| {
            b.block_type == BlockType::Footer
                || b.paragraphs.iter().any(|p| p.text_type == TextType::Footer)
        }),
        text_density,
    }
}
