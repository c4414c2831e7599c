//! Enrichment pipeline: raw recognition output to the final result tree.
//!
//! Pure and deterministic. Word, line, paragraph, and block classification
//! run per page with that page's dimensions; structure analysis (tables,
//! key-value pairs, smart fields, entities, document class, page layout)
//! runs over the merged block list.

mod entities;
mod fields;
mod layout;
mod tables;
mod words;

pub use entities::extract_notable_data;
pub use fields::{extract_key_value_pairs, extract_smart_fields};
pub use tables::detect_tables;

use crate::models::{
    Block, BlockType, DetectedList, DocumentClass, DocumentStructure, Line, OcrOutput, Paragraph,
    ResultMetadata, SmartField, TextType, Word,
};
use crate::ocr::{RawBlock, RawPage};

/// Enrich recognized pages into the result document.
///
/// `language` and `processing_time_ms` are carried into the metadata
/// verbatim; everything else is a function of the page content.
pub fn enrich(pages: &[RawPage], language: &str, processing_time_ms: u64) -> OcrOutput {
    let mut blocks = Vec::new();
    for page in pages {
        for raw_block in &page.blocks {
            blocks.push(build_block(raw_block, page));
        }
    }
    for (index, block) in blocks.iter_mut().enumerate() {
        block.reading_order = index as u32 + 1;
    }

    let text = blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let word_count = blocks
        .iter()
        .flat_map(|b| &b.paragraphs)
        .flat_map(|p| &p.lines)
        .map(|l| l.words.len())
        .sum::<usize>();
    let line_count = blocks
        .iter()
        .flat_map(|b| &b.paragraphs)
        .map(|p| p.lines.len())
        .sum::<usize>();

    let confidence = mean_confidence(&blocks);

    let tables = detect_tables(&blocks);
    let key_value_pairs = extract_key_value_pairs(&blocks);
    let smart_fields = extract_smart_fields(&text, &key_value_pairs);
    let notable_data = extract_notable_data(&text);

    let headings: Vec<String> = blocks
        .iter()
        .flat_map(|b| &b.paragraphs)
        .filter(|p| p.text_type == TextType::Heading)
        .map(|p| p.text.clone())
        .collect();
    let title = headings.first().cloned();

    let lists: Vec<DetectedList> = blocks
        .iter()
        .flat_map(|b| &b.paragraphs)
        .filter(|p| p.text_type == TextType::List)
        .map(|p| DetectedList {
            items: p.lines.iter().map(|l| l.text.clone()).collect(),
        })
        .collect();

    let document_type = classify_document(&text, &blocks, &smart_fields, tables.len());
    let page_layout = layout::page_layout(&blocks);

    let metadata = ResultMetadata {
        language: language.to_string(),
        processing_time_ms,
        page_count: Some(pages.len() as u32),
        word_count,
        line_count,
        avg_confidence: confidence,
    };

    OcrOutput {
        text,
        confidence,
        blocks,
        structure: DocumentStructure {
            title,
            headings,
            lists,
            tables,
            key_value_pairs,
            smart_fields,
            notable_data,
            document_type,
            page_layout,
        },
        metadata,
    }
}

/// Build one enriched block from the raw tree, classifying every level.
fn build_block(raw: &RawBlock, page: &RawPage) -> Block {
    let paragraphs: Vec<Paragraph> = raw
        .paragraphs
        .iter()
        .map(|raw_paragraph| {
            let lines: Vec<Line> = raw_paragraph
                .lines
                .iter()
                .map(|raw_line| {
                    let line_words: Vec<Word> = raw_line
                        .words
                        .iter()
                        .map(|raw_word| Word {
                            text: raw_word.text.clone(),
                            bbox: raw_word.bbox,
                            confidence: raw_word.confidence,
                            font_size: words::font_size_from_height(raw_word.bbox.height),
                            content_type: words::classify_word(&raw_word.text),
                        })
                        .collect();

                    Line {
                        text: line_words
                            .iter()
                            .map(|w| w.text.as_str())
                            .collect::<Vec<_>>()
                            .join(" "),
                        bbox: raw_line.bbox,
                        confidence: raw_line.confidence,
                        alignment: layout::line_alignment(&raw_line.bbox, page.width),
                        words: line_words,
                    }
                })
                .collect();

            let text = lines
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let (text_type, level) =
                layout::classify_paragraph(&text, &raw_paragraph.bbox, page.height);

            Paragraph {
                text,
                bbox: raw_paragraph.bbox,
                confidence: raw_paragraph.confidence,
                text_type,
                level,
                lines,
            }
        })
        .collect();

    let block_type = layout::classify_block(&paragraphs, page.height);

    Block {
        text: paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        bbox: raw.bbox,
        confidence: raw.confidence,
        block_type,
        reading_order: 0,
        paragraphs,
    }
}

/// Mean word confidence across the document, 0 when there are no words.
fn mean_confidence(blocks: &[Block]) -> f64 {
    let confidences: Vec<f64> = blocks
        .iter()
        .flat_map(|b| &b.paragraphs)
        .flat_map(|p| &p.lines)
        .flat_map(|l| &l.words)
        .map(|w| w.confidence)
        .collect();

    if confidences.is_empty() {
        return 0.0;
    }

    let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// Infer the document class from text cues and detected structure.
///
/// Rules are checked in a fixed order; the first to fire wins.
fn classify_document(
    text: &str,
    blocks: &[Block],
    smart_fields: &[SmartField],
    table_count: usize,
) -> DocumentClass {
    let lower = text.to_lowercase();
    let has_field = |field_type: &str| smart_fields.iter().any(|f| f.field_type == field_type);

    let has_total = has_field("total");

    if (lower.contains("invoice") || has_field("invoice_number")) && has_total {
        return DocumentClass::Invoice;
    }
    if lower.contains("receipt") && has_total {
        return DocumentClass::Receipt;
    }
    if smart_fields.len() > 5 {
        return DocumentClass::Form;
    }
    if blocks.iter().any(|b| b.block_type == BlockType::Heading) && table_count >= 1 {
        return DocumentClass::Report;
    }
    if has_field("address") && blocks.len() > 3 {
        return DocumentClass::Letter;
    }

    DocumentClass::Unknown
}
