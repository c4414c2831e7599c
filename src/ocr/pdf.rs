//! PDF handling: embedded-text fast path and page rasterization.
//!
//! Text PDFs skip recognition entirely: extracted text is arranged into a
//! synthetic block tree with approximate sequential boxes and confidence 100.
//! Image PDFs are rasterized page by page at 300 DPI with pdftoppm (poppler)
//! and fed through the image OCR path.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::models::BoundingBox;

use super::{round2, OcrError, RawBlock, RawLine, RawPage, RawParagraph, RawWord};

/// Rasterization resolution for image PDFs.
pub const RASTER_DPI: u32 = 300;

// Synthetic page geometry (US Letter at 72 DPI).
const PAGE_WIDTH: f64 = 612.0;
const PAGE_HEIGHT: f64 = 792.0;
const MARGIN: f64 = 72.0;
const LINE_HEIGHT: f64 = 14.0;
const WORD_HEIGHT: f64 = 11.0;
const CHAR_WIDTH: f64 = 7.0;

/// Number of pages in a PDF.
pub fn page_count(bytes: &[u8]) -> Result<usize, OcrError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| OcrError::PdfFailed(e.to_string()))?;
    Ok(doc.get_pages().len())
}

/// Extract embedded text per page.
///
/// Returns one string per page, in page order. Pages without extractable
/// text yield empty strings; the caller decides whether the document as a
/// whole has text or needs rasterization.
pub fn extract_embedded_text(bytes: &[u8]) -> Result<Vec<String>, OcrError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| OcrError::PdfFailed(e.to_string()))?;

    let mut pages = Vec::new();
    for (page_num, _) in doc.get_pages() {
        let text = doc.extract_text(&[page_num]).unwrap_or_default();
        pages.push(text);
    }

    Ok(pages)
}

/// Arrange extracted text into a synthetic page tree.
///
/// Boxes are approximate: lines advance by a fixed leading from the top
/// margin and words advance by character count. Confidence is 100 because no
/// recognition occurred.
pub fn synthesize_page(text: &str) -> RawPage {
    let mut blocks = Vec::new();
    let mut y = MARGIN;

    for chunk in text.split("\n\n") {
        let mut lines = Vec::new();

        for raw_line in chunk.lines() {
            let trimmed = raw_line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let mut words = Vec::new();
            let mut x = MARGIN;
            for token in trimmed.split_whitespace() {
                let width = round2(token.chars().count() as f64 * CHAR_WIDTH);
                words.push(RawWord {
                    text: token.to_string(),
                    bbox: BoundingBox::from_origin_size(round2(x), round2(y), width, WORD_HEIGHT),
                    confidence: 100.0,
                });
                x += width + CHAR_WIDTH;
            }

            if words.is_empty() {
                continue;
            }

            let bbox = words
                .iter()
                .skip(1)
                .fold(words[0].bbox, |acc, w| acc.union(&w.bbox));
            lines.push(RawLine {
                bbox,
                confidence: 100.0,
                words,
            });
            y += LINE_HEIGHT;
        }

        if lines.is_empty() {
            continue;
        }

        let bbox = lines
            .iter()
            .skip(1)
            .fold(lines[0].bbox, |acc, l| acc.union(&l.bbox));
        blocks.push(RawBlock {
            bbox,
            confidence: 100.0,
            paragraphs: vec![RawParagraph {
                bbox,
                confidence: 100.0,
                lines,
            }],
        });

        // Paragraph gap.
        y += LINE_HEIGHT;
    }

    RawPage {
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT.max(y + MARGIN),
        blocks,
    }
}

/// Rasterize every page of a PDF to PNG files inside `work_dir`.
///
/// The caller owns `work_dir` (normally a `TempDir`), so intermediate files
/// disappear with it on every exit path. Returns the page images in order.
pub fn rasterize_pdf(bytes: &[u8], work_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let pdf_path = work_dir.join("input.pdf");
    std::fs::write(&pdf_path, bytes)?;

    let status = Command::new("pdftoppm")
        .args(["-png", "-r", &RASTER_DPI.to_string()])
        .arg(&pdf_path)
        .arg(work_dir.join("page"))
        .status();

    match status {
        Ok(s) if s.success() => {}
        Ok(_) => {
            return Err(OcrError::PdfFailed(
                "pdftoppm failed to convert PDF".to_string(),
            ))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OcrError::BackendNotAvailable(
                "pdftoppm not found (install poppler-utils)".to_string(),
            ))
        }
        Err(e) => return Err(OcrError::Io(e)),
    }

    let mut images: Vec<PathBuf> = std::fs::read_dir(work_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "png").unwrap_or(false))
        .collect();
    images.sort();

    if images.is_empty() {
        return Err(OcrError::PdfFailed(
            "No images generated from PDF".to_string(),
        ));
    }

    Ok(images)
}
