//! OCR engine abstraction and raw recognition output.
//!
//! The engine is an opaque capability: given an image and a language it
//! returns a positioned block tree. The production backend shells out to
//! Tesseract; PDF handling (embedded-text fast path and 300 DPI
//! rasterization) lives in `pdf`.

mod pdf;
mod tesseract;

pub use pdf::{
    extract_embedded_text, page_count, rasterize_pdf, synthesize_page, RASTER_DPI,
};
pub use tesseract::TesseractEngine;

use std::path::Path;

use thiserror::Error;

use crate::models::BoundingBox;

/// Errors raised by recognition backends and PDF handling.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Unexpected OCR output: {0}")]
    InvalidOutput(String),

    #[error("PDF processing failed: {0}")]
    PdfFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A recognized word with its position and confidence.
#[derive(Debug, Clone)]
pub struct RawWord {
    pub text: String,
    pub bbox: BoundingBox,
    /// 0-100 as reported by the engine.
    pub confidence: f64,
}

/// A line of words.
#[derive(Debug, Clone)]
pub struct RawLine {
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub words: Vec<RawWord>,
}

/// A paragraph of lines.
#[derive(Debug, Clone)]
pub struct RawParagraph {
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub lines: Vec<RawLine>,
}

/// A top-level layout block.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub paragraphs: Vec<RawParagraph>,
}

/// Recognition output for one page.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub width: f64,
    pub height: f64,
    pub blocks: Vec<RawBlock>,
}

impl RawPage {
    /// All words on the page in reading order.
    pub fn words(&self) -> impl Iterator<Item = &RawWord> {
        self.blocks
            .iter()
            .flat_map(|b| &b.paragraphs)
            .flat_map(|p| &p.lines)
            .flat_map(|l| &l.words)
    }
}

/// An OCR capability: bytes on disk plus a language, out comes a block tree.
///
/// Implementations are blocking; callers run them on the blocking pool.
pub trait OcrEngine: Send + Sync {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &'static str;

    /// Recognize a single page image.
    fn recognize(&self, image_path: &Path, language: &str) -> Result<RawPage, OcrError>;
}

/// Round a pixel coordinate to two decimals.
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
