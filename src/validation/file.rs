//! Upload validation: magic-number typing and decompression-bomb defenses.
//!
//! Validation runs twice per job: once at ingestion (bad uploads never reach
//! the queue) and again in the worker before OCR, so corrupt rows or policy
//! changes are caught even after a file was accepted.

use std::io::Cursor;

use thiserror::Error;

/// Maximum accepted upload size.
pub const MAX_FILE_BYTES: usize = 50 * 1024 * 1024;

/// Maximum decoded pixel count for images (roughly a 13k x 13k RGBA page).
pub const MAX_IMAGE_PIXELS: u64 = 178_956_970;

/// Maximum width or height for images.
pub const MAX_IMAGE_DIMENSION: u32 = 50_000;

/// Page-count bounds for PDFs.
pub const MAX_PDF_PAGES: usize = 500;

/// How much of a PDF is scanned for active-content tokens.
const PDF_SCAN_WINDOW: usize = 1024 * 1024;

/// MIME types the pipeline accepts, in detection order.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/tiff",
    "image/bmp",
    "image/webp",
    "application/pdf",
];

/// Validation failures, ordered by the gate that raises them.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes exceeds the {max} byte limit")]
    FileTooLarge { size: usize, max: usize },

    #[error("Could not detect file type from content")]
    UnknownType,

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File type mismatch: claimed {claimed}, detected {detected}")]
    TypeMismatch { claimed: String, detected: String },

    #[error("Image dimensions exceed limits: {width}x{height}")]
    ImageTooLarge { width: u32, height: u32 },

    #[error("Malformed image: {0}")]
    MalformedImage(String),

    #[error("Malformed PDF: {0}")]
    MalformedPdf(String),

    #[error("Encrypted PDFs are not supported")]
    EncryptedPdf,

    #[error("PDF page count out of range: {0} (limit {MAX_PDF_PAGES})")]
    PdfPageCount(usize),
}

/// A file that passed every gate.
#[derive(Debug)]
pub struct ValidatedFile<'a> {
    /// MIME type detected from the leading bytes, never the client's claim.
    pub detected_mime: &'static str,
    /// The accepted byte buffer.
    pub sanitized: &'a [u8],
}

/// Validate an upload against its claimed MIME type.
///
/// Gates run in order and the first failure wins: size, magic-number
/// detection, allow-list, claim/detection consistency, then type-specific
/// structural checks. Pure function of its inputs; no I/O.
pub fn validate_file<'a>(
    bytes: &'a [u8],
    claimed_mime: &str,
) -> Result<ValidatedFile<'a>, ValidationError> {
    if bytes.len() > MAX_FILE_BYTES {
        return Err(ValidationError::FileTooLarge {
            size: bytes.len(),
            max: MAX_FILE_BYTES,
        });
    }

    let detected = infer::get(bytes)
        .map(|kind| kind.mime_type())
        .ok_or(ValidationError::UnknownType)?;

    let detected = ALLOWED_MIME_TYPES
        .iter()
        .copied()
        .find(|mime| *mime == detected)
        .ok_or_else(|| ValidationError::UnsupportedType(detected.to_string()))?;

    let claimed = normalize_mime(claimed_mime);
    if claimed != detected {
        return Err(ValidationError::TypeMismatch {
            claimed,
            detected: detected.to_string(),
        });
    }

    match detected {
        "application/pdf" => check_pdf(bytes)?,
        _ => check_image(bytes)?,
    }

    Ok(ValidatedFile {
        detected_mime: detected,
        sanitized: bytes,
    })
}

/// Normalize a claimed MIME type: lowercase, strip parameters, and fold the
/// common short aliases onto their canonical names.
pub fn normalize_mime(mime: &str) -> String {
    let base = mime
        .split(';')
        .next()
        .unwrap_or(mime)
        .trim()
        .to_lowercase();

    match base.as_str() {
        "image/jpg" => "image/jpeg".to_string(),
        "image/tif" => "image/tiff".to_string(),
        _ => base,
    }
}

/// Structural checks for images.
///
/// Dimensions are read from the header first, then the pixel data is decoded
/// under allocation limits and pushed through a trial downscale. A file that
/// cannot survive the thumbnail transform will not survive OCR either.
fn check_image(bytes: &[u8]) -> Result<(), ValidationError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ValidationError::MalformedImage(e.to_string()))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ValidationError::MalformedImage(e.to_string()))?;

    if width > MAX_IMAGE_DIMENSION
        || height > MAX_IMAGE_DIMENSION
        || u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS
    {
        return Err(ValidationError::ImageTooLarge { width, height });
    }

    let mut limits = image::Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    // Worst case RGBA at the pixel ceiling.
    limits.max_alloc = Some(MAX_IMAGE_PIXELS.saturating_mul(4));

    let mut reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ValidationError::MalformedImage(e.to_string()))?;
    reader.limits(limits);

    let decoded = reader
        .decode()
        .map_err(|e| ValidationError::MalformedImage(e.to_string()))?;

    // Trial transform: proves the image decodes end-to-end.
    let _ = decoded.thumbnail(100, 100);

    Ok(())
}

/// Structural checks for PDFs: parseable, unencrypted, bounded page count.
///
/// Active-content markers are logged but accepted; a PDF that parses cleanly
/// is still OCR-able regardless of embedded script entries.
fn check_pdf(bytes: &[u8]) -> Result<(), ValidationError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ValidationError::MalformedPdf(e.to_string()))?;

    if doc.is_encrypted() {
        return Err(ValidationError::EncryptedPdf);
    }

    let page_count = doc.get_pages().len();
    if page_count == 0 || page_count > MAX_PDF_PAGES {
        return Err(ValidationError::PdfPageCount(page_count));
    }

    for token in active_content_tokens(bytes) {
        tracing::warn!("PDF contains active content marker {}", token);
    }

    Ok(())
}

/// Scan the leading window of a PDF for active-content tokens.
fn active_content_tokens(bytes: &[u8]) -> Vec<&'static str> {
    let window = &bytes[..bytes.len().min(PDF_SCAN_WINDOW)];
    let haystack = String::from_utf8_lossy(window);

    ["/JavaScript", "/JS", "/OpenAction", "/AA"]
        .into_iter()
        .filter(|token| haystack.contains(token))
        .collect()
}
