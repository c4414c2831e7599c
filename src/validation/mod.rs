//! Content validation applied at ingestion and re-applied by the worker.

mod file;
mod webhook_url;

pub use file::{
    normalize_mime, validate_file, ValidatedFile, ValidationError, ALLOWED_MIME_TYPES,
    MAX_FILE_BYTES, MAX_IMAGE_DIMENSION, MAX_IMAGE_PIXELS, MAX_PDF_PAGES,
};
pub use webhook_url::{validate_webhook_url, WebhookUrlError};
