//! Job status endpoint used by polling clients.

use std::sync::LazyLock;

use axum::extract::{Path, State};
use axum::Json;
use regex::Regex;

use super::super::error::{ApiError, FieldError};
use super::super::AppState;

/// Canonical 8-4-4-4-12 UUID shape.
static UUID_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// Reject malformed job identifiers before touching the store.
pub fn require_uuid(id: &str) -> Result<(), ApiError> {
    if UUID_SHAPE.is_match(id) {
        Ok(())
    } else {
        Err(ApiError::Validation(vec![FieldError::new(
            "id",
            "id must be a UUID",
        )]))
    }
}

/// `GET /api/status/{id}`: current state, plus the result or error when
/// terminal.
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_uuid(&id)?;

    let meta = state
        .repo
        .get_meta(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", id)))?;

    Ok(Json(serde_json::json!({
        "id": meta.id,
        "status": meta.status,
        "documentType": meta.document_type,
        "email": meta.email,
        "createdAt": meta.created_at.to_rfc3339(),
        "updatedAt": meta.updated_at.to_rfc3339(),
        "ocrResult": meta.ocr_result,
        "errorMessage": meta.error_message,
        "processedAt": meta.processed_at.map(|dt| dt.to_rfc3339()),
    })))
}

/// `GET /api/health`: liveness for container orchestration.
pub async fn health() -> axum::http::StatusCode {
    axum::http::StatusCode::OK
}
