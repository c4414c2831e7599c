//! Upload endpoint: multipart intake, validation, job creation.

use std::sync::LazyLock;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use regex::Regex;

use crate::models::NewJob;
use crate::validation::{validate_file, validate_webhook_url};

use super::super::error::{ApiError, FieldError};
use super::super::AppState;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Tesseract language codes: three-letter groups joined with `+`.
static LANGUAGE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{3}(?:_[a-z]+)?(?:\+[a-z]{3}(?:_[a-z]+)?)*$").unwrap());

const DEFAULT_LANGUAGE: &str = "eng";

#[derive(Default)]
struct UploadForm {
    file_data: Option<Vec<u8>>,
    file_name: Option<String>,
    claimed_mime: Option<String>,
    document_type: Option<String>,
    email: Option<String>,
    callback_webhook: Option<String>,
    language: Option<String>,
}

/// `POST /api/upload`: accept a document and enqueue a PENDING job.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let form = read_form(multipart).await?;
    let mut details = Vec::new();

    let document_type = form.document_type.unwrap_or_default();
    if document_type.trim().is_empty() {
        details.push(FieldError::new("documentType", "documentType is required"));
    }

    let email = form.email.unwrap_or_default();
    if email.trim().is_empty() {
        details.push(FieldError::new("email", "email is required"));
    } else if !EMAIL_SHAPE.is_match(&email) {
        details.push(FieldError::new("email", "email is not a valid address"));
    }

    if let Some(url) = form.callback_webhook.as_deref() {
        if let Err(e) = validate_webhook_url(url) {
            details.push(FieldError::new("callbackWebhook", e.to_string()));
        }
    }

    let language = form.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    if !LANGUAGE_SHAPE.is_match(&language) {
        details.push(FieldError::new("language", "language is not a valid code"));
    }

    if form.file_data.is_none() {
        details.push(FieldError::new("file", "file is required"));
    }

    if !details.is_empty() {
        return Err(ApiError::Validation(details));
    }

    let file_data = form.file_data.unwrap_or_default();
    let claimed_mime = form.claimed_mime.unwrap_or_default();

    let detected_mime = match validate_file(&file_data, &claimed_mime) {
        Ok(validated) => validated.detected_mime.to_string(),
        Err(e) => {
            return Err(ApiError::Validation(vec![FieldError::new(
                "file",
                e.to_string(),
            )]));
        }
    };

    let job = state
        .repo
        .create(NewJob {
            document_type,
            email,
            callback_webhook: form.callback_webhook,
            file_data,
            file_name: form.file_name.unwrap_or_else(|| "upload".to_string()),
            mime_type: detected_mime,
            language,
        })
        .await?;

    tracing::info!(job_id = %job.id, file = %job.file_name, "job accepted");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": job.id,
            "status": "PENDING",
            "message": "File uploaded successfully and queued for processing",
        })),
    ))
}

/// Drain the multipart stream into a form, ignoring unknown fields.
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                form.claimed_mime = field.content_type().map(|s| s.to_string());
                form.file_name = field.file_name().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read file data: {}", e))
                })?;
                form.file_data = Some(data.to_vec());
            }
            "documentType" => form.document_type = Some(read_text(field).await?),
            "email" => form.email = Some(read_text(field).await?),
            "callbackWebhook" => {
                let value = read_text(field).await?;
                if !value.is_empty() {
                    form.callback_webhook = Some(value);
                }
            }
            "language" => {
                let value = read_text(field).await?;
                if !value.is_empty() {
                    form.language = Some(value);
                }
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map(|s| s.trim().to_string())
        .map_err(|e| ApiError::BadRequest(format!("Failed to read form field: {}", e)))
}
