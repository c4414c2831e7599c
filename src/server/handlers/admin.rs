//! Admin inspection and intervention endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::models::{JobMeta, JobStatus};
use crate::repository::{DeleteOutcome, STUCK_THRESHOLD_MINUTES};

use super::super::error::ApiError;
use super::super::AppState;
use super::status::require_uuid;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Sample size for the average-processing-time stat.
const AVG_SAMPLE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub force: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatchBody {
    pub status: String,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

/// `GET /api/admin/stats`: queue health at a glance.
pub async fn stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let now = Utc::now();

    let counts = state.repo.count_by_status().await?;
    let last_hour = state
        .repo
        .count_created_since(now - Duration::hours(1))
        .await?;
    let stuck = state.repo.stuck_jobs(now).await?;
    let avg_processing_ms = state.repo.avg_processing_ms(AVG_SAMPLE).await?;

    let count_of = |status: JobStatus| counts.get(&status).copied().unwrap_or(0);

    let stuck_jobs: Vec<_> = stuck
        .iter()
        .map(|job| {
            serde_json::json!({
                "id": job.id,
                "fileName": job.file_name,
                "updatedAt": job.updated_at.to_rfc3339(),
                "stuckForSeconds": (now - job.updated_at).num_seconds(),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "counts": {
            "PENDING": count_of(JobStatus::Pending),
            "PROCESSING": count_of(JobStatus::Processing),
            "COMPLETED": count_of(JobStatus::Completed),
            "FAILED": count_of(JobStatus::Failed),
        },
        "lastHour": last_hour,
        "stuckThresholdMinutes": STUCK_THRESHOLD_MINUTES,
        "stuckJobs": stuck_jobs,
        "avgProcessingTimeMs": avg_processing_ms,
    })))
}

/// `GET /api/admin/jobs`: newest-first paged listing.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = match params.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            JobStatus::from_str(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid status: {}", raw)))?,
        ),
    };

    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let (jobs, total) = state.repo.list(status, limit, offset).await?;

    let now = Utc::now();
    let jobs_json: Vec<_> = jobs.iter().map(|job| job_json(job, now)).collect();

    Ok(Json(serde_json::json!({
        "jobs": jobs_json,
        "total": total,
        "limit": limit,
        "offset": offset,
        "hasMore": offset + (jobs.len() as i64) < total,
    })))
}

/// `GET /api/admin/jobs/{id}`: single job, payload size only.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_uuid(&id)?;

    let meta = state
        .repo
        .get_meta(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", id)))?;

    // The single-job view carries the result string; listings only flag it.
    let mut body = job_json(&meta, Utc::now());
    body["ocrResult"] = serde_json::json!(meta.ocr_result);
    Ok(Json(body))
}

/// `DELETE /api/admin/jobs/{id}?force=`: remove a job; PROCESSING needs
/// force.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_uuid(&id)?;

    let force = matches!(params.force.as_deref(), Some("true") | Some("1"));

    match state.repo.delete(&id, force).await? {
        DeleteOutcome::Deleted => Ok(Json(serde_json::json!({
            "message": "Job deleted",
            "id": id,
        }))),
        DeleteOutcome::NotFound => Err(ApiError::NotFound(format!("Job not found: {}", id))),
        DeleteOutcome::ProcessingWithoutForce => Err(ApiError::BadRequest(
            "Cannot delete a job that is processing; pass force=true to override".to_string(),
        )),
    }
}

/// `PATCH /api/admin/jobs/{id}`: status override.
///
/// PENDING clears error state (the stuck-job reset); FAILED requires a
/// message and stamps the terminal timestamp.
pub async fn patch_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PatchBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_uuid(&id)?;

    let status = JobStatus::from_str(&body.status)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid status: {}", body.status)))?;

    if status == JobStatus::Failed && body.error_message.as_deref().unwrap_or("").is_empty() {
        return Err(ApiError::BadRequest(
            "errorMessage is required when setting status to FAILED".to_string(),
        ));
    }

    let meta = state
        .repo
        .admin_update_status(&id, status, body.error_message.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", id)))?;

    Ok(Json(serde_json::json!({ "job": job_json(&meta, Utc::now()) })))
}

/// Admin view of a job row; derived fields, never the payload.
fn job_json(job: &JobMeta, now: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "id": job.id,
        "status": job.status,
        "documentType": job.document_type,
        "email": job.email,
        "callbackWebhook": job.callback_webhook,
        "fileName": job.file_name,
        "mimeType": job.mime_type,
        "language": job.language,
        "fileSizeBytes": job.file_size,
        "errorMessage": job.error_message,
        "hasResult": job.ocr_result.is_some(),
        "createdAt": job.created_at.to_rfc3339(),
        "updatedAt": job.updated_at.to_rfc3339(),
        "processedAt": job.processed_at.map(|dt| dt.to_rfc3339()),
        "processingTime": job.processing_time_ms(),
        "isStuck": job.is_stuck(now, Duration::minutes(STUCK_THRESHOLD_MINUTES)),
        "age": (now - job.created_at).num_milliseconds(),
    })
}
