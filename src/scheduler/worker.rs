//! Worker task: one claimed job through validation, OCR, enrichment, and
//! finalization.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tempfile::TempDir;
use tokio::sync::Semaphore;

use crate::enrich::enrich;
use crate::models::Job;
use crate::ocr::{self, OcrEngine, OcrError, RawPage};
use crate::validation::validate_file;

use super::WorkerContext;

/// Process a claimed job to a terminal state.
///
/// Every failure inside the pipeline becomes FAILED with a readable message.
/// A finalize that affects zero rows means the job was deleted while running;
/// that is tolerated silently. Store errors are logged and left alone so the
/// row stays PROCESSING for the stuck detector.
pub(super) async fn process_job(job: Job, ctx: WorkerContext) {
    tracing::info!(job_id = %job.id, file = %job.file_name, mime = %job.mime_type, "processing job");
    let started = Instant::now();

    // Defense in depth: the stored MIME is already the detected one, but the
    // bytes may be corrupt or newly disallowed after a policy change.
    if let Err(e) = validate_file(&job.file_data, &job.mime_type) {
        finalize_failed(&ctx, &job.id, &format!("File validation failed: {}", e)).await;
        return;
    }

    let recognized = tokio::time::timeout(ctx.processing_timeout, recognize(&job, &ctx)).await;

    let pages = match recognized {
        Err(_) => {
            finalize_failed(&ctx, &job.id, "Processing timeout exceeded").await;
            return;
        }
        Ok(Err(e)) => {
            finalize_failed(&ctx, &job.id, &e.to_string()).await;
            return;
        }
        Ok(Ok(pages)) => pages,
    };

    let output = enrich(&pages, &job.language, started.elapsed().as_millis() as u64);

    let result_json = match serde_json::to_string(&output) {
        Ok(json) => json,
        Err(e) => {
            finalize_failed(&ctx, &job.id, &format!("Result serialization failed: {}", e)).await;
            return;
        }
    };

    match ctx.repo.finalize_completed(&job.id, &result_json).await {
        Ok(0) => {
            tracing::debug!(job_id = %job.id, "job removed while processing; result discarded");
        }
        Ok(_) => {
            tracing::info!(
                job_id = %job.id,
                words = output.metadata.word_count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "job completed"
            );
            if let Some(url) = &job.callback_webhook {
                ctx.webhook.send(url, &job.id, &job.email, &result_json).await;
            }
        }
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "failed to store result");
        }
    }
}

/// Run recognition for the job's media type, yielding pages in order.
async fn recognize(job: &Job, ctx: &WorkerContext) -> Result<Vec<RawPage>, OcrError> {
    if job.mime_type == "application/pdf" {
        recognize_pdf(job, ctx).await
    } else {
        let page = recognize_image(job, ctx).await?;
        Ok(vec![page])
    }
}

/// Image path: write to a scratch file and hand it to the engine.
async fn recognize_image(job: &Job, ctx: &WorkerContext) -> Result<RawPage, OcrError> {
    let scratch = TempDir::new()?;
    let image_path = scratch
        .path()
        .join(format!("upload.{}", extension_for(&job.mime_type)));
    tokio::fs::write(&image_path, &job.file_data).await?;

    run_engine(ctx.engine.clone(), image_path, job.language.clone()).await
}

/// PDF path: embedded text when present, rasterized page OCR otherwise.
async fn recognize_pdf(job: &Job, ctx: &WorkerContext) -> Result<Vec<RawPage>, OcrError> {
    let bytes = job.file_data.clone();
    let texts = tokio::task::spawn_blocking(move || ocr::extract_embedded_text(&bytes))
        .await
        .map_err(|e| OcrError::OcrFailed(e.to_string()))??;

    // Fast path: the PDF carries its own text, no recognition needed.
    if texts.iter().any(|t| !t.trim().is_empty()) {
        tracing::debug!(job_id = %job.id, pages = texts.len(), "PDF has embedded text");
        return Ok(texts.iter().map(|t| ocr::synthesize_page(t)).collect());
    }

    // Image path: rasterize into a worker-owned scratch dir, then fan out
    // page OCR under the page concurrency cap.
    let scratch = TempDir::new()?;
    let bytes = job.file_data.clone();
    let raster_dir = scratch.path().to_path_buf();
    let images = tokio::task::spawn_blocking(move || ocr::rasterize_pdf(&bytes, &raster_dir))
        .await
        .map_err(|e| OcrError::OcrFailed(e.to_string()))??;

    tracing::debug!(job_id = %job.id, pages = images.len(), "rasterized PDF for OCR");

    let semaphore = Arc::new(Semaphore::new(ctx.pdf_page_concurrency));
    let mut handles = Vec::with_capacity(images.len());

    for (page_index, image_path) in images.into_iter().enumerate() {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| OcrError::OcrFailed(e.to_string()))?;
        let engine = ctx.engine.clone();
        let language = job.language.clone();

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            (page_index, run_engine(engine, image_path, language).await)
        }));
    }

    let mut pages: Vec<(usize, RawPage)> = Vec::new();
    for handle in handles {
        let (page_index, result) = handle
            .await
            .map_err(|e| OcrError::OcrFailed(e.to_string()))?;
        match result {
            Ok(page) => pages.push((page_index, page)),
            Err(e) => {
                // A single bad page does not sink the document.
                tracing::warn!(page = page_index + 1, error = %e, "page OCR failed, skipping");
            }
        }
    }

    pages.sort_by_key(|(index, _)| *index);
    Ok(pages.into_iter().map(|(_, page)| page).collect())
}

/// Write the FAILED terminal state, logging (but not propagating) store
/// errors so the row stays PROCESSING for the stuck detector.
async fn finalize_failed(ctx: &WorkerContext, id: &str, error: &str) {
    match ctx.repo.finalize_failed(id, error).await {
        Ok(0) => {
            tracing::debug!(job_id = %id, "job removed while processing; failure discarded");
        }
        Ok(_) => {
            tracing::warn!(job_id = %id, error = %error, "job failed");
        }
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "failed to store failure");
        }
    }
}

/// Engines block; run them on the blocking pool.
async fn run_engine(
    engine: Arc<dyn OcrEngine>,
    image_path: PathBuf,
    language: String,
) -> Result<RawPage, OcrError> {
    tokio::task::spawn_blocking(move || engine.recognize(&image_path, &language))
        .await
        .map_err(|e| OcrError::OcrFailed(e.to_string()))?
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/tiff" => "tif",
        "image/bmp" => "bmp",
        "image/webp" => "webp",
        _ => "bin",
    }
}
