//! Job scheduler: claims pending work and runs a bounded worker pool.
//!
//! The store is the queue. Each iteration reaps finished workers, claims the
//! oldest PENDING job if a slot is free, and sleeps when idle or saturated.
//! Multiple scheduler processes are safe because the claim is atomic in the
//! store; each process enforces only its own concurrency ceiling.

mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ocr::OcrEngine;
use crate::repository::JobRepository;
use crate::webhook::WebhookSink;

/// Idle wait between claim attempts when the queue is empty.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Short back-off while the worker pool is saturated.
const SATURATED_BACKOFF: Duration = Duration::from_millis(500);

/// Hard ceiling on a single recognition run.
pub const PROCESSING_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything a worker task needs.
#[derive(Clone)]
pub struct WorkerContext {
    pub repo: JobRepository,
    pub engine: Arc<dyn OcrEngine>,
    pub webhook: Arc<WebhookSink>,
    /// Per-PDF page OCR fan-out cap.
    pub pdf_page_concurrency: usize,
    /// Recognition deadline; `PROCESSING_TIMEOUT` outside tests.
    pub processing_timeout: Duration,
}

/// Run the scheduling loop until shutdown is signalled.
///
/// On shutdown the loop stops claiming; in-flight workers keep running and
/// are bounded by their own recognition timeout.
pub async fn run(
    ctx: WorkerContext,
    max_concurrent_jobs: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(max_concurrent_jobs, "scheduler started");
    let mut inflight: Vec<JoinHandle<()>> = Vec::new();

    loop {
        if *shutdown.borrow() {
            break;
        }

        inflight.retain(|handle| !handle.is_finished());

        if inflight.len() >= max_concurrent_jobs {
            sleep_or_shutdown(SATURATED_BACKOFF, &mut shutdown).await;
            continue;
        }

        match ctx.repo.claim_oldest_pending().await {
            Ok(Some(job)) => {
                let ctx = ctx.clone();
                inflight.push(tokio::spawn(async move {
                    worker::process_job(job, ctx).await;
                }));
            }
            Ok(None) => {
                sleep_or_shutdown(POLL_INTERVAL, &mut shutdown).await;
            }
            Err(e) => {
                // Store trouble: back off and retry. Claimed rows stay
                // PROCESSING and surface through the stuck detector.
                tracing::warn!(error = %e, "claim failed, backing off");
                sleep_or_shutdown(POLL_INTERVAL, &mut shutdown).await;
            }
        }
    }

    inflight.retain(|handle| !handle.is_finished());
    tracing::info!(
        in_flight = inflight.len(),
        "scheduler stopped accepting work"
    );
}

/// Sleep, waking early if shutdown flips.
async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = shutdown.changed() => {}
    }
}
