//! Service entry point: configuration, store setup, scheduler, HTTP server.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_api::config::Settings;
use ocr_api::ocr::TesseractEngine;
use ocr_api::repository::{run_migrations, AsyncSqlitePool, JobRepository};
use ocr_api::scheduler::{self, WorkerContext, PROCESSING_TIMEOUT};
use ocr_api::server::{create_router, AppState};
use ocr_api::webhook::WebhookSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocr_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Arc::new(Settings::from_env());
    tracing::info!(
        database = %settings.database_url,
        bind = %settings.bind_addr,
        workers = settings.max_concurrent_jobs,
        "starting OCR service"
    );

    run_migrations(&settings.database_url).await?;

    let pool = AsyncSqlitePool::new(&settings.database_url);
    let repo = JobRepository::new(pool);

    let engine = TesseractEngine::new();
    if !engine.is_available() {
        tracing::warn!("tesseract binary not found; image OCR jobs will fail until installed");
    }

    let webhook = Arc::new(WebhookSink::new(&settings.app_domain)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_ctx = WorkerContext {
        repo: repo.clone(),
        engine: Arc::new(engine),
        webhook,
        pdf_page_concurrency: settings.pdf_page_concurrency,
        processing_timeout: PROCESSING_TIMEOUT,
    };
    let scheduler_handle = tokio::spawn(scheduler::run(
        worker_ctx,
        settings.max_concurrent_jobs,
        shutdown_rx,
    ));

    let state = AppState::new(repo, settings.clone());
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop claiming new jobs; in-flight workers finish on their own clock.
    let _ = shutdown_tx.send(true);
    let _ = scheduler_handle.await;
    tracing::info!("shutdown complete");

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
