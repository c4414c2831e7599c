//! Runtime configuration read from the environment.

use std::env;

/// Service settings with their documented defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Store connection; a SQLite path, `sqlite:` prefix optional.
    pub database_url: String,
    /// Base URL used in webhook status links.
    pub app_domain: String,
    /// Listen address for the HTTP surface.
    pub bind_addr: String,
    /// Worker pool ceiling per scheduler process.
    pub max_concurrent_jobs: usize,
    /// Per-PDF page OCR fan-out cap.
    pub pdf_page_concurrency: usize,
    /// Optional override for the OpenAPI `servers[0]` entry.
    pub api_base_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "ocr_jobs.db".to_string(),
            app_domain: "http://localhost:3040".to_string(),
            bind_addr: "0.0.0.0:3040".to_string(),
            max_concurrent_jobs: 3,
            pdf_page_concurrency: 4,
            api_base_url: None,
        }
    }
}

impl Settings {
    /// Build settings from environment variables, falling back to defaults.
    ///
    /// Unparseable numeric values fall back rather than abort; a worker
    /// count of zero is clamped to one so the scheduler can make progress.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_url: env_or("DATABASE_URL", &defaults.database_url),
            app_domain: env_or("APP_DOMAIN", &defaults.app_domain),
            bind_addr: env_or("BIND_ADDR", &defaults.bind_addr),
            max_concurrent_jobs: env_usize("MAX_CONCURRENT_JOBS", defaults.max_concurrent_jobs)
                .max(1),
            pdf_page_concurrency: env_usize("PDF_PAGE_CONCURRENCY", defaults.pdf_page_concurrency)
                .max(1),
            api_base_url: env::var("NEXT_PUBLIC_API_BASE_URL")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
