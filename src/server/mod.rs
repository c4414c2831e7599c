//! HTTP surface for the OCR service.
//!
//! Thin adapters over the job repository and the validators: upload intake,
//! status polling, the OpenAPI document, and the admin endpoints. All heavy
//! work happens in the scheduler's worker pool.

mod error;
mod handlers;
mod routes;

pub use error::{ApiError, FieldError};
pub use routes::create_router;

use std::sync::Arc;

use crate::config::Settings;
use crate::repository::JobRepository;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: JobRepository,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(repo: JobRepository, settings: Arc<Settings>) -> Self {
        Self { repo, settings }
    }
}
