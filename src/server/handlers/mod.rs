//! HTTP handlers, grouped by surface.

mod admin;
mod openapi;
mod status;
mod upload;

pub use admin::{delete_job, get_job, list_jobs, patch_job, stats};
pub use openapi::openapi;
pub use status::{health, status};
pub use upload::upload;
