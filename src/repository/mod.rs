//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking.
//! SQLite is wrapped with diesel-async's SyncConnectionWrapper to provide an
//! async interface; the jobs table doubles as the work queue.

mod jobs;
mod migrations;
mod pool;
mod records;

pub use jobs::{DeleteOutcome, JobRepository, STUCK_THRESHOLD_MINUTES};
pub use migrations::run_migrations;
pub use pool::{AsyncSqlitePool, DieselError};

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}
