//! Diesel-based job repository.
//!
//! The jobs table is the queue: PENDING rows are claimed atomically by
//! competing workers, and all later writes for a row come from the worker
//! that claimed it (or from an explicit admin action).

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::models::{Job, JobMeta, JobStatus, NewJob};
use crate::schema::jobs;

use super::pool::{AsyncSqlitePool, DieselError};
use super::records::{JobMetaRow, JobRecord, NewJobRecord};

/// How long a PROCESSING job may go without an update before it counts
/// as stuck.
pub const STUCK_THRESHOLD_MINUTES: i64 = 10;

/// Outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// The job is PROCESSING and `force` was not set.
    ProcessingWithoutForce,
}

/// Repository for job rows.
#[derive(Clone)]
pub struct JobRepository {
    pool: AsyncSqlitePool,
}

impl JobRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a fresh PENDING job and return it.
    pub async fn create(&self, new_job: NewJob) -> Result<Job, DieselError> {
        let mut conn = self.pool.get().await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        let record = NewJobRecord {
            id: &id,
            status: JobStatus::Pending.as_str(),
            document_type: &new_job.document_type,
            email: &new_job.email,
            callback_webhook: new_job.callback_webhook.as_deref(),
            file_data: &new_job.file_data,
            file_name: &new_job.file_name,
            mime_type: &new_job.mime_type,
            language: &new_job.language,
            created_at: &now_str,
            updated_at: &now_str,
        };

        diesel::insert_into(jobs::table)
            .values(&record)
            .execute(&mut conn)
            .await?;

        Ok(Job {
            id,
            status: JobStatus::Pending,
            document_type: new_job.document_type,
            email: new_job.email,
            callback_webhook: new_job.callback_webhook,
            file_data: new_job.file_data,
            file_name: new_job.file_name,
            mime_type: new_job.mime_type,
            language: new_job.language,
            ocr_result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            processed_at: None,
        })
    }

    /// Fetch a job including its file payload.
    pub async fn get(&self, id: &str) -> Result<Option<Job>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record: Option<JobRecord> = jobs::table
            .find(id)
            .select(JobRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record.map(Job::from))
    }

    /// Fetch a job without its file payload.
    pub async fn get_meta(&self, id: &str) -> Result<Option<JobMeta>, DieselError> {
        let mut conn = self.pool.get().await?;

        let row: Option<JobMetaRow> = jobs::table
            .find(id)
            .select(Self::meta_columns())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(row.map(JobMeta::from))
    }

    /// List jobs newest-first, optionally filtered by status.
    ///
    /// Returns the page and the total count matching the filter.
    pub async fn list(
        &self,
        status: Option<JobStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<JobMeta>, i64), DieselError> {
        let mut conn = self.pool.get().await?;

        let total: i64 = match status {
            Some(status) => {
                jobs::table
                    .filter(jobs::status.eq(status.as_str()))
                    .count()
                    .get_result(&mut conn)
                    .await?
            }
            None => jobs::table.count().get_result(&mut conn).await?,
        };

        let mut page_query = jobs::table.select(Self::meta_columns()).into_boxed();
        if let Some(status) = status {
            page_query = page_query.filter(jobs::status.eq(status.as_str()));
        }

        let rows: Vec<JobMetaRow> = page_query
            .order(jobs::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await?;

        Ok((rows.into_iter().map(JobMeta::from).collect(), total))
    }

    /// Per-status job counts.
    pub async fn count_by_status(&self) -> Result<HashMap<JobStatus, i64>, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(String, i64)> = jobs::table
            .group_by(jobs::status)
            .select((jobs::status, diesel::dsl::count_star()))
            .load(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| JobStatus::from_str(&status).map(|s| (s, count)))
            .collect())
    }

    /// Number of jobs created at or after the cutoff.
    pub async fn count_created_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;

        jobs::table
            .filter(jobs::created_at.ge(cutoff.to_rfc3339()))
            .count()
            .get_result(&mut conn)
            .await
    }

    /// Atomically claim the oldest PENDING job, marking it PROCESSING.
    ///
    /// A single UPDATE with a subquery keeps select-and-mark in one SQLite
    /// statement, so at most one caller can obtain a given row no matter how
    /// many scheduler processes race on the table.
    pub async fn claim_oldest_pending(&self) -> Result<Option<Job>, DieselError> {
        let mut conn = self.pool.get().await?;

        let now_str = Utc::now().to_rfc3339();

        diesel::sql_query(
            r#"UPDATE jobs
               SET status = 'PROCESSING', updated_at = ?
               WHERE id = (
                   SELECT id FROM jobs
                   WHERE status = 'PENDING'
                   ORDER BY created_at ASC
                   LIMIT 1
               )
               RETURNING *"#,
        )
        .bind::<Text, _>(&now_str)
        .get_result::<JobRecord>(&mut conn)
        .await
        .optional()
        .map(|record| record.map(Job::from))
    }

    /// Write the COMPLETED terminal state.
    ///
    /// Returns the number of affected rows; zero means the job was deleted
    /// under the worker, which callers must tolerate.
    pub async fn finalize_completed(
        &self,
        id: &str,
        result_json: &str,
    ) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        let now_str = Utc::now().to_rfc3339();

        diesel::update(jobs::table.find(id))
            .set((
                jobs::status.eq(JobStatus::Completed.as_str()),
                jobs::ocr_result.eq(result_json),
                jobs::error_message.eq(None::<String>),
                jobs::processed_at.eq(&now_str),
                jobs::updated_at.eq(&now_str),
            ))
            .execute(&mut conn)
            .await
    }

    /// Write the FAILED terminal state.
    pub async fn finalize_failed(&self, id: &str, error: &str) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        let now_str = Utc::now().to_rfc3339();

        diesel::update(jobs::table.find(id))
            .set((
                jobs::status.eq(JobStatus::Failed.as_str()),
                jobs::error_message.eq(error),
                jobs::processed_at.eq(&now_str),
                jobs::updated_at.eq(&now_str),
            ))
            .execute(&mut conn)
            .await
    }

    /// Admin reset: back to PENDING with error state cleared.
    ///
    /// May race a still-running worker for the same row; the final state is
    /// the last writer's.
    pub async fn reset_to_pending(&self, id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let now_str = Utc::now().to_rfc3339();

        let affected = diesel::update(jobs::table.find(id))
            .set((
                jobs::status.eq(JobStatus::Pending.as_str()),
                jobs::error_message.eq(None::<String>),
                jobs::processed_at.eq(None::<String>),
                jobs::updated_at.eq(&now_str),
            ))
            .execute(&mut conn)
            .await?;

        Ok(affected > 0)
    }

    /// Admin status override.
    ///
    /// PENDING clears error state; FAILED with a message records the failure
    /// and stamps `processed_at`; other statuses move the state flag only.
    pub async fn admin_update_status(
        &self,
        id: &str,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<Option<JobMeta>, DieselError> {
        match (status, error_message) {
            (JobStatus::Pending, _) => {
                self.reset_to_pending(id).await?;
            }
            (JobStatus::Failed, Some(error)) => {
                self.finalize_failed(id, error).await?;
            }
            (other, _) => {
                let mut conn = self.pool.get().await?;
                let now_str = Utc::now().to_rfc3339();
                diesel::update(jobs::table.find(id))
                    .set((
                        jobs::status.eq(other.as_str()),
                        jobs::updated_at.eq(&now_str),
                    ))
                    .execute(&mut conn)
                    .await?;
            }
        }

        self.get_meta(id).await
    }

    /// Delete a job. PROCESSING rows are refused unless `force` is set.
    pub async fn delete(&self, id: &str, force: bool) -> Result<DeleteOutcome, DieselError> {
        let mut conn = self.pool.get().await?;

        let status: Option<String> = jobs::table
            .find(id)
            .select(jobs::status)
            .first(&mut conn)
            .await
            .optional()?;

        let Some(status) = status else {
            return Ok(DeleteOutcome::NotFound);
        };

        if status == JobStatus::Processing.as_str() && !force {
            return Ok(DeleteOutcome::ProcessingWithoutForce);
        }

        let affected = diesel::delete(jobs::table.find(id)).execute(&mut conn).await?;

        if affected > 0 {
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    /// PROCESSING jobs whose last update is older than the stuck threshold.
    pub async fn stuck_jobs(&self, now: DateTime<Utc>) -> Result<Vec<JobMeta>, DieselError> {
        let mut conn = self.pool.get().await?;

        let cutoff = (now - Duration::minutes(STUCK_THRESHOLD_MINUTES)).to_rfc3339();

        let rows: Vec<JobMetaRow> = jobs::table
            .filter(jobs::status.eq(JobStatus::Processing.as_str()))
            .filter(jobs::updated_at.lt(cutoff))
            .order(jobs::updated_at.asc())
            .select(Self::meta_columns())
            .load(&mut conn)
            .await?;

        Ok(rows.into_iter().map(JobMeta::from).collect())
    }

    /// Mean creation-to-completion time over the most recent completions.
    pub async fn avg_processing_ms(&self, sample: i64) -> Result<Option<f64>, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(String, Option<String>)> = jobs::table
            .filter(jobs::status.eq(JobStatus::Completed.as_str()))
            .order(jobs::processed_at.desc())
            .limit(sample)
            .select((jobs::created_at, jobs::processed_at))
            .load(&mut conn)
            .await?;

        let durations: Vec<i64> = rows
            .into_iter()
            .filter_map(|(created, processed)| {
                let created = super::parse_datetime(&created);
                let processed = super::parse_datetime_opt(processed)?;
                Some((processed - created).num_milliseconds())
            })
            .collect();

        if durations.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            durations.iter().sum::<i64>() as f64 / durations.len() as f64,
        ))
    }

    /// Select list for payload-free reads; must match `JobMetaRow` field order.
    #[allow(clippy::type_complexity)]
    fn meta_columns() -> (
        jobs::id,
        jobs::status,
        jobs::document_type,
        jobs::email,
        jobs::callback_webhook,
        jobs::file_name,
        jobs::mime_type,
        jobs::language,
        diesel::expression::SqlLiteral<BigInt>,
        jobs::ocr_result,
        jobs::error_message,
        jobs::created_at,
        jobs::updated_at,
        jobs::processed_at,
    ) {
        (
            jobs::id,
            jobs::status,
            jobs::document_type,
            jobs::email,
            jobs::callback_webhook,
            jobs::file_name,
            jobs::mime_type,
            jobs::language,
            sql::<BigInt>("length(file_data)"),
            jobs::ocr_result,
            jobs::error_message,
            jobs::created_at,
            jobs::updated_at,
            jobs::processed_at,
        )
    }
}
