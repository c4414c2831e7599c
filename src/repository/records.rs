//! Diesel ORM records for the jobs table.

use diesel::prelude::*;

use crate::models::{Job, JobMeta, JobStatus};
use crate::schema;

use super::parse_datetime;
use super::parse_datetime_opt;

/// Job row as stored, including the file payload.
#[derive(Queryable, Selectable, Identifiable, QueryableByName, Debug, Clone)]
#[diesel(table_name = schema::jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobRecord {
    pub id: String,
    pub status: String,
    pub document_type: String,
    pub email: String,
    pub callback_webhook: Option<String>,
    pub file_data: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub language: String,
    pub ocr_result: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub processed_at: Option<String>,
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        Job {
            id: record.id,
            status: JobStatus::from_str(&record.status).unwrap_or(JobStatus::Pending),
            document_type: record.document_type,
            email: record.email,
            callback_webhook: record.callback_webhook,
            file_data: record.file_data,
            file_name: record.file_name,
            mime_type: record.mime_type,
            language: record.language,
            ocr_result: record.ocr_result,
            error_message: record.error_message,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
            processed_at: parse_datetime_opt(record.processed_at),
        }
    }
}

/// New job for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::jobs)]
pub struct NewJobRecord<'a> {
    pub id: &'a str,
    pub status: &'a str,
    pub document_type: &'a str,
    pub email: &'a str,
    pub callback_webhook: Option<&'a str>,
    pub file_data: &'a [u8],
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub language: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Row shape for payload-free reads; `file_size` comes from SQL
/// `length(file_data)` so the BLOB stays in the database.
#[derive(Queryable, Debug, Clone)]
pub struct JobMetaRow {
    pub id: String,
    pub status: String,
    pub document_type: String,
    pub email: String,
    pub callback_webhook: Option<String>,
    pub file_name: String,
    pub mime_type: String,
    pub language: String,
    pub file_size: i64,
    pub ocr_result: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub processed_at: Option<String>,
}

impl From<JobMetaRow> for JobMeta {
    fn from(row: JobMetaRow) -> Self {
        JobMeta {
            id: row.id,
            status: JobStatus::from_str(&row.status).unwrap_or(JobStatus::Pending),
            document_type: row.document_type,
            email: row.email,
            callback_webhook: row.callback_webhook,
            file_name: row.file_name,
            mime_type: row.mime_type,
            language: row.language,
            file_size: row.file_size.max(0) as u64,
            ocr_result: row.ocr_result,
            error_message: row.error_message,
            created_at: parse_datetime(&row.created_at),
            updated_at: parse_datetime(&row.updated_at),
            processed_at: parse_datetime_opt(row.processed_at),
        }
    }
}
