//! Job model for queued OCR work.
//!
//! A job is the sole persisted entity: the uploaded file travels inside the
//! row, and the worker writes its result (or failure) back into the same row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether this status admits no further worker transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A queued OCR job, including the uploaded bytes.
///
/// Invariants maintained by the repository:
/// - COMPLETED implies `ocr_result` is set and `error_message` is not.
/// - FAILED implies `error_message` is set.
/// - Terminal states carry a `processed_at` timestamp.
#[derive(Debug, Clone)]
pub struct Job {
    /// Server-assigned UUID v4 in textual form.
    pub id: String,
    pub status: JobStatus,
    /// Client-supplied document label; opaque to the pipeline.
    pub document_type: String,
    pub email: String,
    /// Optional delivery URL, SSRF-validated at ingestion and immutable after.
    pub callback_webhook: Option<String>,
    /// Uploaded file content.
    pub file_data: Vec<u8>,
    pub file_name: String,
    /// Detected (not claimed) MIME type.
    pub mime_type: String,
    /// OCR language hint (tesseract language code).
    pub language: String,
    /// Serialized result JSON, set when the job completes.
    pub ocr_result: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Job view without the file payload, for listings and status responses.
///
/// `file_size` is computed in SQL so the BLOB never leaves the database
/// for read-only endpoints.
#[derive(Debug, Clone)]
pub struct JobMeta {
    pub id: String,
    pub status: JobStatus,
    pub document_type: String,
    pub email: String,
    pub callback_webhook: Option<String>,
    pub file_name: String,
    pub mime_type: String,
    pub language: String,
    pub file_size: u64,
    pub ocr_result: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl JobMeta {
    /// Wall-clock duration from creation to the terminal transition.
    pub fn processing_time_ms(&self) -> Option<i64> {
        self.processed_at
            .map(|done| (done - self.created_at).num_milliseconds())
    }

    /// Whether the job has sat in PROCESSING past the stuck threshold.
    pub fn is_stuck(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        self.status == JobStatus::Processing && now - self.updated_at > threshold
    }
}

/// Fields for creating a fresh PENDING job.
#[derive(Debug)]
pub struct NewJob {
    pub document_type: String,
    pub email: String,
    pub callback_webhook: Option<String>,
    pub file_data: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub language: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::from_str("pending"), None);
        assert_eq!(JobStatus::from_str(""), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_stuck_detection() {
        let now = Utc::now();
        let meta = JobMeta {
            id: "j".to_string(),
            status: JobStatus::Processing,
            document_type: "invoice".to_string(),
            email: "t@e.com".to_string(),
            callback_webhook: None,
            file_name: "a.png".to_string(),
            mime_type: "image/png".to_string(),
            language: "eng".to_string(),
            file_size: 10,
            ocr_result: None,
            error_message: None,
            created_at: now - chrono::Duration::minutes(20),
            updated_at: now - chrono::Duration::minutes(11),
            processed_at: None,
        };
        assert!(meta.is_stuck(now, chrono::Duration::minutes(10)));

        let fresh = JobMeta {
            updated_at: now - chrono::Duration::minutes(9),
            ..meta.clone()
        };
        assert!(!fresh.is_stuck(now, chrono::Duration::minutes(10)));

        let completed = JobMeta {
            status: JobStatus::Completed,
            ..meta
        };
        assert!(!completed.is_stuck(now, chrono::Duration::minutes(10)));
    }
}
