//! Outbound webhook delivery.
//!
//! Fire-and-forget: any transport error, timeout, or non-2xx response is
//! logged and swallowed so delivery can never corrupt job state. The URL was
//! SSRF-validated at ingestion; the sink does not re-validate. No retries,
//! no signing.

use std::time::Duration;

use chrono::Utc;

/// Ceiling on a single delivery attempt.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "OCR-API/1.0";

/// Time-bounded webhook sender.
#[derive(Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    app_domain: String,
}

impl WebhookSink {
    /// Build a sink whose status URLs are rooted at `app_domain`.
    pub fn new(app_domain: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            app_domain: app_domain.trim_end_matches('/').to_string(),
        })
    }

    /// POST the completion payload to the job's callback URL.
    ///
    /// Never returns an error: failure is the receiver's problem, not the
    /// job's.
    pub async fn send(&self, url: &str, job_id: &str, email: &str, ocr_result: &str) {
        let payload = serde_json::json!({
            "jobId": job_id,
            "email": email,
            "ocrResult": ocr_result,
            "statusUrl": format!("{}/job/{}", self.app_domain, job_id),
            "timestamp": Utc::now().to_rfc3339(),
        });

        match self.client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(job_id, url, "webhook delivered");
            }
            Ok(response) => {
                tracing::warn!(
                    job_id,
                    url,
                    status = %response.status(),
                    "webhook rejected by receiver"
                );
            }
            Err(e) => {
                tracing::warn!(job_id, url, error = %e, "webhook delivery failed");
            }
        }
    }
}
