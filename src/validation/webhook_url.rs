//! Callback URL validation.
//!
//! Best-effort SSRF block at the literal-IP and hostname level. No DNS
//! resolution is performed, so a public hostname resolving to a private
//! address passes; blocking that would need a resolver-level policy.

use std::net::Ipv4Addr;

use thiserror::Error;
use url::{Host, Url};

#[derive(Debug, Error)]
pub enum WebhookUrlError {
    #[error("Invalid webhook URL: {0}")]
    Invalid(String),

    #[error("Webhook URL scheme must be http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("Webhook URL refers to a private or local address: {0}")]
    BlockedHost(String),
}

/// Validate a callback URL before it is persisted with the job.
pub fn validate_webhook_url(raw: &str) -> Result<(), WebhookUrlError> {
    let parsed = Url::parse(raw).map_err(|e| WebhookUrlError::Invalid(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(WebhookUrlError::UnsupportedScheme(other.to_string())),
    }

    match parsed.host() {
        Some(Host::Domain(domain)) => {
            if domain.eq_ignore_ascii_case("localhost") {
                return Err(WebhookUrlError::BlockedHost(domain.to_string()));
            }
        }
        Some(Host::Ipv4(ip)) => {
            if is_blocked_ipv4(ip) {
                return Err(WebhookUrlError::BlockedHost(ip.to_string()));
            }
        }
        Some(Host::Ipv6(ip)) => {
            if ip == std::net::Ipv6Addr::LOCALHOST {
                return Err(WebhookUrlError::BlockedHost(ip.to_string()));
            }
        }
        None => return Err(WebhookUrlError::Invalid("missing host".to_string())),
    }

    Ok(())
}

/// Literal IPv4 addresses the sink refuses to call.
///
/// Only the exact loopback address 127.0.0.1 is blocked, not the whole
/// 127.0.0.0/8 block; the rest are the RFC 1918 ranges plus link-local.
fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    ip == Ipv4Addr::new(127, 0, 0, 1)
        || ip.is_unspecified()
        || ip.is_private()
        || ip.is_link_local()
}
