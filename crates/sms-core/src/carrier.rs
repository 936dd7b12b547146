//! Carrier port (component B) — the abstract boundary to an external SMS
//! carrier. Kept narrow on purpose: no provider name appears here or in the
//! queue/logging layers, only this trait and its error taxonomy.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a successful send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub external_id: String,
    pub provider_status: String,
    pub cost: Option<Decimal>,
}

/// Outcome of a status lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResult {
    pub provider_status: String,
    pub cost: Option<Decimal>,
}

/// Failure reported by the carrier. `code` is provider-specific; callers
/// classify it via an injected `is_permanent` predicate rather than the
/// queue/logging layers knowing about any one carrier.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("carrier error {code}: {message}")]
pub struct CarrierError {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

pub type CarrierResult<T> = Result<T, CarrierError>;

/// The abstract capability set a dispatcher needs from a carrier.
#[async_trait]
pub trait SmsCarrier: Send + Sync {
    async fn send_sms(
        &self,
        to: &str,
        body: &str,
        status_callback_url: &str,
    ) -> CarrierResult<SendResult>;

    async fn fetch_status(&self, external_id: &str) -> CarrierResult<StatusResult>;
}

/// Predicate type the queue service consults to decide whether a
/// `CarrierError` is permanent (no retry) or transient (retry with backoff).
/// Implementations live alongside the concrete carrier adapter, never here.
pub type IsPermanent = fn(&str) -> bool;

/// Internal delivery-status taxonomy, independent of any one provider's
/// vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalStatus {
    Sent,
    Delivered,
    Failed,
}

impl InternalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InternalStatus::Sent => "sent",
            InternalStatus::Delivered => "delivered",
            InternalStatus::Failed => "failed",
        }
    }
}

/// Maps a provider status string to the internal taxonomy. Anything not
/// recognized passes through unchanged (as its own lowercase string), which
/// callers treat as an opaque status rather than a hard error.
pub fn map_provider_status(provider_status: &str) -> String {
    match provider_status.to_ascii_lowercase().as_str() {
        "queued" | "sending" | "sent" => InternalStatus::Sent.as_str().to_string(),
        "delivered" | "read" => InternalStatus::Delivered.as_str().to_string(),
        "failed" | "undelivered" => InternalStatus::Failed.as_str().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_sending_family_to_sent() {
        for s in ["queued", "sending", "sent", "QUEUED"] {
            assert_eq!(map_provider_status(s), "sent");
        }
    }

    #[test]
    fn maps_delivered_family_to_delivered() {
        assert_eq!(map_provider_status("delivered"), "delivered");
        assert_eq!(map_provider_status("read"), "delivered");
    }

    #[test]
    fn maps_failed_family_to_failed() {
        assert_eq!(map_provider_status("failed"), "failed");
        assert_eq!(map_provider_status("undelivered"), "failed");
    }

    #[test]
    fn passes_through_unknown_status() {
        assert_eq!(map_provider_status("weird_status"), "weird_status");
    }
}
