//! Delivery-lifecycle logger (components D and F): an append-only
//! message-log plus the message aggregate it folds into.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::CoreResult;
use crate::queue::QueueItem;

/// One row created on first dispatch attempt of a queue item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub contenu: String,
    pub date_envoi: DateTime<Utc>,
    pub statut_livraison: String,
    pub final_status: Option<String>,
    pub delivery_attempts: i32,
    pub delivery_timestamp: Option<DateTime<Utc>>,
    pub external_message_id: Option<String>,
    pub error_message: Option<String>,
    pub cost: Option<Decimal>,
    pub id_contact: i64,
    pub id_campagne: Option<i64>,
    pub id_liste: Option<i64>,
    pub queue_item_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable event in a message's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLog {
    pub id: i64,
    pub message_id: i64,
    pub queue_item_id: Option<i64>,
    pub status: String,
    pub provider_status: Option<String>,
    pub provider_response: serde_json::Value,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub attempt_number: i32,
    pub external_message_id: Option<String>,
    pub cost: Option<Decimal>,
    pub processing_duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Input to [`LoggingService::log_event`]. Every field beyond `status` and
/// `event_type` is optional and, per §4.4, only overwrites the Message
/// aggregate's corresponding field when non-null.
#[derive(Debug, Clone, Default)]
pub struct LogEventRequest {
    pub status: String,
    pub event_type: String,
    pub provider_status: Option<String>,
    pub provider_response: Option<serde_json::Value>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub external_message_id: Option<String>,
    pub cost: Option<Decimal>,
    pub duration_ms: Option<i64>,
    pub queue_item_id: Option<i64>,
}

impl LogEventRequest {
    pub fn new(status: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            event_type: event_type.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignStats {
    pub total: i64,
    pub status_breakdown: BTreeMap<String, i64>,
    pub delivery_rate_pct: f64,
    pub average_delivery_seconds: f64,
    pub total_cost: Decimal,
    pub retry_rate_pct: f64,
    pub error_summary: BTreeMap<String, i64>,
}

/// Create message, append event, fold terminal status, timeline,
/// per-campaign stats — the full public contract of component F.
#[async_trait]
pub trait LoggingService: Send + Sync {
    /// Creates the Message row for `queue_item` and writes the first
    /// MessageLog (`attempt_number=1`, `event_type=message_created`). The
    /// first log's timestamp is the authoritative `date_envoi`.
    async fn create_message(
        &self,
        queue_item: &QueueItem,
        initial_status: &str,
        external_id: Option<&str>,
    ) -> CoreResult<Message>;

    /// Appends a MessageLog and folds it into the Message aggregate.
    async fn log_event(&self, message_id: i64, event: LogEventRequest) -> CoreResult<MessageLog>;

    /// Looks up a Message by `external_id`; returns `false` (never an
    /// error) if absent, so carrier-retry storms never land on a 5xx.
    async fn update_delivery_status(
        &self,
        external_id: &str,
        provider_status: &str,
        provider_response: serde_json::Value,
    ) -> CoreResult<bool>;

    async fn timeline(&self, message_id: i64) -> CoreResult<Vec<MessageLog>>;

    async fn campaign_stats(&self, campaign_id: i64) -> CoreResult<CampaignStats>;

    async fn failed_for_retry(
        &self,
        campaign_id: Option<i64>,
        limit: u64,
    ) -> CoreResult<Vec<Message>>;

    async fn find_by_external_id(&self, external_id: &str) -> CoreResult<Option<Message>>;

    /// Messages the status poller (§4.7) should re-check: `statut_livraison
    /// = 'sent'`, sent at or after `since`, with a non-null external id.
    async fn awaiting_status(&self, since: DateTime<Utc>) -> CoreResult<Vec<Message>>;
}

/// Whether `status` is one of the message-level terminal states.
pub fn is_terminal_message_status(status: &str) -> bool {
    matches!(status, "delivered" | "failed" | "bounced")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_message_statuses() {
        assert!(is_terminal_message_status("delivered"));
        assert!(is_terminal_message_status("failed"));
        assert!(is_terminal_message_status("bounced"));
        assert!(!is_terminal_message_status("sent"));
        assert!(!is_terminal_message_status("pending"));
    }

    #[test]
    fn log_event_request_builder_defaults() {
        let req = LogEventRequest::new("sent", "sent");
        assert_eq!(req.status, "sent");
        assert_eq!(req.event_type, "sent");
        assert!(req.cost.is_none());
        assert!(req.error_code.is_none());
    }
}
