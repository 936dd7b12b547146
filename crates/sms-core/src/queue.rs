//! Queue store + queue service contracts (components C and E).
//!
//! This module defines the domain type and the service trait. The durable
//! implementation lives in `sms-db`; an in-memory implementation for tests
//! lives in [`crate::testing`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CoreResult;

/// Queue item lifecycle status. `Sent`, `Failed`, and `Cancelled` are
/// terminal; see [`QueueStatus::is_terminal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    Cancelled,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Sent => "sent",
            QueueStatus::Failed => "failed",
            QueueStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Sent | QueueStatus::Failed | QueueStatus::Cancelled)
    }
}

/// A durable send unit, addressed by `(campaign, contact)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: i64,
    pub campaign_id: Option<i64>,
    pub contact_id: i64,
    pub message_content: String,
    pub priority: i16,
    pub status: QueueStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub scheduled_at: DateTime<Utc>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub external_message_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QueueItem {
    /// Whether this item is currently eligible for lease, per §4.3.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status == QueueStatus::Pending
            && self.scheduled_at <= now
            && self.next_retry_at.map(|t| t <= now).unwrap_or(true)
    }
}

/// `submit` input, mirroring the bounds in §4.3: `0 <= priority <= 10`,
/// `1 <= max_attempts <= 10`.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub campaign_id: i64,
    pub contact_id: i64,
    pub message_content: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub priority: i16,
    pub max_attempts: i32,
}

impl SubmitRequest {
    pub fn new(campaign_id: i64, contact_id: i64, message_content: impl Into<String>) -> Self {
        Self {
            campaign_id,
            contact_id,
            message_content: message_content.into(),
            scheduled_at: None,
            priority: 5,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub counts_by_status: std::collections::BTreeMap<String, i64>,
    pub pending_counts_by_priority: std::collections::BTreeMap<i16, i64>,
    pub avg_processing_seconds_last_24h: f64,
    pub failed_count: i64,
    pub future_scheduled_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupPreview {
    pub sent_records: i64,
    pub failed_records: i64,
    pub cancelled_records: i64,
    pub total: i64,
}

/// Optional filters for [`QueueService::list`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<QueueStatus>,
    pub campaign_id: Option<i64>,
}

/// Submit / lease / complete / fail / retry / cancel / stats / cleanup —
/// the full public contract of component E.
#[async_trait]
pub trait QueueService: Send + Sync {
    async fn submit(&self, req: SubmitRequest) -> CoreResult<QueueItem>;

    /// Atomically transitions up to `limit` eligible items from
    /// `pending` to `processing`. Returned items are guaranteed not to be
    /// leased by any concurrent caller.
    async fn lease_pending(&self, limit: u64) -> CoreResult<Vec<QueueItem>>;

    async fn complete_sent(
        &self,
        id: i64,
        external_id: &str,
        provider_response: serde_json::Value,
    ) -> CoreResult<QueueItem>;

    async fn fail_attempt(&self, id: i64, error: &str, permanent: bool) -> CoreResult<QueueItem>;

    /// Allowed only from `pending`/`processing`. Returns `false` if the
    /// item is missing or not cancellable.
    async fn cancel(&self, id: i64, reason: &str) -> CoreResult<bool>;

    /// Allowed only from `failed`. Preserves `attempts`.
    async fn reset_for_retry(&self, id: i64) -> CoreResult<QueueItem>;

    async fn stats(&self) -> CoreResult<QueueStats>;

    async fn cleanup_preview(&self, days: i64) -> CoreResult<CleanupPreview>;

    /// Deletes rows with a terminal status and `processed_at` older than
    /// `days`. Never deletes rows with a null `processed_at`.
    async fn cleanup(&self, days: i64) -> CoreResult<i64>;

    async fn list(&self, filter: ListFilter, limit: u64, offset: u64) -> CoreResult<Vec<QueueItem>>;

    /// Returns queue items stuck in `processing` past `lease_timeout` —
    /// the input to the stuck-lease reaper (§5).
    async fn find_stuck_leases(
        &self,
        lease_timeout: chrono::Duration,
    ) -> CoreResult<Vec<QueueItem>>;

    /// Returns a stuck-processing item to `pending`, counting the
    /// abandoned attempt. Used exclusively by the reaper.
    async fn reclaim_stuck_lease(&self, id: i64) -> CoreResult<QueueItem>;
}

/// Exponential backoff law from §8: after the k-th failed attempt,
/// `next_retry_at = last_attempt_at + 2^k minutes`.
pub fn backoff_delay(attempts: i32) -> chrono::Duration {
    chrono::Duration::minutes(2i64.pow(attempts.max(0) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligible_when_pending_and_due() {
        let now = Utc::now();
        let item = sample_item(QueueStatus::Pending, now - chrono::Duration::minutes(1), None);
        assert!(item.is_eligible(now));
    }

    #[test]
    fn not_eligible_when_scheduled_in_future() {
        let now = Utc::now();
        let item = sample_item(QueueStatus::Pending, now + chrono::Duration::hours(1), None);
        assert!(!item.is_eligible(now));
    }

    #[test]
    fn not_eligible_before_next_retry() {
        let now = Utc::now();
        let item = sample_item(
            QueueStatus::Pending,
            now - chrono::Duration::hours(1),
            Some(now + chrono::Duration::minutes(5)),
        );
        assert!(!item.is_eligible(now));
    }

    #[test]
    fn not_eligible_when_not_pending() {
        let now = Utc::now();
        let item = sample_item(QueueStatus::Processing, now - chrono::Duration::minutes(1), None);
        assert!(!item.is_eligible(now));
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        assert_eq!(backoff_delay(1), chrono::Duration::minutes(2));
        assert_eq!(backoff_delay(2), chrono::Duration::minutes(4));
        assert_eq!(backoff_delay(3), chrono::Duration::minutes(8));
    }

    #[test]
    fn terminal_statuses() {
        assert!(QueueStatus::Sent.is_terminal());
        assert!(QueueStatus::Failed.is_terminal());
        assert!(QueueStatus::Cancelled.is_terminal());
        assert!(!QueueStatus::Pending.is_terminal());
        assert!(!QueueStatus::Processing.is_terminal());
    }

    fn sample_item(
        status: QueueStatus,
        scheduled_at: DateTime<Utc>,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> QueueItem {
        QueueItem {
            id: 1,
            campaign_id: Some(1),
            contact_id: 1,
            message_content: "hello".into(),
            priority: 5,
            status,
            attempts: 0,
            max_attempts: 3,
            scheduled_at,
            next_retry_at,
            last_attempt_at: None,
            processed_at: None,
            external_message_id: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}
