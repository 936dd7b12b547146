//! In-memory `QueueService`/`LoggingService`/directory implementations,
//! for exercising the dispatcher and ingester without a real database.
//! Mirrors the shape of a mock queue/processor pair kept alongside a
//! trait-based worker abstraction.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use std::sync::Arc;

use crate::directory::{CampaignDirectory, CampaignStatus, ContactDirectory};
use crate::errors::{CoreError, CoreResult};
use crate::logging::{
    is_terminal_message_status, CampaignStats, LogEventRequest, LoggingService, Message, MessageLog,
};
use crate::queue::{
    backoff_delay, CleanupPreview, ListFilter, QueueItem, QueueService, QueueStats, QueueStatus,
    SubmitRequest,
};

/// Permissive directory double: every contact exists with a fixed,
/// normalizable phone number and every campaign is `Active`. Backs
/// `InMemoryQueueService::new()` so tests that don't care about submit-time
/// validation don't each need to wire up a populated `StaticDirectory`.
pub struct AllowAllDirectory;

#[async_trait]
impl ContactDirectory for AllowAllDirectory {
    async fn phone_number(&self, _contact_id: i64) -> CoreResult<Option<String>> {
        Ok(Some("+14155552671".to_string()))
    }
}

#[async_trait]
impl CampaignDirectory for AllowAllDirectory {
    async fn status(&self, _campaign_id: i64) -> CoreResult<Option<CampaignStatus>> {
        Ok(Some(CampaignStatus::Active))
    }
}

/// An in-memory queue store. Lease atomicity is provided by a single
/// `Mutex` guarding the whole table, which is sufficient to prove the
/// exclusion contract in tests even though a real deployment relies on
/// `SELECT ... FOR UPDATE SKIP LOCKED` instead.
pub struct InMemoryQueueService {
    items: Mutex<HashMap<i64, QueueItem>>,
    next_id: AtomicI64,
    contacts: Arc<dyn ContactDirectory>,
    campaigns: Arc<dyn CampaignDirectory>,
    default_region: String,
}

impl Default for InMemoryQueueService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueueService {
    pub fn new() -> Self {
        Self::with_directories(Arc::new(AllowAllDirectory), Arc::new(AllowAllDirectory), "US")
    }

    pub fn with_directories(
        contacts: Arc<dyn ContactDirectory>,
        campaigns: Arc<dyn CampaignDirectory>,
        default_region: impl Into<String>,
    ) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            contacts,
            campaigns,
            default_region: default_region.into(),
        }
    }
}

#[async_trait]
impl QueueService for InMemoryQueueService {
    async fn submit(&self, req: SubmitRequest) -> CoreResult<QueueItem> {
        if !(0..=10).contains(&req.priority) {
            return Err(CoreError::validation("priority must be between 0 and 10"));
        }
        if !(1..=10).contains(&req.max_attempts) {
            return Err(CoreError::validation("max_attempts must be between 1 and 10"));
        }

        let phone = self
            .contacts
            .phone_number(req.contact_id)
            .await?
            .ok_or_else(|| CoreError::validation(format!("contact {} does not exist", req.contact_id)))?;
        crate::phone::normalize(&phone, &self.default_region)?;

        let campaign_status = self
            .campaigns
            .status(req.campaign_id)
            .await?
            .ok_or_else(|| CoreError::validation(format!("campaign {} does not exist", req.campaign_id)))?;
        if !campaign_status.accepts_submissions() {
            return Err(CoreError::validation(format!(
                "campaign {} is not accepting submissions (status {campaign_status:?})",
                req.campaign_id
            )));
        }

        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let item = QueueItem {
            id,
            campaign_id: Some(req.campaign_id),
            contact_id: req.contact_id,
            message_content: req.message_content,
            priority: req.priority,
            status: QueueStatus::Pending,
            attempts: 0,
            max_attempts: req.max_attempts,
            scheduled_at: req.scheduled_at.unwrap_or(now),
            next_retry_at: None,
            last_attempt_at: None,
            processed_at: None,
            external_message_id: None,
            error_message: None,
            created_at: now,
        };
        self.items.lock().unwrap().insert(id, item.clone());
        Ok(item)
    }

    async fn lease_pending(&self, limit: u64) -> CoreResult<Vec<QueueItem>> {
        let now = Utc::now();
        let mut items = self.items.lock().unwrap();

        let mut eligible_ids: Vec<i64> = items
            .values()
            .filter(|i| i.is_eligible(now))
            .map(|i| i.id)
            .collect();
        eligible_ids.sort_by_key(|id| {
            let item = &items[id];
            (item.priority, item.created_at)
        });
        eligible_ids.truncate(limit as usize);

        let mut leased = Vec::with_capacity(eligible_ids.len());
        for id in eligible_ids {
            let item = items.get_mut(&id).unwrap();
            item.status = QueueStatus::Processing;
            item.last_attempt_at = Some(now);
            leased.push(item.clone());
        }
        Ok(leased)
    }

    async fn complete_sent(
        &self,
        id: i64,
        external_id: &str,
        _provider_response: Value,
    ) -> CoreResult<QueueItem> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("QueueItem", id.to_string()))?;

        if item.status != QueueStatus::Processing && item.external_message_id.as_deref() != Some(external_id)
        {
            return Err(CoreError::Internal(format!(
                "queue item {id} is not in processing status"
            )));
        }

        item.status = QueueStatus::Sent;
        item.processed_at = Some(item.processed_at.unwrap_or_else(Utc::now));
        item.external_message_id = Some(external_id.to_string());
        item.error_message = None;
        Ok(item.clone())
    }

    async fn fail_attempt(&self, id: i64, error: &str, permanent: bool) -> CoreResult<QueueItem> {
        let now = Utc::now();
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("QueueItem", id.to_string()))?;

        item.attempts += 1;
        item.last_attempt_at = Some(now);
        item.error_message = Some(error.to_string());

        if permanent || item.attempts >= item.max_attempts {
            item.status = QueueStatus::Failed;
            item.processed_at = Some(now);
            item.next_retry_at = None;
        } else {
            item.status = QueueStatus::Pending;
            item.next_retry_at = Some(now + backoff_delay(item.attempts));
        }
        Ok(item.clone())
    }

    async fn cancel(&self, id: i64, reason: &str) -> CoreResult<bool> {
        let mut items = self.items.lock().unwrap();
        let Some(item) = items.get_mut(&id) else {
            return Ok(false);
        };
        if item.status.is_terminal() {
            return Ok(false);
        }
        item.status = QueueStatus::Cancelled;
        item.error_message = Some(reason.to_string());
        item.processed_at = Some(Utc::now());
        Ok(true)
    }

    async fn reset_for_retry(&self, id: i64) -> CoreResult<QueueItem> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("QueueItem", id.to_string()))?;
        if item.status != QueueStatus::Failed {
            return Err(CoreError::NotRetryable(id.to_string()));
        }
        item.status = QueueStatus::Pending;
        item.next_retry_at = None;
        item.error_message = None;
        Ok(item.clone())
    }

    async fn stats(&self) -> CoreResult<QueueStats> {
        let now = Utc::now();
        let items = self.items.lock().unwrap();
        let mut stats = QueueStats::default();

        let mut processed_durations = Vec::new();
        for item in items.values() {
            *stats
                .counts_by_status
                .entry(item.status.as_str().to_string())
                .or_insert(0) += 1;

            if item.status == QueueStatus::Pending {
                *stats.pending_counts_by_priority.entry(item.priority).or_insert(0) += 1;
                if item.scheduled_at > now {
                    stats.future_scheduled_count += 1;
                }
            }
            if item.status == QueueStatus::Failed {
                stats.failed_count += 1;
            }
            if item.status == QueueStatus::Sent {
                if let Some(processed_at) = item.processed_at {
                    if processed_at >= now - chrono::Duration::hours(24) {
                        processed_durations.push((processed_at - item.created_at).num_milliseconds() as f64 / 1000.0);
                    }
                }
            }
        }
        stats.avg_processing_seconds_last_24h = if processed_durations.is_empty() {
            0.0
        } else {
            processed_durations.iter().sum::<f64>() / processed_durations.len() as f64
        };
        Ok(stats)
    }

    async fn cleanup_preview(&self, days: i64) -> CoreResult<CleanupPreview> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let items = self.items.lock().unwrap();
        let mut preview = CleanupPreview::default();
        for item in items.values() {
            let Some(processed_at) = item.processed_at else {
                continue;
            };
            if processed_at >= cutoff {
                continue;
            }
            match item.status {
                QueueStatus::Sent => preview.sent_records += 1,
                QueueStatus::Failed => preview.failed_records += 1,
                QueueStatus::Cancelled => preview.cancelled_records += 1,
                _ => continue,
            }
        }
        preview.total = preview.sent_records + preview.failed_records + preview.cancelled_records;
        Ok(preview)
    }

    async fn cleanup(&self, days: i64) -> CoreResult<i64> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let mut items = self.items.lock().unwrap();
        let to_delete: Vec<i64> = items
            .values()
            .filter(|i| {
                i.status.is_terminal()
                    && i.processed_at.map(|p| p < cutoff).unwrap_or(false)
            })
            .map(|i| i.id)
            .collect();
        for id in &to_delete {
            items.remove(id);
        }
        Ok(to_delete.len() as i64)
    }

    async fn list(&self, filter: ListFilter, limit: u64, offset: u64) -> CoreResult<Vec<QueueItem>> {
        let items = self.items.lock().unwrap();
        let mut matching: Vec<QueueItem> = items
            .values()
            .filter(|i| filter.status.map(|s| s == i.status).unwrap_or(true))
            .filter(|i| filter.campaign_id.map(|c| i.campaign_id == Some(c)).unwrap_or(true))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn find_stuck_leases(&self, lease_timeout: chrono::Duration) -> CoreResult<Vec<QueueItem>> {
        let cutoff = Utc::now() - lease_timeout;
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .filter(|i| i.status == QueueStatus::Processing && i.last_attempt_at.map(|t| t < cutoff).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn reclaim_stuck_lease(&self, id: i64) -> CoreResult<QueueItem> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("QueueItem", id.to_string()))?;
        item.attempts += 1;
        item.status = QueueStatus::Pending;
        Ok(item.clone())
    }
}

/// In-memory append-only log store + Message aggregate, mirroring the
/// durable implementation's fold-on-write behavior.
#[derive(Default)]
pub struct InMemoryLoggingService {
    messages: Mutex<HashMap<i64, Message>>,
    logs: Mutex<HashMap<i64, Vec<MessageLog>>>,
    next_message_id: AtomicI64,
    next_log_id: AtomicI64,
}

impl InMemoryLoggingService {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
            logs: Mutex::new(HashMap::new()),
            next_message_id: AtomicI64::new(1),
            next_log_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl LoggingService for InMemoryLoggingService {
    async fn create_message(
        &self,
        queue_item: &QueueItem,
        initial_status: &str,
        external_id: Option<&str>,
    ) -> CoreResult<Message> {
        let now = Utc::now();
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        let message = Message {
            id,
            contenu: queue_item.message_content.clone(),
            date_envoi: now,
            statut_livraison: initial_status.to_string(),
            final_status: None,
            delivery_attempts: 0,
            delivery_timestamp: None,
            external_message_id: external_id.map(|s| s.to_string()),
            error_message: None,
            cost: None,
            id_contact: queue_item.contact_id,
            id_campagne: queue_item.campaign_id,
            id_liste: None,
            queue_item_id: Some(queue_item.id),
            updated_at: now,
        };
        self.messages.lock().unwrap().insert(id, message.clone());
        self.log_event(
            id,
            LogEventRequest::new(initial_status, "message_created"),
        )
        .await?;
        Ok(self.messages.lock().unwrap().get(&id).unwrap().clone())
    }

    async fn log_event(&self, message_id: i64, event: LogEventRequest) -> CoreResult<MessageLog> {
        let now = Utc::now();
        let mut logs = self.logs.lock().unwrap();
        let entry = logs.entry(message_id).or_default();
        let attempt_number = entry.len() as i32 + 1;

        let log = MessageLog {
            id: self.next_log_id.fetch_add(1, Ordering::SeqCst),
            message_id,
            queue_item_id: event.queue_item_id,
            status: event.status.clone(),
            provider_status: event.provider_status.clone(),
            provider_response: event.provider_response.clone().unwrap_or(Value::Null),
            error_code: event.error_code.clone(),
            error_message: event.error_message.clone(),
            attempt_number,
            external_message_id: event.external_message_id.clone(),
            cost: event.cost,
            processing_duration_ms: event.duration_ms,
            created_at: now,
        };
        entry.push(log.clone());
        drop(logs);

        let mut messages = self.messages.lock().unwrap();
        let message = messages
            .get_mut(&message_id)
            .ok_or_else(|| CoreError::not_found("Message", message_id.to_string()))?;

        message.statut_livraison = event.status.clone();
        message.delivery_attempts = attempt_number;
        message.updated_at = now;
        if let Some(eid) = event.external_message_id {
            message.external_message_id = Some(eid);
        }
        if let Some(err) = event.error_message {
            message.error_message = Some(err);
        }
        if let Some(cost) = event.cost {
            message.cost = Some(cost);
        }
        if is_terminal_message_status(&event.status) {
            message.final_status = Some(event.status.clone());
            if event.status == "delivered" && message.delivery_timestamp.is_none() {
                message.delivery_timestamp = Some(now);
            }
        }
        Ok(log)
    }

    async fn update_delivery_status(
        &self,
        external_id: &str,
        provider_status: &str,
        provider_response: Value,
    ) -> CoreResult<bool> {
        let message_id = {
            let messages = self.messages.lock().unwrap();
            messages
                .values()
                .find(|m| m.external_message_id.as_deref() == Some(external_id))
                .map(|m| m.id)
        };
        let Some(message_id) = message_id else {
            return Ok(false);
        };

        let internal_status = crate::carrier::map_provider_status(provider_status);
        let error_code = provider_response
            .get("error_code")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let error_message = provider_response
            .get("error_message")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let cost = provider_response
            .get("price")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok());

        let mut event = LogEventRequest::new(internal_status, "delivery_update");
        event.provider_status = Some(provider_status.to_string());
        event.provider_response = Some(provider_response);
        event.error_code = error_code;
        event.error_message = error_message;
        event.cost = cost;

        self.log_event(message_id, event).await?;
        Ok(true)
    }

    async fn timeline(&self, message_id: i64) -> CoreResult<Vec<MessageLog>> {
        Ok(self.logs.lock().unwrap().get(&message_id).cloned().unwrap_or_default())
    }

    async fn campaign_stats(&self, campaign_id: i64) -> CoreResult<CampaignStats> {
        let messages = self.messages.lock().unwrap();
        let campaign_messages: Vec<&Message> = messages
            .values()
            .filter(|m| m.id_campagne == Some(campaign_id))
            .collect();

        let total = campaign_messages.len() as i64;
        let mut stats = CampaignStats {
            total,
            status_breakdown: Default::default(),
            delivery_rate_pct: 0.0,
            average_delivery_seconds: 0.0,
            total_cost: Default::default(),
            retry_rate_pct: 0.0,
            error_summary: Default::default(),
        };
        if total == 0 {
            return Ok(stats);
        }

        let mut delivered = 0i64;
        let mut retried = 0i64;
        let mut delivery_seconds = Vec::new();
        for m in &campaign_messages {
            let status = m.final_status.clone().unwrap_or_else(|| m.statut_livraison.clone());
            *stats.status_breakdown.entry(status.clone()).or_insert(0) += 1;
            if status == "delivered" {
                delivered += 1;
            }
            if m.delivery_attempts > 1 {
                retried += 1;
            }
            if let Some(cost) = m.cost {
                stats.total_cost += cost;
            }
            if let Some(ts) = m.delivery_timestamp {
                delivery_seconds.push((ts - m.date_envoi).num_milliseconds() as f64 / 1000.0);
            }
        }
        stats.delivery_rate_pct = 100.0 * delivered as f64 / total as f64;
        stats.retry_rate_pct = 100.0 * retried as f64 / total as f64;
        stats.average_delivery_seconds = if delivery_seconds.is_empty() {
            0.0
        } else {
            delivery_seconds.iter().sum::<f64>() / delivery_seconds.len() as f64
        };

        let logs = self.logs.lock().unwrap();
        for m in &campaign_messages {
            if let Some(message_logs) = logs.get(&m.id) {
                for log in message_logs {
                    if let Some(code) = &log.error_code {
                        let key = format!("{code}: {}", log.error_message.clone().unwrap_or_default());
                        *stats.error_summary.entry(key).or_insert(0) += 1;
                    }
                }
            }
        }
        Ok(stats)
    }

    async fn failed_for_retry(&self, campaign_id: Option<i64>, limit: u64) -> CoreResult<Vec<Message>> {
        let messages = self.messages.lock().unwrap();
        let mut matching: Vec<Message> = messages
            .values()
            .filter(|m| m.statut_livraison == "failed")
            .filter(|m| campaign_id.map(|c| m.id_campagne == Some(c)).unwrap_or(true))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn find_by_external_id(&self, external_id: &str) -> CoreResult<Option<Message>> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .values()
            .find(|m| m.external_message_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn awaiting_status(&self, since: chrono::DateTime<Utc>) -> CoreResult<Vec<Message>> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.statut_livraison == "sent")
            .filter(|m| m.date_envoi >= since)
            .filter(|m| m.external_message_id.is_some())
            .cloned()
            .collect())
    }
}

/// Fixed-table directory stubs for tests.
#[derive(Default)]
pub struct StaticDirectory {
    pub phones: HashMap<i64, String>,
    pub campaigns: HashMap<i64, CampaignStatus>,
}

#[async_trait]
impl ContactDirectory for StaticDirectory {
    async fn phone_number(&self, contact_id: i64) -> CoreResult<Option<String>> {
        Ok(self.phones.get(&contact_id).cloned())
    }
}

#[async_trait]
impl CampaignDirectory for StaticDirectory {
    async fn status(&self, campaign_id: i64) -> CoreResult<Option<CampaignStatus>> {
        Ok(self.campaigns.get(&campaign_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concurrent_leases_return_disjoint_sets() {
        use std::sync::Arc;

        let queue = Arc::new(InMemoryQueueService::new());
        for i in 0..20 {
            queue
                .submit(SubmitRequest::new(1, i, "hi"))
                .await
                .unwrap();
        }

        let a = queue.clone();
        let b = queue.clone();
        let (leased_a, leased_b) = tokio::join!(a.lease_pending(10), b.lease_pending(10));
        let leased_a = leased_a.unwrap();
        let leased_b = leased_b.unwrap();

        let ids_a: std::collections::HashSet<_> = leased_a.iter().map(|i| i.id).collect();
        let ids_b: std::collections::HashSet<_> = leased_b.iter().map(|i| i.id).collect();
        assert!(ids_a.is_disjoint(&ids_b));
        assert_eq!(ids_a.len() + ids_b.len(), 20);
    }

    #[tokio::test]
    async fn fail_attempt_schedules_backoff_until_exhausted() {
        let queue = InMemoryQueueService::new();
        let item = queue.submit(SubmitRequest::new(1, 1, "hi")).await.unwrap();
        queue.lease_pending(1).await.unwrap();

        let after_first = queue.fail_attempt(item.id, "network", false).await.unwrap();
        assert_eq!(after_first.status, QueueStatus::Pending);
        assert_eq!(after_first.attempts, 1);
        assert!(after_first.next_retry_at.is_some());

        queue.lease_pending(1).await.unwrap();
        let after_second = queue.fail_attempt(item.id, "network", false).await.unwrap();
        assert_eq!(after_second.status, QueueStatus::Pending);

        queue.lease_pending(1).await.unwrap();
        let after_third = queue.fail_attempt(item.id, "network", false).await.unwrap();
        assert_eq!(after_third.status, QueueStatus::Failed);
        assert_eq!(after_third.attempts, 3);
        assert!(after_third.next_retry_at.is_none());
    }

    #[tokio::test]
    async fn cancel_is_idempotent_on_terminal_items() {
        let queue = InMemoryQueueService::new();
        let item = queue.submit(SubmitRequest::new(1, 1, "hi")).await.unwrap();
        assert!(queue.cancel(item.id, "stop").await.unwrap());
        assert!(!queue.cancel(item.id, "stop again").await.unwrap());
    }

    #[tokio::test]
    async fn submit_rejects_unknown_contact() {
        let directory = Arc::new(StaticDirectory {
            phones: HashMap::new(),
            campaigns: HashMap::from([(1, CampaignStatus::Active)]),
        });
        let queue = InMemoryQueueService::with_directories(directory.clone(), directory, "US");
        let err = queue.submit(SubmitRequest::new(1, 99, "hi")).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_rejects_unparseable_contact_phone() {
        let directory = Arc::new(StaticDirectory {
            phones: HashMap::from([(1, "not-a-phone-number".to_string())]),
            campaigns: HashMap::from([(1, CampaignStatus::Active)]),
        });
        let queue = InMemoryQueueService::with_directories(directory.clone(), directory, "US");
        let err = queue.submit(SubmitRequest::new(1, 1, "hi")).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_rejects_unknown_campaign() {
        let directory = Arc::new(StaticDirectory {
            phones: HashMap::from([(1, "+14155552671".to_string())]),
            campaigns: HashMap::new(),
        });
        let queue = InMemoryQueueService::with_directories(directory.clone(), directory, "US");
        let err = queue.submit(SubmitRequest::new(99, 1, "hi")).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_rejects_campaign_not_accepting_submissions() {
        let directory = Arc::new(StaticDirectory {
            phones: HashMap::from([(1, "+14155552671".to_string())]),
            campaigns: HashMap::from([(1, CampaignStatus::Completed)]),
        });
        let queue = InMemoryQueueService::with_directories(directory.clone(), directory, "US");
        let err = queue.submit(SubmitRequest::new(1, 1, "hi")).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn webhook_idempotence_keeps_final_status_and_timestamp() {
        let log = InMemoryLoggingService::new();
        let queue_item = QueueItem {
            id: 1,
            campaign_id: Some(1),
            contact_id: 1,
            message_content: "hi".into(),
            priority: 5,
            status: QueueStatus::Processing,
            attempts: 0,
            max_attempts: 3,
            scheduled_at: Utc::now(),
            next_retry_at: None,
            last_attempt_at: None,
            processed_at: None,
            external_message_id: None,
            error_message: None,
            created_at: Utc::now(),
        };
        let message = log.create_message(&queue_item, "processing", None).await.unwrap();
        log.log_event(
            message.id,
            {
                let mut e = LogEventRequest::new("sent", "sent");
                e.external_message_id = Some("SM1".into());
                e
            },
        )
        .await
        .unwrap();

        assert!(log
            .update_delivery_status("SM1", "delivered", serde_json::json!({}))
            .await
            .unwrap());
        let after_first = log.find_by_external_id("SM1").await.unwrap().unwrap();
        let first_timestamp = after_first.delivery_timestamp;
        assert_eq!(after_first.final_status.as_deref(), Some("delivered"));

        assert!(log
            .update_delivery_status("SM1", "delivered", serde_json::json!({}))
            .await
            .unwrap());
        let after_second = log.find_by_external_id("SM1").await.unwrap().unwrap();
        assert_eq!(after_second.final_status.as_deref(), Some("delivered"));
        assert_eq!(after_second.delivery_timestamp, first_timestamp);
    }
}
