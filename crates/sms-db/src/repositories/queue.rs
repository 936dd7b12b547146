//! Durable `QueueService` implementation over SeaORM.
//!
//! `lease_pending` runs inside a single transaction using
//! `SELECT ... FOR UPDATE SKIP LOCKED` so concurrent dispatcher workers never
//! observe or lease the same row; every other mutation is a single-row
//! transaction, mirroring the transaction-per-operation shape of the
//! teacher's message repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, LockBehavior,
    LockType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use sms_core::directory::{CampaignDirectory, ContactDirectory};
use sms_core::errors::{CoreError, CoreResult};
use sms_core::queue::{
    backoff_delay, CleanupPreview, ListFilter, QueueItem, QueueService, QueueStats,
    QueueStatus as DomainQueueStatus, SubmitRequest,
};

use crate::entities::queue_item::{self, ActiveModel, Column, Entity as QueueItemEntity, QueueStatus};
use crate::error::DatabaseError;

fn db_err(err: sea_orm::DbErr) -> CoreError {
    DatabaseError::from(err).into()
}

pub struct SeaOrmQueueService {
    db: Arc<DatabaseConnection>,
    contacts: Arc<dyn ContactDirectory>,
    campaigns: Arc<dyn CampaignDirectory>,
    default_region: String,
}

impl SeaOrmQueueService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        contacts: Arc<dyn ContactDirectory>,
        campaigns: Arc<dyn CampaignDirectory>,
        default_region: impl Into<String>,
    ) -> Self {
        Self { db, contacts, campaigns, default_region: default_region.into() }
    }
}

#[async_trait]
impl QueueService for SeaOrmQueueService {
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
        sms_core::phone::normalize(&phone, &self.default_region)?;

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
        let active = queue_item::new_active_model(
            req.campaign_id,
            req.contact_id,
            req.message_content,
            req.priority,
            req.max_attempts,
            req.scheduled_at.unwrap_or(now),
            now,
        );
        let model = active.insert(self.db.as_ref()).await.map_err(db_err)?;
        Ok(model.to_domain())
    }

    async fn lease_pending(&self, limit: u64) -> CoreResult<Vec<QueueItem>> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(db_err)?;

        let eligible = QueueItemEntity::find()
            .filter(
                Condition::all()
                    .add(Column::Status.eq(QueueStatus::Pending))
                    .add(Column::ScheduledAt.lte(now))
                    .add(
                        Condition::any()
                            .add(Column::NextRetryAt.is_null())
                            .add(Column::NextRetryAt.lte(now)),
                    ),
            )
            .order_by_asc(Column::Priority)
            .order_by_asc(Column::CreatedAt)
            .limit(limit)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .all(&txn)
            .await
            .map_err(db_err)?;

        let mut leased = Vec::with_capacity(eligible.len());
        for model in eligible {
            let mut active: ActiveModel = model.into();
            active.status = Set(QueueStatus::Processing);
            active.last_attempt_at = Set(Some(now));
            let updated = active.update(&txn).await.map_err(db_err)?;
            leased.push(updated.to_domain());
        }

        txn.commit().await.map_err(db_err)?;
        Ok(leased)
    }

    async fn complete_sent(
        &self,
        id: i64,
        external_id: &str,
        _provider_response: serde_json::Value,
    ) -> CoreResult<QueueItem> {
        let model = QueueItemEntity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| CoreError::not_found("QueueItem", id.to_string()))?;

        let now = Utc::now();
        let mut active: ActiveModel = model.into();
        active.status = Set(QueueStatus::Sent);
        active.processed_at = Set(Some(now));
        active.external_message_id = Set(Some(external_id.to_string()));
        active.error_message = Set(None);
        let updated = active.update(self.db.as_ref()).await.map_err(db_err)?;
        Ok(updated.to_domain())
    }

    async fn fail_attempt(&self, id: i64, error: &str, permanent: bool) -> CoreResult<QueueItem> {
        let model = QueueItemEntity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| CoreError::not_found("QueueItem", id.to_string()))?;

        let now = Utc::now();
        let attempts = model.attempts + 1;
        let max_attempts = model.max_attempts;

        let mut active: ActiveModel = model.into();
        active.attempts = Set(attempts);
        active.last_attempt_at = Set(Some(now));
        active.error_message = Set(Some(error.to_string()));

        if permanent || attempts >= max_attempts {
            active.status = Set(QueueStatus::Failed);
            active.processed_at = Set(Some(now));
            active.next_retry_at = Set(None);
        } else {
            active.status = Set(QueueStatus::Pending);
            active.next_retry_at = Set(Some(now + backoff_delay(attempts)));
        }

        let updated = active.update(self.db.as_ref()).await.map_err(db_err)?;
        Ok(updated.to_domain())
    }

    async fn cancel(&self, id: i64, reason: &str) -> CoreResult<bool> {
        let Some(model) = QueueItemEntity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
        else {
            return Ok(false);
        };
        if DomainQueueStatus::from(model.status).is_terminal() {
            return Ok(false);
        }

        let mut active: ActiveModel = model.into();
        active.status = Set(QueueStatus::Cancelled);
        active.error_message = Set(Some(reason.to_string()));
        active.processed_at = Set(Some(Utc::now()));
        active.update(self.db.as_ref()).await.map_err(db_err)?;
        Ok(true)
    }

    async fn reset_for_retry(&self, id: i64) -> CoreResult<QueueItem> {
        let model = QueueItemEntity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| CoreError::not_found("QueueItem", id.to_string()))?;

        if model.status != QueueStatus::Failed {
            return Err(CoreError::NotRetryable(id.to_string()));
        }

        let mut active: ActiveModel = model.into();
        active.status = Set(QueueStatus::Pending);
        active.next_retry_at = Set(None);
        active.error_message = Set(None);
        let updated = active.update(self.db.as_ref()).await.map_err(db_err)?;
        Ok(updated.to_domain())
    }

    async fn stats(&self) -> CoreResult<QueueStats> {
        let db = self.db.as_ref();
        let now = Utc::now();

        let mut counts_by_status = BTreeMap::new();
        let mut failed_count = 0i64;
        for status in [
            QueueStatus::Pending,
            QueueStatus::Processing,
            QueueStatus::Sent,
            QueueStatus::Failed,
            QueueStatus::Cancelled,
        ] {
            let count = QueueItemEntity::find()
                .filter(Column::Status.eq(status))
                .count(db)
                .await
                .map_err(db_err)? as i64;
            let domain_status = DomainQueueStatus::from(status);
            if domain_status == DomainQueueStatus::Failed {
                failed_count = count;
            }
            counts_by_status.insert(domain_status.as_str().to_string(), count);
        }

        let mut pending_counts_by_priority = BTreeMap::new();
        for priority in 0..=10i16 {
            let count = QueueItemEntity::find()
                .filter(Column::Status.eq(QueueStatus::Pending))
                .filter(Column::Priority.eq(priority))
                .count(db)
                .await
                .map_err(db_err)? as i64;
            if count > 0 {
                pending_counts_by_priority.insert(priority, count);
            }
        }

        let future_scheduled_count = QueueItemEntity::find()
            .filter(Column::Status.eq(QueueStatus::Pending))
            .filter(Column::ScheduledAt.gt(now))
            .count(db)
            .await
            .map_err(db_err)? as i64;

        let cutoff = now - chrono::Duration::hours(24);
        let recent_sent = QueueItemEntity::find()
            .filter(Column::Status.eq(QueueStatus::Sent))
            .filter(Column::ProcessedAt.gte(cutoff))
            .all(db)
            .await
            .map_err(db_err)?;
        let avg_processing_seconds_last_24h = if recent_sent.is_empty() {
            0.0
        } else {
            let total: f64 = recent_sent
                .iter()
                .filter_map(|m| {
                    m.processed_at
                        .map(|p| (p - m.created_at).num_milliseconds() as f64 / 1000.0)
                })
                .sum();
            total / recent_sent.len() as f64
        };

        Ok(QueueStats {
            counts_by_status,
            pending_counts_by_priority,
            avg_processing_seconds_last_24h,
            failed_count,
            future_scheduled_count,
        })
    }

    async fn cleanup_preview(&self, days: i64) -> CoreResult<CleanupPreview> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let db = self.db.as_ref();

        let count_for = |status: QueueStatus| async move {
            QueueItemEntity::find()
                .filter(Column::Status.eq(status))
                .filter(Column::ProcessedAt.lt(cutoff))
                .count(db)
                .await
                .map_err(db_err)
        };

        let sent_records = count_for(QueueStatus::Sent).await? as i64;
        let failed_records = count_for(QueueStatus::Failed).await? as i64;
        let cancelled_records = count_for(QueueStatus::Cancelled).await? as i64;

        Ok(CleanupPreview {
            sent_records,
            failed_records,
            cancelled_records,
            total: sent_records + failed_records + cancelled_records,
        })
    }

    async fn cleanup(&self, days: i64) -> CoreResult<i64> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let result = QueueItemEntity::delete_many()
            .filter(
                Condition::all()
                    .add(
                        Condition::any()
                            .add(Column::Status.eq(QueueStatus::Sent))
                            .add(Column::Status.eq(QueueStatus::Failed))
                            .add(Column::Status.eq(QueueStatus::Cancelled)),
                    )
                    .add(Column::ProcessedAt.lt(cutoff)),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected as i64)
    }

    async fn list(&self, filter: ListFilter, limit: u64, offset: u64) -> CoreResult<Vec<QueueItem>> {
        let mut query = QueueItemEntity::find().order_by_desc(Column::CreatedAt);
        if let Some(status) = filter.status {
            let db_status: QueueStatus = status.into();
            query = query.filter(Column::Status.eq(db_status));
        }
        if let Some(campaign_id) = filter.campaign_id {
            query = query.filter(Column::CampaignId.eq(campaign_id));
        }
        let models = query
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(|m| m.to_domain()).collect())
    }

    async fn find_stuck_leases(&self, lease_timeout: chrono::Duration) -> CoreResult<Vec<QueueItem>> {
        let cutoff = Utc::now() - lease_timeout;
        let models = QueueItemEntity::find()
            .filter(Column::Status.eq(QueueStatus::Processing))
            .filter(Column::LastAttemptAt.lt(cutoff))
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(|m| m.to_domain()).collect())
    }

    async fn reclaim_stuck_lease(&self, id: i64) -> CoreResult<QueueItem> {
        let model = QueueItemEntity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| CoreError::not_found("QueueItem", id.to_string()))?;

        let attempts = model.attempts + 1;
        let mut active: ActiveModel = model.into();
        active.attempts = Set(attempts);
        active.status = Set(QueueStatus::Pending);
        let updated = active.update(self.db.as_ref()).await.map_err(db_err)?;
        Ok(updated.to_domain())
    }
}
