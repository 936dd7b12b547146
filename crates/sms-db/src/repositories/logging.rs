//! Durable `LoggingService` implementation over SeaORM.
//!
//! `log_event` appends the `MessageLog` row and folds it into the `Message`
//! aggregate inside one transaction, so a crash between the two never
//! leaves `delivery_attempts` out of sync with the log count.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use sms_core::errors::{CoreError, CoreResult};
use sms_core::logging::{
    is_terminal_message_status, CampaignStats, LogEventRequest, LoggingService, Message,
    MessageLog,
};
use sms_core::queue::QueueItem;

use crate::entities::message::{ActiveModel as MessageActiveModel, Column as MessageColumn, Entity as MessageEntity};
use crate::entities::message_log::{
    ActiveModel as MessageLogActiveModel, Column as MessageLogColumn, Entity as MessageLogEntity,
};
use crate::error::DatabaseError;

fn db_err(err: sea_orm::DbErr) -> CoreError {
    DatabaseError::from(err).into()
}

pub struct SeaOrmLoggingService {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmLoggingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LoggingService for SeaOrmLoggingService {
    async fn create_message(
        &self,
        queue_item: &QueueItem,
        initial_status: &str,
        external_id: Option<&str>,
    ) -> CoreResult<Message> {
        let now = Utc::now();
        let active = MessageActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            contenu: Set(queue_item.message_content.clone()),
            date_envoi: Set(now),
            statut_livraison: Set(initial_status.to_string()),
            final_status: Set(None),
            delivery_attempts: Set(0),
            delivery_timestamp: Set(None),
            external_message_id: Set(external_id.map(|s| s.to_string())),
            error_message: Set(None),
            cost: Set(None),
            id_contact: Set(queue_item.contact_id),
            id_campagne: Set(queue_item.campaign_id),
            id_liste: Set(None),
            queue_item_id: Set(Some(queue_item.id)),
            updated_at: Set(now),
        };
        let model = active.insert(self.db.as_ref()).await.map_err(db_err)?;

        self.log_event(model.id, LogEventRequest::new(initial_status, "message_created"))
            .await?;

        let refreshed = MessageEntity::find_by_id(model.id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| CoreError::internal("message vanished after creation"))?;
        Ok(refreshed.to_domain())
    }

    async fn log_event(&self, message_id: i64, event: LogEventRequest) -> CoreResult<MessageLog> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(db_err)?;

        let attempt_number = MessageLogEntity::find()
            .filter(MessageLogColumn::MessageId.eq(message_id))
            .count(&txn)
            .await
            .map_err(db_err)? as i32
            + 1;

        let log_active = MessageLogActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            message_id: Set(message_id),
            queue_item_id: Set(event.queue_item_id),
            status: Set(event.status.clone()),
            provider_status: Set(event.provider_status.clone()),
            provider_response: Set(event.provider_response.clone().unwrap_or(serde_json::Value::Null)),
            error_code: Set(event.error_code.clone()),
            error_message: Set(event.error_message.clone()),
            attempt_number: Set(attempt_number),
            external_message_id: Set(event.external_message_id.clone()),
            cost: Set(event.cost),
            processing_duration_ms: Set(event.duration_ms),
            created_at: Set(now),
        };
        let log_model = log_active.insert(&txn).await.map_err(db_err)?;

        let message = MessageEntity::find_by_id(message_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| CoreError::not_found("Message", message_id.to_string()))?;

        let mut message_active: MessageActiveModel = message.clone().into();
        message_active.statut_livraison = Set(event.status.clone());
        message_active.delivery_attempts = Set(attempt_number);
        message_active.updated_at = Set(now);
        if let Some(eid) = &event.external_message_id {
            message_active.external_message_id = Set(Some(eid.clone()));
        }
        if let Some(err_msg) = &event.error_message {
            message_active.error_message = Set(Some(err_msg.clone()));
        }
        if let Some(cost) = event.cost {
            message_active.cost = Set(Some(cost));
        }
        if is_terminal_message_status(&event.status) {
            message_active.final_status = Set(Some(event.status.clone()));
            if event.status == "delivered" && message.delivery_timestamp.is_none() {
                message_active.delivery_timestamp = Set(Some(now));
            }
        }
        message_active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(log_model.to_domain())
    }

    async fn update_delivery_status(
        &self,
        external_id: &str,
        provider_status: &str,
        provider_response: serde_json::Value,
    ) -> CoreResult<bool> {
        let Some(message) = MessageEntity::find()
            .filter(MessageColumn::ExternalMessageId.eq(external_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
        else {
            return Ok(false);
        };

        let internal_status = sms_core::carrier::map_provider_status(provider_status);
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

        self.log_event(message.id, event).await?;
        Ok(true)
    }

    async fn timeline(&self, message_id: i64) -> CoreResult<Vec<MessageLog>> {
        let models = MessageLogEntity::find()
            .filter(MessageLogColumn::MessageId.eq(message_id))
            .order_by_asc(MessageLogColumn::AttemptNumber)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(|m| m.to_domain()).collect())
    }

    async fn campaign_stats(&self, campaign_id: i64) -> CoreResult<CampaignStats> {
        let messages = MessageEntity::find()
            .filter(MessageColumn::IdCampagne.eq(campaign_id))
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?;

        let total = messages.len() as i64;
        let mut stats = CampaignStats {
            total,
            status_breakdown: BTreeMap::new(),
            delivery_rate_pct: 0.0,
            average_delivery_seconds: 0.0,
            total_cost: Default::default(),
            retry_rate_pct: 0.0,
            error_summary: BTreeMap::new(),
        };
        if total == 0 {
            return Ok(stats);
        }

        let mut delivered = 0i64;
        let mut retried = 0i64;
        let mut delivery_seconds = Vec::new();
        for m in &messages {
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

        let message_ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        let logs = MessageLogEntity::find()
            .filter(MessageLogColumn::MessageId.is_in(message_ids))
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?;
        for log in logs {
            if let Some(code) = log.error_code {
                let key = format!("{code}: {}", log.error_message.unwrap_or_default());
                *stats.error_summary.entry(key).or_insert(0) += 1;
            }
        }

        Ok(stats)
    }

    async fn failed_for_retry(&self, campaign_id: Option<i64>, limit: u64) -> CoreResult<Vec<Message>> {
        let mut query = MessageEntity::find()
            .filter(MessageColumn::StatutLivraison.eq("failed"))
            .order_by_desc(MessageColumn::UpdatedAt);
        if let Some(campaign_id) = campaign_id {
            query = query.filter(MessageColumn::IdCampagne.eq(campaign_id));
        }
        let models = query.limit(limit).all(self.db.as_ref()).await.map_err(db_err)?;
        Ok(models.into_iter().map(|m| m.to_domain()).collect())
    }

    async fn find_by_external_id(&self, external_id: &str) -> CoreResult<Option<Message>> {
        let model = MessageEntity::find()
            .filter(MessageColumn::ExternalMessageId.eq(external_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(model.map(|m| m.to_domain()))
    }

    async fn awaiting_status(&self, since: chrono::DateTime<Utc>) -> CoreResult<Vec<Message>> {
        let models = MessageEntity::find()
            .filter(MessageColumn::StatutLivraison.eq("sent"))
            .filter(MessageColumn::DateEnvoi.gte(since))
            .filter(MessageColumn::ExternalMessageId.is_not_null())
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(|m| m.to_domain()).collect())
    }
}
