//! `sms_queue` entity model.

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use sms_core::queue::{QueueItem as DomainQueueItem, QueueStatus as DomainQueueStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "sms_queue")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub campaign_id: Option<i64>,
    pub contact_id: i64,
    pub message_content: String,
    pub priority: i16,
    pub status: QueueStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
    pub next_retry_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_attempt_at: Option<chrono::DateTime<chrono::Utc>>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub external_message_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::message::Entity")]
    Message,
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Database-stored mirror of [`DomainQueueStatus`]. Kept as a distinct type
/// (rather than deriving `DeriveActiveEnum` directly on the domain enum) so
/// `sms-core` stays free of any SeaORM dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum QueueStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl From<DomainQueueStatus> for QueueStatus {
    fn from(status: DomainQueueStatus) -> Self {
        match status {
            DomainQueueStatus::Pending => QueueStatus::Pending,
            DomainQueueStatus::Processing => QueueStatus::Processing,
            DomainQueueStatus::Sent => QueueStatus::Sent,
            DomainQueueStatus::Failed => QueueStatus::Failed,
            DomainQueueStatus::Cancelled => QueueStatus::Cancelled,
        }
    }
}

impl From<QueueStatus> for DomainQueueStatus {
    fn from(status: QueueStatus) -> Self {
        match status {
            QueueStatus::Pending => DomainQueueStatus::Pending,
            QueueStatus::Processing => DomainQueueStatus::Processing,
            QueueStatus::Sent => DomainQueueStatus::Sent,
            QueueStatus::Failed => DomainQueueStatus::Failed,
            QueueStatus::Cancelled => DomainQueueStatus::Cancelled,
        }
    }
}

impl From<Model> for DomainQueueItem {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            campaign_id: model.campaign_id,
            contact_id: model.contact_id,
            message_content: model.message_content,
            priority: model.priority,
            status: model.status.into(),
            attempts: model.attempts,
            max_attempts: model.max_attempts,
            scheduled_at: model.scheduled_at,
            next_retry_at: model.next_retry_at,
            last_attempt_at: model.last_attempt_at,
            processed_at: model.processed_at,
            external_message_id: model.external_message_id,
            error_message: model.error_message,
            created_at: model.created_at,
        }
    }
}

impl Model {
    pub fn to_domain(&self) -> DomainQueueItem {
        self.clone().into()
    }
}

/// Builds the insert `ActiveModel` for a new submission. `id` is left unset
/// for the database to assign.
pub fn new_active_model(
    campaign_id: i64,
    contact_id: i64,
    message_content: String,
    priority: i16,
    max_attempts: i32,
    scheduled_at: chrono::DateTime<chrono::Utc>,
    now: chrono::DateTime<chrono::Utc>,
) -> ActiveModel {
    ActiveModel {
        id: sea_orm::ActiveValue::NotSet,
        campaign_id: Set(Some(campaign_id)),
        contact_id: Set(contact_id),
        message_content: Set(message_content),
        priority: Set(priority),
        status: Set(QueueStatus::Pending),
        attempts: Set(0),
        max_attempts: Set(max_attempts),
        scheduled_at: Set(scheduled_at),
        next_retry_at: Set(None),
        last_attempt_at: Set(None),
        processed_at: Set(None),
        external_message_id: Set(None),
        error_message: Set(None),
        created_at: Set(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_domain_enum() {
        for status in [
            DomainQueueStatus::Pending,
            DomainQueueStatus::Processing,
            DomainQueueStatus::Sent,
            DomainQueueStatus::Failed,
            DomainQueueStatus::Cancelled,
        ] {
            let db: QueueStatus = status.into();
            let back: DomainQueueStatus = db.into();
            assert_eq!(status, back);
        }
    }
}
