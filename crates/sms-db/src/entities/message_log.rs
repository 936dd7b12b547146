//! `message_logs` entity model — append-only.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use sms_core::logging::MessageLog as DomainMessageLog;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "message_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub message_id: i64,
    pub queue_item_id: Option<i64>,
    pub status: String,
    pub provider_status: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub provider_response: Json,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub attempt_number: i32,
    pub external_message_id: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 4)))", nullable)]
    pub cost: Option<Decimal>,
    pub processing_duration_ms: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::message::Entity",
        from = "Column::MessageId",
        to = "super::message::Column::Id",
        on_delete = "Cascade"
    )]
    Message,
    #[sea_orm(
        belongs_to = "super::queue_item::Entity",
        from = "Column::QueueItemId",
        to = "super::queue_item::Column::Id",
        on_delete = "SetNull"
    )]
    QueueItem,
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl Related<super::queue_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QueueItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DomainMessageLog {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            message_id: model.message_id,
            queue_item_id: model.queue_item_id,
            status: model.status,
            provider_status: model.provider_status,
            provider_response: model.provider_response,
            error_code: model.error_code,
            error_message: model.error_message,
            attempt_number: model.attempt_number,
            external_message_id: model.external_message_id,
            cost: model.cost,
            processing_duration_ms: model.processing_duration_ms,
            created_at: model.created_at,
        }
    }
}

impl Model {
    pub fn to_domain(&self) -> DomainMessageLog {
        self.clone().into()
    }
}
