//! `messages` entity model.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use sms_core::logging::Message as DomainMessage;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub contenu: String,
    pub date_envoi: chrono::DateTime<chrono::Utc>,
    pub statut_livraison: String,
    pub final_status: Option<String>,
    pub delivery_attempts: i32,
    pub delivery_timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub external_message_id: Option<String>,
    pub error_message: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 4)))", nullable)]
    pub cost: Option<Decimal>,
    pub id_contact: i64,
    pub id_campagne: Option<i64>,
    pub id_liste: Option<i64>,
    pub queue_item_id: Option<i64>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::queue_item::Entity",
        from = "Column::QueueItemId",
        to = "super::queue_item::Column::Id",
        on_delete = "SetNull"
    )]
    QueueItem,
    #[sea_orm(has_many = "super::message_log::Entity")]
    MessageLog,
}

impl Related<super::queue_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QueueItem.def()
    }
}

impl Related<super::message_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MessageLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DomainMessage {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            contenu: model.contenu,
            date_envoi: model.date_envoi,
            statut_livraison: model.statut_livraison,
            final_status: model.final_status,
            delivery_attempts: model.delivery_attempts,
            delivery_timestamp: model.delivery_timestamp,
            external_message_id: model.external_message_id,
            error_message: model.error_message,
            cost: model.cost,
            id_contact: model.id_contact,
            id_campagne: model.id_campagne,
            id_liste: model.id_liste,
            queue_item_id: model.queue_item_id,
            updated_at: model.updated_at,
        }
    }
}

impl Model {
    pub fn to_domain(&self) -> DomainMessage {
        self.clone().into()
    }
}
