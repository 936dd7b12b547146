use sea_orm_migration::prelude::*;

use super::m20260101_000001_create_sms_queue_table::SmsQueue;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Messages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Messages::Contenu).text().not_null())
                    .col(
                        ColumnDef::new(Messages::DateEnvoi)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Messages::StatutLivraison).string_len(20).not_null())
                    .col(ColumnDef::new(Messages::FinalStatus).string_len(20))
                    .col(
                        ColumnDef::new(Messages::DeliveryAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Messages::DeliveryTimestamp).timestamp_with_time_zone())
                    .col(ColumnDef::new(Messages::ExternalMessageId).string())
                    .col(ColumnDef::new(Messages::ErrorMessage).text())
                    .col(ColumnDef::new(Messages::Cost).decimal_len(12, 4))
                    .col(ColumnDef::new(Messages::IdContact).big_integer().not_null())
                    .col(ColumnDef::new(Messages::IdCampagne).big_integer())
                    .col(ColumnDef::new(Messages::IdListe).big_integer())
                    .col(ColumnDef::new(Messages::QueueItemId).big_integer())
                    .col(
                        ColumnDef::new(Messages::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_messages_queue_item_id")
                            .from(Messages::Table, Messages::QueueItemId)
                            .to(SmsQueue::Table, SmsQueue::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_external_message_id")
                    .table(Messages::Table)
                    .col(Messages::ExternalMessageId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_queue_item_id")
                    .table(Messages::Table)
                    .col(Messages::QueueItemId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_final_status")
                    .table(Messages::Table)
                    .col(Messages::FinalStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_updated_at")
                    .table(Messages::Table)
                    .col(Messages::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_id_campagne")
                    .table(Messages::Table)
                    .col(Messages::IdCampagne)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Messages::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum Messages {
    Table,
    Id,
    Contenu,
    DateEnvoi,
    StatutLivraison,
    FinalStatus,
    DeliveryAttempts,
    DeliveryTimestamp,
    ExternalMessageId,
    ErrorMessage,
    Cost,
    IdContact,
    IdCampagne,
    IdListe,
    QueueItemId,
    UpdatedAt,
}
