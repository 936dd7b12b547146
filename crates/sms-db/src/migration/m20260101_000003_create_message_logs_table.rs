use sea_orm_migration::prelude::*;

use super::m20260101_000001_create_sms_queue_table::SmsQueue;
use super::m20260101_000002_create_messages_table::Messages;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MessageLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MessageLogs::MessageId).big_integer().not_null())
                    .col(ColumnDef::new(MessageLogs::QueueItemId).big_integer())
                    .col(ColumnDef::new(MessageLogs::Status).string_len(20).not_null())
                    .col(ColumnDef::new(MessageLogs::ProviderStatus).string())
                    .col(
                        ColumnDef::new(MessageLogs::ProviderResponse)
                            .json()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(MessageLogs::ErrorCode).string())
                    .col(ColumnDef::new(MessageLogs::ErrorMessage).text())
                    .col(ColumnDef::new(MessageLogs::AttemptNumber).integer().not_null())
                    .col(ColumnDef::new(MessageLogs::ExternalMessageId).string())
                    .col(ColumnDef::new(MessageLogs::Cost).decimal_len(12, 4))
                    .col(ColumnDef::new(MessageLogs::ProcessingDurationMs).big_integer())
                    .col(
                        ColumnDef::new(MessageLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_logs_message_id")
                            .from(MessageLogs::Table, MessageLogs::MessageId)
                            .to(Messages::Table, Messages::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_logs_queue_item_id")
                            .from(MessageLogs::Table, MessageLogs::QueueItemId)
                            .to(SmsQueue::Table, SmsQueue::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .check(Expr::col(MessageLogs::AttemptNumber).gte(1))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_logs_message_id")
                    .table(MessageLogs::Table)
                    .col(MessageLogs::MessageId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_logs_queue_item_id")
                    .table(MessageLogs::Table)
                    .col(MessageLogs::QueueItemId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_logs_external_message_id")
                    .table(MessageLogs::Table)
                    .col(MessageLogs::ExternalMessageId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_logs_status")
                    .table(MessageLogs::Table)
                    .col(MessageLogs::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_logs_created_at")
                    .table(MessageLogs::Table)
                    .col(MessageLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MessageLogs {
    Table,
    Id,
    MessageId,
    QueueItemId,
    Status,
    ProviderStatus,
    ProviderResponse,
    ErrorCode,
    ErrorMessage,
    AttemptNumber,
    ExternalMessageId,
    Cost,
    ProcessingDurationMs,
    CreatedAt,
}
