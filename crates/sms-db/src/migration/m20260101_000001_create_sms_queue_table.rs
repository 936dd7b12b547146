use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SmsQueue::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SmsQueue::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SmsQueue::CampaignId).big_integer())
                    .col(ColumnDef::new(SmsQueue::ContactId).big_integer().not_null())
                    .col(ColumnDef::new(SmsQueue::MessageContent).text().not_null())
                    .col(
                        ColumnDef::new(SmsQueue::Priority)
                            .small_integer()
                            .not_null()
                            .default(5),
                    )
                    .col(
                        ColumnDef::new(SmsQueue::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(SmsQueue::Attempts).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(SmsQueue::MaxAttempts)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(SmsQueue::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SmsQueue::NextRetryAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SmsQueue::LastAttemptAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SmsQueue::ProcessedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(SmsQueue::ExternalMessageId).string())
                    .col(ColumnDef::new(SmsQueue::ErrorMessage).text())
                    .col(
                        ColumnDef::new(SmsQueue::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(SmsQueue::Priority).between(0, 10))
                    .check(Expr::col(SmsQueue::MaxAttempts).between(1, 10))
                    .check(Expr::col(SmsQueue::Attempts).gte(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sms_queue_status_priority")
                    .table(SmsQueue::Table)
                    .col(SmsQueue::Status)
                    .col(SmsQueue::Priority)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sms_queue_next_retry_at")
                    .table(SmsQueue::Table)
                    .col(SmsQueue::NextRetryAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sms_queue_external_message_id")
                    .table(SmsQueue::Table)
                    .col(SmsQueue::ExternalMessageId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_sms_queue_external_message_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_sms_queue_next_retry_at").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_sms_queue_status_priority").to_owned())
            .await?;
        manager.drop_table(Table::drop().table(SmsQueue::Table).to_owned()).await
    }
}

#[derive(Iden)]
enum SmsQueue {
    Table,
    Id,
    CampaignId,
    ContactId,
    MessageContent,
    Priority,
    Status,
    Attempts,
    MaxAttempts,
    ScheduledAt,
    NextRetryAt,
    LastAttemptAt,
    ProcessedAt,
    ExternalMessageId,
    ErrorMessage,
    CreatedAt,
}
