//! Database migration management.

pub mod m20260101_000001_create_sms_queue_table;
pub mod m20260101_000002_create_messages_table;
pub mod m20260101_000003_create_message_logs_table;

use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;

use crate::error::{DatabaseError, DbResult};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_sms_queue_table::Migration),
            Box::new(m20260101_000002_create_messages_table::Migration),
            Box::new(m20260101_000003_create_message_logs_table::Migration),
        ]
    }
}

pub async fn run_migrations(db: &DatabaseConnection) -> DbResult<()> {
    Migrator::up(db, None)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    tracing::info!("database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrator_lists_all_three_tables() {
        assert_eq!(Migrator::migrations().len(), 3);
    }
}
