//! Database connection management.

use sea_orm::{ConnectOptions, Database};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::DbResult;

pub type DatabaseConnection = sea_orm::DatabaseConnection;

pub async fn establish_connection(config: &DatabaseConfig) -> DbResult<DatabaseConnection> {
    let mut connect_options = ConnectOptions::new(config.database_url().as_str());
    connect_options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(config.sql_logging);

    tracing::info!(url = %config.database_url(), "establishing database connection");
    let connection = Database::connect(connect_options).await?;
    tracing::info!("database connection established");
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseUrl;

    #[test]
    fn connect_options_accept_sqlite_memory_url() {
        let config = DatabaseConfig::new(DatabaseUrl::new("sqlite::memory:".into()).unwrap());
        let mut options = ConnectOptions::new(config.database_url().as_str());
        options.max_connections(config.max_connections);
        assert_eq!(config.max_connections, 20);
    }
}
