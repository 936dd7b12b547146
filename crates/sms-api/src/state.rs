//! Shared application state: DB connection, config, health, and the
//! service/carrier trait objects the handlers and workers operate on.

use sea_orm::ConnectionTrait;
use std::sync::Arc;
use tokio::sync::RwLock;

use sms_carrier::{HttpSmsCarrier, HttpSmsCarrierConfig};
use sms_core::carrier::SmsCarrier;
use sms_core::directory::{CampaignDirectory, ContactDirectory};
use sms_core::logging::LoggingService;
use sms_core::queue::QueueService;
use sms_core::testing::StaticDirectory;
use sms_db::{DatabaseConfig, DatabaseConnection, DatabaseUrl, SeaOrmLoggingService, SeaOrmQueueService};

use crate::config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<ApiConfig>,
    pub health: Arc<RwLock<HealthState>>,
    pub queue_service: Arc<dyn QueueService>,
    pub logging_service: Arc<dyn LoggingService>,
    pub carrier: Arc<dyn SmsCarrier>,
    /// Contact/campaign lookup are upstream collaborators this crate does
    /// not own (campaign composition / contact-list management live
    /// elsewhere). Default to an empty stub until a real directory is
    /// wired in.
    pub contacts: Arc<dyn ContactDirectory>,
    pub campaigns: Arc<dyn CampaignDirectory>,
}

#[derive(Debug, Clone)]
pub struct HealthState {
    pub database_healthy: bool,
    pub last_check: chrono::DateTime<chrono::Utc>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            database_healthy: false,
            last_check: chrono::Utc::now(),
            startup_time: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl AppState {
    pub async fn new(config: ApiConfig) -> Result<Self, AppStateError> {
        let db_config = {
            let url = DatabaseUrl::new(config.database.url.clone())
                .map_err(|e| AppStateError::Configuration(e.to_string()))?;
            let mut db_config = DatabaseConfig::new(url);
            db_config.max_connections = config.database.max_connections;
            db_config.min_connections = config.database.min_connections;
            db_config.auto_migrate = config.database.auto_migrate;
            db_config
        };

        let db = sms_db::establish_connection(&db_config)
            .await
            .map_err(AppStateError::DatabaseConnection)?;
        let db = Arc::new(db);

        if db_config.auto_migrate {
            sms_db::run_migrations(db.as_ref())
                .await
                .map_err(AppStateError::DatabaseConnection)?;
        }

        let directory = Arc::new(StaticDirectory::default());
        let contacts: Arc<dyn ContactDirectory> = directory.clone();
        let campaigns: Arc<dyn CampaignDirectory> = directory;

        let queue_service: Arc<dyn QueueService> = Arc::new(SeaOrmQueueService::new(
            db.clone(),
            contacts.clone(),
            campaigns.clone(),
            config.sms.default_country_code.clone(),
        ));
        let logging_service: Arc<dyn LoggingService> = Arc::new(SeaOrmLoggingService::new(db.clone()));

        let carrier_config = HttpSmsCarrierConfig {
            base_url: config.sms.base_url.clone(),
            account_sid: config.carrier.account_sid.clone(),
            auth_token: config.carrier.auth_token.clone(),
            from_number: config.carrier.sender_id.clone(),
        };
        let carrier: Arc<dyn SmsCarrier> = Arc::new(
            HttpSmsCarrier::new(carrier_config).map_err(|e| AppStateError::Configuration(e.to_string()))?,
        );

        Ok(Self {
            db,
            config: Arc::new(config),
            health: Arc::new(RwLock::new(HealthState::default())),
            queue_service,
            logging_service,
            carrier,
            contacts,
            campaigns,
        })
    }

    pub async fn health_check(&self) -> HealthCheckResult {
        let mut health = self.health.write().await;

        let db_healthy = self.check_database_health().await;
        health.database_healthy = db_healthy;
        health.last_check = chrono::Utc::now();
        let current = health.clone();
        drop(health);

        HealthCheckResult {
            healthy: db_healthy,
            checks: vec![HealthCheck {
                name: "database".to_string(),
                status: if db_healthy { HealthStatus::Healthy } else { HealthStatus::Unhealthy },
                message: if db_healthy {
                    "database connection is healthy".to_string()
                } else {
                    "database connection failed".to_string()
                },
                last_checked: current.last_check,
            }],
            uptime: chrono::Utc::now().signed_duration_since(current.startup_time).num_seconds(),
            version: current.version,
        }
    }

    async fn check_database_health(&self) -> bool {
        match self.db.execute(sea_orm::Statement::from_string(self.db.get_database_backend(), "SELECT 1".to_string())).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "database health check failed");
                false
            }
        }
    }

    pub async fn uptime(&self) -> i64 {
        let health = self.health.read().await;
        chrono::Utc::now().signed_duration_since(health.startup_time).num_seconds()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("failed to establish database connection: {0}")]
    DatabaseConnection(#[from] sms_db::DatabaseError),
    #[error("configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub checks: Vec<HealthCheck>,
    pub uptime: i64,
    pub version: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    pub last_checked: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub enum HealthStatus {
    #[serde(rename = "healthy")]
    Healthy,
    #[serde(rename = "unhealthy")]
    Unhealthy,
    #[serde(rename = "degraded")]
    Degraded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_state_defaults_to_unhealthy_until_checked() {
        let health = HealthState::default();
        assert!(!health.database_healthy);
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn health_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&HealthStatus::Healthy).unwrap(), "\"healthy\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Degraded).unwrap(), "\"degraded\"");
    }
}
