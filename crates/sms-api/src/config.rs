//! Application configuration, loaded from the environment.

use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is missing")]
    MissingVariable(String),
    #[error("failed to parse environment variable {variable}: {source}")]
    ParseError {
        variable: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
    pub carrier: CarrierConfig,
    pub sms: SmsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age: Option<usize>,
    pub supports_credentials: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

/// Carrier credentials. Intentionally thin: the provider-specific shape
/// (`account_sid`/`auth_token`/`from_number`) lives in `sms-carrier`, this
/// struct only carries what the API layer needs to construct it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub sender_id: String,
    pub webhook_signing_secret: String,
}

/// The six config keys named in the external interfaces section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub default_country_code: String,
    pub rate_limit: i64,
    pub base_url: String,
    pub message_retention_days: i64,
    pub lease_timeout_seconds: i64,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();

        let server = ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_env("SERVER_PORT", "8080")?,
            workers: env::var("SERVER_WORKERS").ok().map(|v| parse("SERVER_WORKERS", &v)).transpose()?,
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: parse_env("DB_MAX_CONNECTIONS", "10")?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", "1")?,
            auto_migrate: env::var("DB_AUTO_MIGRATE")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        };

        let cors = CorsConfig {
            allowed_origins: split_env("CORS_ALLOWED_ORIGINS", "http://localhost:3000"),
            allowed_methods: split_env("CORS_ALLOWED_METHODS", "GET,POST,PUT,DELETE,OPTIONS"),
            allowed_headers: split_env("CORS_ALLOWED_HEADERS", "Content-Type,Authorization,X-Requested-With"),
            expose_headers: split_env("CORS_EXPOSE_HEADERS", "X-Total-Count"),
            max_age: env::var("CORS_MAX_AGE").ok().map(|v| parse("CORS_MAX_AGE", &v)).transpose()?,
            supports_credentials: env::var("CORS_SUPPORTS_CREDENTIALS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()).to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            },
        };

        let carrier = CarrierConfig {
            account_sid: env::var("CARRIER_ACCOUNT_SID").unwrap_or_default(),
            auth_token: env::var("CARRIER_AUTH_TOKEN").unwrap_or_default(),
            sender_id: env::var("CARRIER_SENDER_ID").unwrap_or_default(),
            webhook_signing_secret: env::var("CARRIER_WEBHOOK_SECRET").unwrap_or_default(),
        };

        let sms = SmsConfig {
            default_country_code: env::var("DEFAULT_COUNTRY_CODE").unwrap_or_else(|_| "FR".to_string()),
            rate_limit: env::var("SMS_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(100),
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            message_retention_days: parse_env("MESSAGE_RETENTION_DAYS", "30")?,
            lease_timeout_seconds: parse_env("LEASE_TIMEOUT_SECONDS", "300")?,
        };

        Ok(ApiConfig { server, database, cors, logging, carrier, sms })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidConfig("server port cannot be 0".to_string()));
        }
        if self.database.url.is_empty() {
            return Err(ConfigError::InvalidConfig("database URL cannot be empty".to_string()));
        }
        if self.cors.allowed_origins.is_empty() {
            return Err(ConfigError::InvalidConfig("at least one CORS origin must be specified".to_string()));
        }
        if self.sms.rate_limit <= 0 {
            return Err(ConfigError::InvalidConfig("SMS_RATE_LIMIT must be positive".to_string()));
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn split_env(key: &str, default: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .collect()
}

fn parse<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    variable: &str,
    raw: &str,
) -> Result<T, ConfigError> {
    raw.parse().map_err(|source| ConfigError::ParseError {
        variable: variable.to_string(),
        source,
    })
}

fn parse_env<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    key: &str,
    default: &str,
) -> Result<T, ConfigError> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    parse(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_zero_port() {
        let mut config = sample_config();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_non_positive_rate_limit() {
        let mut config = sample_config();
        config.sms.rate_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn server_address_combines_host_and_port() {
        let config = sample_config();
        assert_eq!(config.server_address(), "127.0.0.1:8080");
    }

    fn sample_config() -> ApiConfig {
        ApiConfig {
            server: ServerConfig { host: "127.0.0.1".to_string(), port: 8080, workers: None },
            database: DatabaseConfig {
                url: "sqlite://sms.db".to_string(),
                max_connections: 10,
                min_connections: 1,
                auto_migrate: true,
            },
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
                allowed_methods: vec!["GET".to_string()],
                allowed_headers: vec!["content-type".to_string()],
                expose_headers: vec![],
                max_age: Some(3600),
                supports_credentials: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Pretty },
            carrier: CarrierConfig {
                account_sid: "AC123".to_string(),
                auth_token: "token".to_string(),
                sender_id: "+15550000000".to_string(),
                webhook_signing_secret: "secret".to_string(),
            },
            sms: SmsConfig {
                default_country_code: "FR".to_string(),
                rate_limit: 100,
                base_url: "http://localhost:8080".to_string(),
                message_retention_days: 30,
                lease_timeout_seconds: 300,
            },
        }
    }
}
