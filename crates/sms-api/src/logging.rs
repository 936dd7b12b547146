//! Structured logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{ApiConfig, LogFormat};

pub fn init_logging(config: &ApiConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = Registry::default().with(env_filter);

    match config.logging.format {
        LogFormat::Json => {
            subscriber.with(fmt::layer().json().with_target(true).with_line_number(true)).init();
        }
        LogFormat::Pretty => {
            subscriber.with(fmt::layer().pretty().with_target(true).with_line_number(true)).init();
        }
        LogFormat::Compact => {
            subscriber.with(fmt::layer().compact().with_target(false)).init();
        }
    }

    tracing::info!(log_level = %config.logging.level, "logging initialized");
    Ok(())
}
