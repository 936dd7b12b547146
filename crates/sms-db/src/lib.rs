//! # sms-db
//!
//! Durable persistence layer for the SMS dispatch core: SeaORM entities,
//! migrations, and the `QueueService`/`LoggingService` implementations that
//! back them onto Postgres (sqlite for local/dev).
//!
//! ## Modules
//!
//! - [`config`] - database configuration
//! - [`connection`] - connection pool setup
//! - [`entities`] - SeaORM entity models
//! - [`migration`] - schema migrations
//! - [`repositories`] - durable `QueueService`/`LoggingService` implementations
//! - [`error`] - database error type and conversion into `CoreError`

pub mod config;
pub mod connection;
pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;

pub use config::{DatabaseConfig, DatabaseUrl};
pub use connection::{establish_connection, DatabaseConnection};
pub use error::{DatabaseError, DbResult};
pub use migration::{run_migrations, Migrator};
pub use repositories::{SeaOrmLoggingService, SeaOrmQueueService};

pub use sea_orm_migration::MigratorTrait;
