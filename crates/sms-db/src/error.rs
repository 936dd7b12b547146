//! Database error types and conversion into `sms_core::CoreError`.

use thiserror::Error;

pub type DbResult<T> = std::result::Result<T, DatabaseError>;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal database error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for DatabaseError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::ConnectionAcquire(e) => DatabaseError::Connection(e.to_string()),
            sea_orm::DbErr::RecordNotFound(msg) => DatabaseError::NotFound(msg),
            sea_orm::DbErr::Query(e) => DatabaseError::Query(e.to_string()),
            sea_orm::DbErr::Exec(e) => DatabaseError::Query(e.to_string()),
            sea_orm::DbErr::Conn(e) => DatabaseError::Connection(e.to_string()),
            sea_orm::DbErr::Migration(msg) => DatabaseError::Migration(msg),
            other => DatabaseError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Serialization(err.to_string())
    }
}

/// Maps a database-layer error onto the domain error taxonomy so
/// `sms-api` handlers only ever need to match on `CoreError`.
impl From<DatabaseError> for sms_core::CoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => sms_core::CoreError::not_found("entity", msg),
            DatabaseError::Configuration(msg) | DatabaseError::Serialization(msg) => {
                sms_core::CoreError::internal(msg)
            }
            other => sms_core::CoreError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_core_not_found() {
        let db_err = DatabaseError::NotFound("QueueItem 5".into());
        let core_err: sms_core::CoreError = db_err.into();
        assert_eq!(core_err.category(), sms_core::errors::ErrorCategory::NotFound);
    }
}
