//! Core error types shared by every crate in the dispatch core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used throughout the domain and service layers.
pub type CoreResult<T> = Result<T, CoreError>;

/// Error taxonomy named in the design: validation, not-found, state
/// violations, carrier outcomes, and unexpected internal failures.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: String },

    #[error("queue item {0} is not cancellable")]
    NotCancellable(String),

    #[error("queue item {0} is not retryable")]
    NotRetryable(String),

    #[error("carrier error (transient): {0}")]
    CarrierTransient(String),

    #[error("carrier error (permanent): {0}")]
    CarrierPermanent(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found<S1: Into<String>, S2: Into<String>>(entity_type: S1, id: S2) -> Self {
        CoreError::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        CoreError::Internal(message.into())
    }

    /// Error category, used for logging/metrics grouping.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Validation(_) => ErrorCategory::Validation,
            CoreError::NotFound { .. } => ErrorCategory::NotFound,
            CoreError::NotCancellable(_) | CoreError::NotRetryable(_) => ErrorCategory::StateViolation,
            CoreError::CarrierTransient(_) => ErrorCategory::CarrierTransient,
            CoreError::CarrierPermanent(_) => ErrorCategory::CarrierPermanent,
            CoreError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the operation that produced this error should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::CarrierTransient(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    StateViolation,
    CarrierTransient,
    CarrierPermanent,
    Internal,
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_is_not_retryable() {
        let err = CoreError::validation("bad input");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn carrier_transient_is_retryable() {
        let err = CoreError::CarrierTransient("timeout".into());
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::CarrierTransient);
    }

    #[test]
    fn carrier_permanent_is_not_retryable() {
        let err = CoreError::CarrierPermanent("invalid recipient".into());
        assert!(!err.is_retryable());
    }

    #[test]
    fn not_found_formats_entity_and_id() {
        let err = CoreError::not_found("QueueItem", "42");
        assert_eq!(err.to_string(), "QueueItem 42 not found");
    }
}
