//! Error types for quoteline operations

use crate::EntityType;
use std::time::Duration;
use thiserror::Error;

/// Serialization failures for pending-operation and aggregate-cache payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Failed to serialize {what}: {reason}")]
    Serialize { what: String, reason: String },

    #[error("Failed to deserialize {what}: {reason}")]
    Deserialize { what: String, reason: String },

    #[error("Payload under {key} is a {found} operation, expected {expected}")]
    KindMismatch {
        key: String,
        expected: String,
        found: String,
    },
}

/// Fast store (TTL key-value) errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FastStoreError {
    #[error("Fast store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Fast store {op} failed for {key}: {reason}")]
    OperationFailed {
        op: String,
        key: String,
        reason: String,
    },

    #[error("Fast store lock poisoned")]
    LockPoisoned,
}

/// Durable store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DurableStoreError {
    #[error("Entity not found: {entity:?} with id {id}")]
    NotFound { entity: EntityType, id: String },

    #[error("Insert failed for {entity:?}: {reason}")]
    InsertFailed { entity: EntityType, reason: String },

    #[error("Update failed for {entity:?} with id {id}: {reason}")]
    UpdateFailed {
        entity: EntityType,
        id: String,
        reason: String,
    },

    #[error("Durable store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Durable store lock poisoned")]
    LockPoisoned,
}

/// Validation errors for caller requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Pending TTL {ttl:?} must exceed sync interval {interval:?}")]
    TtlNotAboveInterval { ttl: Duration, interval: Duration },
}

/// Master error type for all quoteline errors.
#[derive(Debug, Clone, Error)]
pub enum QuotelineError {
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Fast store error: {0}")]
    FastStore(#[from] FastStoreError),

    #[error("Durable store error: {0}")]
    DurableStore(#[from] DurableStoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Background job {job} failed: {reason}")]
    Job { job: String, reason: String },

    #[error("Telemetry error: {reason}")]
    Telemetry { reason: String },
}

/// Result type alias for quoteline operations.
pub type QuotelineResult<T> = Result<T, QuotelineError>;

impl EncodingError {
    pub fn serialize(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        EncodingError::Serialize {
            what: what.into(),
            reason: err.to_string(),
        }
    }

    pub fn deserialize(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        EncodingError::Deserialize {
            what: what.into(),
            reason: err.to_string(),
        }
    }
}

impl FastStoreError {
    pub fn operation(
        op: impl Into<String>,
        key: impl Into<String>,
        err: impl std::fmt::Display,
    ) -> Self {
        FastStoreError::OperationFailed {
            op: op.into(),
            key: key.into(),
            reason: err.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durable_error_display_not_found() {
        let err = DurableStoreError::NotFound {
            entity: EntityType::Transaction,
            id: "7".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("Transaction"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn test_encoding_error_display_kind_mismatch() {
        let err = EncodingError::KindMismatch {
            key: "pending_create_tx:1_x".to_string(),
            expected: "create".to_string(),
            found: "update".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("pending_create_tx:1_x"));
        assert!(msg.contains("expected create"));
    }

    #[test]
    fn test_telemetry_error_display() {
        let err = QuotelineError::Telemetry {
            reason: "subscriber already set".to_string(),
        };
        assert_eq!(err.to_string(), "Telemetry error: subscriber already set");
    }

    #[test]
    fn test_config_error_display_ttl() {
        let err = ConfigError::TtlNotAboveInterval {
            ttl: Duration::from_secs(10),
            interval: Duration::from_secs(15),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("10s"));
        assert!(msg.contains("15s"));
    }

    #[test]
    fn test_quoteline_error_from_variants() {
        let fast = QuotelineError::from(FastStoreError::LockPoisoned);
        assert!(matches!(fast, QuotelineError::FastStore(_)));

        let durable = QuotelineError::from(DurableStoreError::Unavailable {
            reason: "down".to_string(),
        });
        assert!(matches!(durable, QuotelineError::DurableStore(_)));

        let encoding = QuotelineError::from(EncodingError::serialize("quote", "bad float"));
        assert!(matches!(encoding, QuotelineError::Encoding(_)));

        let validation = QuotelineError::from(ValidationError::InvalidValue {
            field: "quantity".to_string(),
            reason: "negative".to_string(),
        });
        assert!(matches!(validation, QuotelineError::Validation(_)));

        let config = QuotelineError::from(ConfigError::InvalidValue {
            field: "tick_interval".to_string(),
            value: "0".to_string(),
            reason: "must be non-zero".to_string(),
        });
        assert!(matches!(config, QuotelineError::Config(_)));
    }
}
