//! Encoding of staged mutations.
//!
//! A pending record is a JSON envelope tagged with its operation, so a
//! payload can be checked against the key prefix it was found under.

use quoteline_core::{EncodingError, StatusUpdate, Transaction, TransactionId};
use serde::{Deserialize, Serialize};

use super::keys::PendingKind;

/// A mutation intent waiting to be applied to the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PendingOperation {
    /// Insert a full transaction.
    Create(Transaction),
    /// Change the status of an existing transaction.
    Update(StatusUpdate),
}

impl PendingOperation {
    pub fn kind(&self) -> PendingKind {
        match self {
            PendingOperation::Create(_) => PendingKind::Create,
            PendingOperation::Update(_) => PendingKind::Update,
        }
    }

    /// Transaction the operation targets, if it already has an id.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            PendingOperation::Create(tx) => tx.id,
            PendingOperation::Update(update) => Some(update.id),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        serde_json::to_vec(self)
            .map_err(|e| EncodingError::serialize(format!("pending {}", self.kind()), e))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        serde_json::from_slice(bytes).map_err(|e| EncodingError::deserialize("pending operation", e))
    }

    /// Decode a payload read from `key`, which must hold an operation of `expected` kind.
    pub fn decode_for(key: &str, expected: PendingKind, bytes: &[u8]) -> Result<Self, EncodingError> {
        let op = Self::decode(bytes)?;
        if op.kind() != expected {
            return Err(EncodingError::KindMismatch {
                key: key.to_string(),
                expected: expected.to_string(),
                found: op.kind().to_string(),
            });
        }
        Ok(op)
    }
}
