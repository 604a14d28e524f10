//! Enum types for quoteline entities

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Entity type discriminator used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Quote,
    Transaction,
}

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionSide {
    /// Executes against the quote's ask price.
    Buy,
    /// Executes against the quote's bid price.
    Sell,
}

/// Lifecycle status of a transaction.
///
/// `Pending` is the only legal initial state. The other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl TransactionSide {
    /// Stable numeric wire code (Buy = 1, Sell = 2).
    pub fn code(self) -> i32 {
        match self {
            TransactionSide::Buy => 1,
            TransactionSide::Sell => 2,
        }
    }
}

impl TransactionStatus {
    /// Stable numeric wire code (Pending = 1 .. Failed = 4).
    pub fn code(self) -> i32 {
        match self {
            TransactionStatus::Pending => 1,
            TransactionStatus::Completed => 2,
            TransactionStatus::Cancelled => 3,
            TransactionStatus::Failed => 4,
        }
    }

    /// True for states that admit no further transition.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    /// Check whether moving from `self` to `next` is a modeled transition.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        self == TransactionStatus::Pending && next.is_terminal()
    }
}

impl TryFrom<i32> for TransactionSide {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(TransactionSide::Buy),
            2 => Ok(TransactionSide::Sell),
            other => Err(ValidationError::InvalidValue {
                field: "side".to_string(),
                reason: format!("unknown side code {}", other),
            }),
        }
    }
}

impl TryFrom<i32> for TransactionStatus {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(TransactionStatus::Pending),
            2 => Ok(TransactionStatus::Completed),
            3 => Ok(TransactionStatus::Cancelled),
            4 => Ok(TransactionStatus::Failed),
            other => Err(ValidationError::InvalidValue {
                field: "status".to_string(),
                reason: format!("unknown status code {}", other),
            }),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityType::Quote => "Quote",
            EntityType::Transaction => "Transaction",
        };
        write!(f, "{}", value)
    }
}

impl fmt::Display for TransactionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TransactionSide::Buy => "Buy",
            TransactionSide::Sell => "Sell",
        };
        write!(f, "{}", value)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Cancelled => "Cancelled",
            TransactionStatus::Failed => "Failed",
        };
        write!(f, "{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_match_wire_values() {
        assert_eq!(TransactionStatus::Pending.code(), 1);
        assert_eq!(TransactionStatus::Completed.code(), 2);
        assert_eq!(TransactionStatus::Cancelled.code(), 3);
        assert_eq!(TransactionStatus::Failed.code(), 4);
        assert_eq!(TransactionSide::Buy.code(), 1);
        assert_eq!(TransactionSide::Sell.code(), 2);
    }

    #[test]
    fn test_status_try_from_rejects_unknown_code() {
        assert_eq!(
            TransactionStatus::try_from(3).unwrap(),
            TransactionStatus::Cancelled
        );
        assert!(TransactionStatus::try_from(0).is_err());
        assert!(TransactionSide::try_from(9).is_err());
    }

    #[test]
    fn test_only_pending_transitions() {
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Completed));
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Failed));
        assert!(!TransactionStatus::Pending.can_transition_to(TransactionStatus::Pending));
        assert!(!TransactionStatus::Completed.can_transition_to(TransactionStatus::Cancelled));
    }
}
