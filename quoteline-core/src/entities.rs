//! Entity structs for quotes and transactions

use serde::{Deserialize, Serialize};

use crate::enums::{TransactionSide, TransactionStatus};
use crate::error::ValidationError;
use crate::{Symbol, Timestamp, TransactionId};

/// Top-of-book quote for one symbol, owned by the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub bid_price: f64,
    pub bid_volume: i64,
    pub ask_price: f64,
    pub ask_volume: i64,
    pub last_updated: Timestamp,
}

impl Quote {
    /// Price a transaction on `side` executes at: ask for Buy, bid for Sell.
    pub fn execution_price(&self, side: TransactionSide) -> f64 {
        match side {
            TransactionSide::Buy => self.ask_price,
            TransactionSide::Sell => self.bid_price,
        }
    }
}

/// A trade against a quote.
///
/// `price` and `total_amount` are fixed once, when the transaction is
/// created from a quote, and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Assigned by the durable store; `None` before persistence.
    pub id: Option<TransactionId>,
    pub symbol: Symbol,
    pub side: TransactionSide,
    pub status: TransactionStatus,
    pub quantity: i64,
    pub price: f64,
    pub total_amount: f64,
    pub order_time: Timestamp,
    pub execution_time: Option<Timestamp>,
    pub note: Option<String>,
    /// Read-only join populated by the durable store on reads.
    #[serde(default)]
    pub quote: Option<Quote>,
}

/// Caller intent to open a transaction; price is not part of the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Optional caller-chosen identifier; the durable store assigns one otherwise.
    pub id: Option<TransactionId>,
    pub symbol: Symbol,
    pub side: TransactionSide,
    pub quantity: i64,
    pub note: Option<String>,
}

/// Payload of a staged status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub id: TransactionId,
    pub status: TransactionStatus,
}

impl NewTransaction {
    pub fn new(symbol: impl Into<Symbol>, side: TransactionSide, quantity: i64) -> Self {
        Self {
            id: None,
            symbol: symbol.into(),
            side,
            quantity,
            note: None,
        }
    }

    pub fn with_id(mut self, id: TransactionId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Check the request before any quote lookup happens.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "symbol".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.quantity <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "quantity".to_string(),
                reason: format!("must be positive, got {}", self.quantity),
            });
        }
        Ok(())
    }
}

impl Transaction {
    /// Build a pending transaction whose price is fixed from `quote`.
    pub fn priced_from(
        request: NewTransaction,
        quote: &Quote,
        order_time: Timestamp,
    ) -> Result<Self, ValidationError> {
        request.validate()?;
        if request.symbol != quote.symbol {
            return Err(ValidationError::InvalidValue {
                field: "symbol".to_string(),
                reason: format!(
                    "quote is for {} but transaction is for {}",
                    quote.symbol, request.symbol
                ),
            });
        }

        let price = quote.execution_price(request.side);
        Ok(Self {
            id: request.id,
            symbol: request.symbol,
            side: request.side,
            status: TransactionStatus::Pending,
            quantity: request.quantity,
            price,
            total_amount: request.quantity as f64 * price,
            order_time,
            execution_time: None,
            note: request.note,
            quote: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn aapl() -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            bid_price: 100.5,
            bid_volume: 1_000,
            ask_price: 101.0,
            ask_volume: 800,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_buy_is_priced_at_ask() {
        let tx = Transaction::priced_from(
            NewTransaction::new("AAPL", TransactionSide::Buy, 10).with_id(7),
            &aapl(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(tx.id, Some(7));
        assert_eq!(tx.price, 101.0);
        assert_eq!(tx.total_amount, 1010.0);
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(tx.execution_time.is_none());
    }

    #[test]
    fn test_sell_is_priced_at_bid() {
        let tx = Transaction::priced_from(
            NewTransaction::new("AAPL", TransactionSide::Sell, 4),
            &aapl(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(tx.price, 100.5);
        assert_eq!(tx.total_amount, 402.0);
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let err = Transaction::priced_from(
            NewTransaction::new("AAPL", TransactionSide::Buy, 0),
            &aapl(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "quantity"));
    }

    #[test]
    fn test_rejects_mismatched_quote() {
        let result = Transaction::priced_from(
            NewTransaction::new("MSFT", TransactionSide::Buy, 1),
            &aapl(),
            Utc::now(),
        );
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Total is always quantity times the price taken from the matching side.
        #[test]
        fn prop_total_is_quantity_times_fixed_price(
            bid in 0.01f64..10_000.0,
            spread in 0.0f64..50.0,
            quantity in 1i64..100_000,
            buy in any::<bool>(),
        ) {
            let quote = Quote {
                symbol: "XYZ".to_string(),
                bid_price: bid,
                bid_volume: 10,
                ask_price: bid + spread,
                ask_volume: 10,
                last_updated: Utc::now(),
            };
            let side = if buy { TransactionSide::Buy } else { TransactionSide::Sell };
            let tx = Transaction::priced_from(
                NewTransaction::new("XYZ", side, quantity),
                &quote,
                Utc::now(),
            ).unwrap();

            let expected = if buy { quote.ask_price } else { quote.bid_price };
            prop_assert_eq!(tx.price, expected);
            prop_assert_eq!(tx.total_amount, quantity as f64 * expected);
        }
    }
}
