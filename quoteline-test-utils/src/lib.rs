//! Quoteline Test Utilities
//!
//! Shared test infrastructure for the quoteline workspace:
//! - Proptest generators for quotes, transactions, and status updates
//! - Fixtures for common quote books and stores
//! - Assertions for error kinds and jitter bounds

pub use quoteline_core::{
    DurableStoreError, NewTransaction, Quote, QuotelineError, QuotelineResult, StatusUpdate,
    Timestamp, Transaction, TransactionId, TransactionSide, TransactionStatus, ValidationError,
};
pub use quoteline_storage::{InMemoryDurableStore, InMemoryFastStore};

use chrono::{TimeZone, Utc};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for quoteline entity types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a Timestamp between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// Generate an upper-case ticker symbol.
    pub fn arb_symbol() -> impl Strategy<Value = String> {
        "[A-Z]{1,5}".prop_map(|s| s)
    }

    /// Generate a TransactionSide variant.
    pub fn arb_side() -> impl Strategy<Value = TransactionSide> {
        prop_oneof![Just(TransactionSide::Buy), Just(TransactionSide::Sell)]
    }

    /// Generate a status that a pending transaction may move to.
    pub fn arb_terminal_status() -> impl Strategy<Value = TransactionStatus> {
        prop_oneof![
            Just(TransactionStatus::Completed),
            Just(TransactionStatus::Cancelled),
            Just(TransactionStatus::Failed),
        ]
    }

    /// Generate a positive price with cent precision.
    pub fn arb_price() -> impl Strategy<Value = f64> {
        (1i64..1_000_000).prop_map(|cents| cents as f64 / 100.0)
    }

    /// Generate a Quote whose ask is at or above its bid.
    pub fn arb_quote() -> impl Strategy<Value = Quote> {
        (
            arb_symbol(),
            arb_price(),
            0i64..500,
            1i64..1_000_000,
            1i64..1_000_000,
            arb_timestamp(),
        )
            .prop_map(
                |(symbol, bid_price, spread_cents, bid_volume, ask_volume, last_updated)| Quote {
                    symbol,
                    bid_price,
                    bid_volume,
                    ask_price: bid_price + spread_cents as f64 / 100.0,
                    ask_volume,
                    last_updated,
                },
            )
    }

    /// Generate a valid NewTransaction request.
    pub fn arb_new_transaction() -> impl Strategy<Value = NewTransaction> {
        (
            prop::option::of(1i64..1_000_000),
            arb_symbol(),
            arb_side(),
            1i64..10_000,
            prop::option::of("[a-zA-Z0-9 ]{1,40}".prop_map(|s| s)),
        )
            .prop_map(|(id, symbol, side, quantity, note)| NewTransaction {
                id,
                symbol,
                side,
                quantity,
                note,
            })
    }

    /// Generate a pending Transaction with a consistent total.
    pub fn arb_transaction() -> impl Strategy<Value = Transaction> {
        (
            prop::option::of(1i64..1_000_000),
            arb_symbol(),
            arb_side(),
            1i64..10_000,
            arb_price(),
            arb_timestamp(),
            prop::option::of("[a-zA-Z0-9 ]{1,40}".prop_map(|s| s)),
        )
            .prop_map(
                |(id, symbol, side, quantity, price, order_time, note)| Transaction {
                    id,
                    symbol,
                    side,
                    status: TransactionStatus::Pending,
                    quantity,
                    price,
                    total_amount: quantity as f64 * price,
                    order_time,
                    execution_time: None,
                    note,
                    quote: None,
                },
            )
    }

    /// Generate a StatusUpdate payload.
    pub fn arb_status_update() -> impl Strategy<Value = StatusUpdate> {
        (1i64..1_000_000, arb_terminal_status())
            .prop_map(|(id, status)| StatusUpdate { id, status })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built quotes, transactions, and stores for common scenarios.

    use super::*;
    use std::sync::Arc;

    /// Fixed timestamp used by fixture quotes.
    pub fn fixed_time() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// The demo quote book, stamped with [`fixed_time`].
    pub fn demo_quotes() -> Vec<Quote> {
        quoteline_storage::demo_quotes(fixed_time())
    }

    fn demo_quote(symbol: &str) -> Quote {
        demo_quotes()
            .into_iter()
            .find(|q| q.symbol == symbol)
            .unwrap_or_else(|| panic!("{} is not in the demo quote book", symbol))
    }

    /// AAPL with an ask of 101.00.
    pub fn aapl_quote() -> Quote {
        demo_quote("AAPL")
    }

    pub fn googl_quote() -> Quote {
        demo_quote("GOOGL")
    }

    pub fn msft_quote() -> Quote {
        demo_quote("MSFT")
    }

    /// A pending transaction priced at `price` with no id.
    pub fn pending_transaction(
        symbol: &str,
        side: TransactionSide,
        quantity: i64,
        price: f64,
    ) -> Transaction {
        Transaction {
            id: None,
            symbol: symbol.to_string(),
            side,
            status: TransactionStatus::Pending,
            quantity,
            price,
            total_amount: quantity as f64 * price,
            order_time: fixed_time(),
            execution_time: None,
            note: None,
            quote: None,
        }
    }

    /// A durable store seeded with [`demo_quotes`].
    pub fn seeded_durable_store() -> Arc<InMemoryDurableStore> {
        Arc::new(InMemoryDurableStore::with_quotes(demo_quotes()))
    }

    pub fn empty_fast_store() -> Arc<InMemoryFastStore> {
        Arc::new(InMemoryFastStore::new())
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for quoteline-specific validation.

    use super::*;

    /// Assert that a result is a validation error.
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &QuotelineResult<T>) {
        match result {
            Err(QuotelineError::Validation(_)) => {}
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    /// Assert that a result is a durable-store NotFound error.
    pub fn assert_not_found<T: std::fmt::Debug>(result: &QuotelineResult<T>) {
        match result {
            Err(QuotelineError::DurableStore(DurableStoreError::NotFound { .. })) => {}
            other => panic!("Expected NotFound error, got {:?}", other),
        }
    }

    /// Assert that `after` stays within the relative jitter band around `before`.
    ///
    /// `jitter` is the full width of the band, so 0.01 allows ±0.5%.
    pub fn assert_price_within(before: f64, after: f64, jitter: f64) {
        let half = jitter / 2.0;
        let low = before * (1.0 - half);
        let high = before * (1.0 + half);
        let slack = before.abs() * 1e-9;
        assert!(
            after >= low - slack && after <= high + slack,
            "price {} outside [{}, {}]",
            after,
            low,
            high
        );
    }

    /// Assert that a rounded volume stays within the jitter band around `before`.
    pub fn assert_volume_within(before: i64, after: i64, jitter: f64) {
        let half = jitter / 2.0;
        let low = (before as f64 * (1.0 - half)).round() as i64;
        let high = (before as f64 * (1.0 + half)).round() as i64;
        assert!(
            after >= low && after <= high,
            "volume {} outside [{}, {}]",
            after,
            low,
            high
        );
    }
}
