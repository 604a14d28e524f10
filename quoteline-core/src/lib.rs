//! Quoteline Core - Entity Types
//!
//! Pure data structures shared by the storage and engine crates.
//! This crate contains ONLY data types and their invariants - no I/O.

use chrono::{DateTime, Utc};

pub mod entities;
pub mod enums;
pub mod error;

pub use entities::{NewTransaction, Quote, StatusUpdate, Transaction};
pub use enums::{EntityType, TransactionSide, TransactionStatus};
pub use error::{
    ConfigError, DurableStoreError, EncodingError, FastStoreError, QuotelineError,
    QuotelineResult, ValidationError,
};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Transaction identifier assigned by the durable store.
pub type TransactionId = i64;

/// Ticker symbol, unique per quote.
pub type Symbol = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
