//! Staging and aggregate caching on top of a [`FastStore`](crate::FastStore).
//!
//! # Key Layout
//!
//! | Key | Holds | Lifetime |
//! |---|---|---|
//! | `pending_create_tx:<id>_<suffix>` | encoded [`PendingOperation::Create`] | until synced or TTL |
//! | `pending_update_tx:<id>_<suffix>` | encoded [`PendingOperation::Update`] | until synced or TTL |
//! | `all_transactions` | JSON array of every transaction | until a mutation or TTL |
//!
//! The suffix is a UUIDv7, so two stages for the same id never collide
//! regardless of clock resolution.

pub mod aggregate;
pub mod keys;
pub mod pending;

pub use aggregate::{AggregateCacheConfig, AggregateCacheStats, AggregateReadCache};
pub use keys::{
    pending_key, PendingKind, ALL_TRANSACTIONS_KEY, PENDING_CREATE_PREFIX, PENDING_UPDATE_PREFIX,
};
pub use pending::PendingOperation;
