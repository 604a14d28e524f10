//! Quoteline Storage - Store Contracts and Caching
//!
//! Defines the two collaborators the engine is written against:
//!
//! - [`FastStore`]: a TTL key-value store with prefix enumeration, used for
//!   staging pending mutations and holding the aggregate read cache.
//! - [`DurableStore`]: the authoritative record of quotes and transactions.
//!
//! In-memory implementations of both live in [`memory`]; a Redis-backed
//! fast store is available behind the `redis` feature.

pub mod cache;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_backend;
pub mod traits;

pub use cache::{
    pending_key, AggregateCacheConfig, AggregateCacheStats, AggregateReadCache, PendingKind,
    PendingOperation, ALL_TRANSACTIONS_KEY, PENDING_CREATE_PREFIX, PENDING_UPDATE_PREFIX,
};
pub use memory::{demo_quotes, DurableOp, InMemoryDurableStore, InMemoryFastStore, DEMO_QUOTE_BOOK};
#[cfg(feature = "redis")]
pub use redis_backend::RedisFastStore;
pub use traits::{DurableStore, FastStore};
