//! Cache-aside read of the full transaction list.
//!
//! The whole list lives under one fast-store key. A read that finds it
//! returns it as-is; a read that misses fetches from the durable store and
//! writes the result back with a TTL. Every mutation deletes the key so the
//! next read is forced back to the durable store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quoteline_core::{EncodingError, FastStoreError, QuotelineResult, Transaction};

use super::keys::ALL_TRANSACTIONS_KEY;
use crate::traits::{DurableStore, FastStore};

/// Default lifetime of the aggregate entry.
pub const DEFAULT_AGGREGATE_TTL_SECS: u64 = 30;

/// Configuration for the aggregate read cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateCacheConfig {
    /// TTL of the cached transaction list.
    pub ttl: Duration,
}

impl Default for AggregateCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_AGGREGATE_TTL_SECS),
        }
    }
}

impl AggregateCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Hit/miss counters for the aggregate entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses whose write-back to the fast store failed.
    pub write_back_failures: u64,
    /// Refreshes not kept because an invalidation overlapped the fetch.
    pub stale_refreshes: u64,
    pub invalidations: u64,
}

impl AggregateCacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    write_back_failures: AtomicU64,
    stale_refreshes: AtomicU64,
    invalidations: AtomicU64,
}

/// Cache-aside view of `DurableStore::get_all_transactions`.
pub struct AggregateReadCache<F, D>
where
    F: FastStore,
    D: DurableStore,
{
    fast: Arc<F>,
    durable: Arc<D>,
    config: AggregateCacheConfig,
    counters: Counters,
    /// Bumped by every invalidation.
    generation: AtomicU64,
}

impl<F, D> AggregateReadCache<F, D>
where
    F: FastStore,
    D: DurableStore,
{
    pub fn new(fast: Arc<F>, durable: Arc<D>, config: AggregateCacheConfig) -> Self {
        Self {
            fast,
            durable,
            config,
            counters: Counters::default(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(fast: Arc<F>, durable: Arc<D>) -> Self {
        Self::new(fast, durable, AggregateCacheConfig::default())
    }

    pub fn config(&self) -> &AggregateCacheConfig {
        &self.config
    }

    /// Return every transaction, from the cached entry when present.
    ///
    /// A cached entry that cannot be read or decoded is treated as a miss.
    /// Only durable-store and encoding failures on the refresh path reach
    /// the caller; a failed write-back is logged and counted.
    ///
    /// A refresh that overlaps an [`invalidate`](Self::invalidate) still
    /// returns what it fetched but does not leave it cached, since the list
    /// may predate the mutation that caused the invalidation.
    pub async fn get_all(&self) -> QuotelineResult<Vec<Transaction>> {
        match self.fast.get(ALL_TRANSACTIONS_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<Transaction>>(&bytes) {
                Ok(transactions) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(transactions);
                }
                Err(e) => {
                    tracing::warn!(error = %e, key = ALL_TRANSACTIONS_KEY, "Discarding undecodable aggregate entry");
                    if let Err(e) = self.fast.delete(ALL_TRANSACTIONS_KEY).await {
                        tracing::warn!(error = %e, "Failed to delete undecodable aggregate entry");
                    }
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Aggregate cache read failed, falling back to durable store");
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let generation = self.generation.load(Ordering::SeqCst);
        let transactions = self.durable.get_all_transactions().await?;
        let bytes = serde_json::to_vec(&transactions)
            .map_err(|e| EncodingError::serialize("transaction list", e))?;

        if self.generation.load(Ordering::SeqCst) != generation {
            self.discard_stale_refresh(false).await;
            return Ok(transactions);
        }

        if let Err(e) = self.fast.set(ALL_TRANSACTIONS_KEY, bytes, self.config.ttl).await {
            self.counters
                .write_back_failures
                .fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "Failed to cache transaction list");
            return Ok(transactions);
        }

        // An invalidation between the check above and the write.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.discard_stale_refresh(true).await;
            return Ok(transactions);
        }

        tracing::debug!(count = transactions.len(), "Refreshed aggregate transaction cache");
        Ok(transactions)
    }

    async fn discard_stale_refresh(&self, written: bool) {
        self.counters.stale_refreshes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Aggregate cache invalidated during refresh, not caching");
        if written {
            if let Err(e) = self.fast.delete(ALL_TRANSACTIONS_KEY).await {
                tracing::warn!(error = %e, "Failed to drop stale aggregate entry");
            }
        }
    }

    /// Evict the cached list regardless of its remaining TTL.
    pub async fn invalidate(&self) -> Result<(), FastStoreError> {
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.fast.delete(ALL_TRANSACTIONS_KEY).await
    }

    pub fn stats(&self) -> AggregateCacheStats {
        AggregateCacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            write_back_failures: self.counters.write_back_failures.load(Ordering::Relaxed),
            stale_refreshes: self.counters.stale_refreshes.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }
}
