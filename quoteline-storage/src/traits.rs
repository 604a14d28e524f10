//! Collaborator contracts consumed by the cache and the engine.
//!
//! Both traits are object-safe and `Send + Sync` so implementations can be
//! shared across the request path and the background jobs behind an `Arc`.

use std::time::Duration;

use async_trait::async_trait;
use quoteline_core::{
    DurableStoreError, FastStoreError, Quote, Transaction, TransactionId, TransactionStatus,
};

/// Key-value store with per-key expiration and prefix enumeration.
///
/// Every operation is atomic on a single key. No client-side locking is
/// layered on top, so concurrent callers see whatever interleaving the
/// backend provides.
#[async_trait]
pub trait FastStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), FastStoreError>;

    /// Read a value. Expired and absent keys both return `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, FastStoreError>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), FastStoreError>;

    /// List all live keys starting with `prefix`, in no particular order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, FastStoreError>;
}

/// Authoritative store for quotes and transactions.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Fetch every quote.
    async fn get_all_quotes(&self) -> Result<Vec<Quote>, DurableStoreError>;

    /// Fetch one quote. Missing symbols return `DurableStoreError::NotFound`.
    async fn get_quote_by_symbol(&self, symbol: &str) -> Result<Quote, DurableStoreError>;

    /// Overwrite prices, volumes and update time of the quote with the same symbol.
    async fn update_quote(&self, quote: &Quote) -> Result<(), DurableStoreError>;

    /// Fetch every transaction with its quote joined by symbol.
    async fn get_all_transactions(&self) -> Result<Vec<Transaction>, DurableStoreError>;

    /// Insert a transaction, returning its identifier.
    ///
    /// A transaction that already carries an id keeps it; otherwise the
    /// store assigns one.
    async fn create_transaction(&self, tx: &Transaction) -> Result<TransactionId, DurableStoreError>;

    /// Set the status of an existing transaction.
    async fn update_transaction_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), DurableStoreError>;
}
