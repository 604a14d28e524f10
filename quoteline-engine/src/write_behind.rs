//! Write-Behind Synchronizer
//!
//! Mutations are staged in the fast store under time-unique pending keys and
//! return immediately. A periodic cycle later drains those keys into the
//! durable store:
//!
//! - create sweep: every `pending_create_tx:*` key is decoded and inserted
//! - update sweep: every `pending_update_tx:*` key is decoded and applied
//!
//! A key is deleted only after its operation was applied. Keys that fail to
//! read, decode, or apply stay in place for the next cycle until their TTL
//! runs out. Nothing here is surfaced to the request path; outcomes are
//! returned as [`CycleReport`]s for the reconciliation job to log and count.

use std::sync::Arc;

use serde::Serialize;

use quoteline_core::{
    ConfigError, QuotelineResult, StatusUpdate, Transaction, TransactionId, TransactionStatus,
};
use quoteline_storage::{
    pending_key, AggregateReadCache, DurableStore, FastStore, PendingKind, PendingOperation,
};

use crate::config::SyncConfig;

// ============================================================================
// REPORTS
// ============================================================================

/// Outcome of one sweep over the keys of one [`PendingKind`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Keys returned by enumeration.
    pub scanned: u64,
    /// Operations applied to the durable store.
    pub applied: u64,
    /// Operations the durable store rejected; keys left for retry.
    pub apply_failures: u64,
    /// Payloads that did not decode to the expected kind; keys left in place.
    pub decode_failures: u64,
    /// Reads that failed; keys left in place.
    pub read_failures: u64,
    /// Keys that expired between enumeration and read.
    pub vanished: u64,
    /// Applied operations whose key could not be deleted.
    pub delete_failures: u64,
    /// Enumeration itself failed, so nothing was scanned.
    pub enumeration_failed: bool,
}

impl SweepReport {
    /// Total failures of any kind, counting a failed enumeration as one.
    pub fn failures(&self) -> u64 {
        self.apply_failures
            + self.decode_failures
            + self.read_failures
            + self.delete_failures
            + u64::from(self.enumeration_failed)
    }
}

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub creates: SweepReport,
    pub updates: SweepReport,
}

impl CycleReport {
    pub fn applied(&self) -> u64 {
        self.creates.applied + self.updates.applied
    }

    pub fn scanned(&self) -> u64 {
        self.creates.scanned + self.updates.scanned
    }

    pub fn failures(&self) -> u64 {
        self.creates.failures() + self.updates.failures()
    }
}

enum KeyOutcome {
    Applied { deleted: bool },
    ApplyFailed,
    DecodeFailed,
    ReadFailed,
    Vanished,
}

// ============================================================================
// SYNCHRONIZER
// ============================================================================

/// Stages mutations in the fast store and reconciles them into the durable store.
pub struct WriteBehindSynchronizer<F, D>
where
    F: FastStore,
    D: DurableStore,
{
    fast: Arc<F>,
    durable: Arc<D>,
    cache: Arc<AggregateReadCache<F, D>>,
    config: SyncConfig,
}

impl<F, D> WriteBehindSynchronizer<F, D>
where
    F: FastStore,
    D: DurableStore,
{
    /// Build a synchronizer over `config`.
    ///
    /// # Errors
    /// Refuses a zero interval or TTL, and a pending TTL that does not
    /// exceed the tick interval, since staged keys would then expire
    /// before a cycle can apply them.
    pub fn new(
        fast: Arc<F>,
        durable: Arc<D>,
        cache: Arc<AggregateReadCache<F, D>>,
        config: SyncConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            fast,
            durable,
            cache,
            config,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Stage a transaction insert and evict the aggregate cache entry.
    ///
    /// Returns the pending key. On error nothing was staged.
    pub async fn stage_create(&self, tx: &Transaction) -> QuotelineResult<String> {
        let key = pending_key(PendingKind::Create, tx.id);
        self.stage(&key, PendingOperation::Create(tx.clone())).await?;
        Ok(key)
    }

    /// Stage a status change and evict the aggregate cache entry.
    pub async fn stage_update(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> QuotelineResult<String> {
        let key = pending_key(PendingKind::Update, Some(id));
        self.stage(&key, PendingOperation::Update(StatusUpdate { id, status }))
            .await?;
        Ok(key)
    }

    async fn stage(&self, key: &str, op: PendingOperation) -> QuotelineResult<()> {
        let bytes = op.encode()?;
        self.fast.set(key, bytes, self.config.pending_ttl).await?;

        // A stale aggregate entry still expires on its own TTL.
        if let Err(e) = self.cache.invalidate().await {
            tracing::warn!(error = %e, key = %key, "Failed to invalidate aggregate cache after staging");
        }

        tracing::debug!(
            key = %key,
            kind = %op.kind(),
            transaction_id = ?op.transaction_id(),
            "Staged pending operation"
        );
        Ok(())
    }

    /// Live pending keys of one kind, sorted.
    pub async fn pending_keys(&self, kind: PendingKind) -> QuotelineResult<Vec<String>> {
        let mut keys = self.fast.keys(kind.prefix()).await?;
        keys.sort();
        Ok(keys)
    }

    /// Number of live pending keys of both kinds.
    pub async fn pending_count(&self) -> QuotelineResult<usize> {
        let mut count = 0;
        for kind in PendingKind::ALL {
            count += self.fast.keys(kind.prefix()).await?.len();
        }
        Ok(count)
    }

    /// Drain staged creates into the durable store.
    pub async fn sync_creates(&self) -> SweepReport {
        self.sweep(PendingKind::Create).await
    }

    /// Drain staged status updates into the durable store.
    pub async fn sync_updates(&self) -> SweepReport {
        self.sweep(PendingKind::Update).await
    }

    /// Run both sweeps once.
    ///
    /// The sweeps are independent: an update whose create has not landed yet
    /// fails here and is retried on a later cycle. When anything was applied
    /// the aggregate entry is evicted so reads pick up the new rows.
    pub async fn run_cycle(&self) -> CycleReport {
        let report = CycleReport {
            creates: self.sync_creates().await,
            updates: self.sync_updates().await,
        };

        if report.applied() > 0 {
            if let Err(e) = self.cache.invalidate().await {
                tracing::warn!(error = %e, "Failed to invalidate aggregate cache after sync");
            }
        }

        report
    }

    async fn sweep(&self, kind: PendingKind) -> SweepReport {
        let mut report = SweepReport::default();

        let keys = match self.pending_keys(kind).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(error = %e, kind = %kind, "Failed to enumerate pending keys");
                report.enumeration_failed = true;
                return report;
            }
        };

        for key in keys {
            report.scanned += 1;
            match self.process_key(kind, &key).await {
                KeyOutcome::Applied { deleted } => {
                    report.applied += 1;
                    if !deleted {
                        report.delete_failures += 1;
                    }
                }
                KeyOutcome::ApplyFailed => report.apply_failures += 1,
                KeyOutcome::DecodeFailed => report.decode_failures += 1,
                KeyOutcome::ReadFailed => report.read_failures += 1,
                KeyOutcome::Vanished => report.vanished += 1,
            }
        }

        report
    }

    async fn process_key(&self, kind: PendingKind, key: &str) -> KeyOutcome {
        let bytes = match self.fast.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(key = %key, "Pending key expired before it was read");
                return KeyOutcome::Vanished;
            }
            Err(e) => {
                if self.config.log_failures {
                    tracing::warn!(error = %e, key = %key, "Failed to read pending key");
                }
                return KeyOutcome::ReadFailed;
            }
        };

        let op = match PendingOperation::decode_for(key, kind, &bytes) {
            Ok(op) => op,
            Err(e) => {
                if self.config.log_failures {
                    tracing::warn!(error = %e, key = %key, "Failed to decode pending key");
                }
                return KeyOutcome::DecodeFailed;
            }
        };

        if let Err(e) = self.apply(&op).await {
            if self.config.log_failures {
                tracing::warn!(
                    error = %e,
                    key = %key,
                    transaction_id = ?op.transaction_id(),
                    "Failed to apply pending operation, will retry"
                );
            }
            return KeyOutcome::ApplyFailed;
        }

        // A failed delete means the operation may be applied again next cycle.
        let deleted = match self.fast.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Applied pending operation but failed to delete its key");
                false
            }
        };
        KeyOutcome::Applied { deleted }
    }

    async fn apply(&self, op: &PendingOperation) -> QuotelineResult<()> {
        match op {
            PendingOperation::Create(tx) => {
                let id = self.durable.create_transaction(tx).await?;
                tracing::debug!(transaction_id = id, symbol = %tx.symbol, "Synced transaction create");
            }
            PendingOperation::Update(update) => {
                self.durable
                    .update_transaction_status(update.id, update.status)
                    .await?;
                tracing::debug!(
                    transaction_id = update.id,
                    status = %update.status,
                    "Synced transaction status"
                );
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
