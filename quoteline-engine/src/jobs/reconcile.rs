//! Reconciliation Background Task
//!
//! Periodically runs [`WriteBehindSynchronizer::run_cycle`] so staged
//! creates and status updates reach the durable store. Failures never leave
//! this task: they are logged by the synchronizer, counted here, and the
//! affected keys are retried on the next cycle.
//!
//! Ticks are serialized. The cycle runs inside the loop, and a tick that
//! falls due while a cycle is still running is skipped rather than queued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use quoteline_storage::{DurableStore, FastStore};

use super::{shutdown_requested, JobHandle};
use crate::write_behind::{CycleReport, WriteBehindSynchronizer};

// ============================================================================
// METRICS
// ============================================================================

/// Metrics for reconciliation cycles.
#[derive(Debug, Default)]
pub struct ReconcileMetrics {
    /// Total cycles completed
    pub cycles: AtomicU64,

    /// Staged creates inserted into the durable store
    pub creates_applied: AtomicU64,

    /// Staged status updates applied to the durable store
    pub updates_applied: AtomicU64,

    /// Operations the durable store rejected
    pub apply_failures: AtomicU64,

    /// Payloads that failed to decode
    pub decode_failures: AtomicU64,

    /// Pending keys that could not be read
    pub read_failures: AtomicU64,

    /// Sweeps whose key enumeration failed
    pub enumeration_failures: AtomicU64,

    /// Applied operations whose key could not be deleted
    pub delete_failures: AtomicU64,
}

impl ReconcileMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one cycle's outcome into the counters.
    pub fn record(&self, report: &CycleReport) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.creates_applied
            .fetch_add(report.creates.applied, Ordering::Relaxed);
        self.updates_applied
            .fetch_add(report.updates.applied, Ordering::Relaxed);

        for sweep in [&report.creates, &report.updates] {
            self.apply_failures
                .fetch_add(sweep.apply_failures, Ordering::Relaxed);
            self.decode_failures
                .fetch_add(sweep.decode_failures, Ordering::Relaxed);
            self.read_failures
                .fetch_add(sweep.read_failures, Ordering::Relaxed);
            self.delete_failures
                .fetch_add(sweep.delete_failures, Ordering::Relaxed);
            if sweep.enumeration_failed {
                self.enumeration_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> ReconcileSnapshot {
        ReconcileSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            creates_applied: self.creates_applied.load(Ordering::Relaxed),
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            apply_failures: self.apply_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            enumeration_failures: self.enumeration_failures.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of reconciliation metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSnapshot {
    pub cycles: u64,
    pub creates_applied: u64,
    pub updates_applied: u64,
    pub apply_failures: u64,
    pub decode_failures: u64,
    pub read_failures: u64,
    pub enumeration_failures: u64,
    pub delete_failures: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Background task that runs a reconciliation cycle every sync interval.
///
/// Runs until the shutdown signal is received; a cycle in progress always
/// completes first. The first cycle runs one interval after start.
///
/// # Returns
///
/// The metrics handle passed in, after the final cycle.
pub async fn reconcile_task<F, D>(
    sync: Arc<WriteBehindSynchronizer<F, D>>,
    metrics: Arc<ReconcileMetrics>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<ReconcileMetrics>
where
    F: FastStore,
    D: DurableStore,
{
    let period = sync.config().tick_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        tick_interval_ms = period.as_millis() as u64,
        pending_ttl_ms = sync.config().pending_ttl.as_millis() as u64,
        "Reconciliation task started"
    );

    loop {
        tokio::select! {
            biased;

            _ = shutdown_requested(&mut shutdown_rx) => {
                tracing::info!("Reconciliation task shutting down");
                break;
            }

            _ = ticker.tick() => {
                let report = sync.run_cycle().await;
                metrics.record(&report);
                log_cycle(&report);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        cycles = snapshot.cycles,
        creates_applied = snapshot.creates_applied,
        updates_applied = snapshot.updates_applied,
        apply_failures = snapshot.apply_failures,
        enumeration_failures = snapshot.enumeration_failures,
        "Reconciliation task completed"
    );

    metrics
}

/// Spawn [`reconcile_task`] on the current runtime.
pub fn spawn_reconcile<F, D>(
    sync: Arc<WriteBehindSynchronizer<F, D>>,
    shutdown_rx: watch::Receiver<bool>,
) -> JobHandle<ReconcileMetrics>
where
    F: FastStore + 'static,
    D: DurableStore + 'static,
{
    let metrics = Arc::new(ReconcileMetrics::new());
    let task = reconcile_task(sync, Arc::clone(&metrics), shutdown_rx);
    JobHandle::spawn("reconcile", metrics, task)
}

fn log_cycle(report: &CycleReport) {
    if report.scanned() == 0 && report.failures() == 0 {
        tracing::trace!("Reconciliation cycle completed with no pending operations");
        return;
    }

    tracing::info!(
        creates_applied = report.creates.applied,
        updates_applied = report.updates.applied,
        failures = report.failures(),
        "Reconciliation cycle completed"
    );
}

// ============================================================================
// TESTS
// ============================================================================
