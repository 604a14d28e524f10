//! Engine
//!
//! Wires the aggregate cache, the synchronizer, the trading service, and
//! both background jobs over one fast store and one durable store. All jobs
//! share a single shutdown channel, and [`Engine::shutdown`] waits for each
//! of them to exit.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use quoteline_core::QuotelineResult;
use quoteline_storage::{AggregateReadCache, DurableStore, FastStore};

use crate::config::EngineConfig;
use crate::jobs::{
    spawn_reconcile, JobHandle, QuoteSimulator, ReconcileMetrics, ReconcileSnapshot,
    SimulatorMetrics, SimulatorSnapshot,
};
use crate::services::TradingService;
use crate::write_behind::WriteBehindSynchronizer;

/// Final metrics of every job, returned by [`Engine::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    pub reconcile: ReconcileSnapshot,
    /// `None` when the simulator was disabled.
    pub simulator: Option<SimulatorSnapshot>,
}

/// A running write-behind engine.
pub struct Engine<F, D>
where
    F: FastStore + 'static,
    D: DurableStore + 'static,
{
    service: TradingService<F, D>,
    sync: Arc<WriteBehindSynchronizer<F, D>>,
    cache: Arc<AggregateReadCache<F, D>>,
    shutdown_tx: watch::Sender<bool>,
    reconcile: JobHandle<ReconcileMetrics>,
    simulator: Option<JobHandle<SimulatorMetrics>>,
}

impl<F, D> Engine<F, D>
where
    F: FastStore + 'static,
    D: DurableStore + 'static,
{
    /// Validate `config` and spawn the background jobs on the current runtime.
    ///
    /// # Errors
    /// Returns a config error, without spawning anything, when validation
    /// fails. In particular a pending TTL that does not exceed the sync
    /// interval is refused.
    pub fn start(fast: Arc<F>, durable: Arc<D>, config: EngineConfig) -> QuotelineResult<Self> {
        config.validate()?;

        let cache = Arc::new(AggregateReadCache::new(
            Arc::clone(&fast),
            Arc::clone(&durable),
            config.cache.clone(),
        ));
        let sync = Arc::new(WriteBehindSynchronizer::new(
            Arc::clone(&fast),
            Arc::clone(&durable),
            Arc::clone(&cache),
            config.sync.clone(),
        )?);
        let service = TradingService::new(Arc::clone(&durable), Arc::clone(&sync), Arc::clone(&cache));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reconcile = spawn_reconcile(Arc::clone(&sync), shutdown_rx.clone());
        let simulator = if config.simulator.enabled {
            let simulator = Arc::new(QuoteSimulator::new(durable, config.simulator.clone())?);
            Some(simulator.start(shutdown_rx))
        } else {
            tracing::info!("Quote simulator disabled");
            None
        };

        tracing::info!(
            sync_interval_ms = config.sync.tick_interval.as_millis() as u64,
            pending_ttl_ms = config.sync.pending_ttl.as_millis() as u64,
            cache_ttl_ms = config.cache.ttl.as_millis() as u64,
            simulator = config.simulator.enabled,
            "Engine started"
        );

        Ok(Self {
            service,
            sync,
            cache,
            shutdown_tx,
            reconcile,
            simulator,
        })
    }

    /// The boundary surface for request handlers. Cheap to clone.
    pub fn service(&self) -> &TradingService<F, D> {
        &self.service
    }

    pub fn synchronizer(&self) -> &Arc<WriteBehindSynchronizer<F, D>> {
        &self.sync
    }

    pub fn cache(&self) -> &Arc<AggregateReadCache<F, D>> {
        &self.cache
    }

    pub fn reconcile_metrics(&self) -> ReconcileSnapshot {
        self.reconcile.metrics().snapshot()
    }

    pub fn simulator_metrics(&self) -> Option<SimulatorSnapshot> {
        self.simulator.as_ref().map(|job| job.metrics().snapshot())
    }

    /// Signal every job and wait until each has finished its in-flight tick
    /// and exited.
    ///
    /// Pending operations still staged stay in the fast store until their
    /// TTL; a later engine over the same store picks them up.
    pub async fn shutdown(self) -> QuotelineResult<ShutdownReport> {
        tracing::info!("Engine shutting down");
        // A send error only means every job already exited.
        let _ = self.shutdown_tx.send(true);

        let reconcile = self.reconcile.wait().await?.snapshot();
        let simulator = match self.simulator {
            Some(job) => Some(job.wait().await?.snapshot()),
            None => None,
        };

        tracing::info!("Engine stopped");
        Ok(ShutdownReport {
            reconcile,
            simulator,
        })
    }
}
