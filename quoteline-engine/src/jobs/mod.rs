//! Background Jobs for the quoteline engine
//!
//! This module contains the periodic tasks that run beside the request path:
//!
//! - `reconcile`: Drains staged pending operations into the durable store
//! - `quote_simulator`: Randomly perturbs quote prices and volumes
//!
//! # Usage
//!
//! Both jobs watch the same shutdown channel and hand back a [`JobHandle`]
//! that is joined to confirm they stopped:
//!
//! ```ignore
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let reconcile = spawn_reconcile(synchronizer, shutdown_rx.clone());
//! let simulator = simulator.start(shutdown_rx);
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! let reconcile_metrics = reconcile.wait().await?;
//! let simulator_metrics = simulator.wait().await?;
//! ```
//!
//! A tick that is running when the signal arrives finishes before the task
//! exits, so `wait` returning means no tick is half-applied.

pub mod quote_simulator;
pub mod reconcile;

pub use quote_simulator::{
    perturb_quote, QuoteSimulator, SimulatorMetrics, SimulatorSnapshot, TickReport,
};
pub use reconcile::{reconcile_task, spawn_reconcile, ReconcileMetrics, ReconcileSnapshot};

use std::future::Future;
use std::sync::Arc;

use quoteline_core::{QuotelineError, QuotelineResult};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A spawned background job and the metrics it updates.
#[derive(Debug)]
pub struct JobHandle<M> {
    name: &'static str,
    metrics: Arc<M>,
    handle: JoinHandle<Arc<M>>,
}

impl<M> JobHandle<M>
where
    M: Send + Sync + 'static,
{
    pub(crate) fn spawn<Fut>(name: &'static str, metrics: Arc<M>, task: Fut) -> Self
    where
        Fut: Future<Output = Arc<M>> + Send + 'static,
    {
        Self {
            name,
            metrics,
            handle: tokio::spawn(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Live metrics, readable while the job runs.
    pub fn metrics(&self) -> &Arc<M> {
        &self.metrics
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to exit and return its final metrics.
    ///
    /// Only returns once a shutdown signal was observed (or the task
    /// panicked); send the signal first.
    pub async fn wait(self) -> QuotelineResult<Arc<M>> {
        self.handle.await.map_err(|e| QuotelineError::Job {
            job: self.name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// A job that owns its own shutdown channel.
#[derive(Debug)]
pub struct StoppableJob<M> {
    shutdown_tx: watch::Sender<bool>,
    job: JobHandle<M>,
}

impl<M> StoppableJob<M>
where
    M: Send + Sync + 'static,
{
    pub(crate) fn new(shutdown_tx: watch::Sender<bool>, job: JobHandle<M>) -> Self {
        Self { shutdown_tx, job }
    }

    pub fn metrics(&self) -> &Arc<M> {
        self.job.metrics()
    }

    pub fn is_finished(&self) -> bool {
        self.job.is_finished()
    }

    /// Signal the job and wait until its in-flight tick, if any, has finished.
    pub async fn stop(self) -> QuotelineResult<Arc<M>> {
        // A send error only means the task already exited.
        let _ = self.shutdown_tx.send(true);
        self.job.wait().await
    }
}

/// Resolve once the shutdown flag is set or the sender is gone.
pub(crate) async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}
