//! Quoteline Engine - Write-Behind Synchronization
//!
//! Accepts transaction writes against a fast TTL store, reconciles them into
//! the durable store in the background, and serves the full transaction
//! list from a cache-aside aggregate entry. A quote simulator runs beside it
//! and keeps quote prices moving.
//!
//! - [`write_behind`]: staging and reconciliation of pending operations
//! - [`jobs`]: the reconciliation and quote simulator background tasks
//! - [`services`]: the trading service used by request handlers
//! - [`engine`]: wiring and shutdown of everything above
//! - [`config`] / [`constants`]: timings and their defaults
//! - [`telemetry`]: tracing subscriber setup

pub mod config;
pub mod constants;
pub mod engine;
pub mod jobs;
pub mod services;
pub mod telemetry;
pub mod write_behind;

pub use config::{EngineConfig, SimulatorConfig, SyncConfig};
pub use engine::{Engine, ShutdownReport};
pub use jobs::{
    perturb_quote, reconcile_task, spawn_reconcile, JobHandle, QuoteSimulator, ReconcileMetrics,
    ReconcileSnapshot, SimulatorMetrics, SimulatorSnapshot, StoppableJob, TickReport,
};
pub use services::TradingService;
pub use telemetry::{init_tracing, LogFormat};
pub use write_behind::{CycleReport, SweepReport, WriteBehindSynchronizer};

// Re-export the types callers need alongside the engine.
pub use quoteline_core::{
    NewTransaction, Quote, QuotelineError, QuotelineResult, Transaction, TransactionSide,
    TransactionStatus,
};
pub use quoteline_storage::{AggregateCacheConfig, DurableStore, FastStore};
