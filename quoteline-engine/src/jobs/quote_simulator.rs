//! Quote Simulator
//!
//! On every tick, reads all quotes from the durable store, applies a bounded
//! random walk to bid/ask prices and volumes, and writes each quote back.
//!
//! With a jitter factor `j`, a value `x` becomes `x * (1 + u * j)` where `u`
//! is drawn uniformly from `[-0.5, 0.5)`. Volumes are rounded to whole
//! units. A failed fetch abandons the tick; a failed write for one symbol
//! does not stop the rest.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use quoteline_core::{ConfigError, Quote, Timestamp};
use quoteline_storage::DurableStore;

use super::{shutdown_requested, JobHandle, StoppableJob};
use crate::config::SimulatorConfig;

// ============================================================================
// METRICS
// ============================================================================

/// Metrics for simulator ticks.
#[derive(Debug, Default)]
pub struct SimulatorMetrics {
    /// Total ticks run, including abandoned ones
    pub ticks: AtomicU64,

    /// Quotes written back successfully
    pub quotes_updated: AtomicU64,

    /// Per-symbol writes that failed
    pub update_failures: AtomicU64,

    /// Ticks abandoned because quotes could not be fetched
    pub fetch_failures: AtomicU64,
}

impl SimulatorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, report: &TickReport) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.quotes_updated
            .fetch_add(report.updated, Ordering::Relaxed);
        self.update_failures
            .fetch_add(report.failed, Ordering::Relaxed);
        if report.fetch_failed {
            self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> SimulatorSnapshot {
        SimulatorSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            quotes_updated: self.quotes_updated.load(Ordering::Relaxed),
            update_failures: self.update_failures.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of simulator metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulatorSnapshot {
    pub ticks: u64,
    pub quotes_updated: u64,
    pub update_failures: u64,
    pub fetch_failures: u64,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub fetched: u64,
    pub updated: u64,
    pub failed: u64,
    pub fetch_failed: bool,
}

// ============================================================================
// PERTURBATION
// ============================================================================

fn jitter<R: Rng + ?Sized>(rng: &mut R, factor: f64) -> f64 {
    1.0 + rng.random_range(-0.5..0.5) * factor
}

/// Return `quote` with jittered prices and volumes, stamped at `now`.
pub fn perturb_quote<R: Rng + ?Sized>(
    quote: &Quote,
    rng: &mut R,
    price_jitter: f64,
    volume_jitter: f64,
    now: Timestamp,
) -> Quote {
    Quote {
        symbol: quote.symbol.clone(),
        bid_price: quote.bid_price * jitter(rng, price_jitter),
        bid_volume: (quote.bid_volume as f64 * jitter(rng, volume_jitter)).round() as i64,
        ask_price: quote.ask_price * jitter(rng, price_jitter),
        ask_volume: (quote.ask_volume as f64 * jitter(rng, volume_jitter)).round() as i64,
        last_updated: now,
    }
}

// ============================================================================
// SIMULATOR
// ============================================================================

/// Periodically perturbs every quote in the durable store.
pub struct QuoteSimulator<D>
where
    D: DurableStore,
{
    durable: Arc<D>,
    config: SimulatorConfig,
}

impl<D> QuoteSimulator<D>
where
    D: DurableStore,
{
    /// # Errors
    /// Refuses a zero tick interval and jitter factors outside `[0, 1)`.
    pub fn new(durable: Arc<D>, config: SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { durable, config })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Run one tick: fetch, perturb, and write back every quote.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let quotes = match self.durable.get_all_quotes().await {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch quotes, skipping tick");
                report.fetch_failed = true;
                return report;
            }
        };
        report.fetched = quotes.len() as u64;

        let now = Utc::now();
        // ThreadRng is not Send; keep it out of scope across the awaits below.
        let updated: Vec<Quote> = {
            let mut rng = rand::rng();
            quotes
                .iter()
                .map(|quote| {
                    perturb_quote(
                        quote,
                        &mut rng,
                        self.config.price_jitter,
                        self.config.volume_jitter,
                        now,
                    )
                })
                .collect()
        };

        for quote in &updated {
            match self.durable.update_quote(quote).await {
                Ok(()) => report.updated += 1,
                Err(e) => {
                    tracing::warn!(error = %e, symbol = %quote.symbol, "Failed to update quote");
                    report.failed += 1;
                }
            }
        }

        tracing::trace!(updated = report.updated, failed = report.failed, "Quote simulator tick");
        report
    }
}

impl<D> QuoteSimulator<D>
where
    D: DurableStore + 'static,
{
    /// Spawn the tick loop, stopping when `shutdown_rx` flips to true.
    ///
    /// The first tick runs one interval after start.
    pub fn start(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) -> JobHandle<SimulatorMetrics> {
        let metrics = Arc::new(SimulatorMetrics::new());
        let task_metrics = Arc::clone(&metrics);

        let task = async move {
            let period = self.config.tick_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(
                tick_interval_ms = period.as_millis() as u64,
                price_jitter = self.config.price_jitter,
                volume_jitter = self.config.volume_jitter,
                "Quote simulator started"
            );

            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_requested(&mut shutdown_rx) => {
                        tracing::info!("Quote simulator shutting down");
                        break;
                    }

                    _ = ticker.tick() => {
                        let report = self.tick().await;
                        task_metrics.record(&report);
                    }
                }
            }

            let snapshot = task_metrics.snapshot();
            tracing::info!(
                ticks = snapshot.ticks,
                quotes_updated = snapshot.quotes_updated,
                update_failures = snapshot.update_failures,
                fetch_failures = snapshot.fetch_failures,
                "Quote simulator stopped"
            );
            task_metrics
        };

        JobHandle::spawn("quote_simulator", metrics, task)
    }

    /// Spawn the tick loop with its own stop signal.
    pub fn launch(self: Arc<Self>) -> StoppableJob<SimulatorMetrics> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        StoppableJob::new(shutdown_tx, self.start(shutdown_rx))
    }
}

// ============================================================================
// TESTS
// ============================================================================
