//! Quoteline Entry Point
//!
//! Loads configuration, picks a fast store (Redis when `QUOTELINE_REDIS_URL`
//! is set, in-memory otherwise), seeds an in-memory durable store with a
//! demo quote book, and runs the engine until Ctrl-C.

use std::sync::Arc;

use chrono::Utc;
use quoteline_core::{NewTransaction, QuotelineResult, TransactionSide};
use quoteline_engine::{init_tracing, Engine, EngineConfig, LogFormat};
use quoteline_storage::{demo_quotes, FastStore, InMemoryDurableStore, InMemoryFastStore};

#[tokio::main]
async fn main() -> QuotelineResult<()> {
    init_tracing(LogFormat::from_env())?;

    let config = EngineConfig::from_env();
    let durable = Arc::new(InMemoryDurableStore::with_quotes(demo_quotes(Utc::now())));

    match config.redis_url.clone() {
        #[cfg(feature = "redis")]
        Some(url) => {
            tracing::info!("Using Redis fast store");
            let fast = Arc::new(quoteline_storage::RedisFastStore::connect(&url).await?);
            run(fast, durable, config).await
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => {
            tracing::warn!("QUOTELINE_REDIS_URL is set but the redis feature is disabled; using in-memory fast store");
            run(Arc::new(InMemoryFastStore::new()), durable, config).await
        }
        None => {
            tracing::info!("Using in-memory fast store");
            run(Arc::new(InMemoryFastStore::new()), durable, config).await
        }
    }
}

async fn run<F>(fast: Arc<F>, durable: Arc<InMemoryDurableStore>, config: EngineConfig) -> QuotelineResult<()>
where
    F: FastStore + 'static,
{
    let engine = Engine::start(fast, durable, config)?;

    let tx = engine
        .service()
        .create_transaction(
            NewTransaction::new("AAPL", TransactionSide::Buy, 10).with_note("startup demo order"),
        )
        .await?;
    tracing::info!(symbol = %tx.symbol, price = tx.price, total = tx.total_amount, "Demo order staged");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");

    let report = engine.shutdown().await?;
    tracing::info!(
        cycles = report.reconcile.cycles,
        creates_applied = report.reconcile.creates_applied,
        updates_applied = report.reconcile.updates_applied,
        simulator_ticks = ?report.simulator.as_ref().map(|s| s.ticks),
        "Final metrics"
    );
    Ok(())
}
