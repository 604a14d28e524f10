//! Engine start-up validation, shutdown, and the quote simulator's stop contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;
use tokio::time::Instant;

use quoteline_core::{
    ConfigError, DurableStoreError, Quote, QuotelineError, Transaction, TransactionId,
    TransactionStatus,
};
use quoteline_engine::{
    Engine, EngineConfig, QuoteSimulator, SimulatorConfig, SyncConfig,
    TradingService, WriteBehindSynchronizer,
};
use quoteline_storage::{
    AggregateReadCache, DurableOp, DurableStore, InMemoryDurableStore, InMemoryFastStore,
};
use quoteline_test_utils::fixtures::demo_quotes;
use quoteline_test_utils::generators::{arb_new_transaction, arb_quote};

/// Durable store whose quote writes take a fixed amount of time.
struct SlowQuoteWrites {
    inner: InMemoryDurableStore,
    delay: Duration,
}

#[async_trait]
impl DurableStore for SlowQuoteWrites {
    async fn get_all_quotes(&self) -> Result<Vec<Quote>, DurableStoreError> {
        self.inner.get_all_quotes().await
    }

    async fn get_quote_by_symbol(&self, symbol: &str) -> Result<Quote, DurableStoreError> {
        self.inner.get_quote_by_symbol(symbol).await
    }

    async fn update_quote(&self, quote: &Quote) -> Result<(), DurableStoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.update_quote(quote).await
    }

    async fn get_all_transactions(&self) -> Result<Vec<Transaction>, DurableStoreError> {
        self.inner.get_all_transactions().await
    }

    async fn create_transaction(&self, tx: &Transaction) -> Result<TransactionId, DurableStoreError> {
        self.inner.create_transaction(tx).await
    }

    async fn update_transaction_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), DurableStoreError> {
        self.inner.update_transaction_status(id, status).await
    }
}

#[tokio::test]
async fn engine_refuses_ttl_not_above_interval() {
    let config = EngineConfig::default().with_sync(
        SyncConfig::default()
            .with_tick_interval(Duration::from_secs(30))
            .with_pending_ttl(Duration::from_secs(15)),
    );

    let result = Engine::start(
        Arc::new(InMemoryFastStore::new()),
        Arc::new(InMemoryDurableStore::new()),
        config,
    );

    match result {
        Err(QuotelineError::Config(ConfigError::TtlNotAboveInterval { ttl, interval })) => {
            assert_eq!(ttl, Duration::from_secs(15));
            assert_eq!(interval, Duration::from_secs(30));
        }
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("engine started with an invalid config"),
    }
}

#[tokio::test(start_paused = true)]
async fn simulator_stop_waits_for_in_flight_tick() {
    let durable = Arc::new(SlowQuoteWrites {
        inner: InMemoryDurableStore::with_quotes(demo_quotes()),
        delay: Duration::from_millis(500),
    });
    let simulator = Arc::new(
        QuoteSimulator::new(
            durable.clone(),
            SimulatorConfig::default().with_tick_interval(Duration::from_secs(1)),
        )
        .unwrap(),
    );

    let started = Instant::now();
    let job = simulator.launch();

    // The first tick starts at 1s and spends 1.5s writing three quotes.
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let metrics = job.stop().await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(2_500));
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.ticks, 1);
    assert_eq!(snapshot.quotes_updated, 3);
    for before in demo_quotes() {
        let after = durable.inner.quote(&before.symbol).unwrap();
        assert_ne!(after.last_updated, before.last_updated);
    }
}

#[tokio::test(start_paused = true)]
async fn engine_shutdown_joins_both_jobs() {
    let fast = Arc::new(InMemoryFastStore::new());
    let durable = Arc::new(InMemoryDurableStore::with_quotes(demo_quotes()));
    let config = EngineConfig::default()
        .with_sync(
            SyncConfig::default()
                .with_tick_interval(Duration::from_secs(5))
                .with_pending_ttl(Duration::from_secs(20)),
        )
        .with_simulator(SimulatorConfig::default().with_tick_interval(Duration::from_secs(2)));

    let engine = Engine::start(fast, durable.clone(), config).unwrap();
    tokio::time::sleep(Duration::from_secs(11)).await;

    let report = engine.shutdown().await.unwrap();
    assert_eq!(report.reconcile.cycles, 2);
    let simulator = report.simulator.unwrap();
    assert_eq!(simulator.ticks, 5);
    assert_eq!(simulator.quotes_updated, 15);
    assert!(durable.calls(DurableOp::UpdateQuote) >= 15);
}

#[tokio::test(start_paused = true)]
async fn simulator_keeps_running_through_failures() {
    let durable = Arc::new(InMemoryDurableStore::with_quotes(demo_quotes()));
    durable.fail_quote_updates_for("AAPL", true);
    let simulator = Arc::new(
        QuoteSimulator::new(
            durable.clone(),
            SimulatorConfig::default().with_tick_interval(Duration::from_secs(1)),
        )
        .unwrap(),
    );

    let job = simulator.launch();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    durable.fail_operation(DurableOp::GetAllQuotes, true);
    tokio::time::sleep(Duration::from_secs(1)).await;
    durable.fail_operation(DurableOp::GetAllQuotes, false);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let snapshot = job.stop().await.unwrap().snapshot();
    assert_eq!(snapshot.ticks, 3);
    assert_eq!(snapshot.fetch_failures, 1);
    assert_eq!(snapshot.update_failures, 2);
    assert_eq!(snapshot.quotes_updated, 4);
}

proptest! {
    #[test]
    fn prop_created_price_is_fixed_from_quote(
        quote in arb_quote(),
        request in arb_new_transaction(),
    ) {
        let quote = Quote { symbol: request.symbol.clone(), ..quote };
        let (side, quantity) = (request.side, request.quantity);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let tx = runtime.block_on(async {
            let fast = Arc::new(InMemoryFastStore::new());
            let durable = Arc::new(InMemoryDurableStore::with_quotes([quote.clone()]));
            let cache = Arc::new(AggregateReadCache::with_defaults(fast.clone(), durable.clone()));
            let sync = Arc::new(
                WriteBehindSynchronizer::new(
                    fast,
                    durable.clone(),
                    cache.clone(),
                    SyncConfig::default(),
                )
                .unwrap(),
            );
            let service = TradingService::new(durable, sync, cache);
            service
                .create_transaction(request)
                .await
                .unwrap()
        });

        let expected = quote.execution_price(side);
        prop_assert_eq!(tx.price, expected);
        prop_assert_eq!(tx.total_amount, quantity as f64 * expected);
        prop_assert_eq!(tx.status, TransactionStatus::Pending);
    }
}
