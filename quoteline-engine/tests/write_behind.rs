//! End-to-end behaviour of staging, reconciliation, and the aggregate cache
//! against the in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use quoteline_engine::{
    Engine, EngineConfig, NewTransaction, SimulatorConfig, SyncConfig, TradingService,
    TransactionSide, TransactionStatus, WriteBehindSynchronizer,
};
use quoteline_storage::{
    AggregateReadCache, DurableOp, DurableStore, FastStore, InMemoryDurableStore,
    InMemoryFastStore, PendingKind, PendingOperation,
};
use quoteline_test_utils::fixtures::{empty_fast_store, pending_transaction, seeded_durable_store};

const TICK: Duration = Duration::from_secs(15);

fn engine_config() -> EngineConfig {
    EngineConfig::default()
        .with_sync(
            SyncConfig::default()
                .with_tick_interval(TICK)
                .with_pending_ttl(Duration::from_secs(30)),
        )
        .with_simulator(SimulatorConfig::disabled())
}

fn stores() -> (Arc<InMemoryFastStore>, Arc<InMemoryDurableStore>) {
    (empty_fast_store(), seeded_durable_store())
}

fn components(
    fast: &Arc<InMemoryFastStore>,
    durable: &Arc<InMemoryDurableStore>,
) -> (
    Arc<WriteBehindSynchronizer<InMemoryFastStore, InMemoryDurableStore>>,
    TradingService<InMemoryFastStore, InMemoryDurableStore>,
) {
    let cache = Arc::new(AggregateReadCache::with_defaults(fast.clone(), durable.clone()));
    let sync = Arc::new(
        WriteBehindSynchronizer::new(
            fast.clone(),
            durable.clone(),
            cache.clone(),
            SyncConfig::default(),
        )
        .unwrap(),
    );
    let service = TradingService::new(durable.clone(), sync.clone(), cache);
    (sync, service)
}

#[tokio::test]
async fn staging_forces_next_read_to_refetch() {
    let (fast, durable) = stores();
    let (_sync, service) = components(&fast, &durable);

    service.get_all_transactions().await.unwrap();
    assert_eq!(durable.calls(DurableOp::GetAllTransactions), 1);

    service
        .create_transaction(NewTransaction::new("MSFT", TransactionSide::Sell, 3))
        .await
        .unwrap();
    service.get_all_transactions().await.unwrap();
    assert_eq!(durable.calls(DurableOp::GetAllTransactions), 2);

    service
        .update_transaction_status(1, TransactionStatus::Cancelled)
        .await
        .unwrap();
    service.get_all_transactions().await.unwrap();
    assert_eq!(durable.calls(DurableOp::GetAllTransactions), 3);
}

#[tokio::test]
async fn consecutive_reads_are_identical_and_hit_durable_once() {
    let (fast, durable) = stores();
    durable
        .create_transaction(&pending_transaction("AAPL", TransactionSide::Buy, 5, 101.0))
        .await
        .unwrap();
    let (_sync, service) = components(&fast, &durable);

    let first = service.get_all_transactions().await.unwrap();
    let second = service.get_all_transactions().await.unwrap();

    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
    assert_eq!(first[0].quote.as_ref().map(|q| q.symbol.as_str()), Some("AAPL"));
    assert_eq!(durable.calls(DurableOp::GetAllTransactions), 1);
}

#[tokio::test(start_paused = true)]
async fn staged_work_converges_within_one_tick() {
    let (fast, durable) = stores();
    for id in 1..=3 {
        let mut tx = pending_transaction("GOOGL", TransactionSide::Buy, 1, 2801.0);
        tx.id = Some(id);
        durable.create_transaction(&tx).await.unwrap();
    }

    let engine = Engine::start(fast.clone(), durable.clone(), engine_config()).unwrap();
    let service = engine.service().clone();

    for qty in 1..=5 {
        service
            .create_transaction(NewTransaction::new("AAPL", TransactionSide::Buy, qty))
            .await
            .unwrap();
    }
    for (id, status) in [
        (1, TransactionStatus::Completed),
        (2, TransactionStatus::Cancelled),
        (3, TransactionStatus::Failed),
    ] {
        service.update_transaction_status(id, status).await.unwrap();
    }
    assert_eq!(engine.synchronizer().pending_count().await.unwrap(), 8);

    tokio::time::sleep(TICK + Duration::from_secs(1)).await;

    assert_eq!(engine.synchronizer().pending_count().await.unwrap(), 0);
    assert_eq!(durable.transaction_count(), 8);
    assert_eq!(
        durable.transaction(2).map(|tx| tx.status),
        Some(TransactionStatus::Cancelled)
    );

    let report = engine.shutdown().await.unwrap();
    assert_eq!(report.reconcile.creates_applied, 5);
    assert_eq!(report.reconcile.updates_applied, 3);
    assert!(report.simulator.is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_apply_is_retried_next_tick() {
    let (fast, durable) = stores();
    durable.fail_operation(DurableOp::CreateTransaction, true);

    // Long enough for the key to survive the failed tick and the retry.
    let config = engine_config().with_sync(
        SyncConfig::default()
            .with_tick_interval(TICK)
            .with_pending_ttl(Duration::from_secs(60)),
    );
    let engine = Engine::start(fast.clone(), durable.clone(), config).unwrap();
    engine
        .service()
        .create_transaction(NewTransaction::new("AAPL", TransactionSide::Buy, 1).with_id(11))
        .await
        .unwrap();
    let staged = engine
        .synchronizer()
        .pending_keys(PendingKind::Create)
        .await
        .unwrap();

    tokio::time::sleep(TICK + Duration::from_secs(1)).await;
    assert_eq!(
        engine
            .synchronizer()
            .pending_keys(PendingKind::Create)
            .await
            .unwrap(),
        staged
    );
    assert_eq!(engine.reconcile_metrics().apply_failures, 1);

    durable.fail_operation(DurableOp::CreateTransaction, false);
    tokio::time::sleep(TICK).await;

    assert!(durable.transaction(11).is_some());
    assert_eq!(engine.synchronizer().pending_count().await.unwrap(), 0);
    engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn aapl_order_lands_pending_two_ticks_later() {
    let (fast, durable) = stores();
    let engine = Engine::start(fast.clone(), durable.clone(), engine_config()).unwrap();

    let tx = engine
        .service()
        .create_transaction(NewTransaction::new("AAPL", TransactionSide::Buy, 10).with_id(7))
        .await
        .unwrap();
    assert_eq!(tx.price, 101.00);

    let keys = engine
        .synchronizer()
        .pending_keys(PendingKind::Create)
        .await
        .unwrap();
    assert_eq!(keys.len(), 1);
    let bytes = fast.get(&keys[0]).await.unwrap().unwrap();
    match PendingOperation::decode_for(&keys[0], PendingKind::Create, &bytes).unwrap() {
        PendingOperation::Create(staged) => {
            assert_eq!(staged.id, Some(7));
            assert_eq!(staged.price, 101.00);
            assert!((staged.total_amount - 1010.00).abs() < 1e-9);
        }
        other => panic!("expected create, got {:?}", other),
    }

    tokio::time::sleep(TICK * 2).await;

    let stored = durable.transaction(7).unwrap();
    assert_eq!(stored.status, TransactionStatus::Pending);
    assert_eq!(stored.price, 101.00);
    assert!(engine
        .synchronizer()
        .pending_keys(PendingKind::Create)
        .await
        .unwrap()
        .is_empty());

    engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn reads_see_synced_rows_after_a_cycle() {
    let (fast, durable) = stores();
    let engine = Engine::start(fast.clone(), durable.clone(), engine_config()).unwrap();
    let service = engine.service().clone();

    service
        .create_transaction(NewTransaction::new("AAPL", TransactionSide::Buy, 2))
        .await
        .unwrap();
    assert!(service.get_all_transactions().await.unwrap().is_empty());

    tokio::time::sleep(TICK + Duration::from_secs(1)).await;

    let rows = service.get_all_transactions().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "AAPL");
    engine.shutdown().await.unwrap();
}
