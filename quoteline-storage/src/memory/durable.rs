use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use quoteline_core::{
    DurableStoreError, EntityType, Quote, Timestamp, Transaction, TransactionId,
    TransactionStatus,
};

use crate::traits::DurableStore;

/// Durable store operations, used to inject failures and read call counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurableOp {
    GetAllQuotes,
    GetQuoteBySymbol,
    UpdateQuote,
    GetAllTransactions,
    CreateTransaction,
    UpdateTransactionStatus,
}

impl DurableOp {
    fn index(self) -> usize {
        match self {
            DurableOp::GetAllQuotes => 0,
            DurableOp::GetQuoteBySymbol => 1,
            DurableOp::UpdateQuote => 2,
            DurableOp::GetAllTransactions => 3,
            DurableOp::CreateTransaction => 4,
            DurableOp::UpdateTransactionStatus => 5,
        }
    }
}

/// Seed quote book: symbol, bid price, bid volume, ask price, ask volume.
pub const DEMO_QUOTE_BOOK: [(&str, f64, i64, f64, i64); 3] = [
    ("AAPL", 100.50, 1000, 101.00, 800),
    ("GOOGL", 2800.00, 500, 2801.00, 300),
    ("MSFT", 410.25, 1200, 410.75, 900),
];

/// [`DEMO_QUOTE_BOOK`] as quotes last updated at `at`.
pub fn demo_quotes(at: Timestamp) -> Vec<Quote> {
    DEMO_QUOTE_BOOK
        .iter()
        .map(|&(symbol, bid_price, bid_volume, ask_price, ask_volume)| Quote {
            symbol: symbol.to_string(),
            bid_price,
            bid_volume,
            ask_price,
            ask_volume,
            last_updated: at,
        })
        .collect()
}

#[derive(Debug, Default)]
struct Tables {
    quotes: HashMap<String, Quote>,
    transactions: BTreeMap<TransactionId, Transaction>,
    next_id: TransactionId,
}

/// Durable store held in memory.
///
/// Transactions are keyed by id and read back in id order, each joined to
/// the current quote for its symbol.
#[derive(Debug, Default)]
pub struct InMemoryDurableStore {
    tables: RwLock<Tables>,
    calls: [AtomicU64; 6],
    failing: RwLock<HashSet<DurableOp>>,
    failing_symbols: RwLock<HashSet<String>>,
}

impl InMemoryDurableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with quotes.
    pub fn with_quotes(quotes: impl IntoIterator<Item = Quote>) -> Self {
        let store = Self::new();
        for quote in quotes {
            store.insert_quote(quote);
        }
        store
    }

    /// Insert or replace a quote directly, bypassing call accounting.
    pub fn insert_quote(&self, quote: Quote) {
        if let Ok(mut tables) = self.tables.write() {
            tables.quotes.insert(quote.symbol.clone(), quote);
        }
    }

    /// Read a quote directly, bypassing call accounting.
    pub fn quote(&self, symbol: &str) -> Option<Quote> {
        self.tables.read().ok()?.quotes.get(symbol).cloned()
    }

    /// Read a transaction directly, bypassing call accounting.
    pub fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.tables.read().ok()?.transactions.get(&id).cloned()
    }

    /// Number of stored transactions.
    pub fn transaction_count(&self) -> usize {
        self.tables
            .read()
            .map(|t| t.transactions.len())
            .unwrap_or(0)
    }

    /// Make `op` fail with `Unavailable` until reset.
    pub fn fail_operation(&self, op: DurableOp, failing: bool) {
        if let Ok(mut set) = self.failing.write() {
            if failing {
                set.insert(op);
            } else {
                set.remove(&op);
            }
        }
    }

    /// Make `update_quote` fail for one symbol only.
    pub fn fail_quote_updates_for(&self, symbol: &str, failing: bool) {
        if let Ok(mut set) = self.failing_symbols.write() {
            if failing {
                set.insert(symbol.to_string());
            } else {
                set.remove(symbol);
            }
        }
    }

    /// Number of times `op` has been called, failed calls included.
    pub fn calls(&self, op: DurableOp) -> u64 {
        self.calls[op.index()].load(Ordering::SeqCst)
    }


    fn begin(&self, op: DurableOp) -> Result<(), DurableStoreError> {
        self.calls[op.index()].fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing
            .read()
            .map_err(|_| DurableStoreError::LockPoisoned)?;
        if failing.contains(&op) {
            return Err(DurableStoreError::Unavailable {
                reason: format!("injected failure on {:?}", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn get_all_quotes(&self) -> Result<Vec<Quote>, DurableStoreError> {
        self.begin(DurableOp::GetAllQuotes)?;
        let tables = self
            .tables
            .read()
            .map_err(|_| DurableStoreError::LockPoisoned)?;
        let mut quotes: Vec<Quote> = tables.quotes.values().cloned().collect();
        quotes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(quotes)
    }

    async fn get_quote_by_symbol(&self, symbol: &str) -> Result<Quote, DurableStoreError> {
        self.begin(DurableOp::GetQuoteBySymbol)?;
        let tables = self
            .tables
            .read()
            .map_err(|_| DurableStoreError::LockPoisoned)?;
        tables
            .quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| DurableStoreError::NotFound {
                entity: EntityType::Quote,
                id: symbol.to_string(),
            })
    }

    async fn update_quote(&self, quote: &Quote) -> Result<(), DurableStoreError> {
        self.begin(DurableOp::UpdateQuote)?;
        let symbol_failing = self
            .failing_symbols
            .read()
            .map_err(|_| DurableStoreError::LockPoisoned)?
            .contains(&quote.symbol);
        if symbol_failing {
            return Err(DurableStoreError::UpdateFailed {
                entity: EntityType::Quote,
                id: quote.symbol.clone(),
                reason: "injected failure".to_string(),
            });
        }

        let mut tables = self
            .tables
            .write()
            .map_err(|_| DurableStoreError::LockPoisoned)?;
        let stored = tables
            .quotes
            .get_mut(&quote.symbol)
            .ok_or_else(|| DurableStoreError::NotFound {
                entity: EntityType::Quote,
                id: quote.symbol.clone(),
            })?;

        stored.bid_price = quote.bid_price;
        stored.bid_volume = quote.bid_volume;
        stored.ask_price = quote.ask_price;
        stored.ask_volume = quote.ask_volume;
        stored.last_updated = quote.last_updated;
        Ok(())
    }

    async fn get_all_transactions(&self) -> Result<Vec<Transaction>, DurableStoreError> {
        self.begin(DurableOp::GetAllTransactions)?;
        let tables = self
            .tables
            .read()
            .map_err(|_| DurableStoreError::LockPoisoned)?;
        Ok(tables
            .transactions
            .values()
            .map(|tx| {
                let mut joined = tx.clone();
                joined.quote = tables.quotes.get(&tx.symbol).cloned();
                joined
            })
            .collect())
    }

    async fn create_transaction(&self, tx: &Transaction) -> Result<TransactionId, DurableStoreError> {
        self.begin(DurableOp::CreateTransaction)?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| DurableStoreError::LockPoisoned)?;

        let id = match tx.id {
            Some(id) if tables.transactions.contains_key(&id) => {
                return Err(DurableStoreError::InsertFailed {
                    entity: EntityType::Transaction,
                    reason: format!("id {} already exists", id),
                });
            }
            Some(id) => id,
            None => tables.next_id + 1,
        };
        tables.next_id = tables.next_id.max(id);

        let mut stored = tx.clone();
        stored.id = Some(id);
        stored.quote = None;
        tables.transactions.insert(id, stored);
        Ok(id)
    }

    async fn update_transaction_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), DurableStoreError> {
        self.begin(DurableOp::UpdateTransactionStatus)?;
        let mut tables = self
            .tables
            .write()
            .map_err(|_| DurableStoreError::LockPoisoned)?;
        let tx = tables
            .transactions
            .get_mut(&id)
            .ok_or_else(|| DurableStoreError::NotFound {
                entity: EntityType::Transaction,
                id: id.to_string(),
            })?;
        tx.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quoteline_core::TransactionSide;

    fn quote(symbol: &str, bid: f64, ask: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            bid_price: bid,
            bid_volume: 100,
            ask_price: ask,
            ask_volume: 100,
            last_updated: Utc::now(),
        }
    }

    fn transaction(id: Option<TransactionId>, symbol: &str) -> Transaction {
        Transaction {
            id,
            symbol: symbol.to_string(),
            side: TransactionSide::Buy,
            status: TransactionStatus::Pending,
            quantity: 1,
            price: 10.0,
            total_amount: 10.0,
            order_time: Utc::now(),
            execution_time: None,
            note: None,
            quote: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_keeps_provided_ones() {
        let store = InMemoryDurableStore::new();

        let first = store.create_transaction(&transaction(None, "AAPL")).await.unwrap();
        let chosen = store.create_transaction(&transaction(Some(10), "AAPL")).await.unwrap();
        let next = store.create_transaction(&transaction(None, "AAPL")).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(chosen, 10);
        assert_eq!(next, 11);
        assert_eq!(store.transaction_count(), 3);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let store = InMemoryDurableStore::new();
        store.create_transaction(&transaction(Some(7), "AAPL")).await.unwrap();

        let err = store
            .create_transaction(&transaction(Some(7), "AAPL"))
            .await
            .unwrap_err();
        assert!(matches!(err, DurableStoreError::InsertFailed { .. }));
    }

    #[tokio::test]
    async fn test_get_all_transactions_joins_quote() {
        let store = InMemoryDurableStore::with_quotes([quote("AAPL", 100.0, 101.0)]);
        store.create_transaction(&transaction(None, "AAPL")).await.unwrap();
        store.create_transaction(&transaction(None, "TSLA")).await.unwrap();

        let all = store.get_all_transactions().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].quote.as_ref().map(|q| q.ask_price), Some(101.0));
        assert!(all[1].quote.is_none());
        assert_eq!(store.calls(DurableOp::GetAllTransactions), 1);
    }

    #[tokio::test]
    async fn test_update_status_of_missing_transaction_fails() {
        let store = InMemoryDurableStore::new();
        let err = store
            .update_transaction_status(3, TransactionStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, DurableStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_quote_and_symbol_failure() {
        let store = InMemoryDurableStore::with_quotes([
            quote("AAPL", 100.0, 101.0),
            quote("MSFT", 300.0, 301.0),
        ]);
        store.fail_quote_updates_for("AAPL", true);

        assert!(store.update_quote(&quote("AAPL", 1.0, 2.0)).await.is_err());
        store.update_quote(&quote("MSFT", 299.0, 302.0)).await.unwrap();

        assert_eq!(store.quote("AAPL").unwrap().bid_price, 100.0);
        assert_eq!(store.quote("MSFT").unwrap().ask_price, 302.0);
        assert!(store.update_quote(&quote("NOPE", 1.0, 2.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_operation_failure() {
        let store = InMemoryDurableStore::new();
        store.fail_operation(DurableOp::CreateTransaction, true);
        assert!(store.create_transaction(&transaction(None, "AAPL")).await.is_err());
        assert_eq!(store.calls(DurableOp::CreateTransaction), 1);

        store.fail_operation(DurableOp::CreateTransaction, false);
        assert!(store.create_transaction(&transaction(None, "AAPL")).await.is_ok());
    }
}
