//! Trading Service
//!
//! The surface request handlers call. Writes are staged through the
//! write-behind synchronizer and return before the durable store sees them;
//! the full transaction list is read through the aggregate cache.

use std::sync::Arc;

use chrono::Utc;

use quoteline_core::{
    NewTransaction, Quote, QuotelineResult, Transaction, TransactionId, TransactionStatus,
    ValidationError,
};
use quoteline_storage::{AggregateReadCache, DurableStore, FastStore};

use crate::write_behind::WriteBehindSynchronizer;

/// Facade over the durable store, the synchronizer, and the aggregate cache.
pub struct TradingService<F, D>
where
    F: FastStore,
    D: DurableStore,
{
    durable: Arc<D>,
    sync: Arc<WriteBehindSynchronizer<F, D>>,
    cache: Arc<AggregateReadCache<F, D>>,
}

impl<F, D> Clone for TradingService<F, D>
where
    F: FastStore,
    D: DurableStore,
{
    fn clone(&self) -> Self {
        Self {
            durable: Arc::clone(&self.durable),
            sync: Arc::clone(&self.sync),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<F, D> TradingService<F, D>
where
    F: FastStore,
    D: DurableStore,
{
    pub fn new(
        durable: Arc<D>,
        sync: Arc<WriteBehindSynchronizer<F, D>>,
        cache: Arc<AggregateReadCache<F, D>>,
    ) -> Self {
        Self {
            durable,
            sync,
            cache,
        }
    }

    /// Every quote, straight from the durable store.
    pub async fn get_all_quotes(&self) -> QuotelineResult<Vec<Quote>> {
        Ok(self.durable.get_all_quotes().await?)
    }

    /// Price and stage a new transaction.
    ///
    /// The price is fixed here from the current quote (ask for Buy, bid for
    /// Sell) and never recomputed. The returned transaction has status
    /// `Pending` and reaches the durable store on a later sync cycle.
    ///
    /// # Errors
    /// Returns a validation error for an empty symbol or non-positive
    /// quantity, `NotFound` for an unknown symbol, and any staging failure.
    pub async fn create_transaction(&self, request: NewTransaction) -> QuotelineResult<Transaction> {
        request.validate()?;

        let quote = self.durable.get_quote_by_symbol(&request.symbol).await?;
        let tx = Transaction::priced_from(request, &quote, Utc::now())?;

        let key = self.sync.stage_create(&tx).await?;
        tracing::info!(
            key = %key,
            symbol = %tx.symbol,
            side = %tx.side,
            quantity = tx.quantity,
            price = tx.price,
            "Transaction staged"
        );
        Ok(tx)
    }

    /// Stage a status change for an existing transaction.
    ///
    /// # Errors
    /// `Pending` is not a valid target and is rejected with
    /// `IllegalTransition`.
    pub async fn update_transaction_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> QuotelineResult<()> {
        if !TransactionStatus::Pending.can_transition_to(status) {
            return Err(ValidationError::IllegalTransition {
                from: TransactionStatus::Pending.to_string(),
                to: status.to_string(),
            }
            .into());
        }

        self.sync.stage_update(id, status).await?;
        Ok(())
    }

    /// Every transaction with its quote, served from the aggregate cache when fresh.
    pub async fn get_all_transactions(&self) -> QuotelineResult<Vec<Transaction>> {
        self.cache.get_all().await
    }
}

// =============================================================================
// TESTS
// =============================================================================
