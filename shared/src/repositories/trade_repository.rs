//! Trade write path and trade history reads.
//!
//! A trade is fanned out to every table in [`TradeTable::ALL`]. The store only
//! guarantees atomicity inside a single partition, and the four tables use four
//! different partition keys, so a failed write can leave the tables out of step.
//! Failures are surfaced as [`PartialWriteError`] and nothing is rolled back.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{error, info};

use crate::database::{Store, TradeStream};
use crate::entity::trades::TradeTable;
use crate::error::{Error, PartialWriteError, Result};
use crate::models::{Trade, TradeFilters};
use crate::query::TradeQuery;

pub struct TradeRepository {
    store: Arc<dyn Store>,
    logged_batch: bool,
}

impl TradeRepository {
    pub fn new(store: Arc<dyn Store>, logged_batch: bool) -> Self {
        Self {
            store,
            logged_batch,
        }
    }

    /// Writes `trade` to all four trade tables.
    ///
    /// `trade_time` columns hold milliseconds, so the timestamp is truncated to
    /// millisecond precision before it is written.
    pub async fn insert_trade(&self, trade: &Trade) -> Result<()> {
        let trade = &Trade {
            timestamp: trade.timestamp.trunc_subsecs(3),
            ..trade.clone()
        };
        let outcome = if self.logged_batch {
            self.write_batched(trade).await
        } else {
            self.write_sequential(trade).await
        };

        if outcome.failed.is_empty() {
            return Ok(());
        }
        error!(
            trade_id = %trade.trade_id,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Trade write did not reach every table"
        );
        Err(Error::PartialWrite(outcome))
    }

    /// One logged batch. A failed batch gives no per-table detail, so every
    /// table is reported as unconfirmed.
    async fn write_batched(&self, trade: &Trade) -> PartialWriteError {
        let mut outcome = PartialWriteError {
            trade_id: trade.trade_id,
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        match self.store.insert_trade_rows(&TradeTable::ALL, trade).await {
            Ok(()) => outcome.succeeded.extend(TradeTable::ALL),
            Err(e) => outcome
                .failed
                .extend(TradeTable::ALL.into_iter().map(|t| (t, e.clone()))),
        }
        outcome
    }

    /// Each table writer runs in turn; every failure is collected.
    async fn write_sequential(&self, trade: &Trade) -> PartialWriteError {
        let mut outcome = PartialWriteError {
            trade_id: trade.trade_id,
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        for table in TradeTable::ALL {
            match self.store.insert_trade_rows(&[table], trade).await {
                Ok(()) => outcome.succeeded.push(table),
                Err(e) => outcome.failed.push((table, e)),
            }
        }
        outcome
    }

    /// Trade history for `account`, newest first, read from the table that
    /// matches `filters`. Invalid ranges are rejected before the store is asked.
    pub async fn query_trades(
        &self,
        account: &str,
        filters: TradeFilters,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<TradeStream> {
        let query = TradeQuery::builder(account)
            .filters(filters)
            .start(start)
            .end(end)
            .limit(limit)
            .build()?;
        self.fetch(&query).await
    }

    pub async fn fetch(&self, query: &TradeQuery) -> Result<TradeStream> {
        info!(
            account = %query.account,
            table = %query.table,
            symbol = ?query.symbol,
            trade_type = ?query.trade_type,
            start = ?query.start,
            end = ?query.end,
            limit = query.limit,
            "Querying trades"
        );
        self.store
            .select_trades(query)
            .await
            .map_err(Error::store("query trades"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::models::TradeType;
    use chrono::TimeZone;
    use futures::TryStreamExt;
    use uuid::Uuid;

    fn sample_trade() -> Trade {
        Trade {
            account: "A1".to_string(),
            trade_id: Uuid::from_u128(7),
            symbol: "ETSY".to_string(),
            trade_type: TradeType::Buy,
            quantity: 10,
            price: 50.0,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_trade_reaches_every_table() {
        let store = Arc::new(MemoryStore::with_schema());
        let repo = TradeRepository::new(store.clone(), true);
        repo.insert_trade(&sample_trade()).await.unwrap();

        for table in TradeTable::ALL {
            assert_eq!(store.trade_rows(table), vec![sample_trade()], "{}", table);
        }
    }

    #[tokio::test]
    async fn test_insert_trade_keeps_millisecond_precision() {
        let store = Arc::new(MemoryStore::with_schema());
        let repo = TradeRepository::new(store.clone(), true);
        let trade = Trade {
            timestamp: Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(),
            ..sample_trade()
        };
        repo.insert_trade(&trade).await.unwrap();

        let expected = Trade {
            timestamp: Utc.timestamp_opt(1_700_000_000, 123_000_000).unwrap(),
            ..trade
        };
        for table in TradeTable::ALL {
            assert_eq!(store.trade_rows(table), vec![expected.clone()], "{}", table);
        }
        let read: Vec<Trade> = repo
            .query_trades("A1", TradeFilters::new(), None, None, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(read, vec![expected]);
    }

    #[tokio::test]
    async fn test_sequential_failure_names_tables() {
        let store = Arc::new(MemoryStore::with_schema());
        store.fail_writes_to(TradeTable::ByType);
        let repo = TradeRepository::new(store.clone(), false);

        let err = repo.insert_trade(&sample_trade()).await.unwrap_err();
        let partial = match err {
            Error::PartialWrite(partial) => partial,
            other => panic!("expected partial write, got {:?}", other),
        };
        assert_eq!(
            partial.succeeded,
            vec![
                TradeTable::ByDate,
                TradeTable::BySymbol,
                TradeTable::BySymbolAndType
            ]
        );
        assert_eq!(partial.failed.len(), 1);
        assert_eq!(partial.failed[0].0, TradeTable::ByType);
        // successful writes stay in place
        assert_eq!(store.trade_rows(TradeTable::ByDate).len(), 1);
        assert!(store.trade_rows(TradeTable::ByType).is_empty());
    }

    #[tokio::test]
    async fn test_batched_failure_reports_all_tables_unconfirmed() {
        let store = Arc::new(MemoryStore::with_schema());
        store.fail_writes_to(TradeTable::BySymbol);
        let repo = TradeRepository::new(store, true);

        let err = repo.insert_trade(&sample_trade()).await.unwrap_err();
        let partial = match err {
            Error::PartialWrite(partial) => partial,
            other => panic!("expected partial write, got {:?}", other),
        };
        assert!(partial.succeeded.is_empty());
        assert_eq!(partial.failed.len(), 4);
    }

    #[tokio::test]
    async fn test_inverted_range_rejected_before_query() {
        let store = Arc::new(MemoryStore::with_schema());
        let repo = TradeRepository::new(store.clone(), true);
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let result = repo
            .query_trades("A1", TradeFilters::new(), Some(start), Some(end), None)
            .await;
        assert!(matches!(result, Err(Error::InvalidFilter(_))));
        assert_eq!(store.trade_query_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_account_yields_empty_stream() {
        let repo = TradeRepository::new(Arc::new(MemoryStore::with_schema()), true);
        let trades: Vec<Trade> = repo
            .query_trades("nobody", TradeFilters::new(), None, None, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(trades.is_empty());
    }
}
