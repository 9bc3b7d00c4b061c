//! In-process [`Store`] with the same key semantics as the Cassandra tables.
//!
//! Rows are upserted by primary key, trades come back newest first, limits are
//! applied by the store and tables must be created before they are written.
//! Timestamps are kept at the millisecond precision of CQL `timestamp` columns.
//! Tests can make individual trade tables fail to exercise partial writes.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::database::{SchemaStatement, Store, StoreResult, TradeStream};
use crate::entity::trades::TradeTable;
use crate::entity::{accounts_by_user, from_cql_timestamp, positions_by_account, to_cql_timestamp};
use crate::error::StoreError;
use crate::models::{Account, Position, Trade};
use crate::query::TradeQuery;

#[derive(Debug, Default)]
struct State {
    keyspaces: BTreeMap<String, u32>,
    tables: BTreeSet<String>,
    current_keyspace: Option<String>,
    accounts: Vec<Account>,
    positions: BTreeMap<(String, String), Position>,
    trades: HashMap<TradeTable, Vec<Trade>>,
}

impl State {
    fn require_table(&self, table: &str) -> StoreResult<()> {
        if self.tables.contains(table) {
            Ok(())
        } else {
            Err(StoreError::UnknownTable(table.to_string()))
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    failing_tables: Mutex<HashSet<TradeTable>>,
    schema_statements: AtomicUsize,
    trade_queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose keyspace and every investments table already exist.
    pub fn with_schema() -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            state.keyspaces.insert("investments".to_string(), 1);
            state.current_keyspace = Some("investments".to_string());
            state.tables.insert(accounts_by_user::TABLE.to_string());
            state.tables.insert(positions_by_account::TABLE.to_string());
            for table in TradeTable::ALL {
                state.tables.insert(table.name().to_string());
            }
        }
        store
    }

    /// Makes every later write touching `table` fail.
    pub fn fail_writes_to(&self, table: TradeTable) {
        self.failing_tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(table);
    }

    pub fn table_names(&self) -> Vec<String> {
        self.lock().tables.iter().cloned().collect()
    }

    pub fn keyspaces(&self) -> BTreeMap<String, u32> {
        self.lock().keyspaces.clone()
    }

    /// Rows currently stored in `table`.
    pub fn trade_rows(&self, table: TradeTable) -> Vec<Trade> {
        self.lock().trades.get(&table).cloned().unwrap_or_default()
    }

    pub fn schema_statement_count(&self) -> usize {
        self.schema_statements.load(Ordering::SeqCst)
    }

    /// Number of trade queries that reached the store.
    pub fn trade_query_count(&self) -> usize {
        self.trade_queries.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_failing(&self, table: TradeTable) -> bool {
        self.failing_tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&table)
    }
}

/// Round-trips `value` through the column encoding used by [`CassandraStore`](crate::database::CassandraStore).
fn stored_timestamp(value: DateTime<Utc>) -> StoreResult<DateTime<Utc>> {
    from_cql_timestamp(to_cql_timestamp(value))
}

#[async_trait]
impl Store for MemoryStore {
    async fn execute_schema(&self, statement: &SchemaStatement) -> StoreResult<()> {
        self.schema_statements.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        match statement {
            SchemaStatement::CreateKeyspace {
                name,
                replication_factor,
            } => {
                state
                    .keyspaces
                    .entry(name.clone())
                    .or_insert(*replication_factor);
            }
            SchemaStatement::CreateTable { name, .. } => {
                if state.current_keyspace.is_none() {
                    return Err(StoreError::Query("no keyspace has been specified".into()));
                }
                state.tables.insert(name.clone());
            }
        }
        Ok(())
    }

    async fn use_keyspace(&self, keyspace: &str) -> StoreResult<()> {
        let mut state = self.lock();
        if !state.keyspaces.contains_key(keyspace) {
            return Err(StoreError::UnknownKeyspace(keyspace.to_string()));
        }
        state.current_keyspace = Some(keyspace.to_string());
        Ok(())
    }

    async fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let account = &Account {
            opened_at: stored_timestamp(account.opened_at)?,
            ..account.clone()
        };
        let mut state = self.lock();
        state.require_table(accounts_by_user::TABLE)?;
        state.accounts.retain(|a| {
            !(a.username == account.username
                && a.opened_at == account.opened_at
                && a.account_number == account.account_number)
        });
        state.accounts.push(account.clone());
        // the name column is static: one value per user partition
        for existing in state
            .accounts
            .iter_mut()
            .filter(|a| a.username == account.username)
        {
            existing.name = account.name.clone();
        }
        Ok(())
    }

    async fn insert_position(&self, position: &Position) -> StoreResult<()> {
        let mut state = self.lock();
        state.require_table(positions_by_account::TABLE)?;
        state.positions.insert(
            (position.account.clone(), position.symbol.clone()),
            position.clone(),
        );
        Ok(())
    }

    async fn insert_trade_rows(&self, tables: &[TradeTable], trade: &Trade) -> StoreResult<()> {
        if let Some(table) = tables.iter().find(|t| self.is_failing(**t)) {
            return Err(StoreError::Query(format!(
                "write to {} timed out",
                table.name()
            )));
        }

        let trade = &Trade {
            timestamp: stored_timestamp(trade.timestamp)?,
            ..trade.clone()
        };
        let mut state = self.lock();
        for table in tables {
            state.require_table(table.name())?;
        }
        for table in tables {
            let rows = state.trades.entry(*table).or_default();
            rows.retain(|t| t.trade_id != trade.trade_id);
            rows.push(trade.clone());
        }
        Ok(())
    }

    async fn select_accounts(&self, username: &str) -> StoreResult<Vec<Account>> {
        let state = self.lock();
        state.require_table(accounts_by_user::TABLE)?;
        let mut accounts: Vec<Account> = state
            .accounts
            .iter()
            .filter(|a| a.username == username)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| {
            (a.opened_at, &a.account_number).cmp(&(b.opened_at, &b.account_number))
        });
        Ok(accounts)
    }

    async fn select_positions(&self, account: &str) -> StoreResult<Vec<Position>> {
        let state = self.lock();
        state.require_table(positions_by_account::TABLE)?;
        Ok(state
            .positions
            .values()
            .filter(|p| p.account == account)
            .cloned()
            .collect())
    }

    async fn select_trades(&self, query: &TradeQuery) -> StoreResult<TradeStream> {
        self.trade_queries.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        state.require_table(query.table.name())?;
        let mut rows: Vec<Trade> = state
            .trades
            .get(&query.table)
            .map(|rows| rows.iter().filter(|t| query.matches(t)).cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| (b.timestamp, b.trade_id).cmp(&(a.timestamp, a.trade_id)));
        rows.truncate(query.limit as usize);
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeType;
    use chrono::TimeZone;
    use futures::TryStreamExt;
    use uuid::Uuid;

    fn trade(id: u128, secs: i64) -> Trade {
        Trade {
            account: "A1".to_string(),
            trade_id: Uuid::from_u128(id),
            symbol: "SPY".to_string(),
            trade_type: TradeType::Sell,
            quantity: 1,
            price: 400.0,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_writes_require_table() {
        let store = MemoryStore::new();
        let result = store
            .insert_trade_rows(&[TradeTable::ByDate], &trade(1, 0))
            .await;
        assert_eq!(
            result,
            Err(StoreError::UnknownTable("trades_by_date".to_string()))
        );
    }

    #[tokio::test]
    async fn test_trade_upsert_by_id() {
        let store = MemoryStore::with_schema();
        store
            .insert_trade_rows(&[TradeTable::ByDate], &trade(1, 10))
            .await
            .unwrap();
        store
            .insert_trade_rows(&[TradeTable::ByDate], &trade(1, 10))
            .await
            .unwrap();
        assert_eq!(store.trade_rows(TradeTable::ByDate).len(), 1);
    }

    #[tokio::test]
    async fn test_select_trades_newest_first() {
        let store = MemoryStore::with_schema();
        for (id, secs) in [(1, 100), (2, 300), (3, 200)] {
            store
                .insert_trade_rows(&[TradeTable::ByDate], &trade(id, secs))
                .await
                .unwrap();
        }
        let query = TradeQuery::builder("A1").build().unwrap();
        let rows: Vec<Trade> = store
            .select_trades(&query)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let ids: Vec<u128> = rows.iter().map(|t| t.trade_id.as_u128()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(store.trade_query_count(), 1);
    }

    #[tokio::test]
    async fn test_timestamps_stored_at_millisecond_precision() {
        let store = MemoryStore::with_schema();
        let mut precise = trade(1, 1_700_000_000);
        precise.timestamp = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        store
            .insert_trade_rows(&[TradeTable::BySymbol], &precise)
            .await
            .unwrap();

        let stored = store.trade_rows(TradeTable::BySymbol);
        assert_eq!(
            stored[0].timestamp,
            Utc.timestamp_opt(1_700_000_000, 123_000_000).unwrap()
        );

        // bounds compare at millisecond precision, as the cluster does
        for (start_nanos, expected) in [(123_400_000, 1), (124_000_000, 0)] {
            let query = TradeQuery::builder("A1")
                .filters(crate::models::TradeFilters::new().symbol("SPY"))
                .start(Some(Utc.timestamp_opt(1_700_000_000, start_nanos).unwrap()))
                .build()
                .unwrap();
            let rows: Vec<Trade> = store
                .select_trades(&query)
                .await
                .unwrap()
                .try_collect()
                .await
                .unwrap();
            assert_eq!(rows.len(), expected, "start at {} ns", start_nanos);
        }
    }

    #[tokio::test]
    async fn test_failing_table_rejects_whole_batch() {
        let store = MemoryStore::with_schema();
        store.fail_writes_to(TradeTable::ByType);
        let result = store
            .insert_trade_rows(&TradeTable::ALL, &trade(1, 0))
            .await;
        assert!(result.is_err());
        assert!(store.trade_rows(TradeTable::ByDate).is_empty());
    }
}
