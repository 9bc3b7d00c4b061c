use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use scylla::batch::{Batch, BatchType};
use scylla::frame::response::result::CqlValue;
use scylla::prepared_statement::PreparedStatement;
use scylla::query::Query;
use scylla::{ExecutionProfile, Session, SessionBuilder};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::entity::trades::{self, TradeRow, TradeTable};
use crate::entity::{accounts_by_user, positions_by_account, to_cql_timestamp};
use crate::error::{Error, StoreError};
use crate::models::{Account, Position, Trade};
use crate::query::{QueryValue, TradeQuery};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Trades in clustering order, fetched page by page as the stream is polled.
pub type TradeStream = BoxStream<'static, StoreResult<Trade>>;

/// A DDL statement issued by the schema manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatement {
    CreateKeyspace {
        name: String,
        replication_factor: u32,
    },
    CreateTable {
        name: String,
        cql: String,
    },
}

impl SchemaStatement {
    pub fn create_keyspace(name: &str, replication_factor: u32) -> Self {
        SchemaStatement::CreateKeyspace {
            name: name.to_string(),
            replication_factor,
        }
    }

    pub fn create_table(name: &str, cql: impl Into<String>) -> Self {
        SchemaStatement::CreateTable {
            name: name.to_string(),
            cql: cql.into(),
        }
    }

    pub fn cql(&self) -> String {
        match self {
            SchemaStatement::CreateKeyspace {
                name,
                replication_factor,
            } => format!(
                "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = \
                 {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
                name, replication_factor
            ),
            SchemaStatement::CreateTable { cql, .. } => cql.clone(),
        }
    }

    /// Object the statement creates, for logs and error messages.
    pub fn target(&self) -> &str {
        match self {
            SchemaStatement::CreateKeyspace { name, .. } => name,
            SchemaStatement::CreateTable { name, .. } => name,
        }
    }
}

/// Storage seam between the investments domain and the database driver.
#[async_trait]
pub trait Store: Send + Sync {
    /// Runs a create-if-not-exists statement. Existing objects are not an error.
    async fn execute_schema(&self, statement: &SchemaStatement) -> StoreResult<()>;

    async fn use_keyspace(&self, keyspace: &str) -> StoreResult<()>;

    async fn insert_account(&self, account: &Account) -> StoreResult<()>;

    async fn insert_position(&self, position: &Position) -> StoreResult<()>;

    /// Writes `trade` into each of `tables` as one logged batch.
    async fn insert_trade_rows(&self, tables: &[TradeTable], trade: &Trade) -> StoreResult<()>;

    async fn select_accounts(&self, username: &str) -> StoreResult<Vec<Account>>;

    async fn select_positions(&self, account: &str) -> StoreResult<Vec<Position>>;

    async fn select_trades(&self, query: &TradeQuery) -> StoreResult<TradeStream>;
}

/// [`Store`] backed by a Cassandra (or Scylla) cluster.
pub struct CassandraStore {
    session: Session,
    request_timeout: Duration,
    prepared: Mutex<HashMap<String, PreparedStatement>>,
}

impl CassandraStore {
    pub fn new(session: Session, request_timeout: Duration) -> Self {
        Self {
            session,
            request_timeout,
            prepared: Mutex::new(HashMap::new()),
        }
    }

    /// Prepares `cql` once per process and reuses the statement afterwards.
    async fn prepare(&self, cql: &str) -> StoreResult<PreparedStatement> {
        if let Some(statement) = self.cached(cql) {
            return Ok(statement);
        }

        debug!(cql, "Preparing statement");
        let statement = self.session.prepare(cql).await.map_err(query_error)?;
        if let Ok(mut cache) = self.prepared.lock() {
            cache.insert(cql.to_string(), statement.clone());
        }
        Ok(statement)
    }

    fn cached(&self, cql: &str) -> Option<PreparedStatement> {
        self.prepared.lock().ok()?.get(cql).cloned()
    }
}

fn query_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::Query(err.to_string())
}

fn decode_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::Decode(err.to_string())
}

fn to_cql_value(value: QueryValue) -> CqlValue {
    match value {
        QueryValue::Text(text) => CqlValue::Text(text),
        QueryValue::Timestamp(ts) => CqlValue::Timestamp(to_cql_timestamp(ts)),
        QueryValue::Int(n) => CqlValue::Int(n),
    }
}

#[async_trait]
impl Store for CassandraStore {
    async fn execute_schema(&self, statement: &SchemaStatement) -> StoreResult<()> {
        let mut query = Query::new(statement.cql());
        query.set_request_timeout(Some(self.request_timeout));
        self.session.query(query, ()).await.map_err(query_error)?;
        self.session
            .await_schema_agreement()
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn use_keyspace(&self, keyspace: &str) -> StoreResult<()> {
        self.session
            .use_keyspace(keyspace, false)
            .await
            .map_err(query_error)?;
        // statements prepared before the switch point at the previous keyspace
        if let Ok(mut cache) = self.prepared.lock() {
            cache.clear();
        }
        Ok(())
    }

    async fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let statement = self.prepare(accounts_by_user::INSERT).await?;
        self.session
            .execute(&statement, accounts_by_user::insert_values(account))
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn insert_position(&self, position: &Position) -> StoreResult<()> {
        let statement = self.prepare(positions_by_account::INSERT).await?;
        self.session
            .execute(&statement, positions_by_account::insert_values(position))
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn insert_trade_rows(&self, tables: &[TradeTable], trade: &Trade) -> StoreResult<()> {
        let mut batch = Batch::new(BatchType::Logged);
        let mut values = Vec::with_capacity(tables.len());
        for table in tables {
            batch.append_statement(self.prepare(&table.insert_cql()).await?);
            values.push(trades::insert_values(trade));
        }
        self.session
            .batch(&batch, values)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn select_accounts(&self, username: &str) -> StoreResult<Vec<Account>> {
        let statement = self.prepare(accounts_by_user::SELECT_BY_USERNAME).await?;
        let result = self
            .session
            .execute(&statement, (username,))
            .await
            .map_err(query_error)?;
        result
            .rows_typed::<accounts_by_user::AccountRow>()
            .map_err(decode_error)?
            .map(|row| row.map_err(decode_error).and_then(Account::try_from))
            .collect()
    }

    async fn select_positions(&self, account: &str) -> StoreResult<Vec<Position>> {
        let statement = self.prepare(positions_by_account::SELECT_BY_ACCOUNT).await?;
        let result = self
            .session
            .execute(&statement, (account,))
            .await
            .map_err(query_error)?;
        result
            .rows_typed::<positions_by_account::PositionRow>()
            .map_err(decode_error)?
            .map(|row| row.map(Position::from).map_err(decode_error))
            .collect()
    }

    async fn select_trades(&self, query: &TradeQuery) -> StoreResult<TradeStream> {
        let statement = self.prepare(&query.cql()).await?;
        let values: Vec<CqlValue> = query.values().into_iter().map(to_cql_value).collect();
        let rows = self
            .session
            .execute_iter(statement, values)
            .await
            .map_err(query_error)?;
        let stream = rows
            .into_typed::<TradeRow>()
            .map(|row| row.map_err(decode_error).and_then(Trade::try_from));
        Ok(stream.boxed())
    }
}

/// Opens a session against the configured contact points.
///
/// Connection establishment is the only retried operation: up to
/// `config.connect_retries` attempts with a linearly growing delay.
pub async fn connect(config: &Config) -> Result<CassandraStore, Error> {
    let nodes = config.contact_points();
    let profile = ExecutionProfile::builder()
        .request_timeout(Some(config.request_timeout))
        .build();
    let attempts = config.connect_retries.max(1);

    let mut last_error = String::new();
    for attempt in 1..=attempts {
        info!(?nodes, attempt, attempts, "Connecting to cluster");
        let result = SessionBuilder::new()
            .known_nodes(&nodes)
            .connection_timeout(config.request_timeout)
            .default_execution_profile_handle(profile.clone().into_handle())
            .build()
            .await;

        match result {
            Ok(session) => {
                info!("Connected to cluster");
                return Ok(CassandraStore::new(session, config.request_timeout));
            }
            Err(e) => {
                warn!(attempt, attempts, error = %e, "Cluster connection failed");
                last_error = e.to_string();
                if attempt < attempts {
                    tokio::time::sleep(config.connect_retry_delay * attempt).await;
                }
            }
        }
    }

    Err(Error::Connectivity {
        attempts,
        message: last_error,
    })
}
