//! Investments demo on Cassandra.
//!
//! Trades are denormalized into four tables, one per query pattern, and every
//! history query is routed to the table whose partition key covers its filters.
//!
//! - [`models`]: users, accounts, positions, trades and trade filters
//! - [`entity`]: per-table CQL and row mappings
//! - [`query`]: table selection and parameterized trade queries
//! - [`repositories`]: write path and lookups over a [`Store`]
//! - [`database`]: the [`Store`] seam and its Cassandra backend
//! - `memory` (feature `memory`): an in-process [`Store`] for tests
//! - [`fixtures`] and [`populate`]: demo dataset generation and loading

pub mod config;
pub mod context;
pub mod database;
pub mod entity;
pub mod error;
pub mod fixtures;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod models;
pub mod populate;
pub mod query;
pub mod repositories;

pub use config::Config;
pub use context::AppContext;
pub use database::{connect, SchemaStatement, Store, StoreResult, TradeStream};
pub use entity::trades::TradeTable;
pub use error::{Error, PartialWriteError, Result, StoreError};
#[cfg(any(test, feature = "memory"))]
pub use memory::MemoryStore;
pub use models::*;
pub use query::{select_trades_table, TradeQuery, DEFAULT_TRADE_LIMIT};
