//! The four denormalized trade tables.
//!
//! Every table stores the same columns. They differ only in partition key, so
//! each one serves a different filter combination while keeping `trade_time`
//! as the first clustering column (descending).

use std::fmt;

use scylla::frame::value::{CqlTimestamp, CqlTimeuuid};
use scylla::FromRow;
use uuid::Uuid;

use super::{from_cql_timestamp, to_cql_timestamp};
use crate::error::StoreError;
use crate::models::{Trade, TradeType};

/// Columns shared by every trade table, in select/insert order.
pub const COLUMNS: [&str; 8] = [
    "account",
    "trade_time",
    "trade_id",
    "trade_type",
    "symbol",
    "quantity",
    "price",
    "amount",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TradeTable {
    ByDate,
    BySymbol,
    ByType,
    BySymbolAndType,
}

impl TradeTable {
    /// Fan-out order used by the write path.
    pub const ALL: [TradeTable; 4] = [
        TradeTable::ByDate,
        TradeTable::BySymbol,
        TradeTable::ByType,
        TradeTable::BySymbolAndType,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TradeTable::ByDate => "trades_by_date",
            TradeTable::BySymbol => "trades_by_symbol",
            TradeTable::ByType => "trades_by_type",
            TradeTable::BySymbolAndType => "trades_by_symbol_and_type",
        }
    }

    pub fn from_name(name: &str) -> Option<TradeTable> {
        TradeTable::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn keyed_by_symbol(&self) -> bool {
        matches!(self, TradeTable::BySymbol | TradeTable::BySymbolAndType)
    }

    pub fn keyed_by_type(&self) -> bool {
        matches!(self, TradeTable::ByType | TradeTable::BySymbolAndType)
    }

    pub fn partition_columns(&self) -> Vec<&'static str> {
        let mut columns = vec!["account"];
        if self.keyed_by_symbol() {
            columns.push("symbol");
        }
        if self.keyed_by_type() {
            columns.push("trade_type");
        }
        columns
    }

    pub fn insert_cql(&self) -> String {
        let markers = vec!["?"; COLUMNS.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name(),
            COLUMNS.join(", "),
            markers
        )
    }

    pub fn select_cql(&self) -> String {
        format!("SELECT {} FROM {}", COLUMNS.join(", "), self.name())
    }
}

impl fmt::Display for TradeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bind values for [`TradeTable::insert_cql`], in [`COLUMNS`] order.
pub type TradeValues = (
    String,
    CqlTimestamp,
    CqlTimeuuid,
    String,
    String,
    i32,
    f64,
    f64,
);

pub fn insert_values(trade: &Trade) -> TradeValues {
    (
        trade.account.clone(),
        to_cql_timestamp(trade.timestamp),
        CqlTimeuuid::from(trade.trade_id),
        trade.trade_type.as_str().to_string(),
        trade.symbol.clone(),
        trade.quantity,
        trade.price,
        trade.amount(),
    )
}

#[derive(Debug, Clone, FromRow)]
pub struct TradeRow {
    pub account: String,
    pub trade_time: CqlTimestamp,
    pub trade_id: CqlTimeuuid,
    pub trade_type: String,
    pub symbol: String,
    pub quantity: i32,
    pub price: f64,
    pub amount: f64,
}

impl TryFrom<TradeRow> for Trade {
    type Error = StoreError;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        let trade_type = row
            .trade_type
            .parse::<TradeType>()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Trade {
            account: row.account,
            trade_id: Uuid::from(row.trade_id),
            symbol: row.symbol,
            trade_type,
            quantity: row.quantity,
            price: row.price,
            timestamp: from_cql_timestamp(row.trade_time)?,
        })
    }
}
