use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub account_number: String,
    /// Full name of the owning user, stored once per user partition.
    pub name: Option<String>,
    pub cash_balance: f64,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub account: String,
    pub symbol: String,
    pub quantity: i32,
    pub cost_basis: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub const ALL: [TradeType; 2] = [TradeType::Buy, TradeType::Sell];

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            other => Err(Error::InvalidFilter(format!(
                "trade type must be `buy` or `sell`, got `{}`",
                other
            ))),
        }
    }
}

/// An executed trade. The same logical row is stored in every trade table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub account: String,
    /// Time-ordered (v1) identifier, unique across all trades.
    pub trade_id: Uuid,
    pub symbol: String,
    pub trade_type: TradeType,
    pub quantity: i32,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn amount(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// Optional filters accepted by trade history queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeFilters {
    pub symbol: Option<String>,
    pub trade_type: Option<TradeType>,
}

impl TradeFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn trade_type(mut self, trade_type: TradeType) -> Self {
        self.trade_type = Some(trade_type);
        self
    }

    /// Builds filters from raw command-line values. Blank values count as absent.
    pub fn parse(symbol: Option<&str>, trade_type: Option<&str>) -> Result<Self, Error> {
        let symbol = symbol
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let trade_type = trade_type
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(TradeType::from_str)
            .transpose()?;
        Ok(Self { symbol, trade_type })
    }
}
