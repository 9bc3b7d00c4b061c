//! Trade history routing.
//!
//! A trade query is always answered by exactly one of the four trade tables:
//! the one whose partition key covers the filters the caller supplied.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};

use crate::entity::trades::TradeTable;
use crate::error::{Error, Result};
use crate::models::{Trade, TradeFilters, TradeType};

/// Row cap applied when the caller does not ask for one.
pub const DEFAULT_TRADE_LIMIT: u32 = 100;

/// Picks the trade table able to serve `filters` with a single-partition read.
pub fn select_trades_table(filters: &TradeFilters) -> TradeTable {
    match (filters.symbol.is_some(), filters.trade_type.is_some()) {
        (true, true) => TradeTable::BySymbolAndType,
        (true, false) => TradeTable::BySymbol,
        (false, true) => TradeTable::ByType,
        (false, false) => TradeTable::ByDate,
    }
}

/// A bind value for a parameterized query, independent of the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Timestamp(DateTime<Utc>),
    Int(i32),
}

/// A validated, fully routed trade history query.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeQuery {
    pub table: TradeTable,
    pub account: String,
    pub symbol: Option<String>,
    pub trade_type: Option<TradeType>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: u32,
}

impl TradeQuery {
    pub fn builder(account: impl Into<String>) -> TradeQueryBuilder {
        TradeQueryBuilder {
            account: account.into(),
            filters: TradeFilters::default(),
            start: None,
            end: None,
            limit: None,
        }
    }

    /// Parameterized CQL for this query. Only bind markers carry caller input.
    pub fn cql(&self) -> String {
        let mut cql = format!("{} WHERE account = ?", self.table.select_cql());
        if self.table.keyed_by_symbol() {
            cql.push_str(" AND symbol = ?");
        }
        if self.table.keyed_by_type() {
            cql.push_str(" AND trade_type = ?");
        }
        if self.start.is_some() {
            cql.push_str(" AND trade_time >= ?");
        }
        if self.end.is_some() {
            cql.push_str(" AND trade_time <= ?");
        }
        cql.push_str(" LIMIT ?");
        cql
    }

    /// Bind values matching the markers of [`TradeQuery::cql`], in order.
    pub fn values(&self) -> Vec<QueryValue> {
        let mut values = vec![QueryValue::Text(self.account.clone())];
        if let (true, Some(symbol)) = (self.table.keyed_by_symbol(), &self.symbol) {
            values.push(QueryValue::Text(symbol.clone()));
        }
        if let (true, Some(trade_type)) = (self.table.keyed_by_type(), self.trade_type) {
            values.push(QueryValue::Text(trade_type.as_str().to_string()));
        }
        if let Some(start) = self.start {
            values.push(QueryValue::Timestamp(start));
        }
        if let Some(end) = self.end {
            values.push(QueryValue::Timestamp(end));
        }
        // build() rejects limits above i32::MAX
        values.push(QueryValue::Int(self.limit as i32));
        values
    }

    /// True when `trade` lives in the partition and time range this query reads.
    pub fn matches(&self, trade: &Trade) -> bool {
        if trade.account != self.account {
            return false;
        }
        if self.table.keyed_by_symbol() && self.symbol.as_deref() != Some(trade.symbol.as_str()) {
            return false;
        }
        if self.table.keyed_by_type() && self.trade_type != Some(trade.trade_type) {
            return false;
        }
        if self.start.is_some_and(|start| trade.timestamp < start) {
            return false;
        }
        if self.end.is_some_and(|end| trade.timestamp > end) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct TradeQueryBuilder {
    account: String,
    filters: TradeFilters,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    limit: Option<u32>,
}

impl TradeQueryBuilder {
    pub fn filters(mut self, filters: TradeFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn start(mut self, start: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self
    }

    pub fn end(mut self, end: Option<DateTime<Utc>>) -> Self {
        self.end = end;
        self
    }

    /// Parses command-line date bounds. See [`parse_date`] for accepted formats.
    pub fn dates(self, start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let start = start.map(|s| parse_date(s, DateBound::Start)).transpose()?;
        let end = end.map(|s| parse_date(s, DateBound::End)).transpose()?;
        Ok(self.start(start).end(end))
    }

    pub fn limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }

    pub fn build(self) -> Result<TradeQuery> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(Error::InvalidFilter(format!(
                    "start date {} is after end date {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                )));
            }
        }

        let limit = self.limit.unwrap_or(DEFAULT_TRADE_LIMIT);
        if limit == 0 || limit > i32::MAX as u32 {
            return Err(Error::InvalidFilter(format!(
                "limit must be between 1 and {}, got {}",
                i32::MAX,
                limit
            )));
        }

        Ok(TradeQuery {
            table: select_trades_table(&self.filters),
            account: self.account,
            symbol: self.filters.symbol,
            trade_type: self.filters.trade_type,
            // bounds bind as millisecond timestamps
            start: self.start.map(|start| start.trunc_subsecs(3)),
            end: self.end.map(|end| end.trunc_subsecs(3)),
            limit,
        })
    }
}

/// Which side of a range a date-only value stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

/// Parses `YYYY-MM-DD`, ISO 8601 local date-times (`T` or space separated,
/// minutes or seconds with optional fraction) or RFC 3339.
///
/// Values without an offset are UTC. A date-only end bound covers the whole day.
pub fn parse_date(value: &str, bound: DateBound) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| Error::InvalidFilter(format!("unrecognized date `{}`", value)))?;
    let naive = match bound {
        DateBound::Start => date.and_hms_opt(0, 0, 0),
        DateBound::End => date.and_hms_milli_opt(23, 59, 59, 999),
    }
    .ok_or_else(|| Error::InvalidFilter(format!("unrecognized date `{}`", value)))?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_select_trades_table_covers_every_combination() {
        let cases = [
            (Some("ETSY"), Some(TradeType::Buy), TradeTable::BySymbolAndType),
            (Some("ETSY"), None, TradeTable::BySymbol),
            (None, Some(TradeType::Sell), TradeTable::ByType),
            (None, None, TradeTable::ByDate),
        ];
        for (symbol, trade_type, expected) in cases {
            let filters = TradeFilters {
                symbol: symbol.map(str::to_string),
                trade_type,
            };
            assert_eq!(select_trades_table(&filters), expected, "{:?}", filters);
        }
    }

    #[test]
    fn test_cql_for_symbol_and_type_with_range() {
        let query = TradeQuery::builder("A1")
            .filters(TradeFilters::new().symbol("ETSY").trade_type(TradeType::Buy))
            .dates(Some("2024-01-01"), Some("2024-01-31"))
            .unwrap()
            .limit(Some(5))
            .build()
            .unwrap();

        assert_eq!(
            query.cql(),
            "SELECT account, trade_time, trade_id, trade_type, symbol, quantity, price, amount \
             FROM trades_by_symbol_and_type WHERE account = ? AND symbol = ? AND trade_type = ? \
             AND trade_time >= ? AND trade_time <= ? LIMIT ?"
        );
        let values = query.values();
        assert_eq!(values.len(), 6);
        assert_eq!(values[0], QueryValue::Text("A1".to_string()));
        assert_eq!(values[1], QueryValue::Text("ETSY".to_string()));
        assert_eq!(values[2], QueryValue::Text("buy".to_string()));
        assert_eq!(values[5], QueryValue::Int(5));
    }

    #[test]
    fn test_cql_keeps_filter_values_out_of_query_text() {
        let query = TradeQuery::builder("A1'; DROP TABLE x; --")
            .filters(TradeFilters::new().symbol("' OR 1=1"))
            .build()
            .unwrap();
        let cql = query.cql();
        assert!(!cql.contains("DROP"));
        assert!(!cql.contains("OR 1=1"));
        assert_eq!(cql.matches('?').count(), query.values().len());
    }

    #[test]
    fn test_default_limit() {
        let query = TradeQuery::builder("A1").build().unwrap();
        assert_eq!(query.table, TradeTable::ByDate);
        assert_eq!(query.limit, DEFAULT_TRADE_LIMIT);
        assert!(query.cql().ends_with("WHERE account = ? LIMIT ?"));
    }

    #[test]
    fn test_start_after_end_is_invalid() {
        let result = TradeQuery::builder("A1")
            .dates(Some("2024-02-01"), Some("2024-01-01"))
            .unwrap()
            .build();
        assert!(matches!(result, Err(Error::InvalidFilter(_))));
    }

    #[test]
    fn test_zero_limit_is_invalid() {
        let result = TradeQuery::builder("A1").limit(Some(0)).build();
        assert!(matches!(result, Err(Error::InvalidFilter(_))));
    }

    #[test]
    fn test_same_day_range_is_valid() {
        let query = TradeQuery::builder("A1")
            .dates(Some("2024-01-01"), Some("2024-01-01"))
            .unwrap()
            .build()
            .unwrap();
        let end = query.end.unwrap();
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();
        assert_eq!(parse_date("2024-03-05T10:30:00", DateBound::Start).unwrap(), expected);
        assert_eq!(parse_date("2024-03-05 10:30:00", DateBound::Start).unwrap(), expected);
        assert_eq!(parse_date("2024-03-05T12:30:00+02:00", DateBound::Start).unwrap(), expected);
        assert_eq!(
            parse_date("2024-03-05", DateBound::Start).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
        assert!(matches!(
            parse_date("05/03/2024", DateBound::Start),
            Err(Error::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_parse_iso_fractions_and_minutes() {
        assert_eq!(
            parse_date("2024-03-05T10:30:00.500", DateBound::Start).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap() + chrono::Duration::milliseconds(500)
        );
        assert_eq!(
            parse_date("2024-03-05 10:30:00.25", DateBound::End).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap() + chrono::Duration::milliseconds(250)
        );
        let minutes = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();
        assert_eq!(parse_date("2024-03-05T10:30", DateBound::Start).unwrap(), minutes);
        assert_eq!(parse_date("2024-03-05 10:30", DateBound::End).unwrap(), minutes);
    }

    #[test]
    fn test_range_bounds_truncate_to_milliseconds() {
        let query = TradeQuery::builder("A1")
            .dates(Some("2024-03-05T10:30:00.123456"), Some("2024-03-05T10:30:00.999999"))
            .unwrap()
            .build()
            .unwrap();
        let base = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();
        assert_eq!(query.start, Some(base + chrono::Duration::milliseconds(123)));
        assert_eq!(query.end, Some(base + chrono::Duration::milliseconds(999)));
    }
}
