//! Per-table row mappings and CQL text for the investments keyspace.

pub mod accounts_by_user;
pub mod positions_by_account;
pub mod trades;

use chrono::{DateTime, TimeZone, Utc};
use scylla::frame::value::CqlTimestamp;

use crate::error::StoreError;

pub(crate) fn to_cql_timestamp(value: DateTime<Utc>) -> CqlTimestamp {
    CqlTimestamp(value.timestamp_millis())
}

pub(crate) fn from_cql_timestamp(value: CqlTimestamp) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(value.0)
        .single()
        .ok_or_else(|| StoreError::Decode(format!("timestamp {} out of range", value.0)))
}
