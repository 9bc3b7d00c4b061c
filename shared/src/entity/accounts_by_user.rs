//! Accounts grouped by owning user.
//!
//! Clustered by `opened_at` so a user's accounts come back in the order they
//! were created. The user's full name is a static column of the partition.

use scylla::frame::value::CqlTimestamp;
use scylla::FromRow;

use super::{from_cql_timestamp, to_cql_timestamp};
use crate::error::StoreError;
use crate::models::Account;

pub const TABLE: &str = "accounts_by_user";

pub const INSERT: &str = "INSERT INTO accounts_by_user \
    (username, opened_at, account_number, cash_balance, name) VALUES (?, ?, ?, ?, ?)";

pub const SELECT_BY_USERNAME: &str = "SELECT username, account_number, name, cash_balance, opened_at \
    FROM accounts_by_user WHERE username = ?";

pub type AccountValues = (String, CqlTimestamp, String, f64, Option<String>);

pub fn insert_values(account: &Account) -> AccountValues {
    (
        account.username.clone(),
        to_cql_timestamp(account.opened_at),
        account.account_number.clone(),
        account.cash_balance,
        account.name.clone(),
    )
}

#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub username: String,
    pub account_number: String,
    pub name: Option<String>,
    pub cash_balance: Option<f64>,
    pub opened_at: CqlTimestamp,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            username: row.username,
            account_number: row.account_number,
            name: row.name,
            cash_balance: row.cash_balance.unwrap_or(0.0),
            opened_at: from_cql_timestamp(row.opened_at)?,
        })
    }
}
