//! Holdings per account, one row per symbol.

use scylla::FromRow;

use crate::models::Position;

pub const TABLE: &str = "positions_by_account";

pub const INSERT: &str =
    "INSERT INTO positions_by_account (account, symbol, quantity, cost_basis) VALUES (?, ?, ?, ?)";

pub const SELECT_BY_ACCOUNT: &str =
    "SELECT account, symbol, quantity, cost_basis FROM positions_by_account WHERE account = ?";

pub type PositionValues = (String, String, i32, f64);

pub fn insert_values(position: &Position) -> PositionValues {
    (
        position.account.clone(),
        position.symbol.clone(),
        position.quantity,
        position.cost_basis,
    )
}

#[derive(Debug, Clone, FromRow)]
pub struct PositionRow {
    pub account: String,
    pub symbol: String,
    pub quantity: Option<i32>,
    pub cost_basis: Option<f64>,
}

impl From<PositionRow> for Position {
    fn from(row: PositionRow) -> Self {
        Position {
            account: row.account,
            symbol: row.symbol,
            quantity: row.quantity.unwrap_or(0),
            cost_basis: row.cost_basis.unwrap_or(0.0),
        }
    }
}
