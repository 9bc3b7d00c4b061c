//! Writes a generated demo dataset through the regular write path.

use serde::Serialize;
use tracing::info;

use crate::context::AppContext;
use crate::error::Result;
use crate::fixtures::DemoData;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulateSummary {
    pub users: usize,
    pub accounts: Vec<String>,
    pub positions_count: usize,
    pub trades_count: usize,
}

impl PopulateSummary {
    pub fn accounts_count(&self) -> usize {
        self.accounts.len()
    }
}

/// Inserts accounts, then positions, then trades. Stops at the first failure.
pub async fn populate(ctx: &AppContext, data: &DemoData) -> Result<PopulateSummary> {
    info!(
        accounts = data.accounts.len(),
        positions = data.positions.len(),
        trades = data.trades.len(),
        "Populating demo data"
    );

    for account in &data.accounts {
        ctx.accounts.insert_account(account).await?;
    }
    info!("Inserted {} accounts", data.accounts.len());

    for position in &data.positions {
        ctx.positions.insert_position(position).await?;
    }
    info!("Inserted {} positions", data.positions.len());

    for (i, trade) in data.trades.iter().enumerate() {
        ctx.trades.insert_trade(trade).await?;
        if (i + 1) % 500 == 0 {
            info!("Inserted {}/{} trades", i + 1, data.trades.len());
        }
    }
    info!("Inserted {} trades into all trade tables", data.trades.len());

    Ok(PopulateSummary {
        users: data.users.len(),
        accounts: data
            .accounts
            .iter()
            .map(|a| a.account_number.clone())
            .collect(),
        positions_count: data.positions.len(),
        trades_count: data.trades.len(),
    })
}
