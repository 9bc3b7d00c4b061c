use anyhow::Result;
use serde::Serialize;
use shared::fixtures::FixtureConfig;
use shared::{AppContext, TradeQuery};

pub mod accounts;
pub mod populate;
pub mod positions;
pub mod trades;

pub use accounts::handle_accounts;
pub use populate::handle_populate;
pub use positions::handle_positions;
pub use trades::handle_trades;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Table,
    Json,
}

/// A fully validated command, ready to run against the cluster.
#[derive(Debug, Clone)]
pub enum Request {
    Populate(FixtureConfig),
    Accounts { username: String },
    Positions { account: String },
    Trades(TradeQuery),
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Populate(_) => "populate",
            Request::Accounts { .. } => "accounts",
            Request::Positions { .. } => "positions",
            Request::Trades(_) => "trades",
        }
    }
}

/// Runs `request` and returns what should be printed on stdout.
pub async fn dispatch(ctx: &AppContext, request: Request, output: Output) -> Result<String> {
    match request {
        Request::Populate(config) => handle_populate(ctx, config, output).await,
        Request::Accounts { username } => handle_accounts(ctx, &username, output).await,
        Request::Positions { account } => handle_positions(ctx, &account, output).await,
        Request::Trades(query) => handle_trades(ctx, &query, output).await,
    }
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use shared::{AppContext, Config, MemoryStore};

    pub fn context() -> AppContext {
        AppContext::new(Config::default(), Arc::new(MemoryStore::with_schema()))
    }
}
