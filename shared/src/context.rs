//! Process-wide handles, created once at startup and passed to every command.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::database::{self, Store};
use crate::error::Result;
use crate::repositories::{AccountRepository, PositionRepository, TradeRepository};

pub struct AppContext {
    config: Config,
    store: Arc<dyn Store>,
    pub accounts: AccountRepository,
    pub positions: PositionRepository,
    pub trades: TradeRepository,
}

impl AppContext {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        AppContext {
            accounts: AccountRepository::new(store.clone()),
            positions: PositionRepository::new(store.clone()),
            trades: TradeRepository::new(store.clone(), config.logged_batch),
            config,
            store,
        }
    }

    /// Validates `config` and opens the cluster session.
    pub async fn connect(config: Config) -> Result<Self> {
        config.validate()?;
        let store = database::connect(&config).await?;
        Ok(Self::new(config, Arc::new(store)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Releases the session and its connection pool.
    pub fn shutdown(self) {
        info!("Closing cluster session");
        drop(self);
    }
}
