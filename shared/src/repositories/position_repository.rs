use std::sync::Arc;

use tracing::info;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::Position;

pub struct PositionRepository {
    store: Arc<dyn Store>,
}

impl PositionRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn insert_position(&self, position: &Position) -> Result<()> {
        self.store
            .insert_position(position)
            .await
            .map_err(Error::store("insert position"))
    }

    /// Every position held by `account`, ordered by symbol.
    pub async fn list_positions(&self, account: &str) -> Result<Vec<Position>> {
        info!(account, "Retrieving positions");
        self.store
            .select_positions(account)
            .await
            .map_err(Error::store("list positions"))
    }
}
