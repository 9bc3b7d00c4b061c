use std::sync::Arc;

use tracing::info;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::Account;

pub struct AccountRepository {
    store: Arc<dyn Store>,
}

impl AccountRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn insert_account(&self, account: &Account) -> Result<()> {
        self.store
            .insert_account(account)
            .await
            .map_err(Error::store("insert account"))
    }

    /// Accounts owned by `username` in the order they were opened.
    /// Unknown users simply have no accounts.
    pub async fn list_accounts(&self, username: &str) -> Result<Vec<Account>> {
        info!(username, "Retrieving accounts");
        self.store
            .select_accounts(username)
            .await
            .map_err(Error::store("list accounts"))
    }
}
