use async_trait::async_trait;
use shared::entity::{accounts_by_user, positions_by_account};
use shared::Result;

use crate::{MigrationTrait, SchemaManager};

pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_accounts_and_positions"
    }

    async fn up(&self, manager: &SchemaManager<'_>) -> Result<()> {
        // name is static: one owner name per username partition
        manager
            .create_table(
                accounts_by_user::TABLE,
                format!(
                    "CREATE TABLE IF NOT EXISTS {} (\
                     username text, \
                     opened_at timestamp, \
                     account_number text, \
                     cash_balance double, \
                     name text STATIC, \
                     PRIMARY KEY ((username), opened_at, account_number))",
                    accounts_by_user::TABLE
                ),
            )
            .await?;

        manager
            .create_table(
                positions_by_account::TABLE,
                format!(
                    "CREATE TABLE IF NOT EXISTS {} (\
                     account text, \
                     symbol text, \
                     quantity int, \
                     cost_basis double, \
                     PRIMARY KEY ((account), symbol))",
                    positions_by_account::TABLE
                ),
            )
            .await
    }
}
