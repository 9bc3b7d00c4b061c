//! Schema manager: creates the keyspace and every table the demo reads from.
//!
//! All statements are `IF NOT EXISTS`, so running the migrator against an
//! existing schema is a no-op.

use async_trait::async_trait;
use shared::{Error, Result, SchemaStatement, Store};
use tracing::info;

mod m20240101_000001_create_accounts_and_positions;
mod m20240101_000002_create_trade_tables;

#[async_trait]
pub trait MigrationTrait: Send + Sync {
    fn name(&self) -> &'static str;

    async fn up(&self, manager: &SchemaManager<'_>) -> Result<()>;
}

/// Runs schema statements against a [`Store`], with logging and error context.
pub struct SchemaManager<'a> {
    store: &'a dyn Store,
}

impl<'a> SchemaManager<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub async fn create_table(&self, name: &str, cql: String) -> Result<()> {
        self.execute(SchemaStatement::create_table(name, cql)).await
    }

    async fn execute(&self, statement: SchemaStatement) -> Result<()> {
        info!(target_object = statement.target(), "Applying schema statement");
        self.store
            .execute_schema(&statement)
            .await
            .map_err(|source| Error::Schema {
                statement: statement.cql(),
                source,
            })
    }
}

pub struct Migrator;

impl Migrator {
    pub fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_accounts_and_positions::Migration),
            Box::new(m20240101_000002_create_trade_tables::Migration),
        ]
    }

    /// Creates `keyspace`, switches the session to it and applies every migration.
    pub async fn ensure_schema(
        store: &dyn Store,
        keyspace: &str,
        replication_factor: u32,
    ) -> Result<()> {
        let manager = SchemaManager::new(store);
        manager
            .execute(SchemaStatement::create_keyspace(keyspace, replication_factor))
            .await?;
        store
            .use_keyspace(keyspace)
            .await
            .map_err(Error::store("use keyspace"))?;

        for migration in Self::migrations() {
            info!(migration = migration.name(), "Running migration");
            migration.up(&manager).await?;
        }
        info!(keyspace, "Schema is up to date");
        Ok(())
    }
}
