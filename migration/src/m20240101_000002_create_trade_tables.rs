use async_trait::async_trait;
use shared::{Result, TradeTable};

use crate::{MigrationTrait, SchemaManager};

pub struct Migration;

pub(crate) fn create_trade_table_cql(table: TradeTable) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         account text, \
         trade_time timestamp, \
         trade_id timeuuid, \
         trade_type text, \
         symbol text, \
         quantity int, \
         price double, \
         amount double, \
         PRIMARY KEY (({}), trade_time, trade_id)) \
         WITH CLUSTERING ORDER BY (trade_time DESC, trade_id DESC)",
        table.name(),
        table.partition_columns().join(", ")
    )
}

#[async_trait]
impl MigrationTrait for Migration {
    fn name(&self) -> &'static str {
        "m20240101_000002_create_trade_tables"
    }

    async fn up(&self, manager: &SchemaManager<'_>) -> Result<()> {
        for table in TradeTable::ALL {
            manager
                .create_table(table.name(), create_trade_table_cql(table))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_key_per_table() {
        assert!(create_trade_table_cql(TradeTable::ByDate)
            .contains("PRIMARY KEY ((account), trade_time, trade_id)"));
        assert!(create_trade_table_cql(TradeTable::BySymbol)
            .contains("PRIMARY KEY ((account, symbol), trade_time, trade_id)"));
        assert!(create_trade_table_cql(TradeTable::ByType)
            .contains("PRIMARY KEY ((account, trade_type), trade_time, trade_id)"));
        assert!(create_trade_table_cql(TradeTable::BySymbolAndType)
            .contains("PRIMARY KEY ((account, symbol, trade_type), trade_time, trade_id)"));
    }

    #[test]
    fn test_trade_tables_cluster_newest_first() {
        for table in TradeTable::ALL {
            assert!(create_trade_table_cql(table)
                .ends_with("WITH CLUSTERING ORDER BY (trade_time DESC, trade_id DESC)"));
        }
    }
}
