//! Error types shared by every crate in the workspace.

use uuid::Uuid;

use crate::entity::trades::TradeTable;

/// Failure reported by a [`Store`](crate::database::Store) backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("could not decode row: {0}")]
    Decode(String),

    #[error("unconfigured table {0}")]
    UnknownTable(String),

    #[error("keyspace {0} does not exist")]
    UnknownKeyspace(String),
}

/// One or more trade tables did not confirm a trade write.
///
/// Writes that did succeed are not rolled back.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "trade {trade_id} written to [{}], failed on [{}]",
    table_names(.succeeded),
    failures(.failed)
)]
pub struct PartialWriteError {
    pub trade_id: Uuid,
    pub succeeded: Vec<TradeTable>,
    pub failed: Vec<(TradeTable, StoreError)>,
}

fn table_names(tables: &[TradeTable]) -> String {
    tables
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn failures(failed: &[(TradeTable, StoreError)]) -> String {
    failed
        .iter()
        .map(|(table, err)| format!("{} ({})", table.name(), err))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not connect to cluster after {attempts} attempt(s): {message}")]
    Connectivity { attempts: u32, message: String },

    #[error("schema statement `{statement}` failed: {source}")]
    Schema {
        statement: String,
        #[source]
        source: StoreError,
    },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("partial write: {0}")]
    PartialWrite(#[from] PartialWriteError),

    #[error("{operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Error {
        move |source| Error::Store { operation, source }
    }

    /// Process exit code for this error: 2 for bad user input, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidFilter(_) | Error::Config(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::InvalidFilter("x".into()).exit_code(), 2);
        assert_eq!(Error::Config("x".into()).exit_code(), 2);
        let err = Error::Connectivity {
            attempts: 3,
            message: "refused".into(),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_partial_write_display_names_tables() {
        let err = PartialWriteError {
            trade_id: Uuid::nil(),
            succeeded: vec![TradeTable::ByDate],
            failed: vec![(TradeTable::ByType, StoreError::Query("timeout".into()))],
        };
        let text = err.to_string();
        assert!(text.contains("[trades_by_date]"));
        assert!(text.contains("trades_by_type (query failed: timeout)"));
    }

    #[test]
    fn test_partial_write_lists_every_failure() {
        let err = PartialWriteError {
            trade_id: Uuid::nil(),
            succeeded: Vec::new(),
            failed: vec![
                (TradeTable::BySymbol, StoreError::Query("timeout".into())),
                (
                    TradeTable::BySymbolAndType,
                    StoreError::UnknownTable("trades_by_symbol_and_type".into()),
                ),
            ],
        };
        assert_eq!(
            err.to_string(),
            "trade 00000000-0000-0000-0000-000000000000 written to [], failed on \
             [trades_by_symbol (query failed: timeout), \
             trades_by_symbol_and_type (unconfigured table trades_by_symbol_and_type)]"
        );

        let wrapped = Error::from(err);
        assert_eq!(wrapped.exit_code(), 1);
        assert!(wrapped.to_string().starts_with("partial write: trade "));
    }
}
