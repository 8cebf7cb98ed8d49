use core_types::{CoreError, TradeId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Trade {0} was not found in the journal.")]
    NotFound(TradeId),

    #[error("Trade {0} is already closed.")]
    AlreadyClosed(TradeId),

    #[error("Stored trade record is invalid: {0}")]
    Corrupt(#[from] CoreError),

    #[error("Unknown journal column: {0}")]
    UnknownColumn(String),
}
