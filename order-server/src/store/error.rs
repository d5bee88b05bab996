use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Store is closed")]
    Closed,

    #[error("Transaction aborted at command {index}: {command}")]
    Aborted { index: usize, command: String },

    #[error("Invalid scan cursor: {0}")]
    InvalidCursor(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type StoreResult<T> = Result<T, StoreError>;
