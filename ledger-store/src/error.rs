//! Error types for the ledger store

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Store errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Withdrawal request not found
    #[error("Withdrawal request not found: {0}")]
    WithdrawalNotFound(String),

    /// Record already exists (insert of a duplicate key)
    #[error("Record already exists in {collection}: {key}")]
    AlreadyExists {
        /// Collection name
        collection: &'static str,
        /// Record key
        key: String,
    },

    /// Stale write: the record changed since it was read
    #[error("Version conflict in {collection} for {key}: expected {expected}, found {found}")]
    VersionConflict {
        /// Collection name
        collection: &'static str,
        /// Record key
        key: String,
        /// Version the writer expected
        expected: u64,
        /// Version actually stored
        found: u64,
    },

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
