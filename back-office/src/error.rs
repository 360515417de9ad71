//! Error types for the back office

use thiserror::Error;

/// Result type for back-office operations
pub type Result<T> = std::result::Result<T, Error>;

/// Back-office errors
#[derive(Error, Debug)]
pub enum Error {
    /// Store error
    #[error(transparent)]
    Ledger(#[from] ledger_store::Error),

    /// Event id not present in site settings
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// Login rejected
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, expired, or revoked session token
    #[error("Unauthorized")]
    Unauthorized,

    /// Malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
