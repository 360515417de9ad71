//! Error types for the account engine

use ledger_store::WithdrawalStatus;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Store error
    #[error(transparent)]
    Ledger(#[from] ledger_store::Error),

    /// Malformed wallet address
    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),

    /// Non-positive or otherwise malformed amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Requested more than the available balance
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Amount requested
        requested: Decimal,
        /// Balance available
        available: Decimal,
    },

    /// Requested more than the remaining allowance
    #[error("Allowance exceeded: requested {requested}, allowance {allowance}")]
    AllowanceExceeded {
        /// Amount requested
        requested: Decimal,
        /// Remaining allowance
        allowance: Decimal,
    },

    /// Withdrawal state machine violation
    #[error("Illegal withdrawal transition: {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: WithdrawalStatus,
        /// Requested state
        to: WithdrawalStatus,
    },

    /// Confirmation attempted by a wallet that does not own the request
    #[error("Wallet {wallet} does not own withdrawal request {request}")]
    NotRequestOwner {
        /// Request id
        request: Uuid,
        /// Confirming wallet
        wallet: String,
    },
}
