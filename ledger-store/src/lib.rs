//! Nexus Ledger Store
//!
//! Durable storage for the simulated mining platform: users,
//! conversion records, withdrawal requests, live-support sessions, and
//! site settings.
//!
//! # Architecture
//!
//! - **Single Writer**: one actor task serializes all mutations
//! - **Optimistic Concurrency**: every mutable record carries a version;
//!   stale writes are rejected, never silently merged
//! - **Atomic Batches**: multi-record mutations (referral linking,
//!   conversion + audit record, withdrawal finalization) commit in one
//!   RocksDB `WriteBatch`
//! - **Visible Failures**: a failed write fails the operation; nothing
//!   proceeds optimistically
//!
//! # Invariants
//!
//! - A wallet address identifies at most one user (case-insensitive)
//! - Transactions are append-only, never edited
//! - A withdrawal debits the platform balance exactly once, atomically
//!   with its `Approved` transition

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod metrics;
pub mod seed;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports
pub use config::{AdminConfig, Config};
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use storage::Storage;
pub use store::Store;
pub use types::{
    AppEvent, ChartPoint, ChatMessage, ChatSender, ChatSession, Currency, DepositAddresses,
    EventKind, GearTier, SiteSettings, SupportContact, Transaction, TransactionStatus, User,
    UserStatus, WalletAddress, WalletBalances, WithdrawalRequest, WithdrawalStatus,
};
