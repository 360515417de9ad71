//! Nexus Account Engine
//!
//! Balance-mutating operations layered on the ledger store: account
//! lifecycle (wallet connection, referral linking, welcome bonus),
//! conversion with allowance enforcement, direct transfer, and the
//! withdrawal workflow state machine.
//!
//! Every operation follows the same shape: read the current records
//! from the store, validate, produce updated records, and submit them
//! through the store's single-writer actor with compare-and-swap
//! versions. Validation lives inside the operations, not in callers.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod conversion;
pub mod error;
pub mod lifecycle;
pub mod transfer;
pub mod withdrawal;

pub use error::{Error, Result};
pub use lifecycle::ConnectOutcome;

use ledger_store::Store;
use std::sync::Arc;

/// Account engine, orchestrating balance-mutating operations on the
/// ledger store
pub struct AccountEngine {
    store: Arc<Store>,
}

impl AccountEngine {
    /// Create an engine over an opened store
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl std::fmt::Debug for AccountEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountEngine").finish_non_exhaustive()
    }
}
