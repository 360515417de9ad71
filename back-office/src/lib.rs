//! Nexus Back Office
//!
//! Administrative surface over the ledger store: credentialed sessions,
//! dashboard aggregates, referral forest views, payout tier lookup,
//! live support chat, site settings, and event scheduling.
//!
//! Every mutating operation takes a session token issued by
//! [`auth::AdminAuth::login`] and verifies it before touching the
//! store, except chat message delivery, which both sides of a session
//! use.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod error;
pub mod referrals;
pub mod settings;
pub mod tiers;

pub use auth::{AdminAuth, SessionToken};
pub use dashboard::DashboardSnapshot;
pub use error::{Error, Result};
pub use referrals::{aggregate, build_forest, ReferralAggregate, ReferralNode};
pub use tiers::{daily_yield, lookup_tier};

use ledger_store::Store;
use std::sync::Arc;

/// Back-office service over an opened store
#[derive(Debug)]
pub struct BackOffice {
    store: Arc<Store>,
    auth: AdminAuth,
}

impl BackOffice {
    /// Create the back office; the admin credential comes from the
    /// store's configuration
    pub fn new(store: Arc<Store>) -> Self {
        let auth = AdminAuth::new(store.config().admin.clone());
        Self { store, auth }
    }

    /// The underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The admin authenticator
    pub fn auth(&self) -> &AdminAuth {
        &self.auth
    }

    /// The referral forest over all current users
    pub fn referral_forest(&self) -> Result<Vec<ReferralNode>> {
        Ok(build_forest(&self.store.list_users()?))
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use ledger_store::Config;

    pub(crate) const TEST_PASSWORD: &str = "test-password";

    fn test_config(dir: &std::path::Path, seed: bool) -> Config {
        let salt = "0badc0de0badc0de";
        let mut config = Config::default();
        config.data_dir = dir.to_path_buf();
        config.seed_on_first_open = seed;
        config.admin.password_salt_hex = salt.to_string();
        config.admin.password_digest_hex = AdminAuth::digest_for(salt, TEST_PASSWORD).unwrap();
        config
    }

    async fn open(seed: bool) -> (BackOffice, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = test_config(temp_dir.path(), seed);
        let store = Store::open(config).await.unwrap();
        (BackOffice::new(Arc::new(store)), temp_dir)
    }

    /// Back office over an empty store
    pub(crate) async fn back_office() -> (BackOffice, tempfile::TempDir) {
        open(false).await
    }

    /// Back office over the seeded demo dataset
    pub(crate) async fn back_office_seeded() -> (BackOffice, tempfile::TempDir) {
        open(true).await
    }

    impl BackOffice {
        /// Open an admin session with the test credential
        pub(crate) fn test_login(&self) -> SessionToken {
            self.auth()
                .login(&self.store().config().admin.username, TEST_PASSWORD)
                .unwrap()
        }
    }
}
