//! Main store orchestration layer
//!
//! Ties together storage, the single-writer actor, seeding, and metrics
//! into a high-level API. The `Store` is an explicitly constructed
//! instance with a lifecycle (opened at process start, shut down at
//! exit); nothing in this crate is a global.
//!
//! # Example
//!
//! ```no_run
//! use ledger_store::{Config, Store};
//!
//! #[tokio::main]
//! async fn main() -> ledger_store::Result<()> {
//!     let store = Store::open(Config::default()).await?;
//!     let users = store.list_users()?;
//!     tracing::info!("{} users", users.len());
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_store_actor, StoreHandle},
    seed,
    types::{
        ChatSession, SiteSettings, Transaction, User, WalletAddress, WithdrawalRequest,
    },
    Config, Error, Metrics, Result, Storage,
};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Main store interface
pub struct Store {
    /// Actor handle for mutations
    handle: StoreHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Change sequence receiver template
    changes: watch::Receiver<u64>,

    /// Metrics collector
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Store {
    /// Open the store, seeding it on first open if configured
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);

        // The settings singleton doubles as the "has been seeded" marker
        if config.seed_on_first_open && storage.get_settings()?.is_none() {
            Self::apply_seed(&storage)?;
        }

        let metrics = Metrics::new()
            .map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;
        let (handle, changes) = spawn_store_actor(storage.clone(), metrics.clone());

        Ok(Self {
            handle,
            storage,
            changes,
            metrics,
            config,
        })
    }

    fn apply_seed(storage: &Storage) -> Result<()> {
        let data = seed::seed_data();

        // The settings marker is written last; a crash mid-seed leaves
        // earlier records behind without it. Records from such a partial
        // run are skipped, not errors, so re-seeding always completes.
        for user in &data.users {
            match storage.insert_user_with_parent(user, None) {
                Ok(_) | Err(Error::AlreadyExists { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        for tx in &data.transactions {
            storage.insert_transaction(tx)?;
        }
        for request in &data.withdrawals {
            match storage.insert_withdrawal(request) {
                Ok(_) | Err(Error::AlreadyExists { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        storage.put_settings(&data.settings)?;

        tracing::info!(
            users = data.users.len(),
            transactions = data.transactions.len(),
            withdrawals = data.withdrawals.len(),
            "Seed dataset applied"
        );

        Ok(())
    }

    /// Store configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Subscribe to the change sequence. The value increments after
    /// every committed mutation; observers re-read on change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.clone()
    }

    // Reads (direct to storage)

    /// Look up a user by wallet address
    pub fn find_user(&self, wallet: &WalletAddress) -> Result<Option<User>> {
        self.storage.find_user(wallet)
    }

    /// Get a user, failing if absent
    pub fn get_user(&self, wallet: &WalletAddress) -> Result<User> {
        self.storage.get_user(wallet)
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.storage.list_users()
    }

    /// Resolve a referral code to its owner
    pub fn find_user_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        self.storage.find_user_by_referral_code(code)
    }

    /// Transactions for one wallet
    pub fn transactions_for_user(&self, wallet: &WalletAddress) -> Result<Vec<Transaction>> {
        self.storage.transactions_for_user(wallet)
    }

    /// List all transactions
    pub fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.storage.list_transactions()
    }

    /// Get a withdrawal request by id
    pub fn get_withdrawal(&self, id: Uuid) -> Result<WithdrawalRequest> {
        self.storage.get_withdrawal(id)
    }

    /// Withdrawal requests for one wallet
    pub fn withdrawals_for_user(&self, wallet: &WalletAddress) -> Result<Vec<WithdrawalRequest>> {
        self.storage.withdrawals_for_user(wallet)
    }

    /// List all withdrawal requests
    pub fn list_withdrawals(&self) -> Result<Vec<WithdrawalRequest>> {
        self.storage.list_withdrawals()
    }

    /// Look up a chat session by wallet
    pub fn get_chat(&self, wallet: &WalletAddress) -> Result<Option<ChatSession>> {
        self.storage.get_chat(wallet)
    }

    /// List all chat sessions
    pub fn list_chats(&self) -> Result<Vec<ChatSession>> {
        self.storage.list_chats()
    }

    /// Get site settings (always present after seeding)
    pub fn get_settings(&self) -> Result<SiteSettings> {
        self.storage
            .get_settings()?
            .ok_or_else(|| Error::Other("Site settings not initialized".to_string()))
    }

    // Mutations (through the actor)

    /// Insert a new user, optionally bumping the referral parent
    pub async fn insert_user_with_parent(
        &self,
        user: User,
        parent: Option<User>,
    ) -> Result<(User, Option<User>)> {
        self.handle.insert_user_with_parent(user, parent).await
    }

    /// Compare-and-swap update of one user
    pub async fn put_user(&self, user: User) -> Result<User> {
        self.handle.put_user(user).await
    }

    /// Apply a conversion atomically
    pub async fn record_conversion(&self, user: User, transaction: Transaction) -> Result<User> {
        self.handle.record_conversion(user, transaction).await
    }

    /// Insert a withdrawal request
    pub async fn insert_withdrawal(&self, request: WithdrawalRequest) -> Result<WithdrawalRequest> {
        self.handle.insert_withdrawal(request).await
    }

    /// Compare-and-swap update of a withdrawal request
    pub async fn put_withdrawal(&self, request: WithdrawalRequest) -> Result<WithdrawalRequest> {
        self.handle.put_withdrawal(request).await
    }

    /// Finalize a withdrawal atomically
    pub async fn finalize_withdrawal(
        &self,
        user: User,
        request: WithdrawalRequest,
    ) -> Result<(User, WithdrawalRequest)> {
        self.handle.finalize_withdrawal(user, request).await
    }

    /// Upsert a chat session
    pub async fn put_chat(&self, session: ChatSession) -> Result<ChatSession> {
        self.handle.put_chat(session).await
    }

    /// Upsert site settings
    pub async fn put_settings(&self, settings: SiteSettings) -> Result<SiteSettings> {
        self.handle.put_settings(settings).await
    }

    // Document export

    /// Export the whole dataset as one JSON document:
    /// `{users[], transactions[], withdrawals[], settings{}, chat_sessions{}}`
    pub fn export_document(&self) -> Result<serde_json::Value> {
        let chat_sessions: serde_json::Map<String, serde_json::Value> = self
            .list_chats()?
            .into_iter()
            .map(|s| {
                let key = s.wallet.to_string();
                serde_json::to_value(&s).map(|v| (key, v))
            })
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Other(format!("Export serialization failed: {}", e)))?;

        let doc = serde_json::json!({
            "users": self.list_users()?,
            "transactions": self.list_transactions()?,
            "withdrawals": self.list_withdrawals()?,
            "settings": self.get_settings()?,
            "chat_sessions": chat_sessions,
        });

        Ok(doc)
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<crate::storage::StorageStats> {
        self.storage.stats()
    }

    /// Shutdown the store
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("service", &self.config.service_name)
            .finish_non_exhaustive()
    }
}
