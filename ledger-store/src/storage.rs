//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `users` - User records (key: normalized wallet address)
//! - `transactions` - Append-only conversion log (key: transaction id)
//! - `withdrawals` - Withdrawal requests (key: request id)
//! - `chat` - Live-support sessions (key: wallet address)
//! - `settings` - Singleton site settings (key: `site`)
//! - `indices` - Secondary indices for fast lookups
//!
//! # Concurrency
//!
//! Every mutable record carries a `version`. Writers submit the record
//! with the version they read; the store rejects the write with
//! [`Error::VersionConflict`] if the stored version differs, and bumps
//! the version on success. Multi-record mutations commit through one
//! atomic `WriteBatch`.

use crate::{
    error::{Error, Result},
    types::{ChatSession, SiteSettings, Transaction, User, WalletAddress, WithdrawalRequest},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode, Options,
    WriteBatch, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_USERS: &str = "users";
const CF_TRANSACTIONS: &str = "transactions";
const CF_WITHDRAWALS: &str = "withdrawals";
const CF_CHAT: &str = "chat";
const CF_SETTINGS: &str = "settings";
const CF_INDICES: &str = "indices";

/// Settings singleton key
const SETTINGS_KEY: &[u8] = b"site";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_USERS, Self::cf_options_hot()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_cold()),
            ColumnFamilyDescriptor::new(CF_WITHDRAWALS, Self::cf_options_hot()),
            ColumnFamilyDescriptor::new(CF_CHAT, Self::cf_options_hot()),
            ColumnFamilyDescriptor::new(CF_SETTINGS, Self::cf_options_hot()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_hot() -> Options {
        let mut opts = Options::default();
        // Frequently read collections, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_cold() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // User operations

    /// Look up a user by wallet address
    pub fn find_user(&self, wallet: &WalletAddress) -> Result<Option<User>> {
        let cf = self.cf_handle(CF_USERS)?;
        let value = self.db.get_cf(cf, wallet.as_str().as_bytes())?;
        value.map(|v| bincode::deserialize(&v).map_err(Error::from)).transpose()
    }

    /// Get a user, failing if absent
    pub fn get_user(&self, wallet: &WalletAddress) -> Result<User> {
        self.find_user(wallet)?
            .ok_or_else(|| Error::UserNotFound(wallet.to_string()))
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let cf = self.cf_handle(CF_USERS)?;
        let mut users = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            users.push(bincode::deserialize(&value)?);
        }
        Ok(users)
    }

    /// Update a user with a compare-and-swap on `user.version`
    pub fn put_user(&self, user: &User) -> Result<User> {
        let cf = self.cf_handle(CF_USERS)?;
        let key = user.wallet_address.as_str().as_bytes().to_vec();

        let stored = self
            .find_user(&user.wallet_address)?
            .ok_or_else(|| Error::UserNotFound(user.wallet_address.to_string()))?;
        Self::check_version("users", user.wallet_address.as_str(), user.version, stored.version)?;

        let mut next = user.clone();
        next.version += 1;
        self.db.put_cf(cf, key, bincode::serialize(&next)?)?;

        tracing::debug!(wallet = %next.wallet_address, version = next.version, "User updated");

        Ok(next)
    }

    /// Insert a new user, optionally updating the referral parent in the
    /// same atomic batch.
    ///
    /// The new user must not exist; the parent (if supplied) is written
    /// with a compare-and-swap on its version. The referral-code index
    /// entry is committed in the same batch.
    pub fn insert_user_with_parent(
        &self,
        user: &User,
        parent: Option<&User>,
    ) -> Result<(User, Option<User>)> {
        let cf_users = self.cf_handle(CF_USERS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        if self.find_user(&user.wallet_address)?.is_some() {
            return Err(Error::AlreadyExists {
                collection: "users",
                key: user.wallet_address.to_string(),
            });
        }

        let parent_next = match parent {
            Some(p) => {
                let stored = self
                    .find_user(&p.wallet_address)?
                    .ok_or_else(|| Error::UserNotFound(p.wallet_address.to_string()))?;
                Self::check_version("users", p.wallet_address.as_str(), p.version, stored.version)?;
                let mut next = p.clone();
                next.version += 1;
                Some(next)
            }
            None => None,
        };

        let mut user_next = user.clone();
        user_next.version += 1;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            cf_users,
            user_next.wallet_address.as_str().as_bytes(),
            bincode::serialize(&user_next)?,
        );
        if let Some(ref p) = parent_next {
            batch.put_cf(
                cf_users,
                p.wallet_address.as_str().as_bytes(),
                bincode::serialize(p)?,
            );
        }
        batch.put_cf(
            cf_indices,
            Self::index_key_referral_code(&user_next.referral_code),
            user_next.wallet_address.as_str().as_bytes(),
        );

        self.db.write(batch)?;

        tracing::info!(
            wallet = %user_next.wallet_address,
            parent = parent_next.as_ref().map(|p| p.wallet_address.as_str()).unwrap_or("-"),
            "User created"
        );

        Ok((user_next, parent_next))
    }

    /// Resolve a referral code to its owner
    pub fn find_user_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let key = Self::index_key_referral_code(code);

        match self.db.get_cf(cf_indices, key)? {
            Some(wallet_bytes) => {
                let wallet = WalletAddress::new(String::from_utf8_lossy(&wallet_bytes));
                self.find_user(&wallet)
            }
            None => Ok(None),
        }
    }

    // Transaction operations

    /// Append a conversion record (with its per-user index entry)
    pub fn insert_transaction(&self, tx: &Transaction) -> Result<()> {
        let cf_tx = self.cf_handle(CF_TRANSACTIONS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(cf_tx, tx.id.as_bytes(), bincode::serialize(tx)?);
        batch.put_cf(
            cf_indices,
            Self::index_key_user_transaction(&tx.user_wallet, tx.id),
            [],
        );
        self.db.write(batch)?;

        Ok(())
    }

    /// Apply a conversion: CAS-update the user and append the transaction
    /// record in one atomic batch.
    pub fn record_conversion(&self, user: &User, tx: &Transaction) -> Result<User> {
        let cf_users = self.cf_handle(CF_USERS)?;
        let cf_tx = self.cf_handle(CF_TRANSACTIONS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let stored = self
            .find_user(&user.wallet_address)?
            .ok_or_else(|| Error::UserNotFound(user.wallet_address.to_string()))?;
        Self::check_version("users", user.wallet_address.as_str(), user.version, stored.version)?;

        let mut user_next = user.clone();
        user_next.version += 1;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            cf_users,
            user_next.wallet_address.as_str().as_bytes(),
            bincode::serialize(&user_next)?,
        );
        batch.put_cf(cf_tx, tx.id.as_bytes(), bincode::serialize(tx)?);
        batch.put_cf(
            cf_indices,
            Self::index_key_user_transaction(&tx.user_wallet, tx.id),
            [],
        );
        self.db.write(batch)?;

        tracing::debug!(
            wallet = %user_next.wallet_address,
            transaction_id = %tx.id,
            "Conversion recorded"
        );

        Ok(user_next)
    }

    /// Transactions for one wallet, in id (time) order
    pub fn transactions_for_user(&self, wallet: &WalletAddress) -> Result<Vec<Transaction>> {
        let ids = self.scan_index_ids(Self::index_prefix_user_transaction(wallet))?;
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let mut txs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(value) = self.db.get_cf(cf, id.as_bytes())? {
                txs.push(bincode::deserialize(&value)?);
            }
        }
        Ok(txs)
    }

    /// List all transactions
    pub fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let mut txs = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            txs.push(bincode::deserialize(&value)?);
        }
        Ok(txs)
    }

    // Withdrawal operations

    /// Insert a new withdrawal request
    pub fn insert_withdrawal(&self, request: &WithdrawalRequest) -> Result<WithdrawalRequest> {
        let cf = self.cf_handle(CF_WITHDRAWALS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        if self.db.get_cf(cf, request.id.as_bytes())?.is_some() {
            return Err(Error::AlreadyExists {
                collection: "withdrawals",
                key: request.id.to_string(),
            });
        }

        let mut next = request.clone();
        next.version += 1;

        let mut batch = WriteBatch::default();
        batch.put_cf(cf, next.id.as_bytes(), bincode::serialize(&next)?);
        batch.put_cf(
            cf_indices,
            Self::index_key_user_withdrawal(&next.user_wallet, next.id),
            [],
        );
        self.db.write(batch)?;

        tracing::info!(
            request_id = %next.id,
            wallet = %next.user_wallet,
            status = %next.status,
            "Withdrawal request created"
        );

        Ok(next)
    }

    /// Get a withdrawal request by id
    pub fn get_withdrawal(&self, id: Uuid) -> Result<WithdrawalRequest> {
        let cf = self.cf_handle(CF_WITHDRAWALS)?;
        let value = self
            .db
            .get_cf(cf, id.as_bytes())?
            .ok_or_else(|| Error::WithdrawalNotFound(id.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Update a withdrawal request with a compare-and-swap on its version
    pub fn put_withdrawal(&self, request: &WithdrawalRequest) -> Result<WithdrawalRequest> {
        let cf = self.cf_handle(CF_WITHDRAWALS)?;

        let stored = self.get_withdrawal(request.id)?;
        Self::check_version(
            "withdrawals",
            &request.id.to_string(),
            request.version,
            stored.version,
        )?;

        let mut next = request.clone();
        next.version += 1;
        self.db.put_cf(cf, next.id.as_bytes(), bincode::serialize(&next)?)?;

        Ok(next)
    }

    /// Finalize a withdrawal: the status transition and the balance debit
    /// commit as one atomic batch, both compare-and-swapped.
    pub fn finalize_withdrawal(
        &self,
        user: &User,
        request: &WithdrawalRequest,
    ) -> Result<(User, WithdrawalRequest)> {
        let cf_users = self.cf_handle(CF_USERS)?;
        let cf_wd = self.cf_handle(CF_WITHDRAWALS)?;

        let stored_user = self
            .find_user(&user.wallet_address)?
            .ok_or_else(|| Error::UserNotFound(user.wallet_address.to_string()))?;
        Self::check_version(
            "users",
            user.wallet_address.as_str(),
            user.version,
            stored_user.version,
        )?;

        let stored_request = self.get_withdrawal(request.id)?;
        Self::check_version(
            "withdrawals",
            &request.id.to_string(),
            request.version,
            stored_request.version,
        )?;

        let mut user_next = user.clone();
        user_next.version += 1;
        let mut request_next = request.clone();
        request_next.version += 1;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            cf_users,
            user_next.wallet_address.as_str().as_bytes(),
            bincode::serialize(&user_next)?,
        );
        batch.put_cf(cf_wd, request_next.id.as_bytes(), bincode::serialize(&request_next)?);
        self.db.write(batch)?;

        tracing::info!(
            request_id = %request_next.id,
            wallet = %user_next.wallet_address,
            status = %request_next.status,
            "Withdrawal finalized"
        );

        Ok((user_next, request_next))
    }

    /// Withdrawal requests for one wallet
    pub fn withdrawals_for_user(&self, wallet: &WalletAddress) -> Result<Vec<WithdrawalRequest>> {
        let ids = self.scan_index_ids(Self::index_prefix_user_withdrawal(wallet))?;
        let cf = self.cf_handle(CF_WITHDRAWALS)?;

        let mut requests = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(value) = self.db.get_cf(cf, id.as_bytes())? {
                requests.push(bincode::deserialize(&value)?);
            }
        }
        Ok(requests)
    }

    /// List all withdrawal requests
    pub fn list_withdrawals(&self) -> Result<Vec<WithdrawalRequest>> {
        let cf = self.cf_handle(CF_WITHDRAWALS)?;
        let mut requests = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            requests.push(bincode::deserialize(&value)?);
        }
        Ok(requests)
    }

    // Chat operations

    /// Look up a chat session by wallet
    pub fn get_chat(&self, wallet: &WalletAddress) -> Result<Option<ChatSession>> {
        let cf = self.cf_handle(CF_CHAT)?;
        let value = self.db.get_cf(cf, wallet.as_str().as_bytes())?;
        value.map(|v| bincode::deserialize(&v).map_err(Error::from)).transpose()
    }

    /// Upsert a chat session. A session with version 0 may be inserted
    /// fresh; otherwise the stored version must match.
    pub fn put_chat(&self, session: &ChatSession) -> Result<ChatSession> {
        let cf = self.cf_handle(CF_CHAT)?;

        let stored_version = self.get_chat(&session.wallet)?.map(|s| s.version).unwrap_or(0);
        Self::check_version("chat", session.wallet.as_str(), session.version, stored_version)?;

        let mut next = session.clone();
        next.version += 1;
        self.db
            .put_cf(cf, next.wallet.as_str().as_bytes(), bincode::serialize(&next)?)?;

        Ok(next)
    }

    /// List all chat sessions
    pub fn list_chats(&self) -> Result<Vec<ChatSession>> {
        let cf = self.cf_handle(CF_CHAT)?;
        let mut sessions = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            sessions.push(bincode::deserialize(&value)?);
        }
        Ok(sessions)
    }

    // Settings operations

    /// Get site settings, if seeded
    pub fn get_settings(&self) -> Result<Option<SiteSettings>> {
        let cf = self.cf_handle(CF_SETTINGS)?;
        let value = self.db.get_cf(cf, SETTINGS_KEY)?;
        value.map(|v| bincode::deserialize(&v).map_err(Error::from)).transpose()
    }

    /// Upsert site settings with a compare-and-swap on the version
    pub fn put_settings(&self, settings: &SiteSettings) -> Result<SiteSettings> {
        let cf = self.cf_handle(CF_SETTINGS)?;

        let stored_version = self.get_settings()?.map(|s| s.version).unwrap_or(0);
        Self::check_version("settings", "site", settings.version, stored_version)?;

        let mut next = settings.clone();
        next.version += 1;
        self.db.put_cf(cf, SETTINGS_KEY, bincode::serialize(&next)?)?;

        Ok(next)
    }

    // Version / index helpers

    fn check_version(
        collection: &'static str,
        key: &str,
        expected: u64,
        found: u64,
    ) -> Result<()> {
        if expected != found {
            return Err(Error::VersionConflict {
                collection,
                key: key.to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }

    fn index_key_referral_code(code: &str) -> Vec<u8> {
        let mut key = b"rc|".to_vec();
        key.extend_from_slice(code.as_bytes());
        key
    }

    fn index_prefix_user_transaction(wallet: &WalletAddress) -> Vec<u8> {
        let mut key = b"tx|".to_vec();
        key.extend_from_slice(wallet.as_str().as_bytes());
        key.push(b'|');
        key
    }

    fn index_key_user_transaction(wallet: &WalletAddress, id: Uuid) -> Vec<u8> {
        let mut key = Self::index_prefix_user_transaction(wallet);
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn index_prefix_user_withdrawal(wallet: &WalletAddress) -> Vec<u8> {
        let mut key = b"wd|".to_vec();
        key.extend_from_slice(wallet.as_str().as_bytes());
        key.push(b'|');
        key
    }

    fn index_key_user_withdrawal(wallet: &WalletAddress, id: Uuid) -> Vec<u8> {
        let mut key = Self::index_prefix_user_withdrawal(wallet);
        key.extend_from_slice(id.as_bytes());
        key
    }

    /// Scan an index prefix, extracting the trailing record UUID from
    /// each matching key.
    fn scan_index_ids(&self, prefix: Vec<u8>) -> Result<Vec<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            if key.len() == prefix.len() + 16 {
                let id_bytes: [u8; 16] = key[prefix.len()..].try_into().unwrap();
                ids.push(Uuid::from_bytes(id_bytes));
            }
        }
        Ok(ids)
    }

    // Statistics

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            total_users: self.list_users()?.len() as u64,
            total_transactions: self.list_transactions()?.len() as u64,
            total_withdrawals: self.list_withdrawals()?.len() as u64,
            total_chat_sessions: self.list_chats()?.len() as u64,
        })
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// User count
    pub total_users: u64,
    /// Transaction count
    pub total_transactions: u64,
    /// Withdrawal request count
    pub total_withdrawals: u64,
    /// Chat session count
    pub total_chat_sessions: u64,
}
