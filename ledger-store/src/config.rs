//! Configuration for the platform store

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Seed the store with the demo dataset on first open
    pub seed_on_first_open: bool,

    /// Welcome bonus credited on account creation and referred
    /// reconnection (ETH)
    pub welcome_bonus_eth: Decimal,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,

    /// Admin credential configuration
    pub admin: AdminConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/nexus"),
            service_name: "ledger-store".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            seed_on_first_open: true,
            welcome_bonus_eth: Decimal::new(5, 3), // 0.005 ETH
            rocksdb: RocksDbConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Admin credential configuration.
///
/// Only the salted SHA-256 digest of the password is ever stored; the
/// verification logic lives in the back-office crate. Empty salt/digest
/// means no admin login is possible until one is provisioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Admin username
    pub username: String,

    /// Hex-encoded password salt
    pub password_salt_hex: String,

    /// Hex-encoded SHA-256 digest of salt || password
    pub password_digest_hex: String,

    /// Session token lifetime (minutes)
    pub session_ttl_minutes: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password_salt_hex: String::new(),
            password_digest_hex: String::new(),
            session_ttl_minutes: 60,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("NEXUS_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(username) = std::env::var("NEXUS_ADMIN_USERNAME") {
            config.admin.username = username;
        }

        if let Ok(salt) = std::env::var("NEXUS_ADMIN_SALT_HEX") {
            config.admin.password_salt_hex = salt;
        }

        if let Ok(digest) = std::env::var("NEXUS_ADMIN_DIGEST_HEX") {
            config.admin.password_digest_hex = digest;
        }

        if let Ok(bonus) = std::env::var("NEXUS_WELCOME_BONUS_ETH") {
            config.welcome_bonus_eth = bonus
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid bonus amount: {}", e)))?;
        }

        Ok(config)
    }
}
