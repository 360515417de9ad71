//! Admin credential verification and session tokens
//!
//! Passwords are never stored or compared in the clear. The config
//! carries a hex salt and the SHA-256 digest of `salt || password`;
//! login recomputes the digest and compares in constant time. A
//! successful login issues a random 32-byte session token with an
//! expiry, held in an in-process map and revoked on logout.
//!
//! An empty configured digest means no credential has been provisioned
//! and every login fails.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ledger_store::AdminConfig;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Opaque session token handed out by [`AdminAuth::login`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// The token in hex form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
struct Session {
    expires_at: DateTime<Utc>,
}

/// Admin authenticator with in-process session tracking
#[derive(Debug)]
pub struct AdminAuth {
    config: AdminConfig,
    sessions: DashMap<String, Session>,
}

impl AdminAuth {
    /// Build an authenticator from the configured credential
    pub fn new(config: AdminConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
        }
    }

    /// Compute the hex digest stored in config for a salt and password.
    /// Used when provisioning a credential.
    pub fn digest_for(salt_hex: &str, password: &str) -> Result<String> {
        let salt = decode_hex(salt_hex)?;
        let mut hasher = Sha256::new();
        hasher.update(&salt);
        hasher.update(password.as_bytes());
        Ok(encode_hex(&hasher.finalize()))
    }

    /// Verify credentials and issue a session token
    pub fn login(&self, username: &str, password: &str) -> Result<SessionToken> {
        if self.config.password_digest_hex.is_empty() {
            tracing::warn!("Admin login attempted with no credential provisioned");
            return Err(Error::InvalidCredentials);
        }

        let expected = decode_hex(&self.config.password_digest_hex)?;
        let actual = {
            let salt = decode_hex(&self.config.password_salt_hex)?;
            let mut hasher = Sha256::new();
            hasher.update(&salt);
            hasher.update(password.as_bytes());
            hasher.finalize()
        };

        let name_ok = username == self.config.username;
        if !(name_ok && constant_time_eq(&expected, &actual)) {
            tracing::warn!(username, "Admin login rejected");
            return Err(Error::InvalidCredentials);
        }

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = encode_hex(&bytes);

        let ttl = Duration::minutes(self.config.session_ttl_minutes as i64);
        self.sessions.insert(
            token.clone(),
            Session {
                expires_at: Utc::now() + ttl,
            },
        );

        tracing::info!(username, "Admin session opened");
        Ok(SessionToken(token))
    }

    /// Check a token. Expired tokens are removed as they are seen.
    pub fn verify(&self, token: &str) -> Result<()> {
        // Copy the expiry out so the read guard is released before
        // `remove` takes a write lock on the same shard.
        let expires_at = self.sessions.get(token).map(|s| s.expires_at);
        match expires_at {
            Some(expires_at) if expires_at > Utc::now() => Ok(()),
            Some(_) => {
                drop(self.sessions.remove(token));
                Err(Error::Unauthorized)
            }
            None => Err(Error::Unauthorized),
        }
    }

    /// Revoke a token
    pub fn logout(&self, token: &str) {
        self.sessions.remove(token);
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(Error::InvalidInput(format!(
            "odd-length hex string: {}",
            hex.len()
        )));
    }
    // Operates on raw bytes; anything outside [0-9a-fA-F], multibyte
    // input included, is an error
    fn nibble(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| match (nibble(pair[0]), nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(Error::InvalidInput("non-hex character".to_string())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provisioned() -> AdminAuth {
        let salt = "a1b2c3d4e5f60718";
        let mut config = AdminConfig::default();
        config.password_salt_hex = salt.to_string();
        config.password_digest_hex = AdminAuth::digest_for(salt, "correct horse").unwrap();
        AdminAuth::new(config)
    }

    #[test]
    fn test_login_verify_logout() {
        let auth = provisioned();

        let token = auth.login("admin", "correct horse").unwrap();
        assert!(auth.verify(token.as_str()).is_ok());

        auth.logout(token.as_str());
        assert!(matches!(
            auth.verify(token.as_str()),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_wrong_credentials_rejected() {
        let auth = provisioned();

        assert!(matches!(
            auth.login("admin", "wrong"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("root", "correct horse"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn test_malformed_hex_config_rejected() {
        assert_eq!(decode_hex("00ff").unwrap(), vec![0x00, 0xff]);
        assert!(matches!(decode_hex("abc"), Err(Error::InvalidInput(_))));
        assert!(matches!(decode_hex("zz"), Err(Error::InvalidInput(_))));

        // Multibyte UTF-8 must be an error, never a slice panic
        assert!(matches!(decode_hex("€a"), Err(Error::InvalidInput(_))));
        assert!(matches!(
            AdminAuth::digest_for("€a", "pw"),
            Err(Error::InvalidInput(_))
        ));

        // A login against a corrupt configured salt fails cleanly too
        let mut config = AdminConfig::default();
        config.password_salt_hex = "€a".to_string();
        config.password_digest_hex = "00ff".to_string();
        let auth = AdminAuth::new(config);
        assert!(matches!(
            auth.login("admin", "pw"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let auth = provisioned();
        assert!(matches!(auth.verify("deadbeef"), Err(Error::Unauthorized)));
    }

    #[test]
    fn test_unprovisioned_login_impossible() {
        let auth = AdminAuth::new(AdminConfig::default());
        assert!(matches!(
            auth.login("admin", "password"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn test_expired_session_rejected() {
        let salt = "00ff";
        let mut config = AdminConfig::default();
        config.password_salt_hex = salt.to_string();
        config.password_digest_hex = AdminAuth::digest_for(salt, "pw").unwrap();
        config.session_ttl_minutes = 0;
        let auth = AdminAuth::new(config);

        let token = auth.login("admin", "pw").unwrap();
        assert!(matches!(
            auth.verify(token.as_str()),
            Err(Error::Unauthorized)
        ));
    }
}
