//! Static credential table.
//!
//! Passwords are kept as SHA-256 digests and compared in constant time.
//! Unknown users are checked against a dummy digest, so a lookup costs
//! the same whether or not the username exists.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use metaweblog_types::{Identity, Result, WeblogError};

use crate::traits::Authenticator;

struct UserRecord {
    user_id: u64,
    digest: [u8; 32],
}

/// Authenticator backed by a fixed username → password-digest table.
#[derive(Default)]
pub struct StaticAuthenticator {
    users: HashMap<String, UserRecord>,
    next_id: u64,
}

impl StaticAuthenticator {
    /// Creates an authenticator with no users; every call is rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user with a plain-text password.
    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        let digest = sha256(password.as_bytes());
        self.insert(username, digest);
        self
    }

    /// Adds a user with a hex-encoded SHA-256 password digest.
    ///
    /// # Errors
    ///
    /// [`WeblogError::ConfigError`] if `digest_hex` is not 64 hex characters.
    pub fn with_digest(mut self, username: &str, digest_hex: &str) -> Result<Self> {
        let bytes = hex::decode(digest_hex).map_err(|_| WeblogError::ConfigError {
            reason: format!("password digest for '{username}' is not valid hex"),
        })?;
        let digest: [u8; 32] = bytes.try_into().map_err(|_| WeblogError::ConfigError {
            reason: format!("password digest for '{username}' must be 32 bytes"),
        })?;
        self.insert(username, digest);
        Ok(self)
    }

    /// Number of configured users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if no user is configured.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn insert(&mut self, username: &str, digest: [u8; 32]) {
        self.next_id += 1;
        self.users.insert(
            username.to_string(),
            UserRecord {
                user_id: self.next_id,
                digest,
            },
        );
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Identity>> {
        let provided = sha256(password.as_bytes());
        match self.users.get(username) {
            Some(record) if constant_time_eq(&provided, &record.digest) => Ok(Some(Identity {
                user_id: record.user_id,
                username: username.to_string(),
            })),
            Some(_) => Ok(None),
            None => {
                let _ = constant_time_eq(&provided, &[0u8; 32]);
                Ok(None)
            }
        }
    }
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Compares two byte slices in constant time.
///
/// Returns `true` if and only if `a` and `b` are equal in both
/// length and content.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
