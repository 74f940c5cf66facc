//! Shared-secret session guard for the admin web UI.
//!
//! Presenting the configured `secret_key` at login yields a bearer token.
//! Tokens are stored as SHA-256 hashes (never plaintext) and compared in
//! constant time; repeated wrong secrets trip a lockout.

use sha2::{Digest, Sha256};
use std::sync::Mutex;
use std::time::Instant;

/// Maximum failed login attempts before lockout.
const MAX_FAILURES: u32 = 5;
/// Lockout duration in seconds after too many failures.
const LOCKOUT_SECS: u64 = 300;

/// SHA-256 hash a token for storage (never store plaintext).
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time equality comparison for secret strings.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub struct SessionGuard {
    secret_key: String,
    token_hashes: Mutex<Vec<String>>,
    failure_count: Mutex<u32>,
    lockout_until: Mutex<Option<Instant>>,
}

impl SessionGuard {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            token_hashes: Mutex::new(Vec::new()),
            failure_count: Mutex::new(0),
            lockout_until: Mutex::new(None),
        }
    }

    /// Attempt to log in with the shared secret.
    ///
    /// Returns:
    /// - `Ok(Some(token))` on success (secret matched, token issued)
    /// - `Ok(None)` if the secret was wrong
    /// - `Err(remaining_lockout_secs)` if locked out
    pub fn login(&self, secret: &str) -> Result<Option<String>, u64> {
        {
            let lockout = self
                .lockout_until
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(until) = *lockout {
                let remaining = until.saturating_duration_since(Instant::now());
                if !remaining.is_zero() {
                    return Err(remaining.as_secs().max(1));
                }
            }
        }

        if secret.is_empty() || !constant_time_eq(secret, &self.secret_key) {
            let mut failures = self
                .failure_count
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *failures += 1;
            if *failures >= MAX_FAILURES {
                let mut lockout = self
                    .lockout_until
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                *lockout = Some(Instant::now() + std::time::Duration::from_secs(LOCKOUT_SECS));
                *failures = 0;
            }
            return Ok(None);
        }

        let token = generate_session_token();
        {
            let mut hashes = self
                .token_hashes
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            hashes.push(hash_token(&token));
        }
        {
            let mut failures = self
                .failure_count
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *failures = 0;
        }

        Ok(Some(token))
    }

    /// Validate a bearer token against stored hashes.
    pub fn is_authenticated(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        let hash = hash_token(token);
        let hashes = self
            .token_hashes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut authenticated = false;
        for stored_hash in hashes.iter() {
            authenticated |= constant_time_eq(stored_hash, &hash);
        }
        authenticated
    }

    /// Invalidate one token.
    pub fn logout(&self, token: &str) {
        let hash = hash_token(token);
        let mut hashes = self
            .token_hashes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        hashes.retain(|stored| !constant_time_eq(stored, &hash));
    }
}

fn generate_session_token() -> String {
    use rand::RngCore;
    let mut buf = [0u8; 32];
    rand::rng().fill_bytes(&mut buf);
    format!("pg_{}", hex::encode(buf))
}
