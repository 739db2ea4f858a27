//! Storage for the active access/refresh token pair.
//!
//! The rest of the client only talks to [`CredentialStore`], so the medium
//! (memory, a file on disk, an OS keychain) can be swapped freely.
//!
//! Expiry follows cookie semantics: the access token disappears once the
//! backend-supplied expiry passes, the refresh token after a locally managed
//! lifetime counted from when it was stored.

pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

use crate::envelope::AuthTokens;
use crate::error::CredentialStoreError;

use common::RedactedToken;

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

pub const DEFAULT_REFRESH_LIFETIME_DAYS: u32 = 30;

pub fn refresh_lifetime_from_days(days: u32) -> TimeDelta {
    TimeDelta::days(i64::from(days))
}

/// Key/value access to the credential pair. No network, no validation.
pub trait CredentialStore: Send + Sync {
    /// Current access token, `None` when absent or expired.
    fn get_access(&self) -> Result<Option<RedactedToken>, CredentialStoreError>;

    /// Current refresh token, `None` when absent or expired.
    fn get_refresh(&self) -> Result<Option<RedactedToken>, CredentialStoreError>;

    /// Replace both tokens at once. Readers never see a mixed pair.
    fn set(
        &self,
        access: &RedactedToken,
        refresh: &RedactedToken,
        access_expiry: DateTime<Utc>,
    ) -> Result<(), CredentialStoreError>;

    /// Remove both tokens. Idempotent.
    fn clear(&self) -> Result<(), CredentialStoreError>;

    fn store_tokens(&self, tokens: &AuthTokens) -> Result<(), CredentialStoreError> {
        self.set(
            &tokens.access_token.token,
            &tokens.refresh_token.token,
            tokens.access_token.expires_at,
        )
    }
}

/// Persisted form of the credential pair.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    access_token: String,
    access_expires_at: DateTime<Utc>,
    refresh_token: String,
    refresh_expires_at: DateTime<Utc>,
}

impl StoredCredentials {
    pub fn issue(
        access: &RedactedToken,
        refresh: &RedactedToken,
        access_expiry: DateTime<Utc>,
        refresh_lifetime: TimeDelta,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access.expose().to_string(),
            access_expires_at: access_expiry,
            refresh_token: refresh.expose().to_string(),
            refresh_expires_at: now + refresh_lifetime,
        }
    }

    pub fn access_at(&self, now: DateTime<Utc>) -> Option<RedactedToken> {
        (now < self.access_expires_at).then(|| RedactedToken::new(self.access_token.as_str()))
    }

    pub fn refresh_at(&self, now: DateTime<Utc>) -> Option<RedactedToken> {
        (now < self.refresh_expires_at).then(|| RedactedToken::new(self.refresh_token.as_str()))
    }

    pub fn access_expires_at(&self) -> DateTime<Utc> {
        self.access_expires_at
    }

    pub fn refresh_expires_at(&self) -> DateTime<Utc> {
        self.refresh_expires_at
    }
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("access_token", &"[REDACTED]")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_token", &"[REDACTED]")
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

impl Drop for StoredCredentials {
    fn drop(&mut self) {
        self.access_token.zeroize();
        self.refresh_token.zeroize();
    }
}
