use crate::credentials::{
    CredentialStore, DEFAULT_REFRESH_LIFETIME_DAYS, StoredCredentials, refresh_lifetime_from_days,
};
use crate::error::CredentialStoreError;

use common::RedactedToken;

use std::sync::RwLock;

use chrono::{DateTime, TimeDelta, Utc};

/// Process-local credential store.
///
/// Nothing survives a restart; the user logs in again.
pub struct MemoryCredentialStore {
    credentials: RwLock<Option<StoredCredentials>>,
    refresh_lifetime: TimeDelta,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::with_refresh_lifetime(refresh_lifetime_from_days(DEFAULT_REFRESH_LIFETIME_DAYS))
    }

    pub fn with_refresh_lifetime(refresh_lifetime: TimeDelta) -> Self {
        Self {
            credentials: RwLock::new(None),
            refresh_lifetime,
        }
    }

    fn read<T>(
        &self,
        pick: impl FnOnce(&StoredCredentials) -> Option<T>,
    ) -> Result<Option<T>, CredentialStoreError> {
        let guard = self
            .credentials
            .read()
            .map_err(|e| CredentialStoreError::poisoned(e.to_string()))?;

        Ok(guard.as_ref().and_then(pick))
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_access(&self) -> Result<Option<RedactedToken>, CredentialStoreError> {
        self.read(|stored| stored.access_at(Utc::now()))
    }

    fn get_refresh(&self) -> Result<Option<RedactedToken>, CredentialStoreError> {
        self.read(|stored| stored.refresh_at(Utc::now()))
    }

    fn set(
        &self,
        access: &RedactedToken,
        refresh: &RedactedToken,
        access_expiry: DateTime<Utc>,
    ) -> Result<(), CredentialStoreError> {
        let stored = StoredCredentials::issue(
            access,
            refresh,
            access_expiry,
            self.refresh_lifetime,
            Utc::now(),
        );

        let mut guard = self
            .credentials
            .write()
            .map_err(|e| CredentialStoreError::poisoned(e.to_string()))?;
        *guard = Some(stored);

        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut guard = self
            .credentials
            .write()
            .map_err(|e| CredentialStoreError::poisoned(e.to_string()))?;
        *guard = None;

        Ok(())
    }
}
