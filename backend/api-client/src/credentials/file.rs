//! JSON file credential store.
//!
//! Writes go to a temp file that is renamed over the target, so a reader
//! always sees either the old pair or the new pair. On Unix the file is
//! readable by the owner only.

use crate::credentials::{CredentialStore, StoredCredentials};
use crate::error::CredentialStoreError;

use common::{ErrorLocation, RedactedToken};

use std::io::ErrorKind;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info};

const APP_DATA_DIR_NAME: &str = "clinic-dashboard";
const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Default credentials location: `{data_local_dir}/clinic-dashboard/credentials.json`.
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_DATA_DIR_NAME).join(CREDENTIALS_FILE_NAME))
}

pub struct FileCredentialStore {
    path: PathBuf,
    refresh_lifetime: TimeDelta,
    write_guard: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>, refresh_lifetime: TimeDelta) -> Self {
        Self {
            path: path.into(),
            refresh_lifetime,
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[track_caller]
    fn load(&self) -> Result<Option<StoredCredentials>, CredentialStoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CredentialStoreError::Read {
                    path: self.path.clone(),
                    source: e,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| CredentialStoreError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[track_caller]
    fn persist(&self, stored: &StoredCredentials) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CredentialStoreError::Write {
                path: parent.to_path_buf(),
                source: e,
                location: ErrorLocation::from(Location::caller()),
            })?;
        }

        let json = serde_json::to_string(stored).map_err(|e| CredentialStoreError::Serialize {
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = self.path.with_extension("json.tmp");

        std::fs::write(&temp_path, json).map_err(|e| CredentialStoreError::Write {
            path: temp_path.clone(),
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

        restrict_permissions(&temp_path)?;

        std::fs::rename(&temp_path, &self.path).map_err(|e| CredentialStoreError::Write {
            path: self.path.clone(),
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>, CredentialStoreError> {
        self.write_guard
            .lock()
            .map_err(|e| CredentialStoreError::poisoned(e.to_string()))
    }
}

#[cfg(unix)]
#[track_caller]
fn restrict_permissions(path: &Path) -> Result<(), CredentialStoreError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|e| {
        CredentialStoreError::Write {
            path: path.to_path_buf(),
            source: e,
            location: ErrorLocation::from(Location::caller()),
        }
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), CredentialStoreError> {
    Ok(())
}

impl CredentialStore for FileCredentialStore {
    fn get_access(&self) -> Result<Option<RedactedToken>, CredentialStoreError> {
        Ok(self.load()?.and_then(|stored| stored.access_at(Utc::now())))
    }

    fn get_refresh(&self) -> Result<Option<RedactedToken>, CredentialStoreError> {
        Ok(self.load()?.and_then(|stored| stored.refresh_at(Utc::now())))
    }

    fn set(
        &self,
        access: &RedactedToken,
        refresh: &RedactedToken,
        access_expiry: DateTime<Utc>,
    ) -> Result<(), CredentialStoreError> {
        let _guard = self.lock_writes()?;

        let stored = StoredCredentials::issue(
            access,
            refresh,
            access_expiry,
            self.refresh_lifetime,
            Utc::now(),
        );
        self.persist(&stored)?;

        debug!("Credentials written to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let _guard = self.lock_writes()?;

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Credentials removed from {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredentialStoreError::Write {
                path: self.path.clone(),
                source: e,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
