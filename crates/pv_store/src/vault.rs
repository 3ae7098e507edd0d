//! Vault session controller.
//!
//! Long-term state is the password hash in a credentials file. Session
//! state is the hex-exported session key in a cache file under a
//! session-scoped directory: a reload inside the same session restores
//! the key without the password, and the host wipes the directory when
//! the session ends, which is the intended lock-on-close behavior. The
//! derived key itself lives only in memory and is zeroized on lock.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use pv_crypto::{
    challenge,
    kdf::{derive_session_key, SessionKey},
    password,
};

use crate::error::StoreError;

/// Minimum accepted vault password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Externally visible state of the vault gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultStatus {
    NoPasswordSet,
    Locked,
    Unlocked,
    /// Reset flow: a support code is out for out-of-band delivery.
    ChallengeIssued { support_code: String },
    /// Reset flow: the user is entering the operator-issued unlock key.
    AwaitingUnlockKey { support_code: String },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsFile {
    password_hash: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionCacheFile {
    session_key: String,
}

enum Gate {
    NoPassword,
    Locked,
    Unlocked { key: SessionKey },
    ChallengeIssued { code: String },
    AwaitingUnlockKey { code: String },
}

/// Shared controller handle; clone freely, state lives behind the lock.
#[derive(Clone)]
pub struct VaultController {
    credentials_path: PathBuf,
    session_cache_path: PathBuf,
    gate: Arc<RwLock<Gate>>,
}

impl VaultController {
    /// Inspect persisted state and start in the matching gate state: a
    /// readable session cache resumes `Unlocked` without the password,
    /// otherwise a stored credential means `Locked`. A corrupt cache
    /// falls back to `Locked`, never an error.
    pub fn start(
        credentials_path: impl Into<PathBuf>,
        session_cache_path: impl Into<PathBuf>,
    ) -> Self {
        let credentials_path = credentials_path.into();
        let session_cache_path = session_cache_path.into();
        let has_password = read_credentials(&credentials_path).is_some();
        let gate = match restore_session_key(&session_cache_path) {
            Some(key) => {
                info!("vault session restored from cache");
                Gate::Unlocked { key }
            }
            None if has_password => Gate::Locked,
            None => Gate::NoPassword,
        };
        Self {
            credentials_path,
            session_cache_path,
            gate: Arc::new(RwLock::new(gate)),
        }
    }

    pub async fn status(&self) -> VaultStatus {
        match &*self.gate.read().await {
            Gate::NoPassword => VaultStatus::NoPasswordSet,
            Gate::Locked => VaultStatus::Locked,
            Gate::Unlocked { .. } => VaultStatus::Unlocked,
            Gate::ChallengeIssued { code } => VaultStatus::ChallengeIssued {
                support_code: code.clone(),
            },
            Gate::AwaitingUnlockKey { code } => VaultStatus::AwaitingUnlockKey {
                support_code: code.clone(),
            },
        }
    }

    pub async fn is_unlocked(&self) -> bool {
        matches!(&*self.gate.read().await, Gate::Unlocked { .. })
    }

    pub fn is_password_set(&self) -> bool {
        read_credentials(&self.credentials_path).is_some()
    }

    /// Set the vault password and unlock in one step: there is no separate
    /// login right after setup.
    pub async fn set_password(&self, password: &str) -> Result<(), StoreError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(StoreError::InvalidCredential(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let pw = password.to_string();
        // PBKDF2 is CPU-bound; keep it off the async executor threads.
        let (hash, key) = tokio::task::spawn_blocking(move || {
            let hash = password::hash_password(&pw)?;
            let key = derive_session_key(&pw)?;
            Ok::<_, pv_crypto::CryptoError>((hash, key))
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;

        write_credentials(&self.credentials_path, &hash)?;
        write_session_cache(&self.session_cache_path, &key)?;
        *self.gate.write().await = Gate::Unlocked { key };
        info!("vault password set; vault unlocked");
        Ok(())
    }

    /// Try to unlock with a password. `Ok(false)` on a wrong password (the
    /// gate stays locked); errors are reserved for storage faults.
    pub async fn unlock(&self, password: &str) -> Result<bool, StoreError> {
        let Some(stored_hash) = read_credentials(&self.credentials_path) else {
            return Ok(false);
        };
        let pw = password.to_string();
        let verified = tokio::task::spawn_blocking(move || {
            if !password::verify_password(&pw, &stored_hash) {
                return Ok::<_, pv_crypto::CryptoError>(None);
            }
            derive_session_key(&pw).map(Some)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;

        match verified {
            Some(key) => {
                write_session_cache(&self.session_cache_path, &key)?;
                *self.gate.write().await = Gate::Unlocked { key };
                info!("vault unlocked");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Lock the vault: drop the session cache and zeroize the in-memory
    /// key. The long-term credential is untouched.
    pub async fn lock(&self) -> Result<(), StoreError> {
        remove_if_exists(&self.session_cache_path)?;
        let mut gate = self.gate.write().await;
        if matches!(*gate, Gate::Unlocked { .. }) {
            *gate = Gate::Locked;
            info!("vault locked");
        }
        Ok(())
    }

    /// Issue a reset challenge and return the support code the user reads
    /// to the operator.
    pub async fn start_reset(&self) -> String {
        let code = challenge::generate_support_code();
        *self.gate.write().await = Gate::ChallengeIssued { code: code.clone() };
        info!("vault reset challenge issued");
        code
    }

    /// The user reports having received an unlock key; move to key entry.
    pub async fn await_unlock_key(&self) {
        let mut gate = self.gate.write().await;
        if let Gate::ChallengeIssued { code } = &*gate {
            let code = code.clone();
            *gate = Gate::AwaitingUnlockKey { code };
        }
    }

    /// Verify an operator-issued unlock key against the outstanding
    /// challenge. A valid key discards the stored credential entirely (the
    /// next step is a fresh `set_password`); an invalid key leaves the
    /// challenge outstanding and returns `Ok(false)`.
    pub async fn submit_unlock_key(&self, unlock_key: &str) -> Result<bool, StoreError> {
        let mut gate = self.gate.write().await;
        let code = match &*gate {
            Gate::ChallengeIssued { code } | Gate::AwaitingUnlockKey { code } => code.clone(),
            _ => return Ok(false),
        };
        if !challenge::verify_unlock_key(&code, unlock_key) {
            return Ok(false);
        }
        remove_if_exists(&self.credentials_path)?;
        remove_if_exists(&self.session_cache_path)?;
        *gate = Gate::NoPassword;
        info!("vault credential discarded after verified reset");
        Ok(true)
    }

    /// Clone of the in-memory session key for encrypt/decrypt operations.
    pub async fn session_key(&self) -> Result<SessionKey, StoreError> {
        match &*self.gate.read().await {
            Gate::Unlocked { key } => Ok(key.clone()),
            _ => Err(StoreError::VaultLocked),
        }
    }
}

fn read_credentials(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str::<CredentialsFile>(&raw)
        .ok()
        .map(|c| c.password_hash)
}

fn write_credentials(path: &Path, password_hash: &str) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = CredentialsFile {
        password_hash: password_hash.to_string(),
    };
    fs::write(path, serde_json::to_string(&file)?)?;
    Ok(())
}

fn restore_session_key(path: &Path) -> Option<SessionKey> {
    let raw = fs::read_to_string(path).ok()?;
    let cache: SessionCacheFile = match serde_json::from_str(&raw) {
        Ok(cache) => cache,
        Err(err) => {
            warn!(%err, "session key cache is corrupt; starting locked");
            return None;
        }
    };
    match SessionKey::import(&cache.session_key) {
        Ok(key) => Some(key),
        Err(err) => {
            warn!(%err, "session key cache is corrupt; starting locked");
            None
        }
    }
}

fn write_session_cache(path: &Path, key: &SessionKey) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = SessionCacheFile {
        session_key: key.export(),
    };
    fs::write(path, serde_json::to_string(&file)?)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
