//! Session key derivation.
//!
//! The session key only protects vault data for the lifetime of one
//! session, so it uses a lower iteration count than the stored credential
//! and a fixed application salt: the same password re-derives the same key
//! on every unlock, which is what lets a cached export stand in for the
//! password after a reload.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

/// Iteration count for the session key.
pub const SESSION_KEY_ITERATIONS: u32 = 50_000;

const SESSION_SALT: &[u8] = b"playvault-session-salt";

/// 32-byte AES-256-GCM key derived from the vault password. Zeroized on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SessionKey(pub(crate) [u8; 32]);

impl SessionKey {
    /// Hex-encode the key for caching in session-scoped storage.
    pub fn export(&self) -> String {
        hex::encode(self.0)
    }

    /// Restore a key previously produced by [`SessionKey::export`].
    pub fn import(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(encoded)?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("session key must be 32 bytes".into()))?;
        Ok(Self(key))
    }
}

/// Derive the session key from the vault password.
pub fn derive_session_key(password: &str) -> Result<SessionKey, CryptoError> {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        SESSION_SALT,
        SESSION_KEY_ITERATIONS,
        &mut out,
    );
    Ok(SessionKey(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_session_key("abc123").unwrap();
        let b = derive_session_key("abc123").unwrap();
        assert_eq!(a.0, b.0);
        assert_ne!(a.0, derive_session_key("abc124").unwrap().0);
    }

    #[test]
    fn export_import_roundtrip() {
        let key = derive_session_key("abc123").unwrap();
        let restored = SessionKey::import(&key.export()).unwrap();
        assert_eq!(key.0, restored.0);
    }

    #[test]
    fn import_rejects_bad_material() {
        assert!(SessionKey::import("not hex").is_err());
        assert!(SessionKey::import("abcd").is_err());
    }
}
