//! Password hashing for the long-term vault credential.
//!
//! Stored format: `hex(salt):hex(digest)` where digest is the SHA-256 of
//! the PBKDF2-HMAC-SHA256 output. The credential is verifiable but not
//! reversible; verification never errors on malformed input, a bad stored
//! string is simply a failed match.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

/// Iteration count for the stored credential. Slow on purpose.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

pub(crate) fn derive_key_material(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Hash a password for storage: fresh random salt, PBKDF2, SHA-256 digest.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let key = derive_key_material(password, &salt, PBKDF2_ITERATIONS);
    let digest = Sha256::digest(key);
    Ok(format!("{}:{}", hex::encode(salt), hex::encode(digest)))
}

/// Verify a password against a stored hash string.
///
/// A wrong password and a malformed stored string both return `false`;
/// wrong input is expected here, not a fault.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest_hex) else {
        return false;
    };
    let key = derive_key_material(password, &salt, PBKDF2_ITERATIONS);
    let digest = Sha256::digest(key);
    bool::from(digest.as_slice().ct_eq(expected.as_slice()))
}
