//! Out-of-band password reset.
//!
//! The user reads a random support code to a trusted operator; the
//! operator computes the matching unlock key from the application secret
//! and sends it back. Neither side ever transmits the vault password.
//!
//! The application secret is static, so compromising it breaks the reset
//! scheme for every install. Closing that hole takes a per-request
//! server-signed token, and there is no server here.

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Iteration count for the challenge key. Low: the derived key is never
/// stored and only authenticates a single short-lived code.
pub const CHALLENGE_ITERATIONS: u32 = 1_000;

const MASTER_SECRET: &[u8] = b"PLAYVAULT_RESET_MASTER_786";
const UNLOCK_KEY_LEN: usize = 12;

/// Random support code for the reset flow: 16 bytes, hex-encoded.
pub fn generate_support_code() -> String {
    let mut code = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut code);
    hex::encode(code)
}

/// Compute the unlock key an operator would issue for `support_code`:
/// PBKDF2 over the application secret salted with the code, then
/// HMAC-SHA256 of `<code>_unlock`, truncated to 12 uppercase hex chars.
pub fn expected_unlock_key(support_code: &str) -> Result<String, CryptoError> {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(
        MASTER_SECRET,
        support_code.as_bytes(),
        CHALLENGE_ITERATIONS,
        &mut key,
    );
    let mut mac =
        HmacSha256::new_from_slice(&key).map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    mac.update(support_code.as_bytes());
    mac.update(b"_unlock");
    let signature = mac.finalize().into_bytes();
    Ok(hex::encode(signature)[..UNLOCK_KEY_LEN].to_uppercase())
}

/// Case-insensitive check of a candidate unlock key. Never errors: an
/// invalid key is expected user input.
pub fn verify_unlock_key(support_code: &str, candidate: &str) -> bool {
    match expected_unlock_key(support_code) {
        Ok(expected) => candidate.to_uppercase() == expected,
        Err(_) => false,
    }
}
