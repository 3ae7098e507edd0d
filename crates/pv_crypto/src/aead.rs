//! Authenticated encryption for vault payloads.
//!
//! AES-256-GCM, fresh random 12-byte IV per call.
//! Wire format: `hex(iv):hex(ciphertext + tag)`.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};

use crate::{error::CryptoError, kdf::SessionKey};

const IV_LEN: usize = 12;

/// Encrypt `plaintext` under a session key.
pub fn encrypt(plaintext: &[u8], key: &SessionKey) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(&key.0).map_err(|_| CryptoError::AeadEncrypt)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::AeadEncrypt)?;
    Ok(format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext)))
}

/// Decrypt a string produced by [`encrypt`].
///
/// Fails on a missing separator, non-hex fields, a wrong-sized IV, or an
/// authentication tag mismatch. Unlike password verification this DOES
/// error: a corrupt ciphertext is unexpected, not ordinary user input.
pub fn decrypt(encoded: &str, key: &SessionKey) -> Result<Vec<u8>, CryptoError> {
    let (iv_hex, ct_hex) = encoded
        .split_once(':')
        .ok_or_else(|| CryptoError::MalformedCiphertext("missing field separator".into()))?;
    let iv = hex::decode(iv_hex)?;
    let ciphertext = hex::decode(ct_hex)?;
    if iv.len() != IV_LEN {
        return Err(CryptoError::MalformedCiphertext(format!(
            "iv must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }
    let cipher = Aes256Gcm::new_from_slice(&key.0).map_err(|_| CryptoError::AeadDecrypt)?;
    cipher
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
        .map_err(|_| CryptoError::AeadDecrypt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::derive_session_key;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = derive_session_key("abc123").unwrap();
        let encoded = encrypt(b"some private note", &key).unwrap();
        assert_eq!(decrypt(&encoded, &key).unwrap(), b"some private note");
    }

    #[test]
    fn fresh_iv_per_call() {
        let key = derive_session_key("abc123").unwrap();
        assert_ne!(encrypt(b"x", &key).unwrap(), encrypt(b"x", &key).unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let key = derive_session_key("abc123").unwrap();
        let other = derive_session_key("different").unwrap();
        let encoded = encrypt(b"secret", &key).unwrap();
        assert!(matches!(
            decrypt(&encoded, &other),
            Err(CryptoError::AeadDecrypt)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = derive_session_key("abc123").unwrap();
        let encoded = encrypt(b"secret", &key).unwrap();
        // Flip the last ciphertext nibble.
        let mut tampered = encoded.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert!(decrypt(&tampered, &key).is_err());
    }

    #[test]
    fn malformed_input_fails() {
        let key = derive_session_key("abc123").unwrap();
        assert!(decrypt("", &key).is_err());
        assert!(decrypt("no separator", &key).is_err());
        assert!(decrypt("zz:zz", &key).is_err());
        // Valid hex, wrong IV size.
        assert!(decrypt("abcd:abcd", &key).is_err());
    }
}
