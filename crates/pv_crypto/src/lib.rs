//! pv_crypto — PlayVault cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Session key material is zeroized on drop.
//! - Every binary value that crosses a storage boundary is hex-encoded;
//!   multi-part strings join their fields with a single `:`. All joined
//!   fields are themselves hex, so the separator cannot collide.
//!
//! # Module layout
//! - `password`  — PBKDF2 credential hashing + verification
//! - `kdf`       — session key derivation and portable export/import
//! - `aead`      — AES-256-GCM encrypt/decrypt helpers
//! - `challenge` — support-code / unlock-key pair for out-of-band password reset
//! - `error`     — unified error type

pub mod aead;
pub mod challenge;
pub mod error;
pub mod kdf;
pub mod password;

pub use error::CryptoError;
pub use kdf::SessionKey;
