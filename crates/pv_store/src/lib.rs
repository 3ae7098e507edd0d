//! pv_store — Versioned local storage for the PlayVault video library
//!
//! # Storage strategy
//! One SQLite database holds three collections: videos (metadata plus the
//! raw media payload), file handles, and playlists. Bulk reads never load
//! payloads; only a single-video fetch does. The vault is a logical
//! partition: an indexed flag on the video row, a password hash in a
//! credentials file, and a session key cached for the lifetime of one
//! session. The database file itself is NOT encrypted.
//!
//! # Migration
//! SQLx migrations in `migrations/` are run on open.

pub mod db;
pub mod error;
pub mod library;
pub mod models;
pub mod transfer;
pub mod vault;

pub use db::Store;
pub use error::StoreError;
pub use library::{ImportFile, Library, MediaInfo, MediaProbe, ProbeError};
pub use vault::{VaultController, VaultStatus};
