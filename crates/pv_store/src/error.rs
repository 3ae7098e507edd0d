use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Persistent storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Vault is locked; unlock with the password first")]
    VaultLocked,

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Media decode failure: {0}")]
    MediaDecodeFailure(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] pv_crypto::CryptoError),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}
