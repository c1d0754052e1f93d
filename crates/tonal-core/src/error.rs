use thiserror::Error;

/// Top-level error type for the Tonal system.
///
/// Subsystem crates define their own error types and implement
/// `From<TonalError>` (or the reverse) so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TonalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Stored data is corrupt: {0}")]
    StorageCorrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for TonalError {
    fn from(err: toml::de::Error) -> Self {
        TonalError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TonalError {
    fn from(err: toml::ser::Error) -> Self {
        TonalError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TonalError {
    fn from(err: serde_json::Error) -> Self {
        TonalError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Tonal operations.
pub type Result<T> = std::result::Result<T, TonalError>;
