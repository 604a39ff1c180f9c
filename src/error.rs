use thiserror::Error;

/// Infrastructure failures: configuration, the persistent medium, local I/O.
///
/// Upstream API failures never use this type; they travel as
/// [`RawFailure`](crate::classifier::RawFailure) and leave the crate as
/// [`ClassifiedError`](crate::classifier::ClassifiedError).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// A write that failed only because the medium is full may succeed after
    /// expired entries have been purged.
    pub fn is_quota(&self) -> bool {
        matches!(self, Error::QuotaExceeded { .. })
    }
}
