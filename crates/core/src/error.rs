//! Error types for the listing-market engine.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the listing-market engine.
///
/// Absence of data is never an error here; metric reads express it as
/// `None`. These variants cover malformed input at a boundary and
/// failures of the collaborators behind the repository and source seams.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog lookup or consistency error.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Observation rejected at the repository boundary.
    #[error("Observation error: {0}")]
    Observation(String),

    /// Repository/storage error.
    #[error("Store error: {0}")]
    Store(String),

    /// Listing source fetch or parse error.
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Conflict audit error.
    #[error("Audit error: {0}")]
    Audit(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a catalog error.
    pub fn catalog(msg: impl Into<String>) -> Self {
        Error::Catalog(msg.into())
    }

    /// Create an observation error.
    pub fn observation(msg: impl Into<String>) -> Self {
        Error::Observation(msg.into())
    }

    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }

    /// Create an ingest error.
    pub fn ingest(msg: impl Into<String>) -> Self {
        Error::Ingest(msg.into())
    }

    /// Create an audit error.
    pub fn audit(msg: impl Into<String>) -> Self {
        Error::Audit(msg.into())
    }
}
