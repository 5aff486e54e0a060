//! Common error types for idfuse.

use idfuse_core::ResolveError;
use thiserror::Error;

/// Common error type for idfuse operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input rejected by the resolution engine
    #[error("invalid input: {0}")]
    Resolve(#[from] ResolveError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No identity matched the request
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type alias using idfuse Error.
pub type Result<T> = std::result::Result<T, Error>;
