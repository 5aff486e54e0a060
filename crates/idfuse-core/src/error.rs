//! Resolution error types

use thiserror::Error;

/// Input rejected at the engine boundary.
///
/// Absence is never an error: lookups that find nothing return `None` or an
/// empty collection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// Similarity threshold outside 0.0 - 1.0 (or NaN)
    #[error("similarity threshold must be within 0.0..=1.0, got {0}")]
    InvalidThreshold(f64),

    /// Identifier type name outside the recognized set
    #[error("unrecognized identifier type: {0}")]
    UnknownIdentifierType(String),

    /// Category name outside student, staff, faculty, unknown
    #[error("unrecognized category: {0}")]
    UnknownCategory(String),

    /// Blank or otherwise unusable primary key
    #[error("invalid primary key: {0:?}")]
    InvalidPrimaryKey(String),
}

/// Result type for resolution operations
pub type ResolveResult<T> = Result<T, ResolveError>;
