//! Name similarity for approximate resolution

use strsim::normalized_levenshtein;

use crate::error::{ResolveError, ResolveResult};

/// Normalized edit-distance ratio between two names, case-insensitive.
///
/// `1 - levenshtein(a, b) / max(len(a), len(b))`, counted in chars.
/// Two empty names are identical (1.0).
pub fn name_similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// Reject thresholds outside 0.0 - 1.0, including NaN
pub fn validate_threshold(threshold: f64) -> ResolveResult<f64> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(ResolveError::InvalidThreshold(threshold))
    }
}
