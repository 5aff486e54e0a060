//! Resolver configuration

use idfuse_core::{LinkPolicy, ResolutionEngine};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Tunables for building and querying the engine.
///
/// Loaded from JSON; every field is optional and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Similarity threshold for name search when the caller gives none (default: 0.85)
    pub default_fuzzy_threshold: f64,
    /// Cap on name search results (default: 10)
    pub max_fuzzy_results: usize,
    /// How far linked-identity listings follow shared identifiers (default: one-hop)
    pub link_policy: LinkPolicy,
    /// Index roster names as `display-name` identifiers (default: false).
    /// Names collide, so enabling this links namesakes.
    pub index_display_names: bool,
    /// Page size for listings when the caller gives none (default: 100)
    pub default_list_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_fuzzy_threshold: 0.85,
            max_fuzzy_results: 10,
            link_policy: LinkPolicy::OneHop,
            index_display_names: false,
            default_list_limit: 100,
        }
    }
}

impl ResolverConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_fuzzy_threshold) {
            return Err(Error::Config(format!(
                "default_fuzzy_threshold must be within 0.0..=1.0, got {}",
                self.default_fuzzy_threshold
            )));
        }
        if self.max_fuzzy_results == 0 {
            return Err(Error::Config("max_fuzzy_results must be positive".into()));
        }
        if self.default_list_limit == 0 {
            return Err(Error::Config("default_list_limit must be positive".into()));
        }
        Ok(())
    }

    /// An empty engine configured with this link policy
    pub fn engine(&self) -> ResolutionEngine {
        ResolutionEngine::with_policy(self.link_policy)
    }
}
