//! Read-side query layer over the current engine snapshot
//!
//! Every call takes one snapshot from the handle and answers entirely from it,
//! so a concurrent rebuild never mixes two engines into one answer. Results
//! are owned views, ready to serialize.

use idfuse_core::{Category, IdentifierKind, IdentityRecord, ResolveError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::handle::EngineHandle;
use crate::pipeline::column_kind;
use crate::report::{fusion_report, linked_identities, FusionReport, LinkedIdentity};

/// A record together with everything it links to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub identity: IdentityRecord,
    pub all_identifiers: BTreeMap<IdentifierKind, Vec<String>>,
    pub linked_identities: Vec<LinkedIdentity>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyMatch {
    pub identity: IdentityRecord,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzySearchView {
    pub query: String,
    pub threshold: f64,
    pub matches: Vec<FuzzyMatch>,
}

/// Filter and page for `list`. `None` limit means the configured default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListFilter {
    pub organizational_unit: Option<String>,
    pub category: Option<Category>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl ListFilter {
    fn matches(&self, record: &IdentityRecord) -> bool {
        let unit_ok = self
            .organizational_unit
            .as_deref()
            .map_or(true, |unit| record.organizational_unit.as_deref() == Some(unit));
        let category_ok = self.category.map_or(true, |category| record.category == category);
        unit_ok && category_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityPage {
    /// Records in the engine, before filtering
    pub total: usize,
    /// Records passing the filter, before paging
    pub matched: usize,
    pub skip: usize,
    pub limit: usize,
    pub identities: Vec<IdentityRecord>,
}

pub struct QueryService {
    handle: Arc<EngineHandle>,
    config: ResolverConfig,
}

impl QueryService {
    pub fn new(handle: Arc<EngineHandle>, config: ResolverConfig) -> Self {
        Self { handle, config }
    }

    pub fn handle(&self) -> &Arc<EngineHandle> {
        &self.handle
    }

    /// Exact lookup by identifier type and value. The type is a canonical
    /// name (`contact-id`) or a roster column name (`email`).
    pub fn search(&self, type_name: &str, value: &str) -> Result<EntityView> {
        let kind = column_kind(type_name.trim(), true)
            .ok_or_else(|| ResolveError::UnknownIdentifierType(type_name.to_string()))?;
        let engine = self.handle.snapshot();
        let record = engine
            .resolve_by_identifier(kind, value)
            .ok_or_else(|| Error::NotFound(format!("{kind}:{value}")))?;
        debug!(identity_id = %record.identity_id, type_name, "Resolved identifier");
        Ok(self.view(&engine, record))
    }

    pub fn entity(&self, identity_id: &str) -> Result<EntityView> {
        let engine = self.handle.snapshot();
        let record = engine
            .get(identity_id)
            .ok_or_else(|| Error::NotFound(format!("identity {identity_id}")))?;
        Ok(self.view(&engine, record))
    }

    /// Name search, best matches first, capped at `max_fuzzy_results`
    pub fn fuzzy_search(&self, name: &str, threshold: Option<f64>) -> Result<FuzzySearchView> {
        let threshold = threshold.unwrap_or(self.config.default_fuzzy_threshold);
        let engine = self.handle.snapshot();
        let matches = engine
            .resolve_by_fuzzy_name(name, threshold)?
            .into_iter()
            .take(self.config.max_fuzzy_results)
            .map(|m| FuzzyMatch {
                identity: m.record.clone(),
                similarity: m.similarity,
            })
            .collect();

        Ok(FuzzySearchView {
            query: name.to_string(),
            threshold,
            matches,
        })
    }

    /// Linked identities of a record, strongest link first
    pub fn linked(&self, identity_id: &str) -> Result<Vec<LinkedIdentity>> {
        let engine = self.handle.snapshot();
        let record = engine
            .get(identity_id)
            .ok_or_else(|| Error::NotFound(format!("identity {identity_id}")))?;
        Ok(linked_identities(&engine, record))
    }

    pub fn report(&self, identity_id: &str) -> Result<FusionReport> {
        fusion_report(&self.handle.snapshot(), identity_id)
    }

    /// Records in creation order, filtered then paged
    pub fn list(&self, filter: &ListFilter) -> EntityPage {
        let engine = self.handle.snapshot();
        let limit = filter.limit.unwrap_or(self.config.default_list_limit);
        let matching: Vec<&IdentityRecord> = engine.records().filter(|r| filter.matches(r)).collect();

        EntityPage {
            total: engine.len(),
            matched: matching.len(),
            skip: filter.skip,
            limit,
            identities: matching
                .into_iter()
                .skip(filter.skip)
                .take(limit)
                .cloned()
                .collect(),
        }
    }

    fn view(&self, engine: &idfuse_core::ResolutionEngine, record: &IdentityRecord) -> EntityView {
        EntityView {
            identity: record.clone(),
            all_identifiers: engine.all_identifiers_for(&record.identity_id),
            linked_identities: linked_identities(engine, record),
            confidence: record.confidence_score(),
        }
    }
}
