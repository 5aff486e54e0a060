//! Multi-source fusion report for a single identity

use idfuse_core::{
    link_confidence, ConflictObservation, Identifier, IdentifierKind, IdentityRecord,
    ResolutionEngine, Source,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// A record linked to the subject of a view or report.
///
/// Under transitive linking a record may share nothing with the subject.
/// `link_confidence` and `shared_identifiers` then describe the hop that
/// reached it, from the `via` record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedIdentity {
    pub identity_id: String,
    pub display_name: Option<String>,
    pub link_confidence: f64,
    /// `kind:value` keys this record shares with `via`
    pub shared_identifiers: Vec<String>,
    /// Record this one was reached from; the subject itself for direct links
    pub via: String,
    /// 1 for direct links
    pub hops: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionSummary {
    pub total_sources: usize,
    pub total_identifiers: usize,
    pub identifier_kinds: Vec<IdentifierKind>,
    /// Source contributing the most identifiers; ties go to the more trusted source
    pub dominant_source: Option<Source>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionReport {
    pub identity_id: String,
    pub display_name: Option<String>,
    pub overall_confidence: f64,
    pub identifiers_by_source: BTreeMap<Source, Vec<Identifier>>,
    pub provenance: BTreeMap<Source, Vec<String>>,
    pub linked_identities: Vec<LinkedIdentity>,
    pub conflicts: Vec<ConflictObservation>,
    pub summary: FusionSummary,
}

/// Records linked to `record` under the engine's link policy, strongest link first.
/// Equal link confidence keeps discovery order.
pub fn linked_identities(engine: &ResolutionEngine, record: &IdentityRecord) -> Vec<LinkedIdentity> {
    let mut linked: Vec<LinkedIdentity> = engine
        .resolve_links(&record.identity_id)
        .into_iter()
        .map(|link| {
            let shared = link.via.shared_keys(link.record);
            LinkedIdentity {
                identity_id: link.record.identity_id.clone(),
                display_name: link.record.display_name.clone(),
                link_confidence: link_confidence(&shared),
                shared_identifiers: shared,
                via: link.via.identity_id.clone(),
                hops: link.hops,
            }
        })
        .collect();

    linked.sort_by(|a, b| {
        b.link_confidence
            .partial_cmp(&a.link_confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    linked
}

pub fn fusion_report(engine: &ResolutionEngine, identity_id: &str) -> Result<FusionReport> {
    let record = engine
        .get(identity_id)
        .ok_or_else(|| Error::NotFound(format!("identity {identity_id}")))?;

    let identifiers_by_source = record.identifiers_by_source();

    let mut identifier_kinds: Vec<IdentifierKind> =
        record.identifiers().iter().map(|id| id.kind).collect();
    identifier_kinds.sort();
    identifier_kinds.dedup();

    // BTreeMap order is trust order, so the first maximum wins ties
    let dominant_source = identifiers_by_source
        .iter()
        .fold(None::<(Source, usize)>, |best, (source, ids)| match best {
            Some((_, count)) if count >= ids.len() => best,
            _ => Some((*source, ids.len())),
        })
        .map(|(source, _)| source);

    let summary = FusionSummary {
        total_sources: identifiers_by_source.len(),
        total_identifiers: record.identifiers().len(),
        identifier_kinds,
        dominant_source,
    };

    Ok(FusionReport {
        identity_id: record.identity_id.clone(),
        display_name: record.display_name.clone(),
        overall_confidence: record.confidence_score(),
        provenance: record.provenance(),
        linked_identities: linked_identities(engine, record),
        conflicts: record.conflicts().to_vec(),
        identifiers_by_source,
        summary,
    })
}
