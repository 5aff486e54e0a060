//! ResolutionEngine - ingestion and resolution over records and the index

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::confidence::link_confidence;
use crate::error::{ResolveError, ResolveResult};
use crate::identity::{AddOutcome, IdentifierKind, IdentityRecord, Subject};
use crate::index::IdentifierIndex;
use crate::similarity::{name_similarity, validate_threshold};

/// How far `resolve_linked` follows the identifier-sharing graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkPolicy {
    /// Direct neighbors only: records sharing an identifier with the target
    #[default]
    OneHop,
    /// Every record reachable through shared identifiers
    Transitive,
}

/// A fuzzy name match
#[derive(Debug, Clone, Copy)]
pub struct NameMatch<'a> {
    pub record: &'a IdentityRecord,
    pub similarity: f64,
}

/// A record reached through shared identifiers
#[derive(Debug, Clone, Copy)]
pub struct Link<'a> {
    pub record: &'a IdentityRecord,
    /// The record it was reached from; the starting record for direct neighbors
    pub via: &'a IdentityRecord,
    /// Distance from the starting record, 1 for direct neighbors
    pub hops: usize,
}

/// What a single `ingest` call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// A new record was created for the primary key
    pub created: bool,
    pub added: usize,
    pub already_present: usize,
    pub conflicts: usize,
    /// Identifiers skipped for having a blank value
    pub blank: usize,
}

/// Record and index totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub records: usize,
    pub identifiers: usize,
    pub index_keys: usize,
    pub conflicts: usize,
}

/// Owns every identity record and the identifier index.
///
/// Built once by a single writer through `ingest`, then shared read-only.
/// Records live in an arena in creation order; that order is the tie-break
/// for fuzzy matches and link discovery.
#[derive(Debug, Clone, Default)]
pub struct ResolutionEngine {
    records: Vec<IdentityRecord>,
    positions: AHashMap<String, usize>,
    index: IdentifierIndex,
    policy: LinkPolicy,
}

impl ResolutionEngine {
    /// Create an empty engine with one-hop link resolution
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: LinkPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> LinkPolicy {
        self.policy
    }

    /// Apply one subject's assertions.
    ///
    /// Creates the record on first sight of the primary key, adds every
    /// identifier with a non-blank value, indexes the ones the record holds,
    /// then recomputes confidence. Conflicting values are counted, never
    /// indexed, and never abort the rest of the batch.
    pub fn ingest(&mut self, subject: Subject) -> ResolveResult<IngestSummary> {
        let Subject {
            primary_key,
            attributes,
            identifiers,
            observed_at_ms,
        } = subject;

        let identity_id = primary_key.trim();
        if identity_id.is_empty() {
            return Err(ResolveError::InvalidPrimaryKey(primary_key));
        }
        let identity_id = identity_id.to_string();

        let mut summary = IngestSummary::default();
        let position = match self.positions.get(&identity_id) {
            Some(&position) => {
                self.records[position].fill_missing_attributes(attributes);
                position
            }
            None => {
                let position = self.records.len();
                self.records
                    .push(IdentityRecord::new(identity_id.clone(), attributes, observed_at_ms));
                self.positions.insert(identity_id.clone(), position);
                summary.created = true;
                position
            }
        };

        let record = &mut self.records[position];
        for mut identifier in identifiers {
            identifier.value = identifier.value.trim().to_string();
            if identifier.value.is_empty() {
                summary.blank += 1;
                continue;
            }

            let kind = identifier.kind;
            let value = identifier.value.clone();
            match record.add_identifier(identifier) {
                AddOutcome::Conflict => summary.conflicts += 1,
                outcome => {
                    self.index.insert(kind, &value, &identity_id);
                    if outcome == AddOutcome::Added {
                        summary.added += 1;
                    } else {
                        summary.already_present += 1;
                    }
                }
            }
        }

        record.recalculate_confidence(observed_at_ms);
        Ok(summary)
    }

    pub fn get(&self, identity_id: &str) -> Option<&IdentityRecord> {
        self.position(identity_id).map(|p| &self.records[p])
    }

    /// All records in creation order
    pub fn records(&self) -> impl Iterator<Item = &IdentityRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn index(&self) -> &IdentifierIndex {
        &self.index
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            records: self.records.len(),
            identifiers: self.records.iter().map(|r| r.identifiers().len()).sum(),
            index_keys: self.index.len(),
            conflicts: self.records.iter().map(|r| r.conflicts().len()).sum(),
        }
    }

    /// Exact lookup. When several records assert the pair, the first one
    /// indexed wins.
    pub fn resolve_by_identifier(&self, kind: IdentifierKind, value: &str) -> Option<&IdentityRecord> {
        self.index
            .lookup(kind, value.trim())
            .first()
            .and_then(|id| self.get(id))
    }

    /// Exact lookup by identifier type name; unknown names are rejected
    pub fn resolve_by_identifier_name(
        &self,
        type_name: &str,
        value: &str,
    ) -> ResolveResult<Option<&IdentityRecord>> {
        let kind: IdentifierKind = type_name.parse()?;
        Ok(self.resolve_by_identifier(kind, value))
    }

    /// Records whose display name is at least `threshold` similar to `query`,
    /// most similar first. Equal scores keep creation order.
    pub fn resolve_by_fuzzy_name(&self, query: &str, threshold: f64) -> ResolveResult<Vec<NameMatch<'_>>> {
        let threshold = validate_threshold(threshold)?;

        let mut matches: Vec<NameMatch<'_>> = self
            .records
            .iter()
            .filter_map(|record| {
                let name = record.display_name.as_deref()?;
                let similarity = name_similarity(query, name);
                (similarity >= threshold).then_some(NameMatch { record, similarity })
            })
            .collect();

        // sort_by is stable, so ties stay in creation order
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(matches)
    }

    /// Records linked to `identity_id` through shared identifiers, following
    /// the engine's `LinkPolicy`. Empty for unknown ids.
    pub fn resolve_linked(&self, identity_id: &str) -> Vec<&IdentityRecord> {
        self.resolve_links(identity_id)
            .into_iter()
            .map(|link| link.record)
            .collect()
    }

    /// Like `resolve_linked`, but each record carries the record it was
    /// reached from and its distance from `identity_id`.
    pub fn resolve_links(&self, identity_id: &str) -> Vec<Link<'_>> {
        let max_hops = match self.policy {
            LinkPolicy::OneHop => Some(1),
            LinkPolicy::Transitive => None,
        };
        self.walk(identity_id, max_hops)
    }

    /// Every record reachable from `identity_id` through shared identifiers,
    /// regardless of policy, excluding the record itself.
    pub fn resolve_component(&self, identity_id: &str) -> Vec<&IdentityRecord> {
        self.walk(identity_id, None)
            .into_iter()
            .map(|link| link.record)
            .collect()
    }

    /// Identifiers of the record plus those of its linked records, grouped by
    /// kind without duplicate values. Empty for unknown ids.
    pub fn all_identifiers_for(&self, identity_id: &str) -> BTreeMap<IdentifierKind, Vec<String>> {
        let mut all: BTreeMap<IdentifierKind, Vec<String>> = BTreeMap::new();
        let Some(record) = self.get(identity_id) else {
            return all;
        };

        let linked = self.resolve_linked(identity_id);
        let identifiers = record
            .identifiers()
            .iter()
            .chain(linked.iter().flat_map(|r| r.identifiers()));

        for identifier in identifiers {
            let values = all.entry(identifier.kind).or_default();
            if !values.contains(&identifier.value) {
                values.push(identifier.value.clone());
            }
        }
        all
    }

    /// Link confidence between two known records, from their shared identifiers
    pub fn link_confidence_between(&self, a: &str, b: &str) -> Option<f64> {
        let (a, b) = (self.get(a)?, self.get(b)?);
        Some(link_confidence(&a.shared_keys(b)))
    }

    fn position(&self, identity_id: &str) -> Option<usize> {
        self.positions.get(identity_id.trim()).copied()
    }

    /// Breadth-first walk over the identifier-sharing graph, in discovery
    /// order, stopping after `max_hops` when given
    fn walk(&self, identity_id: &str, max_hops: Option<usize>) -> Vec<Link<'_>> {
        let Some(start) = self.position(identity_id) else {
            return Vec::new();
        };

        let mut visited = AHashSet::new();
        visited.insert(start);
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut found = Vec::new();

        while let Some((current, hops)) = queue.pop_front() {
            if max_hops.is_some_and(|max| hops >= max) {
                continue;
            }
            for neighbor in self.neighbor_positions(current) {
                if visited.insert(neighbor) {
                    found.push(Link {
                        record: &self.records[neighbor],
                        via: &self.records[current],
                        hops: hops + 1,
                    });
                    queue.push_back((neighbor, hops + 1));
                }
            }
        }
        found
    }

    /// Positions of records sharing any identifier with `position`, in
    /// discovery order, without duplicates
    fn neighbor_positions(&self, position: usize) -> Vec<usize> {
        let mut seen = AHashSet::new();
        let mut neighbors = Vec::new();

        for identifier in self.records[position].identifiers() {
            for id in self.index.lookup(identifier.kind, &identifier.value) {
                let Some(&other) = self.positions.get(id) else {
                    continue;
                };
                if other != position && seen.insert(other) {
                    neighbors.push(other);
                }
            }
        }
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Source, SubjectBuilder};
    use pretty_assertions::assert_eq;

    fn ids(records: &[&IdentityRecord]) -> Vec<String> {
        records.iter().map(|r| r.identity_id.clone()).collect()
    }

    /// A - B share a contact, B - C share a device, D stands alone
    fn chain(policy: LinkPolicy) -> ResolutionEngine {
        let mut engine = ResolutionEngine::with_policy(policy);
        let subjects = [
            SubjectBuilder::new("A")
                .display_name("Ann Lee")
                .identifier(IdentifierKind::InstitutionalId, "S1", Source::Roster)
                .identifier(IdentifierKind::ContactId, "ann@x.org", Source::Roster),
            SubjectBuilder::new("B")
                .display_name("Ann Leigh")
                .identifier(IdentifierKind::ContactId, "ann@x.org", Source::ServiceTicket)
                .identifier(IdentifierKind::DeviceFingerprint, "D1", Source::NetworkAssociation),
            SubjectBuilder::new("C")
                .display_name("Carl Ng")
                .identifier(IdentifierKind::DeviceFingerprint, "D1", Source::NetworkAssociation),
            SubjectBuilder::new("D")
                .display_name("Dee Ray")
                .identifier(IdentifierKind::StaffId, "T9", Source::Roster),
        ];
        for subject in subjects {
            engine.ingest(subject.build()).unwrap();
        }
        engine
    }

    #[test]
    fn test_blank_primary_key_rejected() {
        let mut engine = ResolutionEngine::new();
        let err = engine.ingest(SubjectBuilder::new("  ").build()).unwrap_err();
        assert_eq!(err, ResolveError::InvalidPrimaryKey("  ".to_string()));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_ingest_summary() {
        let mut engine = ResolutionEngine::new();
        let summary = engine
            .ingest(
                SubjectBuilder::new("E1")
                    .identifier(IdentifierKind::InstitutionalId, "S1", Source::Roster)
                    .identifier(IdentifierKind::ContactId, "  ", Source::Roster)
                    .identifier(IdentifierKind::InstitutionalId, "S2", Source::AccessBadge)
                    .build(),
            )
            .unwrap();

        assert_eq!(
            summary,
            IngestSummary {
                created: true,
                added: 1,
                already_present: 0,
                conflicts: 1,
                blank: 1,
            }
        );
        // the conflicting value is never indexed
        assert!(engine.resolve_by_identifier(IdentifierKind::InstitutionalId, "S2").is_none());
    }

    #[test]
    fn test_values_are_trimmed() {
        let mut engine = ResolutionEngine::new();
        engine
            .ingest(
                SubjectBuilder::new(" E1 ")
                    .identifier(IdentifierKind::CredentialId, " C7 ", Source::AccessBadge)
                    .build(),
            )
            .unwrap();

        let record = engine.resolve_by_identifier(IdentifierKind::CredentialId, "C7").unwrap();
        assert_eq!(record.identity_id, "E1");
        assert!(engine.get("E1").is_some());
    }

    #[test]
    fn test_first_indexed_wins() {
        let mut engine = ResolutionEngine::new();
        for key in ["E2", "E1"] {
            engine
                .ingest(
                    SubjectBuilder::new(key)
                        .identifier(IdentifierKind::CredentialId, "C1", Source::AccessBadge)
                        .build(),
                )
                .unwrap();
        }
        let record = engine.resolve_by_identifier(IdentifierKind::CredentialId, "C1").unwrap();
        assert_eq!(record.identity_id, "E2");
    }

    #[test]
    fn test_resolve_by_identifier_name() {
        let engine = chain(LinkPolicy::OneHop);
        let record = engine.resolve_by_identifier_name("staff-id", "T9").unwrap();
        assert_eq!(record.map(|r| r.identity_id.as_str()), Some("D"));
        assert_eq!(engine.resolve_by_identifier_name("staff-id", "nope").unwrap(), None);
        assert!(matches!(
            engine.resolve_by_identifier_name("passport", "X"),
            Err(ResolveError::UnknownIdentifierType(_))
        ));
    }

    #[test]
    fn test_one_hop_stops_at_neighbors() {
        let engine = chain(LinkPolicy::OneHop);
        assert_eq!(ids(&engine.resolve_linked("A")), vec!["B"]);
        assert_eq!(ids(&engine.resolve_linked("B")), vec!["A", "C"]);
        assert_eq!(ids(&engine.resolve_linked("C")), vec!["B"]);
        assert!(engine.resolve_linked("D").is_empty());
        assert!(engine.resolve_linked("missing").is_empty());
    }

    #[test]
    fn test_transitive_reaches_component() {
        let engine = chain(LinkPolicy::Transitive);
        assert_eq!(ids(&engine.resolve_linked("A")), vec!["B", "C"]);
        assert_eq!(ids(&engine.resolve_linked("C")), vec!["B", "A"]);
        assert!(engine.resolve_linked("D").is_empty());
    }

    #[test]
    fn test_component_ignores_policy() {
        let engine = chain(LinkPolicy::OneHop);
        assert_eq!(ids(&engine.resolve_component("A")), vec!["B", "C"]);
    }

    #[test]
    fn test_component_handles_cycles() {
        // A-B via contact, B-C via device, C-A via credential
        let mut engine = chain(LinkPolicy::Transitive);
        engine
            .ingest(
                SubjectBuilder::new("A")
                    .identifier(IdentifierKind::CredentialId, "C5", Source::AccessBadge)
                    .build(),
            )
            .unwrap();
        engine
            .ingest(
                SubjectBuilder::new("C")
                    .identifier(IdentifierKind::CredentialId, "C5", Source::AccessBadge)
                    .build(),
            )
            .unwrap();

        assert_eq!(ids(&engine.resolve_linked("A")), vec!["B", "C"]);
        assert_eq!(ids(&engine.resolve_linked("B")), vec!["A", "C"]);
    }

    #[test]
    fn test_all_identifiers_one_hop() {
        let engine = chain(LinkPolicy::OneHop);
        let all = engine.all_identifiers_for("A");

        assert_eq!(all[&IdentifierKind::InstitutionalId], vec!["S1"]);
        assert_eq!(all[&IdentifierKind::ContactId], vec!["ann@x.org"]);
        assert_eq!(all[&IdentifierKind::DeviceFingerprint], vec!["D1"]);
        assert_eq!(all.len(), 3);
        assert!(engine.all_identifiers_for("missing").is_empty());
    }

    #[test]
    fn test_all_identifiers_transitive() {
        let mut one_hop = chain(LinkPolicy::OneHop);
        let mut transitive = chain(LinkPolicy::Transitive);
        for engine in [&mut one_hop, &mut transitive] {
            engine
                .ingest(
                    SubjectBuilder::new("C")
                        .identifier(IdentifierKind::CredentialId, "C3", Source::AccessBadge)
                        .build(),
                )
                .unwrap();
        }

        assert!(!one_hop.all_identifiers_for("A").contains_key(&IdentifierKind::CredentialId));

        let all = transitive.all_identifiers_for("A");
        assert_eq!(all[&IdentifierKind::CredentialId], vec!["C3"]);
        assert_eq!(all[&IdentifierKind::DeviceFingerprint], vec!["D1"]);
        assert!(!all.contains_key(&IdentifierKind::StaffId));
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_links_record_path() {
        let engine = chain(LinkPolicy::Transitive);
        let links: Vec<(&str, &str, usize)> = engine
            .resolve_links("A")
            .iter()
            .map(|l| (l.record.identity_id.as_str(), l.via.identity_id.as_str(), l.hops))
            .collect();
        assert_eq!(links, vec![("B", "A", 1), ("C", "B", 2)]);

        let engine = chain(LinkPolicy::OneHop);
        let links: Vec<(&str, usize)> = engine
            .resolve_links("B")
            .iter()
            .map(|l| (l.via.identity_id.as_str(), l.hops))
            .collect();
        assert_eq!(links, vec![("B", 1), ("B", 1)]);
        assert!(engine.resolve_links("missing").is_empty());
    }

    #[test]
    fn test_fuzzy_orders_by_similarity() {
        let engine = chain(LinkPolicy::OneHop);
        let matches = engine.resolve_by_fuzzy_name("ann lee", 0.5).unwrap();
        let names: Vec<&str> = matches
            .iter()
            .map(|m| m.record.display_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["Ann Lee", "Ann Leigh"]);
        assert_eq!(matches[0].similarity, 1.0);
    }

    #[test]
    fn test_fuzzy_ties_keep_creation_order() {
        let mut engine = ResolutionEngine::new();
        for key in ["Z", "Y", "X"] {
            engine
                .ingest(SubjectBuilder::new(key).display_name("Sam Roe").build())
                .unwrap();
        }
        let matches = engine.resolve_by_fuzzy_name("sam roe", 0.9).unwrap();
        let order: Vec<&str> = matches.iter().map(|m| m.record.identity_id.as_str()).collect();
        assert_eq!(order, vec!["Z", "Y", "X"]);
    }

    #[test]
    fn test_fuzzy_rejects_bad_threshold() {
        let engine = chain(LinkPolicy::OneHop);
        assert!(matches!(
            engine.resolve_by_fuzzy_name("ann", 1.5),
            Err(ResolveError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_link_confidence_between() {
        let engine = chain(LinkPolicy::OneHop);
        assert_eq!(engine.link_confidence_between("A", "B"), Some(0.95));
        assert_eq!(engine.link_confidence_between("A", "D"), Some(0.0));
        assert_eq!(engine.link_confidence_between("A", "missing"), None);
    }

    #[test]
    fn test_stats() {
        let engine = chain(LinkPolicy::OneHop);
        assert_eq!(
            engine.stats(),
            EngineStats {
                records: 4,
                identifiers: 6,
                index_keys: 4,
                conflicts: 0,
            }
        );
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResolutionEngine>();
    }
}
