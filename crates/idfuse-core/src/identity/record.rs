//! Identity record - the resolved representation of one subject

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::types::{Category, Identifier, IdentifierKind, Source, SubjectAttributes};
use crate::confidence::entity_confidence;

/// Multiplier applied to the confidence score for each conflicting assertion
pub const CONFLICT_PENALTY: f64 = 0.9;

/// What `add_identifier` did with an assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    /// First identifier of its kind; appended
    Added,
    /// Same kind and value already held; nothing changed
    AlreadyPresent,
    /// Kind already held with a different value; stored value kept, confidence penalized
    Conflict,
}

/// A rejected assertion that disagreed with a stored identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictObservation {
    pub kind: IdentifierKind,
    pub kept_value: String,
    pub rejected_value: String,
    pub source: Source,
    pub observed_at_ms: i64,
}

/// One resolved subject with its provenance-tagged identifiers.
///
/// Holds at most one identifier per kind (first write wins). The confidence
/// score is always `entity_confidence(identifiers) * 0.9^conflicts` once
/// `recalculate_confidence` has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub identity_id: String,
    identifiers: Vec<Identifier>,
    pub display_name: Option<String>,
    pub contact: Option<String>,
    pub category: Category,
    pub organizational_unit: Option<String>,
    confidence_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conflicts: Vec<ConflictObservation>,
    /// Unix timestamp milliseconds
    pub created_at_ms: i64,
    /// Unix timestamp milliseconds
    pub updated_at_ms: i64,
}

impl IdentityRecord {
    pub fn new(identity_id: impl Into<String>, attributes: SubjectAttributes, now_ms: i64) -> Self {
        Self {
            identity_id: identity_id.into(),
            identifiers: Vec::new(),
            display_name: attributes.display_name,
            contact: attributes.contact,
            category: attributes.category,
            organizational_unit: attributes.organizational_unit,
            confidence_score: 0.0,
            conflicts: Vec::new(),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn conflicts(&self) -> &[ConflictObservation] {
        &self.conflicts
    }

    pub fn get_identifier(&self, kind: IdentifierKind) -> Option<&Identifier> {
        self.identifiers.iter().find(|id| id.kind == kind)
    }

    /// Whether this record holds exactly `kind:value`
    pub fn holds(&self, kind: IdentifierKind, value: &str) -> bool {
        self.get_identifier(kind).is_some_and(|id| id.value == value)
    }

    /// Add an identifier, keeping the first value seen for each kind.
    ///
    /// A different value for a held kind never replaces the stored one; it
    /// multiplies the score by `CONFLICT_PENALTY` and is logged. Penalties
    /// compound and survive `recalculate_confidence`.
    pub fn add_identifier(&mut self, identifier: Identifier) -> AddOutcome {
        match self.get_identifier(identifier.kind) {
            None => {
                self.updated_at_ms = self.updated_at_ms.max(identifier.last_seen_ms);
                self.identifiers.push(identifier);
                AddOutcome::Added
            }
            Some(existing) if existing.value == identifier.value => AddOutcome::AlreadyPresent,
            Some(existing) => {
                let observation = ConflictObservation {
                    kind: identifier.kind,
                    kept_value: existing.value.clone(),
                    rejected_value: identifier.value,
                    source: identifier.source,
                    observed_at_ms: identifier.last_seen_ms,
                };
                self.conflicts.push(observation);
                self.confidence_score *= CONFLICT_PENALTY;
                AddOutcome::Conflict
            }
        }
    }

    /// Recompute the confidence score from the current identifier set and
    /// the number of conflicts seen so far.
    pub fn recalculate_confidence(&mut self, now_ms: i64) {
        let penalty = CONFLICT_PENALTY.powi(self.conflicts.len() as i32);
        self.confidence_score = entity_confidence(&self.identifiers) * penalty;
        self.updated_at_ms = self.updated_at_ms.max(now_ms);
    }

    /// Fill attributes that are still unknown. Known attributes are never overwritten.
    pub fn fill_missing_attributes(&mut self, attributes: SubjectAttributes) {
        if self.display_name.is_none() {
            self.display_name = attributes.display_name;
        }
        if self.contact.is_none() {
            self.contact = attributes.contact;
        }
        if self.category == Category::Unknown {
            self.category = attributes.category;
        }
        if self.organizational_unit.is_none() {
            self.organizational_unit = attributes.organizational_unit;
        }
    }

    /// Identifiers grouped by the source that asserted them
    pub fn identifiers_by_source(&self) -> BTreeMap<Source, Vec<Identifier>> {
        let mut grouped: BTreeMap<Source, Vec<Identifier>> = BTreeMap::new();
        for identifier in &self.identifiers {
            grouped
                .entry(identifier.source)
                .or_default()
                .push(identifier.clone());
        }
        grouped
    }

    /// Which sources contributed which identifiers, as `kind:value` keys
    pub fn provenance(&self) -> BTreeMap<Source, Vec<String>> {
        let mut provenance: BTreeMap<Source, Vec<String>> = BTreeMap::new();
        for identifier in &self.identifiers {
            provenance
                .entry(identifier.source)
                .or_default()
                .push(identifier.key());
        }
        provenance
    }

    /// `kind:value` keys held by both records, in this record's identifier order
    pub fn shared_keys(&self, other: &IdentityRecord) -> Vec<String> {
        self.identifiers
            .iter()
            .filter(|id| other.holds(id.kind, &id.value))
            .map(Identifier::key)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record() -> IdentityRecord {
        IdentityRecord::new("E1", SubjectAttributes::default(), 1_000)
    }

    fn inst(value: &str) -> Identifier {
        Identifier::new(IdentifierKind::InstitutionalId, value, Source::Roster, 2_000)
    }

    #[test]
    fn test_add_new_kind() {
        let mut r = record();
        assert_eq!(r.add_identifier(inst("S1")), AddOutcome::Added);
        assert_eq!(r.identifiers().len(), 1);
        assert_eq!(r.updated_at_ms, 2_000);
    }

    #[test]
    fn test_add_same_value_is_noop() {
        let mut r = record();
        r.add_identifier(inst("S1"));
        r.recalculate_confidence(3_000);
        let before = r.clone();

        assert_eq!(r.add_identifier(inst("S1")), AddOutcome::AlreadyPresent);
        assert_eq!(r, before);
    }

    #[test]
    fn test_conflict_keeps_first_value() {
        let mut r = record();
        r.add_identifier(inst("S1"));
        r.recalculate_confidence(3_000);
        let before = r.confidence_score();

        assert_eq!(r.add_identifier(inst("S2")), AddOutcome::Conflict);
        assert_eq!(r.get_identifier(IdentifierKind::InstitutionalId).unwrap().value, "S1");
        assert!((r.confidence_score() - before * 0.9).abs() < 1e-12);
        assert_eq!(r.conflicts().len(), 1);
        assert_eq!(r.conflicts()[0].rejected_value, "S2");
    }

    #[test]
    fn test_conflict_penalty_survives_recalculation() {
        let mut r = record();
        r.add_identifier(inst("S1"));
        r.recalculate_confidence(3_000);
        r.add_identifier(inst("S2"));
        r.add_identifier(inst("S3"));
        r.recalculate_confidence(4_000);

        assert!((r.confidence_score() - 0.81).abs() < 1e-12);
        assert_eq!(r.updated_at_ms, 4_000);
    }

    #[test]
    fn test_fill_missing_attributes() {
        let mut r = IdentityRecord::new(
            "E1",
            SubjectAttributes {
                display_name: Some("Ann Lee".into()),
                ..Default::default()
            },
            0,
        );
        r.fill_missing_attributes(SubjectAttributes {
            display_name: Some("Someone Else".into()),
            contact: Some("ann@x.org".into()),
            category: Category::Staff,
            organizational_unit: None,
        });

        assert_eq!(r.display_name.as_deref(), Some("Ann Lee"));
        assert_eq!(r.contact.as_deref(), Some("ann@x.org"));
        assert_eq!(r.category, Category::Staff);
    }

    #[test]
    fn test_provenance_and_shared_keys() {
        let mut a = record();
        a.add_identifier(inst("S1"));
        a.add_identifier(Identifier::new(
            IdentifierKind::DeviceFingerprint,
            "D9",
            Source::NetworkAssociation,
            0,
        ));

        let mut b = IdentityRecord::new("E2", SubjectAttributes::default(), 0);
        b.add_identifier(Identifier::new(
            IdentifierKind::DeviceFingerprint,
            "D9",
            Source::Roster,
            0,
        ));

        let provenance = a.provenance();
        assert_eq!(provenance[&Source::Roster], vec!["institutional-id:S1"]);
        assert_eq!(
            provenance[&Source::NetworkAssociation],
            vec!["device-fingerprint:D9"]
        );
        assert_eq!(a.shared_keys(&b), vec!["device-fingerprint:D9"]);
        assert_eq!(b.shared_keys(&a), vec!["device-fingerprint:D9"]);
    }
}
