//! Ingestion pipeline: roster and event batches into a resolution engine
//!
//! Source exports are loosely typed: ids may arrive as strings or numbers,
//! columns vary per dataset, and rows can be incomplete. This module is the
//! boundary where those rows are mapped onto the closed `IdentifierKind` set.
//! After that, each subject is ingested exactly once, in roster order, with
//! the identifiers seen in event batches merged in.

use chrono::{DateTime, NaiveDateTime};
use idfuse_core::{
    Category, Identifier, IdentifierKind, ResolutionEngine, Source, SubjectAttributes,
    SubjectBuilder,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::Result;

/// One row of the profile roster. Unlisted columns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RosterRow {
    #[serde(default, deserialize_with = "loose_string")]
    pub entity_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub staff_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub faculty_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub card_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub device_hash: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub face_id: Option<String>,
}

impl RosterRow {
    /// Identifier columns of this row, as (column, value) pairs
    fn identifier_columns(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("student_id", self.student_id.as_deref()),
            ("staff_id", self.staff_id.as_deref()),
            ("email", self.email.as_deref()),
            ("card_id", self.card_id.as_deref()),
            ("device_hash", self.device_hash.as_deref()),
            ("face_id", self.face_id.as_deref()),
            ("name", self.name.as_deref()),
        ]
    }

    /// Category from the role, trusted only when the matching id column is filled
    pub fn category(&self) -> Category {
        let filled = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        match Category::from_role(self.role.as_deref().unwrap_or_default()) {
            Category::Student if filled(&self.student_id) => Category::Student,
            Category::Staff if filled(&self.staff_id) => Category::Staff,
            Category::Faculty if filled(&self.faculty_id) => Category::Faculty,
            _ => Category::Unknown,
        }
    }

    fn attributes(&self) -> SubjectAttributes {
        SubjectAttributes {
            display_name: self.name.clone(),
            contact: self.email.clone(),
            category: self.category(),
            organizational_unit: self.department.clone(),
        }
    }
}

/// One row of an event batch (badge swipe, Wi-Fi association, booking, ...)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventRow {
    #[serde(default, deserialize_with = "loose_string")]
    pub entity_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub timestamp: Option<String>,
    /// Every other column; identifier columns are picked out by name
    #[serde(flatten)]
    pub columns: BTreeMap<String, serde_json::Value>,
}

/// Event rows from a single source
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    pub source: Source,
    pub rows: Vec<EventRow>,
}

/// Counts from one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub subjects: usize,
    pub identifiers_added: usize,
    pub conflicts: usize,
    /// Roster rows without a usable entity id
    pub skipped_rows: usize,
    /// Event rows naming an entity that is not on the roster
    pub orphan_events: usize,
}

/// Map a source column name onto the identifier allow-list.
///
/// Canonical kind names are accepted as-is. `name` maps to `display-name`
/// only when `index_display_names` is set; everything else is dropped.
pub fn column_kind(column: &str, index_display_names: bool) -> Option<IdentifierKind> {
    match column {
        "student_id" => Some(IdentifierKind::InstitutionalId),
        "staff_id" => Some(IdentifierKind::StaffId),
        "email" => Some(IdentifierKind::ContactId),
        "card_id" => Some(IdentifierKind::CredentialId),
        "device_hash" => Some(IdentifierKind::DeviceFingerprint),
        "face_id" => Some(IdentifierKind::BiometricId),
        "name" | "display-name" if index_display_names => Some(IdentifierKind::DisplayName),
        "name" | "display-name" => None,
        other => IdentifierKind::parse(other),
    }
}

/// Read a roster export (JSON array of row objects)
pub fn load_roster(path: impl AsRef<Path>) -> Result<Vec<RosterRow>> {
    let file = std::fs::File::open(path.as_ref())?;
    let rows: Vec<RosterRow> = serde_json::from_reader(std::io::BufReader::new(file))?;
    Ok(rows)
}

/// Read an event export (JSON array of row objects) for `source`
pub fn load_events(source: Source, path: impl AsRef<Path>) -> Result<EventBatch> {
    let file = std::fs::File::open(path.as_ref())?;
    let rows: Vec<EventRow> = serde_json::from_reader(std::io::BufReader::new(file))?;
    Ok(EventBatch { source, rows })
}

/// Build a fresh engine from a roster plus event batches.
///
/// `now_ms` stamps roster identifiers and event rows without a parseable
/// timestamp. Bad rows are skipped and counted, never fatal.
pub fn build_engine(
    roster: &[RosterRow],
    events: &[EventBatch],
    config: &ResolverConfig,
    now_ms: i64,
) -> (ResolutionEngine, BuildReport) {
    info!(
        roster_rows = roster.len(),
        event_batches = events.len(),
        link_policy = ?config.link_policy,
        "Building identity engine"
    );

    let mut report = BuildReport::default();
    let mut sightings = collect_sightings(events, config, now_ms);
    let mut engine = config.engine();

    for row in roster {
        let Some(entity_id) = row.entity_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
        else {
            warn!(name = ?row.name, "Skipping roster row without entity_id");
            report.skipped_rows += 1;
            continue;
        };

        let mut builder = SubjectBuilder::new(entity_id)
            .attributes(row.attributes())
            .observed_at(now_ms);
        for (column, value) in row.identifier_columns() {
            if let (Some(kind), Some(value)) = (column_kind(column, config.index_display_names), value) {
                builder = builder.identifier(kind, value, Source::Roster);
            }
        }
        if let Some(seen) = sightings.remove(entity_id) {
            for identifier in seen.identifiers {
                builder = builder.push(identifier);
            }
        }

        match engine.ingest(builder.build()) {
            Ok(summary) => {
                debug!(
                    entity_id,
                    added = summary.added,
                    conflicts = summary.conflicts,
                    "Ingested subject"
                );
                if summary.created {
                    report.subjects += 1;
                }
                report.identifiers_added += summary.added;
                report.conflicts += summary.conflicts;
            }
            Err(e) => {
                warn!(entity_id, error = %e, "Skipping roster row");
                report.skipped_rows += 1;
            }
        }
    }

    report.orphan_events = sightings.values().map(|seen| seen.rows).sum();
    if report.orphan_events > 0 {
        warn!(
            orphan_rows = report.orphan_events,
            orphan_identifiers = sightings.values().map(|seen| seen.identifiers.len()).sum::<usize>(),
            entities = sightings.len(),
            "Event rows for entities missing from the roster were dropped"
        );
    }

    let stats = engine.stats();
    info!(
        subjects = report.subjects,
        identifiers = stats.identifiers,
        index_keys = stats.index_keys,
        conflicts = stats.conflicts,
        skipped = report.skipped_rows,
        "Identity engine built"
    );
    (engine, report)
}

/// Event evidence gathered for one entity
#[derive(Debug, Default)]
struct Sightings {
    identifiers: Vec<Identifier>,
    rows: usize,
}

/// Group event identifiers by entity, merging repeats of the same value into
/// one identifier spanning the earliest and latest sighting.
fn collect_sightings(
    events: &[EventBatch],
    config: &ResolverConfig,
    now_ms: i64,
) -> HashMap<String, Sightings> {
    let mut sightings: HashMap<String, Sightings> = HashMap::new();

    for batch in events {
        let mut unattributed = 0usize;
        for row in &batch.rows {
            let Some(entity_id) = row.entity_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
            else {
                unattributed += 1;
                continue;
            };
            let seen_at = row
                .timestamp
                .as_deref()
                .and_then(parse_timestamp_ms)
                .unwrap_or(now_ms);

            let seen = sightings.entry(entity_id.to_string()).or_default();
            seen.rows += 1;
            for (column, value) in &row.columns {
                let Some(kind) = column_kind(column, config.index_display_names) else {
                    continue;
                };
                let Some(value) = value_string(value) else {
                    continue;
                };
                merge_sighting(&mut seen.identifiers, Identifier::new(kind, value, batch.source, seen_at));
            }
        }
        if unattributed > 0 {
            debug!(source = %batch.source, rows = unattributed, "Event rows without entity_id ignored");
        }
    }
    sightings
}

fn merge_sighting(identifiers: &mut Vec<Identifier>, sighting: Identifier) {
    match identifiers
        .iter_mut()
        .find(|id| id.kind == sighting.kind && id.value == sighting.value)
    {
        Some(existing) => {
            existing.first_seen_ms = existing.first_seen_ms.min(sighting.first_seen_ms);
            existing.last_seen_ms = existing.last_seen_ms.max(sighting.last_seen_ms);
        }
        None => identifiers.push(sighting),
    }
}

/// RFC 3339, or `YYYY-MM-DD HH:MM:SS` read as UTC
fn parse_timestamp_ms(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn value_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accept strings, numbers, or null for id-like columns
fn loose_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_string))
}
