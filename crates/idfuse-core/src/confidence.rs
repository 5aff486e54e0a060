//! Confidence scoring for resolved identities
//!
//! Three pure scores, each in 0.0 - 1.0:
//! - Entity confidence: how well-evidenced a single identity is
//! - Link confidence: how likely two identities denote the same subject
//! - Event confidence: how much to trust a single observed event
//!
//! The formulas are fixed contracts. Downstream consumers compare the results
//! against fixed thresholds, so weights and rounding must not drift.

use crate::identity::{Identifier, IdentifierKind, Source};

/// Weight of the identifier type in a per-identifier score
const TYPE_SHARE: f64 = 0.7;
/// Weight of the source in a per-identifier score
const SOURCE_SHARE: f64 = 0.3;
/// Bonus per distinct identifier type, capped at `MAX_DIVERSITY_BONUS`
const DIVERSITY_STEP: f64 = 0.05;
const MAX_DIVERSITY_BONUS: f64 = 0.2;
/// Bonus per additional shared identifier, capped at `MAX_MULTI_MATCH_BONUS`
const MULTI_MATCH_STEP: f64 = 0.1;
const MAX_MULTI_MATCH_BONUS: f64 = 0.2;
/// Weight for identifier types or sources that are not recognized
pub const UNKNOWN_WEIGHT: f64 = 0.5;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Overall confidence for an identity from its identifiers.
///
/// Each identifier scores `0.7 * type_weight + 0.3 * source_weight`; the
/// average gets a diversity bonus of 0.05 per distinct type (max 0.2).
/// Clamped to 0.0 - 1.0 and rounded to 2 decimals.
pub fn entity_confidence(identifiers: &[Identifier]) -> f64 {
    if identifiers.is_empty() {
        return 0.0;
    }

    let total: f64 = identifiers
        .iter()
        .map(|id| id.kind.reliability() * TYPE_SHARE + id.source.reliability() * SOURCE_SHARE)
        .sum();
    let average = total / identifiers.len() as f64;

    let mut kinds: Vec<IdentifierKind> = identifiers.iter().map(|id| id.kind).collect();
    kinds.sort();
    kinds.dedup();
    let diversity_bonus = (kinds.len() as f64 * DIVERSITY_STEP).min(MAX_DIVERSITY_BONUS);

    round2((average + diversity_bonus).clamp(0.0, 1.0))
}

/// Confidence that two identities are the same subject, from the
/// `kind:value` keys they share.
///
/// Base is the strongest shared type; each additional shared key adds 0.1
/// (max 0.2). Keys whose type does not parse count at `UNKNOWN_WEIGHT`.
pub fn link_confidence<S: AsRef<str>>(shared_keys: &[S]) -> f64 {
    if shared_keys.is_empty() {
        return 0.0;
    }

    let base = shared_keys
        .iter()
        .map(|key| key_weight(key.as_ref()))
        .fold(0.0_f64, f64::max);
    let multi_match_bonus =
        ((shared_keys.len() - 1) as f64 * MULTI_MATCH_STEP).min(MAX_MULTI_MATCH_BONUS);

    round2((base + multi_match_bonus).clamp(0.0, 1.0))
}

/// Confidence for a single observed event.
///
/// Source reliability, plus 0.10 if the event is under 24h old (0.05 under
/// 7 days), plus 0.10 when a location is known. Events stamped after `now_ms`
/// count as fresh.
pub fn event_confidence(source: Source, event_ms: i64, now_ms: i64, has_location: bool) -> f64 {
    let age_ms = now_ms.saturating_sub(event_ms);
    let recency_bonus = if age_ms < DAY_MS {
        0.1
    } else if age_ms < WEEK_MS {
        0.05
    } else {
        0.0
    };
    let location_bonus = if has_location { 0.1 } else { 0.0 };

    round2((source.reliability() + recency_bonus + location_bonus).clamp(0.0, 1.0))
}

fn key_weight(key: &str) -> f64 {
    key.split_once(':')
        .and_then(|(kind, _)| IdentifierKind::parse(kind))
        .map(|kind| kind.reliability())
        .unwrap_or(UNKNOWN_WEIGHT)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
