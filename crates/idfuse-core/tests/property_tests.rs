//! Property tests for confidence and resolution invariants

use idfuse_core::{
    link_confidence, IdentifierKind, ResolutionEngine, Source, SubjectBuilder,
};
use proptest::prelude::*;

fn arb_kind() -> impl Strategy<Value = IdentifierKind> {
    prop::sample::select(IdentifierKind::ALL.to_vec())
}

fn arb_source() -> impl Strategy<Value = Source> {
    prop::sample::select(Source::ALL.to_vec())
}

fn arb_key() -> impl Strategy<Value = String> {
    (arb_kind(), "[a-z0-9]{1,8}").prop_map(|(kind, value)| kind.key(&value))
}

proptest! {
    /// Each further conflicting value never raises the score.
    #[test]
    fn conflicts_never_raise_confidence(
        kind in arb_kind(),
        source in arb_source(),
        extra in proptest::collection::vec((arb_kind(), "[a-z]{1,6}"), 0..4),
        conflicting in proptest::collection::vec("[A-Z]{1,6}", 1..6),
    ) {
        let mut engine = ResolutionEngine::new();
        let mut builder = SubjectBuilder::new("E").identifier(kind, "base", source);
        for (k, v) in &extra {
            builder = builder.identifier(*k, v.as_str(), source);
        }
        engine.ingest(builder.build()).unwrap();

        let mut previous = engine.get("E").unwrap().confidence_score();
        for value in conflicting {
            engine
                .ingest(SubjectBuilder::new("E").identifier(kind, value, source).build())
                .unwrap();
            let current = engine.get("E").unwrap().confidence_score();
            prop_assert!(current <= previous, "{} > {}", current, previous);
            previous = current;
        }
    }

    /// Every match found at a high threshold is still found at a lower one.
    #[test]
    fn lowering_threshold_keeps_matches(
        names in proptest::collection::vec("[a-z]{1,6} [a-z]{1,6}", 1..12),
        query in "[a-z]{1,6} [a-z]{1,6}",
        high in 0.0f64..=1.0,
        drop in 0.0f64..=1.0,
    ) {
        let mut engine = ResolutionEngine::new();
        for (i, name) in names.iter().enumerate() {
            engine
                .ingest(SubjectBuilder::new(format!("E{i}")).display_name(name.as_str()).build())
                .unwrap();
        }
        let low = high * drop;

        let strict: Vec<String> = engine
            .resolve_by_fuzzy_name(&query, high)
            .unwrap()
            .into_iter()
            .map(|m| m.record.identity_id.clone())
            .collect();
        let loose: Vec<String> = engine
            .resolve_by_fuzzy_name(&query, low)
            .unwrap()
            .into_iter()
            .map(|m| m.record.identity_id.clone())
            .collect();

        for id in strict {
            prop_assert!(loose.contains(&id));
        }
    }

    /// Link confidence is zero exactly when nothing is shared, and never
    /// drops as more shared keys are added.
    #[test]
    fn link_confidence_is_bounded_and_monotone(
        keys in proptest::collection::vec(arb_key(), 0..8),
    ) {
        let mut previous = 0.0;
        for n in 0..=keys.len() {
            let score = link_confidence(&keys[..n]);
            prop_assert!((0.0..=1.0).contains(&score));
            prop_assert_eq!(score == 0.0, n == 0);
            prop_assert!(score >= previous);
            previous = score;
        }
    }

    /// Ingesting the same batch twice leaves the score unchanged.
    #[test]
    fn ingest_twice_same_score(
        values in proptest::collection::vec((arb_kind(), arb_source(), "[a-z0-9]{1,8}"), 1..8),
    ) {
        let build = || {
            values
                .iter()
                .fold(SubjectBuilder::new("E"), |b, (kind, source, value)| {
                    b.identifier(*kind, value.as_str(), *source)
                })
                .build()
        };

        let mut engine = ResolutionEngine::new();
        engine.ingest(build()).unwrap();
        let once = engine.get("E").unwrap().confidence_score();
        let index_keys = engine.index().len();

        engine.ingest(build()).unwrap();
        let twice = engine.get("E").unwrap().confidence_score();

        // a batch that conflicts with itself re-applies its own conflicts
        let record = engine.get("E").unwrap();
        if record.conflicts().is_empty() {
            prop_assert_eq!(once, twice);
        }
        prop_assert_eq!(index_keys, engine.index().len());
    }
}
