//! Identity resolution
//!
//! [`ResolutionEngine`] ingests per-subject identifier batches into identity
//! records and the identifier index, then answers:
//!
//! - exact lookups by `kind:value` (first indexed record wins)
//! - approximate lookups by display name (normalized edit distance)
//! - linked records sharing identifiers, one hop or transitively
//!
//! # Example
//!
//! ```rust
//! use idfuse_core::identity::{IdentifierKind, Source, SubjectBuilder};
//! use idfuse_core::resolve::ResolutionEngine;
//!
//! let mut engine = ResolutionEngine::new();
//! engine
//!     .ingest(
//!         SubjectBuilder::new("E-1")
//!             .display_name("John Smith")
//!             .identifier(IdentifierKind::ContactId, "js@x.org", Source::Roster)
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let found = engine.resolve_by_identifier(IdentifierKind::ContactId, "js@x.org");
//! assert_eq!(found.unwrap().identity_id, "E-1");
//!
//! let matches = engine.resolve_by_fuzzy_name("jon smith", 0.85).unwrap();
//! assert_eq!(matches.len(), 1);
//! ```

mod engine;

pub use engine::{EngineStats, IngestSummary, Link, LinkPolicy, NameMatch, ResolutionEngine};
