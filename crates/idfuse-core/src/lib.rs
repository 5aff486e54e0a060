//! idfuse Core Engine
//!
//! Identity resolution and confidence scoring over noisy, multi-source
//! identity signals. This crate is the pure kernel: it performs no I/O, never
//! logs, and never reads the clock. Callers pass timestamps in.
//!
//! # Modules
//!
//! - `identity` - identifiers, subjects, identity records
//! - `confidence` - entity, link, and event confidence scores
//! - `index` - inverted `kind:value` index
//! - `similarity` - name similarity for approximate lookups
//! - `resolve` - the resolution engine tying them together
//!
//! # Example
//!
//! ```rust
//! use idfuse_core::{IdentifierKind, ResolutionEngine, Source, SubjectBuilder};
//!
//! let mut engine = ResolutionEngine::new();
//! for (key, device) in [("X", "D9"), ("Y", "D9")] {
//!     engine
//!         .ingest(
//!             SubjectBuilder::new(key)
//!                 .identifier(IdentifierKind::DeviceFingerprint, device, Source::NetworkAssociation)
//!                 .build(),
//!         )
//!         .unwrap();
//! }
//!
//! let linked = engine.resolve_linked("X");
//! assert_eq!(linked[0].identity_id, "Y");
//! assert_eq!(engine.link_confidence_between("X", "Y"), Some(0.7));
//! ```

pub mod confidence;
pub mod error;
pub mod identity;
pub mod index;
pub mod resolve;
pub mod similarity;

// Re-export main types at crate root
pub use confidence::{entity_confidence, event_confidence, link_confidence};
pub use error::{ResolveError, ResolveResult};
pub use identity::{
    AddOutcome, Category, ConflictObservation, Identifier, IdentifierKind, IdentityRecord, Source,
    Subject, SubjectAttributes, SubjectBuilder, CONFLICT_PENALTY,
};
pub use index::IdentifierIndex;
pub use resolve::{EngineStats, IngestSummary, Link, LinkPolicy, NameMatch, ResolutionEngine};
pub use similarity::name_similarity;
