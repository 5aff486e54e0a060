//! Identity data model
//!
//! An [`IdentityRecord`] is one resolved subject: a stable id, descriptive
//! attributes, and a set of [`Identifier`]s, each tagged with the [`Source`]
//! that asserted it. Ingestion hands the engine a [`Subject`], usually built
//! with [`SubjectBuilder`].
//!
//! # Example
//!
//! ```rust
//! use idfuse_core::identity::{IdentifierKind, Source, SubjectBuilder};
//!
//! let subject = SubjectBuilder::new("E-1001")
//!     .display_name("Ann Lee")
//!     .observed_at(1704067200000)
//!     .identifier(IdentifierKind::InstitutionalId, "S1", Source::Roster)
//!     .identifier(IdentifierKind::ContactId, "ann@x.org", Source::Roster)
//!     .build();
//!
//! assert_eq!(subject.identifiers.len(), 2);
//! ```

mod record;
mod types;

pub use record::{AddOutcome, ConflictObservation, IdentityRecord, CONFLICT_PENALTY};
pub use types::{
    Category, Identifier, IdentifierKind, Source, Subject, SubjectAttributes, SubjectBuilder,
};
