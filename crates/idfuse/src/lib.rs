//! idfuse - identity resolution over roster and event exports
//!
//! Builds on `idfuse-core` with everything that touches the outside world:
//!
//! - `pipeline` - roster and event rows into a `ResolutionEngine`
//! - `handle` - a shared engine that can be rebuilt and swapped under readers
//! - `query` - exact, fuzzy, linked, and paged lookups as serializable views
//! - `report` - per-identity fusion reports
//! - `config` - resolver tunables
//! - `tracing` - logging setup
//!
//! # Example
//!
//! ```rust
//! use idfuse::{build_engine, ResolverConfig, RosterRow};
//!
//! let roster: Vec<RosterRow> = serde_json::from_str(
//!     r#"[{"entity_id": "E1", "name": "Ann Lee", "email": "ann@x.org"},
//!         {"entity_id": "E2", "name": "A. Lee", "email": "ann@x.org"}]"#,
//! )
//! .unwrap();
//!
//! let (engine, report) = build_engine(&roster, &[], &ResolverConfig::default(), 0);
//! assert_eq!(report.subjects, 2);
//! assert_eq!(engine.resolve_linked("E1")[0].identity_id, "E2");
//! ```

pub mod config;
pub mod error;
pub mod handle;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod tracing;

pub use config::ResolverConfig;
pub use error::{Error, Result};
pub use handle::EngineHandle;
pub use pipeline::{build_engine, load_events, load_roster, BuildReport, EventBatch, EventRow, RosterRow};
pub use query::{EntityPage, EntityView, FuzzyMatch, FuzzySearchView, ListFilter, QueryService};
pub use report::{fusion_report, FusionReport, FusionSummary, LinkedIdentity};
