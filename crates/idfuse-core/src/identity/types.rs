//! Identifier and subject type definitions

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ResolveError;

/// Recognized identifier categories.
///
/// This is the closed allow-list accepted by ingestion. Loosely typed
/// source columns are mapped onto it at the boundary; anything that does not
/// map is dropped before it reaches a record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierKind {
    /// Student or member number issued by the institution
    InstitutionalId,
    /// Employee number
    StaffId,
    /// Email or other contact handle
    ContactId,
    /// Access card / badge credential
    CredentialId,
    /// Hashed device identifier seen on the network
    DeviceFingerprint,
    /// Face or other biometric template id
    BiometricId,
    /// Human-readable name (weakest: names collide)
    DisplayName,
}

impl IdentifierKind {
    pub const ALL: [IdentifierKind; 7] = [
        Self::InstitutionalId,
        Self::StaffId,
        Self::ContactId,
        Self::CredentialId,
        Self::DeviceFingerprint,
        Self::BiometricId,
        Self::DisplayName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InstitutionalId => "institutional-id",
            Self::StaffId => "staff-id",
            Self::ContactId => "contact-id",
            Self::CredentialId => "credential-id",
            Self::DeviceFingerprint => "device-fingerprint",
            Self::BiometricId => "biometric-id",
            Self::DisplayName => "display-name",
        }
    }

    /// Parse a canonical type name, returning `None` for anything outside the allow-list.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Reliability of this identifier type as evidence of identity (0.0 - 1.0)
    pub fn reliability(&self) -> f64 {
        match self {
            Self::InstitutionalId => 1.0,
            Self::StaffId => 1.0,
            Self::ContactId => 0.95,
            Self::CredentialId => 0.9,
            Self::BiometricId => 0.85,
            Self::DeviceFingerprint => 0.7, // devices get shared
            Self::DisplayName => 0.6,
        }
    }

    /// Index key for a value of this kind: `kind:value`.
    ///
    /// Fusion reports and link confidence rely on this exact format.
    pub fn key(&self, value: &str) -> String {
        format!("{}:{}", self.as_str(), value)
    }
}

impl FromStr for IdentifierKind {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ResolveError::UnknownIdentifierType(s.to_string()))
    }
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of an identifier: which data source asserted it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Official profile roster
    Roster,
    /// Access-badge swipes
    AccessBadge,
    /// Library / equipment checkouts
    Checkout,
    /// Room and lab bookings
    Booking,
    /// Camera frames matched against biometric templates
    BiometricSighting,
    /// Wi-Fi association logs
    NetworkAssociation,
    /// Service-desk tickets
    ServiceTicket,
    /// Anything not recognized (lowest trust)
    #[default]
    External,
}

impl Source {
    pub const ALL: [Source; 8] = [
        Self::Roster,
        Self::AccessBadge,
        Self::Checkout,
        Self::Booking,
        Self::BiometricSighting,
        Self::NetworkAssociation,
        Self::ServiceTicket,
        Self::External,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roster => "roster",
            Self::AccessBadge => "access-badge",
            Self::Checkout => "checkout",
            Self::Booking => "booking",
            Self::BiometricSighting => "biometric-sighting",
            Self::NetworkAssociation => "network-association",
            Self::ServiceTicket => "service-ticket",
            Self::External => "external",
        }
    }

    /// Infer a source from a dataset label.
    ///
    /// Accepts the canonical names as well as the legacy dataset names
    /// (`profiles`, `swipes`, `wifi`, `library`, `bookings`, `cctv`,
    /// `helpdesk`). Everything else is `External`.
    pub fn from_label(label: &str) -> Self {
        let lower = label.trim().to_lowercase();
        match lower.as_str() {
            "roster" | "profiles" => Self::Roster,
            "access-badge" | "swipes" => Self::AccessBadge,
            "checkout" | "library" => Self::Checkout,
            "booking" | "bookings" => Self::Booking,
            "biometric-sighting" | "cctv" => Self::BiometricSighting,
            "network-association" | "wifi" => Self::NetworkAssociation,
            "service-ticket" | "helpdesk" => Self::ServiceTicket,
            _ => Self::External,
        }
    }

    /// Reliability of the source (0.0 - 1.0)
    pub fn reliability(&self) -> f64 {
        match self {
            Self::Roster => 1.0,
            Self::AccessBadge => 0.9,
            Self::Checkout => 0.85,
            Self::Booking => 0.85,
            Self::BiometricSighting => 0.8,
            Self::NetworkAssociation => 0.75,
            Self::ServiceTicket => 0.7,
            Self::External => 0.5,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Population category of a subject
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Student,
    Staff,
    Faculty,
    #[default]
    Unknown,
}

impl Category {
    /// Parse a role label; anything unrecognized is `Unknown`
    pub fn from_role(role: &str) -> Self {
        match role.trim().to_lowercase().as_str() {
            "student" => Self::Student,
            "staff" => Self::Staff,
            "faculty" => Self::Faculty,
            _ => Self::Unknown,
        }
    }
}

/// Strict parse: unlike `from_role`, names outside the set are rejected
impl FromStr for Category {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            other => match Self::from_role(other) {
                Self::Unknown => Err(ResolveError::UnknownCategory(s.to_string())),
                category => Ok(category),
            },
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Staff => write!(f, "staff"),
            Self::Faculty => write!(f, "faculty"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A single typed, sourced, timestamped value asserted to belong to a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub kind: IdentifierKind,
    pub value: String,
    pub source: Source,
    /// Trust in this single assertion (0.0 - 1.0); defaults to the source reliability
    pub confidence: f64,
    /// First time the value was observed (Unix timestamp milliseconds)
    pub first_seen_ms: i64,
    /// Last time the value was observed (Unix timestamp milliseconds)
    pub last_seen_ms: i64,
}

impl Identifier {
    pub fn new(
        kind: IdentifierKind,
        value: impl Into<String>,
        source: Source,
        observed_at_ms: i64,
    ) -> Self {
        Self {
            kind,
            value: value.into(),
            source,
            confidence: source.reliability(),
            first_seen_ms: observed_at_ms,
            last_seen_ms: observed_at_ms,
        }
    }

    pub fn seen_between(mut self, first_seen_ms: i64, last_seen_ms: i64) -> Self {
        self.first_seen_ms = first_seen_ms.min(last_seen_ms);
        self.last_seen_ms = first_seen_ms.max(last_seen_ms);
        self
    }

    pub fn key(&self) -> String {
        self.kind.key(&self.value)
    }
}

/// Descriptive attributes of a subject (not used for matching)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectAttributes {
    pub display_name: Option<String>,
    pub contact: Option<String>,
    #[serde(default)]
    pub category: Category,
    pub organizational_unit: Option<String>,
}

/// Everything one ingestion call asserts about one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Stable key of the subject; becomes the identity id
    pub primary_key: String,
    #[serde(default)]
    pub attributes: SubjectAttributes,
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
    /// When this batch was observed (Unix timestamp milliseconds)
    #[serde(default)]
    pub observed_at_ms: i64,
}

/// Builder for ingestion subjects
#[derive(Debug)]
pub struct SubjectBuilder {
    subject: Subject,
}

impl SubjectBuilder {
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            subject: Subject {
                primary_key: primary_key.into(),
                attributes: SubjectAttributes::default(),
                identifiers: Vec::new(),
                observed_at_ms: 0,
            },
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.subject.attributes.display_name = Some(name.into());
        self
    }

    pub fn contact(mut self, contact: impl Into<String>) -> Self {
        self.subject.attributes.contact = Some(contact.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.subject.attributes.category = category;
        self
    }

    pub fn organizational_unit(mut self, unit: impl Into<String>) -> Self {
        self.subject.attributes.organizational_unit = Some(unit.into());
        self
    }

    pub fn attributes(mut self, attributes: SubjectAttributes) -> Self {
        self.subject.attributes = attributes;
        self
    }

    pub fn observed_at(mut self, observed_at_ms: i64) -> Self {
        self.subject.observed_at_ms = observed_at_ms;
        self
    }

    /// Assert a value observed at the builder's `observed_at` time.
    ///
    /// Call `observed_at` first if the timestamp matters.
    pub fn identifier(mut self, kind: IdentifierKind, value: impl Into<String>, source: Source) -> Self {
        let identifier = Identifier::new(kind, value, source, self.subject.observed_at_ms);
        self.subject.identifiers.push(identifier);
        self
    }

    pub fn push(mut self, identifier: Identifier) -> Self {
        self.subject.identifiers.push(identifier);
        self
    }

    /// Assert values keyed by loose type names. Names outside the allow-list
    /// are ignored, not stored.
    pub fn loose<K, V>(mut self, values: impl IntoIterator<Item = (K, V)>, source: Source) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in values {
            if let Some(kind) = IdentifierKind::parse(name.as_ref()) {
                let identifier = Identifier::new(kind, value, source, self.subject.observed_at_ms);
                self.subject.identifiers.push(identifier);
            }
        }
        self
    }

    pub fn build(self) -> Subject {
        self.subject
    }
}
