//! Version records and entity identity.
//!
//! Every logical entity (shell, submodel, concept description) is identified
//! by a stable business ID. The store never mutates an entity in place:
//! each save appends an immutable [`VersionRecord`] snapshot, and at most one
//! snapshot per entity is active at a time.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Business identifier of a logical entity.
///
/// Shell, submodel, and concept-description IDs are IRIs assigned by the
/// package author; they are unique within their kind and group all version
/// snapshots of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Creates an entity ID from a business key.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Surrogate row key assigned by the persistence port at insert time.
///
/// Sequence IDs are globally unique and monotonically assigned; they are
/// never reused, even after deactivation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SequenceId(u64);

impl SequenceId {
    /// Wraps a raw sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three entity kinds the vault stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// Asset administration shell.
    Shell,
    /// Submodel.
    Submodel,
    /// Concept description.
    ConceptDescription,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell => write!(f, "shell"),
            Self::Submodel => write!(f, "submodel"),
            Self::ConceptDescription => write!(f, "concept description"),
        }
    }
}

/// Kind-specific attribute block carried by a [`VersionRecord`].
///
/// Implementations tie an attribute struct to its [`EntityKind`] so generic
/// code (stores, activation, errors) can name the kind it operates on.
pub trait VersionAttrs: fmt::Debug + Clone + Send + Sync + 'static {
    /// Entity kind stored with these attributes.
    const KIND: EntityKind;
}

/// Shell-specific record attributes, derived from the shell's asset
/// information at ingest time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellAttrs {
    /// Asset kind name (e.g. `Instance`, `Type`); absent when the shell
    /// carries no asset information.
    pub asset_kind: Option<String>,
    /// Global asset identifier; absent when the shell carries no asset
    /// information.
    pub global_asset_id: Option<String>,
}

impl VersionAttrs for ShellAttrs {
    const KIND: EntityKind = EntityKind::Shell;
}

/// Submodel-specific record attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmodelAttrs {
    /// First key value of the submodel's semantic reference, if any.
    pub semantic_id: Option<String>,
    /// Shell this submodel was ingested alongside. Derived positionally
    /// (first shell saved in the same package), not a checked foreign key.
    pub parent_id: Option<EntityId>,
}

impl VersionAttrs for SubmodelAttrs {
    const KIND: EntityKind = EntityKind::Submodel;
}

/// Concept descriptions carry no attributes beyond the common columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptDescriptionAttrs;

impl VersionAttrs for ConceptDescriptionAttrs {
    const KIND: EntityKind = EntityKind::ConceptDescription;
}

/// One immutable version snapshot of a logical entity.
///
/// Once inserted, `entity_id`, `version`, and `payload` never change; only
/// the activation flag and update provenance may be rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord<A> {
    /// Surrogate row key, assigned by the persistence port.
    pub seq: SequenceId,
    /// Business key grouping all versions of this entity.
    pub entity_id: EntityId,
    /// Short human-readable name from the package.
    pub id_short: Option<String>,
    /// Kind-specific attributes.
    pub attrs: A,
    /// Version number, starting at 1 and unique within `entity_id`.
    pub version: u32,
    /// Whether this snapshot is the current one for read purposes.
    pub is_active: bool,
    /// Canonical serialized form of the entity; opaque to the core.
    pub payload: String,
    /// Actor that created this snapshot.
    pub created_by: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Actor of the most recent activation-state change, if any.
    pub updated_by: Option<String>,
    /// Timestamp of the most recent activation-state change, if any.
    pub updated_at: Option<DateTime<Utc>>,
}

impl<A: VersionAttrs> VersionRecord<A> {
    /// Entity kind this record belongs to.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        A::KIND
    }

    /// Payload-free projection of this record.
    #[must_use]
    pub fn version_info(&self) -> VersionInfo {
        VersionInfo {
            seq: self.seq,
            entity_id: self.entity_id.clone(),
            id_short: self.id_short.clone(),
            version: self.version,
            is_active: self.is_active,
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            updated_by: self.updated_by.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Payload-free projection of a [`VersionRecord`] for version pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Surrogate row key.
    pub seq: SequenceId,
    /// Business key.
    pub entity_id: EntityId,
    /// Short human-readable name.
    pub id_short: Option<String>,
    /// Version number.
    pub version: u32,
    /// Whether this version is currently active.
    pub is_active: bool,
    /// Actor that created the snapshot.
    pub created_by: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Actor of the most recent activation-state change, if any.
    pub updated_by: Option<String>,
    /// Timestamp of the most recent activation-state change, if any.
    pub updated_at: Option<DateTime<Utc>>,
}
