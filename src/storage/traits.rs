//! Abstract storage trait for version records.
//!
//! The trait defines the contract durable backends must implement. By using
//! a trait, we enable:
//! - In-memory backends for testing and embedded use
//! - Relational or document backends for production
//!
//! The port stores rows; the version-numbering and single-active invariants
//! are enforced above it by [`VersionedStore`](crate::store::VersionedStore),
//! which serializes all writes for one entity ID.

use thiserror::Error;

use crate::record::{EntityId, SequenceId, VersionAttrs, VersionRecord};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No row exists with the given sequence ID.
    #[error("Row not found: seq={0}")]
    RowNotFound(SequenceId),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Payload serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Storage contract for the version records of one entity kind.
///
/// Implementations persist rows verbatim and answer the queries below; they
/// are not responsible for version numbering or the single-active invariant.
pub trait VersionStore<A: VersionAttrs>: Send + Sync {
    /// Insert a new record and return its assigned sequence ID.
    ///
    /// The `seq` field of the passed record is ignored; sequence IDs are
    /// assigned monotonically by the backend and never reused.
    fn insert(&self, record: &VersionRecord<A>) -> Result<SequenceId, StorageError>;

    /// Rewrite the row identified by `record.seq`.
    ///
    /// Returns [`StorageError::RowNotFound`] if no such row exists.
    fn update(&self, record: &VersionRecord<A>) -> Result<(), StorageError>;

    /// All versions of one entity, version descending.
    fn find_all_by_entity_id(
        &self,
        entity_id: &EntityId,
    ) -> Result<Vec<VersionRecord<A>>, StorageError>;

    /// The active version of one entity, if any.
    fn find_active_by_entity_id(
        &self,
        entity_id: &EntityId,
    ) -> Result<Option<VersionRecord<A>>, StorageError>;

    /// A specific version of one entity, if recorded.
    fn find_by_entity_id_and_version(
        &self,
        entity_id: &EntityId,
        version: u32,
    ) -> Result<Option<VersionRecord<A>>, StorageError>;

    /// Highest version number recorded for one entity.
    fn max_version(&self, entity_id: &EntityId) -> Result<Option<u32>, StorageError>;

    /// Clear the active flag on every version of one entity.
    ///
    /// Returns the number of rows that changed.
    fn deactivate_all(&self, entity_id: &EntityId) -> Result<u64, StorageError>;

    /// All active records across entities, creation time descending.
    fn find_all_active(&self) -> Result<Vec<VersionRecord<A>>, StorageError>;

    /// Whether any version of this entity exists.
    fn exists_by_entity_id(&self, entity_id: &EntityId) -> Result<bool, StorageError>;

    /// Number of versions recorded for this entity.
    fn count(&self, entity_id: &EntityId) -> Result<u64, StorageError>;
}
