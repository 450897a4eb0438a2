//! Versioned entity store.
//!
//! [`VersionedStore`] owns the version-numbering and single-active invariants
//! for one entity kind, on top of a [`VersionStore`] persistence port:
//!
//! - version numbers start at 1 and grow strictly, derived by query from the
//!   stored rows rather than from an in-memory counter;
//! - at most one record per entity ID is active at a time;
//! - a record's identity, version, and payload never change after insert.
//!
//! All writes for one entity ID are serialized through a per-entity lock
//! registry; operations on different entity IDs do not contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{NotFoundError, VaultError, VaultResult};
use crate::record::{
    EntityId, SequenceId, SubmodelAttrs, VersionAttrs, VersionInfo, VersionRecord,
};
use crate::storage::{InMemoryVersionStore, StorageError, VersionStore};

pub(crate) fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// One save request: everything the store needs to append or refresh a
/// version of a single entity.
#[derive(Debug, Clone)]
pub struct SaveRequest<A> {
    /// Business key of the entity.
    pub entity_id: EntityId,
    /// Short human-readable name.
    pub id_short: Option<String>,
    /// Kind-specific attributes.
    pub attrs: A,
    /// Canonical serialized payload.
    pub payload: String,
    /// When true, append a new version; when false, refresh the latest one.
    pub create_new_version: bool,
}

/// Registry of per-entity write locks.
///
/// Lock entries are created on first use and kept for the process lifetime;
/// the set of entity IDs a process touches is bounded by its working set.
#[derive(Debug, Default)]
struct EntityLocks {
    inner: Mutex<HashMap<EntityId, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    fn for_entity(&self, entity_id: &EntityId) -> Result<Arc<Mutex<()>>, StorageError> {
        let mut map = self.inner.lock().map_err(|_| lock_err("lock registry"))?;
        Ok(Arc::clone(
            map.entry(entity_id.clone()).or_default(),
        ))
    }
}

/// Per-kind version-lifecycle service over a persistence port.
///
/// Instantiated once per entity kind (shells, submodels, concept
/// descriptions) with the matching attribute type.
pub struct VersionedStore<A: VersionAttrs> {
    port: Arc<dyn VersionStore<A>>,
    locks: EntityLocks,
}

impl<A: VersionAttrs> std::fmt::Debug for VersionedStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedStore")
            .field("kind", &A::KIND)
            .finish_non_exhaustive()
    }
}

impl<A: VersionAttrs> VersionedStore<A> {
    /// Creates a store over the given persistence port.
    #[must_use]
    pub fn new(port: Arc<dyn VersionStore<A>>) -> Self {
        Self {
            port,
            locks: EntityLocks::default(),
        }
    }

    /// Creates a store backed by the in-memory reference port.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryVersionStore::new()))
    }

    pub(crate) fn port(&self) -> &Arc<dyn VersionStore<A>> {
        &self.port
    }

    pub(crate) fn entity_lock(&self, entity_id: &EntityId) -> Result<Arc<Mutex<()>>, StorageError> {
        self.locks.for_entity(entity_id)
    }

    /// Saves one entity snapshot.
    ///
    /// With `create_new_version` set (or on first save), every existing
    /// version is deactivated and a fresh record is inserted at
    /// `max_version + 1`, active, created by `actor`.
    ///
    /// Without it, no row is inserted: the latest version is re-activated in
    /// place with updated provenance. (The system this store descends from
    /// inserted a second row reusing the latest version number here; that
    /// broke version uniqueness, so this store refreshes instead.)
    ///
    /// # Errors
    /// Returns a storage error when the port fails; the per-entity lock makes
    /// the deactivate-then-insert sequence atomic for readers.
    pub fn save(&self, request: SaveRequest<A>, actor: &str) -> VaultResult<VersionRecord<A>> {
        let lock = self.entity_lock(&request.entity_id)?;
        let _guard = lock.lock().map_err(|_| lock_err("entity lock"))?;

        let max_version = self.port.max_version(&request.entity_id)?.unwrap_or(0);

        if max_version > 0 && !request.create_new_version {
            return self.refresh_latest(&request.entity_id, max_version, actor);
        }

        if max_version > 0 {
            let deactivated = self.port.deactivate_all(&request.entity_id)?;
            debug!(
                kind = %A::KIND,
                entity_id = %request.entity_id,
                deactivated,
                "deactivated previous versions"
            );
        }

        let mut record = VersionRecord {
            seq: SequenceId::default(),
            entity_id: request.entity_id,
            id_short: request.id_short,
            attrs: request.attrs,
            version: max_version + 1,
            is_active: true,
            payload: request.payload,
            created_by: actor.to_string(),
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        };
        record.seq = self.port.insert(&record)?;

        info!(
            kind = %A::KIND,
            entity_id = %record.entity_id,
            version = record.version,
            created_by = %record.created_by,
            "saved new version"
        );
        Ok(record)
    }

    // The no-new-version path: re-activate the latest row without touching
    // its identity, version, or payload.
    fn refresh_latest(
        &self,
        entity_id: &EntityId,
        max_version: u32,
        actor: &str,
    ) -> VaultResult<VersionRecord<A>> {
        let mut latest = self
            .port
            .find_by_entity_id_and_version(entity_id, max_version)?
            .ok_or_else(|| {
                VaultError::internal(format!(
                    "latest {} version missing: entity_id={entity_id}, version={max_version}",
                    A::KIND
                ))
            })?;

        self.port.deactivate_all(entity_id)?;
        latest.is_active = true;
        latest.updated_by = Some(actor.to_string());
        latest.updated_at = Some(Utc::now());
        self.port.update(&latest)?;

        info!(
            kind = %A::KIND,
            entity_id = %entity_id,
            version = latest.version,
            updated_by = actor,
            "refreshed latest version"
        );
        Ok(latest)
    }

    /// All versions of one entity as payload-free projections, version
    /// descending.
    ///
    /// # Errors
    /// Returns a storage error when the port fails.
    pub fn list_versions(&self, entity_id: &EntityId) -> VaultResult<Vec<VersionInfo>> {
        let rows = self.port.find_all_by_entity_id(entity_id)?;
        Ok(rows.iter().map(VersionRecord::version_info).collect())
    }

    /// The active record of one entity.
    ///
    /// # Errors
    /// Returns [`NotFoundError::NoActiveVersion`] when no version is active.
    pub fn get_active(&self, entity_id: &EntityId) -> VaultResult<VersionRecord<A>> {
        self.port
            .find_active_by_entity_id(entity_id)?
            .ok_or_else(|| {
                NotFoundError::NoActiveVersion {
                    kind: A::KIND,
                    entity_id: entity_id.clone(),
                }
                .into()
            })
    }

    /// One active record per entity, creation time descending.
    ///
    /// # Errors
    /// Returns a storage error when the port fails.
    pub fn list_all_active(&self) -> VaultResult<Vec<VersionRecord<A>>> {
        Ok(self.port.find_all_active()?)
    }

    /// Whether any version of this entity exists.
    ///
    /// # Errors
    /// Returns a storage error when the port fails.
    pub fn exists(&self, entity_id: &EntityId) -> VaultResult<bool> {
        Ok(self.port.exists_by_entity_id(entity_id)?)
    }

    /// Number of versions recorded for this entity.
    ///
    /// # Errors
    /// Returns a storage error when the port fails.
    pub fn count_versions(&self, entity_id: &EntityId) -> VaultResult<u64> {
        Ok(self.port.count(entity_id)?)
    }
}

impl VersionedStore<SubmodelAttrs> {
    /// Active submodels linked to one shell, ordered by `id_short`.
    ///
    /// The link is the positional ingest-time association, not a checked
    /// reference.
    ///
    /// # Errors
    /// Returns a storage error when the port fails.
    pub fn list_active_by_parent(
        &self,
        parent_id: &EntityId,
    ) -> VaultResult<Vec<VersionRecord<SubmodelAttrs>>> {
        let mut rows: Vec<_> = self
            .port
            .find_all_active()?
            .into_iter()
            .filter(|row| row.attrs.parent_id.as_ref() == Some(parent_id))
            .collect();
        rows.sort_by(|a, b| a.id_short.cmp(&b.id_short));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::record::ShellAttrs;

    fn request(entity_id: &str, create_new_version: bool) -> SaveRequest<ShellAttrs> {
        SaveRequest {
            entity_id: EntityId::from(entity_id),
            id_short: Some("Motor".to_string()),
            attrs: ShellAttrs::default(),
            payload: "{\"id\":\"urn:shell:motor\"}".to_string(),
            create_new_version,
        }
    }

    fn submodel_request(
        entity_id: &str,
        id_short: &str,
        parent: Option<&str>,
    ) -> SaveRequest<SubmodelAttrs> {
        SaveRequest {
            entity_id: EntityId::from(entity_id),
            id_short: Some(id_short.to_string()),
            attrs: SubmodelAttrs {
                semantic_id: None,
                parent_id: parent.map(EntityId::from),
            },
            payload: "{}".to_string(),
            create_new_version: true,
        }
    }

    #[test]
    fn test_first_save_creates_version_one() {
        let store = VersionedStore::in_memory();
        let record = store.save(request("urn:shell:a", true), "operator").unwrap();
        assert_eq!(record.version, 1);
        assert!(record.is_active);
        assert_eq!(record.created_by, "operator");
        assert_eq!(record.seq, SequenceId::new(1));
    }

    #[test]
    fn test_versions_are_monotonic_from_one() {
        let store = VersionedStore::in_memory();
        let id = EntityId::from("urn:shell:a");
        for expected in 1..=5 {
            let record = store.save(request("urn:shell:a", true), "operator").unwrap();
            assert_eq!(record.version, expected);
        }

        let versions: Vec<u32> = store
            .list_versions(&id)
            .unwrap()
            .iter()
            .map(|info| info.version)
            .collect();
        assert_eq!(versions, vec![5, 4, 3, 2, 1]);
        assert_eq!(store.count_versions(&id).unwrap(), 5);
    }

    #[test]
    fn test_new_version_deactivates_previous() {
        let store = VersionedStore::in_memory();
        let id = EntityId::from("urn:shell:a");
        store.save(request("urn:shell:a", true), "operator").unwrap();
        store.save(request("urn:shell:a", true), "operator").unwrap();

        let active = store.get_active(&id).unwrap();
        assert_eq!(active.version, 2);

        let infos = store.list_versions(&id).unwrap();
        let active_count = infos.iter().filter(|info| info.is_active).count();
        assert_eq!(active_count, 1);
    }

    #[test]
    fn test_save_without_new_version_refreshes_latest() {
        let store = VersionedStore::in_memory();
        let id = EntityId::from("urn:shell:a");
        let first = store.save(request("urn:shell:a", false), "alice").unwrap();
        assert_eq!(first.version, 1);

        let second = store.save(request("urn:shell:a", false), "bob").unwrap();
        assert_eq!(second.version, 1);
        assert_eq!(second.seq, first.seq);
        assert_eq!(second.updated_by.as_deref(), Some("bob"));

        // No second row was inserted.
        assert_eq!(store.count_versions(&id).unwrap(), 1);
        assert_eq!(store.get_active(&id).unwrap().created_by, "alice");
    }

    #[test]
    fn test_get_active_not_found() {
        let store: VersionedStore<ShellAttrs> = VersionedStore::in_memory();
        let err = store.get_active(&EntityId::from("urn:shell:ghost")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_exists_and_list_all_active() {
        let store = VersionedStore::in_memory();
        store.save(request("urn:shell:a", true), "operator").unwrap();
        store.save(request("urn:shell:b", true), "operator").unwrap();
        store.save(request("urn:shell:b", true), "operator").unwrap();

        assert!(store.exists(&EntityId::from("urn:shell:a")).unwrap());
        assert!(!store.exists(&EntityId::from("urn:shell:c")).unwrap());

        let active = store.list_all_active().unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|record| record.is_active));
    }

    #[test]
    fn test_entities_are_versioned_independently() {
        let store = VersionedStore::in_memory();
        store.save(request("urn:shell:a", true), "operator").unwrap();
        store.save(request("urn:shell:a", true), "operator").unwrap();
        let other = store.save(request("urn:shell:b", true), "operator").unwrap();
        assert_eq!(other.version, 1);
    }

    #[test]
    fn test_concurrent_saves_keep_versions_unique() {
        let store = Arc::new(VersionedStore::in_memory());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    store.save(request("urn:shell:a", true), "operator").unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let id = EntityId::from("urn:shell:a");
        let infos = store.list_versions(&id).unwrap();
        assert_eq!(infos.len(), 80);

        let mut versions: Vec<u32> = infos.iter().map(|info| info.version).collect();
        versions.sort_unstable();
        let expected: Vec<u32> = (1..=80).collect();
        assert_eq!(versions, expected);

        assert_eq!(infos.iter().filter(|info| info.is_active).count(), 1);
        assert_eq!(store.get_active(&id).unwrap().version, 80);
    }

    #[test]
    fn test_list_active_by_parent_filters_and_orders() {
        let store = VersionedStore::in_memory();
        store
            .save(submodel_request("urn:sm:b", "Beta", Some("urn:shell:a")), "op")
            .unwrap();
        store
            .save(submodel_request("urn:sm:a", "Alpha", Some("urn:shell:a")), "op")
            .unwrap();
        store
            .save(submodel_request("urn:sm:c", "Gamma", Some("urn:shell:z")), "op")
            .unwrap();
        store
            .save(submodel_request("urn:sm:d", "Delta", None), "op")
            .unwrap();

        let linked = store
            .list_active_by_parent(&EntityId::from("urn:shell:a"))
            .unwrap();
        let names: Vec<_> = linked
            .iter()
            .map(|record| record.id_short.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }
}
