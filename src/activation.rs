//! Version activation state machine.
//!
//! [`ActivationManager`] switches which stored version of an entity is the
//! active one. The switch is two writes: deactivate everything, then activate
//! the target. Both run under the same per-entity lock the store uses for
//! saves, so readers never observe two active versions. If the target version
//! does not exist, the entity is left with zero active versions until a
//! corrective activation succeeds; that transient window is accepted.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{NotFoundError, VaultResult};
use crate::record::{EntityId, VersionAttrs, VersionRecord};
use crate::store::{lock_err, VersionedStore};

/// Activate/deactivate transitions over one [`VersionedStore`].
#[derive(Debug)]
pub struct ActivationManager<A: VersionAttrs> {
    store: Arc<VersionedStore<A>>,
}

impl<A: VersionAttrs> ActivationManager<A> {
    /// Creates a manager over the given store.
    #[must_use]
    pub fn new(store: Arc<VersionedStore<A>>) -> Self {
        Self { store }
    }

    /// Makes `version` the single active version of `entity_id`.
    ///
    /// # Errors
    /// Returns [`NotFoundError::VersionNotFound`] when the target version is
    /// not recorded, or a storage error when the port fails. In either case
    /// all versions of the entity have already been deactivated.
    pub fn activate(
        &self,
        entity_id: &EntityId,
        version: u32,
        actor: &str,
    ) -> VaultResult<VersionRecord<A>> {
        let lock = self.store.entity_lock(entity_id)?;
        let _guard = lock.lock().map_err(|_| lock_err("entity lock"))?;

        self.store.port().deactivate_all(entity_id)?;

        let Some(mut record) = self
            .store
            .port()
            .find_by_entity_id_and_version(entity_id, version)?
        else {
            warn!(
                kind = %A::KIND,
                entity_id = %entity_id,
                version,
                "activation target missing; entity left with no active version"
            );
            return Err(NotFoundError::VersionNotFound {
                kind: A::KIND,
                entity_id: entity_id.clone(),
                version,
            }
            .into());
        };

        record.is_active = true;
        record.updated_by = Some(actor.to_string());
        record.updated_at = Some(Utc::now());
        self.store.port().update(&record)?;

        info!(
            kind = %A::KIND,
            entity_id = %entity_id,
            version,
            activated_by = actor,
            "activated version"
        );
        Ok(record)
    }
}
