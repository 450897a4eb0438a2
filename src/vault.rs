//! Transport-agnostic entry points.
//!
//! [`TwinVault`] wires the parser, the three per-kind stores, their
//! activation managers, and the ingestion pipeline into one facade. An HTTP
//! layer (or any other transport) calls these methods directly; the facade
//! holds no state beyond the stores themselves.

use std::sync::Arc;

use crate::activation::ActivationManager;
use crate::error::VaultResult;
use crate::ingest::{IngestReport, IngestionPipeline};
use crate::parser::{JsonPackageParser, PackageParser};
use crate::record::{
    ConceptDescriptionAttrs, EntityId, ShellAttrs, SubmodelAttrs, VersionRecord,
};
use crate::storage::VersionStore;
use crate::store::VersionedStore;

/// The assembled vault: upload, query, and activation surface.
pub struct TwinVault {
    shells: Arc<VersionedStore<ShellAttrs>>,
    submodels: Arc<VersionedStore<SubmodelAttrs>>,
    concept_descriptions: Arc<VersionedStore<ConceptDescriptionAttrs>>,
    shell_activation: ActivationManager<ShellAttrs>,
    submodel_activation: ActivationManager<SubmodelAttrs>,
    concept_description_activation: ActivationManager<ConceptDescriptionAttrs>,
    pipeline: IngestionPipeline,
}

impl std::fmt::Debug for TwinVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwinVault").finish_non_exhaustive()
    }
}

impl TwinVault {
    /// Creates a vault over in-memory storage with the built-in JSON parser.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_parser(Arc::new(JsonPackageParser::new()))
    }

    /// Creates a vault over in-memory storage with a custom parser backend.
    #[must_use]
    pub fn with_parser(parser: Arc<dyn PackageParser>) -> Self {
        Self::with_ports(
            parser,
            Arc::new(crate::storage::InMemoryVersionStore::new()),
            Arc::new(crate::storage::InMemoryVersionStore::new()),
            Arc::new(crate::storage::InMemoryVersionStore::new()),
        )
    }

    /// Creates a vault over externally provided persistence ports.
    #[must_use]
    pub fn with_ports(
        parser: Arc<dyn PackageParser>,
        shell_port: Arc<dyn VersionStore<ShellAttrs>>,
        submodel_port: Arc<dyn VersionStore<SubmodelAttrs>>,
        concept_description_port: Arc<dyn VersionStore<ConceptDescriptionAttrs>>,
    ) -> Self {
        let shells = Arc::new(VersionedStore::new(shell_port));
        let submodels = Arc::new(VersionedStore::new(submodel_port));
        let concept_descriptions = Arc::new(VersionedStore::new(concept_description_port));

        Self {
            shell_activation: ActivationManager::new(Arc::clone(&shells)),
            submodel_activation: ActivationManager::new(Arc::clone(&submodels)),
            concept_description_activation: ActivationManager::new(Arc::clone(
                &concept_descriptions,
            )),
            pipeline: IngestionPipeline::new(
                parser,
                Arc::clone(&shells),
                Arc::clone(&submodels),
                Arc::clone(&concept_descriptions),
            ),
            shells,
            submodels,
            concept_descriptions,
        }
    }

    /// Ingests one uploaded package file.
    ///
    /// # Errors
    /// Validation and parse failures abort the upload; see
    /// [`IngestionPipeline::ingest_file`].
    pub fn upload(
        &self,
        filename: &str,
        bytes: &[u8],
        actor: &str,
        ignore_duplicates: bool,
    ) -> VaultResult<IngestReport> {
        self.pipeline
            .ingest_file(filename, bytes, actor, ignore_duplicates)
    }

    /// Shell store: active lists, version lists, existence checks.
    #[must_use]
    pub fn shells(&self) -> &VersionedStore<ShellAttrs> {
        &self.shells
    }

    /// Submodel store.
    #[must_use]
    pub fn submodels(&self) -> &VersionedStore<SubmodelAttrs> {
        &self.submodels
    }

    /// Concept-description store.
    #[must_use]
    pub fn concept_descriptions(&self) -> &VersionedStore<ConceptDescriptionAttrs> {
        &self.concept_descriptions
    }

    /// Makes `version` the active version of a shell.
    ///
    /// # Errors
    /// See [`ActivationManager::activate`].
    pub fn activate_shell(
        &self,
        entity_id: &EntityId,
        version: u32,
        actor: &str,
    ) -> VaultResult<VersionRecord<ShellAttrs>> {
        self.shell_activation.activate(entity_id, version, actor)
    }

    /// Makes `version` the active version of a submodel.
    ///
    /// # Errors
    /// See [`ActivationManager::activate`].
    pub fn activate_submodel(
        &self,
        entity_id: &EntityId,
        version: u32,
        actor: &str,
    ) -> VaultResult<VersionRecord<SubmodelAttrs>> {
        self.submodel_activation.activate(entity_id, version, actor)
    }

    /// Makes `version` the active version of a concept description.
    ///
    /// # Errors
    /// See [`ActivationManager::activate`].
    pub fn activate_concept_description(
        &self,
        entity_id: &EntityId,
        version: u32,
        actor: &str,
    ) -> VaultResult<VersionRecord<ConceptDescriptionAttrs>> {
        self.concept_description_activation
            .activate(entity_id, version, actor)
    }
}
