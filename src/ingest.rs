//! Package ingestion pipeline.
//!
//! Consumes one parsed [`Package`] and drives one store write per entity,
//! shells first, then submodels, then concept descriptions. Each entity is
//! saved in isolation: a storage or serialization failure is recorded in the
//! report and the rest of the package is still attempted.
//!
//! Submodels are linked to the first shell successfully saved in the same
//! package. That is a positional heuristic, not a resolution of the shell's
//! submodel references; with multiple shells in one package the link may not
//! reflect true ownership.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ValidationError, VaultResult};
use crate::model::{canonical_json, ConceptDescription, Package, Shell, Submodel, SubmodelElement};
use crate::parser::{PackageFormat, PackageParser};
use crate::record::{
    ConceptDescriptionAttrs, EntityId, EntityKind, ShellAttrs, SubmodelAttrs, VersionAttrs,
    VersionRecord,
};
use crate::storage::StorageError;
use crate::store::{SaveRequest, VersionedStore};

/// Result of one entity's save attempt within a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveOutcome {
    /// The entity was stored at this version.
    Saved {
        /// Version number assigned (or refreshed).
        version: u32,
    },
    /// The save failed; the rest of the package was still processed.
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
}

/// Per-entity ingestion outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOutcome {
    /// Entity kind.
    pub kind: EntityKind,
    /// Business key of the entity.
    pub entity_id: EntityId,
    /// What happened to it.
    pub outcome: SaveOutcome,
}

impl EntityOutcome {
    /// Returns true when the entity was saved.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self.outcome, SaveOutcome::Saved { .. })
    }
}

/// Summary of one package ingestion.
///
/// `outcomes` records every entity in the package, saved or failed; the
/// per-kind ID lists contain successfully saved entities only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Correlation ID for this upload, used in logs.
    pub upload_id: Uuid,
    /// Per-entity outcomes, in processing order.
    pub outcomes: Vec<EntityOutcome>,
    /// Successfully saved shell IDs, in package order.
    pub shell_ids: Vec<EntityId>,
    /// Successfully saved submodel IDs, in package order.
    pub submodel_ids: Vec<EntityId>,
    /// Successfully saved concept-description IDs, in package order.
    pub concept_description_ids: Vec<EntityId>,
    /// Human-readable count summary.
    pub message: String,
}

impl IngestReport {
    /// Outcomes of entities that failed to save.
    pub fn failures(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_saved())
    }

    /// Returns true when every entity in the package was saved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(EntityOutcome::is_saved)
    }
}

/// Drives parsed packages into the three versioned stores.
pub struct IngestionPipeline {
    parser: Arc<dyn PackageParser>,
    shells: Arc<VersionedStore<ShellAttrs>>,
    submodels: Arc<VersionedStore<SubmodelAttrs>>,
    concept_descriptions: Arc<VersionedStore<ConceptDescriptionAttrs>>,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline").finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    /// Creates a pipeline over the parser and the three per-kind stores.
    #[must_use]
    pub fn new(
        parser: Arc<dyn PackageParser>,
        shells: Arc<VersionedStore<ShellAttrs>>,
        submodels: Arc<VersionedStore<SubmodelAttrs>>,
        concept_descriptions: Arc<VersionedStore<ConceptDescriptionAttrs>>,
    ) -> Self {
        Self {
            parser,
            shells,
            submodels,
            concept_descriptions,
        }
    }

    /// Validates, parses, and ingests one uploaded file.
    ///
    /// Validation and parse failures abort the upload before any storage
    /// mutation. Per-entity save failures do not: they are recorded in the
    /// returned report.
    ///
    /// # Errors
    /// - [`ValidationError`] for an empty actor, missing filename, or
    ///   unsupported suffix.
    /// - [`ParseError`](crate::parser::ParseError) when the package cannot be
    ///   decoded.
    pub fn ingest_file(
        &self,
        filename: &str,
        bytes: &[u8],
        actor: &str,
        ignore_duplicates: bool,
    ) -> VaultResult<IngestReport> {
        if actor.trim().is_empty() {
            return Err(ValidationError::EmptyActor.into());
        }
        let format = PackageFormat::from_filename(filename)?;

        info!(
            filename,
            %format,
            actor,
            ignore_duplicates,
            size = bytes.len(),
            "parsing uploaded package"
        );
        let package = self.parser.parse(bytes, format)?;
        Ok(self.ingest_package(&package, actor, ignore_duplicates))
    }

    /// Ingests an already-parsed package.
    ///
    /// `ignore_duplicates` maps to the store's no-new-version mode: a
    /// re-upload refreshes existing entities instead of appending versions.
    #[must_use]
    pub fn ingest_package(
        &self,
        package: &Package,
        actor: &str,
        ignore_duplicates: bool,
    ) -> IngestReport {
        let upload_id = Uuid::new_v4();
        let create_new_version = !ignore_duplicates;

        info!(
            %upload_id,
            actor,
            ignore_duplicates,
            shells = package.shells.len(),
            submodels = package.submodels.len(),
            concept_descriptions = package.concept_descriptions.len(),
            "ingesting package"
        );

        let mut outcomes = Vec::with_capacity(package.entity_count());
        let mut shell_ids = Vec::new();
        let mut submodel_ids = Vec::new();
        let mut concept_description_ids = Vec::new();

        // First shell that actually lands in the store; submodels in this
        // package link to it.
        let mut parent_id: Option<EntityId> = None;

        for shell in &package.shells {
            debug!(
                %upload_id,
                entity_id = %shell.id,
                id_short = shell.id_short.as_deref().unwrap_or("-"),
                "processing shell"
            );
            let result = self.save_shell(shell, create_new_version, actor);
            if let Ok(record) = &result {
                if parent_id.is_none() {
                    parent_id = Some(record.entity_id.clone());
                }
                shell_ids.push(record.entity_id.clone());
            }
            outcomes.push(outcome_of(EntityKind::Shell, &shell.id, &result));
        }

        for submodel in &package.submodels {
            debug!(
                %upload_id,
                entity_id = %submodel.id,
                id_short = submodel.id_short.as_deref().unwrap_or("-"),
                semantic_id = submodel.semantic_key().unwrap_or("-"),
                elements = submodel.elements.len(),
                "processing submodel"
            );
            log_elements(&submodel.elements, 0);

            let result = self.save_submodel(submodel, parent_id.clone(), create_new_version, actor);
            if let Ok(record) = &result {
                submodel_ids.push(record.entity_id.clone());
            }
            outcomes.push(outcome_of(EntityKind::Submodel, &submodel.id, &result));
        }

        for concept_description in &package.concept_descriptions {
            debug!(
                %upload_id,
                entity_id = %concept_description.id,
                id_short = concept_description.id_short.as_deref().unwrap_or("-"),
                "processing concept description"
            );
            let result =
                self.save_concept_description(concept_description, create_new_version, actor);
            if let Ok(record) = &result {
                concept_description_ids.push(record.entity_id.clone());
            }
            outcomes.push(outcome_of(
                EntityKind::ConceptDescription,
                &concept_description.id,
                &result,
            ));
        }

        let message = format!(
            "Saved {} shells, {} submodels, {} concept descriptions (uploaded by: {actor})",
            shell_ids.len(),
            submodel_ids.len(),
            concept_description_ids.len(),
        );
        info!(%upload_id, "{message}");

        IngestReport {
            upload_id,
            outcomes,
            shell_ids,
            submodel_ids,
            concept_description_ids,
            message,
        }
    }

    fn save_shell(
        &self,
        shell: &Shell,
        create_new_version: bool,
        actor: &str,
    ) -> VaultResult<VersionRecord<ShellAttrs>> {
        let payload = canonical_json(shell)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let attrs = ShellAttrs {
            asset_kind: shell
                .asset_information
                .as_ref()
                .and_then(|info| info.asset_kind)
                .map(|kind| kind.as_str().to_string()),
            global_asset_id: shell
                .asset_information
                .as_ref()
                .and_then(|info| info.global_asset_id.clone()),
        };
        self.shells.save(
            SaveRequest {
                entity_id: shell.id.clone(),
                id_short: shell.id_short.clone(),
                attrs,
                payload,
                create_new_version,
            },
            actor,
        )
    }

    fn save_submodel(
        &self,
        submodel: &Submodel,
        parent_id: Option<EntityId>,
        create_new_version: bool,
        actor: &str,
    ) -> VaultResult<VersionRecord<SubmodelAttrs>> {
        let payload = canonical_json(submodel)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let attrs = SubmodelAttrs {
            semantic_id: submodel.semantic_key().map(str::to_string),
            parent_id,
        };
        self.submodels.save(
            SaveRequest {
                entity_id: submodel.id.clone(),
                id_short: submodel.id_short.clone(),
                attrs,
                payload,
                create_new_version,
            },
            actor,
        )
    }

    fn save_concept_description(
        &self,
        concept_description: &ConceptDescription,
        create_new_version: bool,
        actor: &str,
    ) -> VaultResult<VersionRecord<ConceptDescriptionAttrs>> {
        let payload = canonical_json(concept_description)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.concept_descriptions.save(
            SaveRequest {
                entity_id: concept_description.id.clone(),
                id_short: concept_description.id_short.clone(),
                attrs: ConceptDescriptionAttrs,
                payload,
                create_new_version,
            },
            actor,
        )
    }
}

fn outcome_of<A: VersionAttrs>(
    kind: EntityKind,
    entity_id: &EntityId,
    result: &VaultResult<VersionRecord<A>>,
) -> EntityOutcome {
    let outcome = match result {
        Ok(record) => SaveOutcome::Saved {
            version: record.version,
        },
        Err(err) => {
            warn!(%kind, %entity_id, error = %err, "failed to save entity; continuing");
            SaveOutcome::Failed {
                reason: err.to_string(),
            }
        }
    };
    EntityOutcome {
        kind,
        entity_id: entity_id.clone(),
        outcome,
    }
}

fn log_elements(elements: &[SubmodelElement], depth: usize) {
    for element in elements {
        let indent = "  ".repeat(depth);
        debug!("{indent}- {}", element.describe());
        log_elements(element.children(), depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssetInformation, AssetKind, Reference};
    use crate::parser::JsonPackageParser;

    fn pipeline() -> (
        IngestionPipeline,
        Arc<VersionedStore<ShellAttrs>>,
        Arc<VersionedStore<SubmodelAttrs>>,
        Arc<VersionedStore<ConceptDescriptionAttrs>>,
    ) {
        let shells = Arc::new(VersionedStore::in_memory());
        let submodels = Arc::new(VersionedStore::in_memory());
        let concept_descriptions = Arc::new(VersionedStore::in_memory());
        let pipeline = IngestionPipeline::new(
            Arc::new(JsonPackageParser::new()),
            Arc::clone(&shells),
            Arc::clone(&submodels),
            Arc::clone(&concept_descriptions),
        );
        (pipeline, shells, submodels, concept_descriptions)
    }

    fn shell(id: &str) -> Shell {
        Shell {
            id: EntityId::from(id),
            id_short: None,
            asset_information: None,
            submodel_refs: Vec::new(),
        }
    }

    fn submodel(id: &str) -> Submodel {
        Submodel {
            id: EntityId::from(id),
            id_short: None,
            semantic_id: None,
            elements: Vec::new(),
        }
    }

    #[test]
    fn test_ingest_stores_all_kinds() {
        let (pipeline, shells, submodels, concept_descriptions) = pipeline();
        let package = Package {
            shells: vec![shell("urn:shell:a")],
            submodels: vec![submodel("urn:sm:a")],
            concept_descriptions: vec![ConceptDescription {
                id: EntityId::from("urn:cd:a"),
                id_short: Some("Vendor".to_string()),
            }],
        };

        let report = pipeline.ingest_package(&package, "operator", false);
        assert!(report.is_complete());
        assert_eq!(report.shell_ids, vec![EntityId::from("urn:shell:a")]);
        assert_eq!(report.submodel_ids, vec![EntityId::from("urn:sm:a")]);
        assert_eq!(
            report.concept_description_ids,
            vec![EntityId::from("urn:cd:a")]
        );
        assert_eq!(report.outcomes.len(), 3);
        assert!(report.message.contains("1 shells"));
        assert!(report.message.contains("uploaded by: operator"));

        assert_eq!(
            shells.get_active(&EntityId::from("urn:shell:a")).unwrap().version,
            1
        );
        assert_eq!(
            submodels.get_active(&EntityId::from("urn:sm:a")).unwrap().version,
            1
        );
        assert_eq!(
            concept_descriptions
                .get_active(&EntityId::from("urn:cd:a"))
                .unwrap()
                .version,
            1
        );
    }

    #[test]
    fn test_shell_attrs_derived_from_asset_information() {
        let (pipeline, shells, _, _) = pipeline();
        let mut with_info = shell("urn:shell:a");
        with_info.asset_information = Some(AssetInformation {
            asset_kind: Some(AssetKind::Instance),
            global_asset_id: Some("urn:asset:1".to_string()),
        });
        let package = Package {
            shells: vec![with_info, shell("urn:shell:b")],
            ..Package::default()
        };

        pipeline.ingest_package(&package, "operator", false);

        let a = shells.get_active(&EntityId::from("urn:shell:a")).unwrap();
        assert_eq!(a.attrs.asset_kind.as_deref(), Some("Instance"));
        assert_eq!(a.attrs.global_asset_id.as_deref(), Some("urn:asset:1"));

        let b = shells.get_active(&EntityId::from("urn:shell:b")).unwrap();
        assert_eq!(b.attrs.asset_kind, None);
        assert_eq!(b.attrs.global_asset_id, None);
    }

    #[test]
    fn test_submodel_links_to_first_shell() {
        let (pipeline, _, submodels, _) = pipeline();
        let package = Package {
            shells: vec![shell("urn:shell:first"), shell("urn:shell:second")],
            submodels: vec![submodel("urn:sm:a")],
            ..Package::default()
        };

        pipeline.ingest_package(&package, "operator", false);

        let record = submodels.get_active(&EntityId::from("urn:sm:a")).unwrap();
        assert_eq!(
            record.attrs.parent_id,
            Some(EntityId::from("urn:shell:first"))
        );
    }

    #[test]
    fn test_submodel_without_shell_has_no_parent() {
        let (pipeline, _, submodels, _) = pipeline();
        let package = Package {
            submodels: vec![submodel("urn:sm:a")],
            ..Package::default()
        };

        pipeline.ingest_package(&package, "operator", false);

        let record = submodels.get_active(&EntityId::from("urn:sm:a")).unwrap();
        assert_eq!(record.attrs.parent_id, None);
    }

    #[test]
    fn test_submodel_semantic_id_resolution() {
        let (pipeline, _, submodels, _) = pipeline();
        let mut with_semantics = submodel("urn:sm:a");
        with_semantics.semantic_id = Some(Reference {
            keys: vec!["urn:semantics:nameplate".to_string()],
        });
        let mut empty_keys = submodel("urn:sm:b");
        empty_keys.semantic_id = Some(Reference::default());
        let package = Package {
            submodels: vec![with_semantics, empty_keys],
            ..Package::default()
        };

        pipeline.ingest_package(&package, "operator", false);

        let a = submodels.get_active(&EntityId::from("urn:sm:a")).unwrap();
        assert_eq!(a.attrs.semantic_id.as_deref(), Some("urn:semantics:nameplate"));
        let b = submodels.get_active(&EntityId::from("urn:sm:b")).unwrap();
        assert_eq!(b.attrs.semantic_id, None);
    }

    #[test]
    fn test_reupload_appends_versions() {
        let (pipeline, shells, _, _) = pipeline();
        let package = Package {
            shells: vec![shell("urn:shell:a")],
            ..Package::default()
        };

        pipeline.ingest_package(&package, "operator", false);
        pipeline.ingest_package(&package, "operator", false);

        let id = EntityId::from("urn:shell:a");
        assert_eq!(shells.count_versions(&id).unwrap(), 2);
        assert_eq!(shells.get_active(&id).unwrap().version, 2);
    }

    #[test]
    fn test_reupload_with_ignore_duplicates_refreshes() {
        let (pipeline, shells, _, _) = pipeline();
        let package = Package {
            shells: vec![shell("urn:shell:a")],
            ..Package::default()
        };

        pipeline.ingest_package(&package, "operator", false);
        pipeline.ingest_package(&package, "operator", true);

        let id = EntityId::from("urn:shell:a");
        assert_eq!(shells.count_versions(&id).unwrap(), 1);
        assert_eq!(shells.get_active(&id).unwrap().version, 1);
    }

    #[test]
    fn test_ingest_file_validates_before_parsing() {
        let (pipeline, _, _, _) = pipeline();

        let err = pipeline
            .ingest_file("", b"{}", "operator", false)
            .unwrap_err();
        assert!(err.is_validation());

        let err = pipeline
            .ingest_file("twin.zip", b"{}", "operator", false)
            .unwrap_err();
        assert!(err.is_validation());

        let err = pipeline
            .ingest_file("twin.json", b"{}", "  ", false)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_ingest_file_parse_failure_aborts() {
        let (pipeline, shells, _, _) = pipeline();
        let err = pipeline
            .ingest_file("twin.json", b"{broken", "operator", false)
            .unwrap_err();
        assert!(err.is_parse());
        assert!(shells.list_all_active().unwrap().is_empty());
    }

    #[test]
    fn test_ingest_file_end_to_end() {
        let (pipeline, shells, _, _) = pipeline();
        let bytes = br#"{
            "assetAdministrationShells": [{"id": "urn:shell:motor", "idShort": "Motor"}],
            "submodels": [{"id": "urn:sm:doc"}]
        }"#;

        let report = pipeline
            .ingest_file("twin.json", bytes, "operator", false)
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(
            shells
                .get_active(&EntityId::from("urn:shell:motor"))
                .unwrap()
                .id_short
                .as_deref(),
            Some("Motor")
        );
    }
}
