//! # TwinVault - Versioned storage for digital-twin description packages
//!
//! TwinVault ingests digital-twin description packages (asset administration
//! shells, submodels, concept descriptions) and persists each entity as an
//! append-only sequence of immutable, individually activatable version
//! snapshots.
//!
//! ## Core Concepts
//!
//! - **VersionRecord**: one immutable snapshot of an entity, numbered per
//!   entity starting at 1; at most one snapshot per entity is active
//! - **VersionedStore**: per-kind version-lifecycle service over a pluggable
//!   persistence port, with per-entity write serialization
//! - **ActivationManager**: atomic switch of which version is active
//! - **IngestionPipeline**: parsed package graph in, one store write per
//!   entity out, with per-entity failure isolation
//!
//! ## Usage
//!
//! ```rust
//! use twinvault::{EntityId, TwinVault};
//!
//! let vault = TwinVault::in_memory();
//! let package = br#"{
//!     "assetAdministrationShells": [{"id": "urn:shell:motor", "idShort": "Motor"}],
//!     "submodels": [{"id": "urn:sm:nameplate"}]
//! }"#;
//!
//! let report = vault.upload("motor.json", package, "operator", false)?;
//! assert!(report.is_complete());
//!
//! let shell = vault.shells().get_active(&EntityId::from("urn:shell:motor"))?;
//! assert_eq!(shell.version, 1);
//! # Ok::<(), twinvault::VaultError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod model;
pub mod record;

// Collaborator interfaces
pub mod parser;
pub mod storage;

// Version lifecycle and ingestion
pub mod activation;
pub mod ingest;
pub mod store;
pub mod vault;

// Re-export primary types at crate root for convenience
pub use activation::ActivationManager;
pub use error::{NotFoundError, ValidationError, VaultError, VaultResult};
pub use ingest::{EntityOutcome, IngestReport, IngestionPipeline, SaveOutcome};
pub use model::{
    AssetInformation, AssetKind, ConceptDescription, Package, Reference, Shell, Submodel,
    SubmodelElement,
};
pub use parser::{JsonPackageParser, PackageFormat, PackageParser, ParseError};
pub use record::{
    ConceptDescriptionAttrs, EntityId, EntityKind, SequenceId, ShellAttrs, SubmodelAttrs,
    VersionAttrs, VersionInfo, VersionRecord,
};
pub use storage::{InMemoryVersionStore, StorageError, VersionStore};
pub use store::{SaveRequest, VersionedStore};
pub use vault::TwinVault;
