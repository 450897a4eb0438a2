//! Error types for TwinVault.
//!
//! All errors are strongly typed using thiserror, grouped by the stage that
//! produces them: validation before any storage mutation, not-found lookups,
//! storage-port failures, and package-parse failures.

use thiserror::Error;

use crate::parser::ParseError;
use crate::record::{EntityId, EntityKind};
use crate::storage::StorageError;

/// Upload-input validation errors, rejected before any parsing or storage.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File name is required")]
    MissingFilename,

    #[error("Unsupported file format: {filename}. Supported: .aasx, .json, .xml")]
    UnsupportedFormat {
        filename: String,
    },

    #[error("Actor identity cannot be empty")]
    EmptyActor,
}

/// Lookup failures for entity/version combinations that do not exist.
#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("No active {kind} version for {entity_id}")]
    NoActiveVersion {
        kind: EntityKind,
        entity_id: EntityId,
    },

    #[error("{kind} version not found: entity_id={entity_id}, version={version}")]
    VersionNotFound {
        kind: EntityKind,
        entity_id: EntityId,
        version: u32,
    },
}

/// Top-level error type for TwinVault.
///
/// This enum encompasses all failures an upload, save, query, or activation
/// can surface to a caller.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl VaultError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a parse error.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Returns true if the caller is at fault (bad input or missing target),
    /// as opposed to a backend or internal failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_) | Self::Parse(_))
    }
}

/// Result type alias for TwinVault operations.
pub type VaultResult<T> = Result<T, VaultError>;
