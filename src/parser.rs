//! Package parser collaborator interface.
//!
//! The parser turns raw upload bytes into the [`Package`](crate::model::Package)
//! graph. Format detection happens here, from the filename suffix, before any
//! parsing or storage is attempted; the decoders themselves are pluggable
//! behind [`PackageParser`]. A JSON backend is built in; the packaged
//! container (`.aasx`) and XML decoders are external collaborators.

use std::fmt;

use thiserror::Error;

use crate::error::ValidationError;
use crate::model::Package;

/// Supported package formats, inferred from the filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageFormat {
    /// Packaged container (`.aasx`).
    Aasx,
    /// Plain JSON environment document (`.json`).
    Json,
    /// XML environment document (`.xml`).
    Xml,
}

impl PackageFormat {
    /// Infers the format from a filename suffix, case-insensitively.
    ///
    /// # Errors
    /// - [`ValidationError::MissingFilename`] when the name is empty.
    /// - [`ValidationError::UnsupportedFormat`] for any other suffix.
    pub fn from_filename(filename: &str) -> Result<Self, ValidationError> {
        let trimmed = filename.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingFilename);
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.ends_with(".aasx") {
            Ok(Self::Aasx)
        } else if lower.ends_with(".json") {
            Ok(Self::Json)
        } else if lower.ends_with(".xml") {
            Ok(Self::Xml)
        } else {
            Err(ValidationError::UnsupportedFormat {
                filename: trimmed.to_string(),
            })
        }
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aasx => write!(f, "aasx"),
            Self::Json => write!(f, "json"),
            Self::Xml => write!(f, "xml"),
        }
    }
}

/// Errors produced while decoding an uploaded package.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bytes do not decode as the declared format.
    #[error("Malformed {format} package: {message}")]
    Malformed {
        format: PackageFormat,
        message: String,
    },

    /// No decoder is wired in for the declared format.
    #[error("No parser backend available for {format} packages")]
    UnsupportedBackend {
        format: PackageFormat,
    },
}

/// Decoder from raw upload bytes to the parsed entity graph.
///
/// A failed parse aborts the whole upload before any entity is processed.
pub trait PackageParser: Send + Sync {
    /// Decodes `bytes` as a package of the declared format.
    ///
    /// # Errors
    /// Returns [`ParseError`] when the bytes cannot be decoded or the format
    /// has no backend.
    fn parse(&self, bytes: &[u8], format: PackageFormat) -> Result<Package, ParseError>;
}

/// Built-in parser backend for JSON environment documents.
///
/// AASX containers and XML documents require external decoders and are
/// rejected with [`ParseError::UnsupportedBackend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPackageParser;

impl JsonPackageParser {
    /// Creates the JSON parser backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PackageParser for JsonPackageParser {
    fn parse(&self, bytes: &[u8], format: PackageFormat) -> Result<Package, ParseError> {
        match format {
            PackageFormat::Json => {
                serde_json::from_slice(bytes).map_err(|err| ParseError::Malformed {
                    format,
                    message: err.to_string(),
                })
            }
            PackageFormat::Aasx | PackageFormat::Xml => {
                Err(ParseError::UnsupportedBackend { format })
            }
        }
    }
}
