//! Parsed package graph.
//!
//! The package parser collaborator turns an uploaded file into this in-memory
//! graph; the ingestion pipeline walks it and derives one store write per
//! entity. These types also define the canonical JSON payload each record
//! carries.

use serde::{Deserialize, Serialize};

use crate::record::EntityId;

/// An ordered reference to another identifiable.
///
/// Only the key values are modeled; the core reads the first key and treats
/// the rest as opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Key values, outermost first.
    #[serde(default)]
    pub keys: Vec<String>,
}

impl Reference {
    /// Value of the first key, if any.
    #[must_use]
    pub fn first_key(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }
}

/// Kind of asset a shell describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    /// A concrete asset instance.
    Instance,
    /// An asset type.
    Type,
    /// Kind is not applicable for this asset.
    NotApplicable,
}

impl AssetKind {
    /// Canonical name, as stored on shell records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "Instance",
            Self::Type => "Type",
            Self::NotApplicable => "NotApplicable",
        }
    }
}

/// Asset identity block of a shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInformation {
    /// Kind of the described asset.
    pub asset_kind: Option<AssetKind>,
    /// Global asset identifier.
    pub global_asset_id: Option<String>,
}

/// An asset administration shell: the header entity of a digital twin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shell {
    /// Business identifier.
    pub id: EntityId,
    /// Short human-readable name.
    #[serde(default)]
    pub id_short: Option<String>,
    /// Asset identity; may be absent in incomplete packages.
    #[serde(default)]
    pub asset_information: Option<AssetInformation>,
    /// References to the shell's submodels.
    #[serde(default, rename = "submodels")]
    pub submodel_refs: Vec<Reference>,
}

/// A language-tagged string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangString {
    /// BCP 47 language tag.
    pub language: String,
    /// Text in that language.
    pub text: String,
}

/// Closed set of submodel element variants the core understands.
///
/// Elements are handled exhaustively (logging, summaries); variants the
/// format defines but the core does not model fall into [`Self::Unsupported`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modelType")]
pub enum SubmodelElement {
    /// A single typed value.
    #[serde(rename_all = "camelCase")]
    Property {
        /// Short name.
        #[serde(default)]
        id_short: Option<String>,
        /// Stringified value.
        #[serde(default)]
        value: Option<String>,
        /// XSD value type name.
        #[serde(default)]
        value_type: Option<String>,
    },
    /// A min/max pair.
    #[serde(rename_all = "camelCase")]
    Range {
        /// Short name.
        #[serde(default)]
        id_short: Option<String>,
        /// Lower bound.
        #[serde(default)]
        min: Option<String>,
        /// Upper bound.
        #[serde(default)]
        max: Option<String>,
        /// XSD value type name.
        #[serde(default)]
        value_type: Option<String>,
    },
    /// A reference to an external file.
    #[serde(rename_all = "camelCase")]
    File {
        /// Short name.
        #[serde(default)]
        id_short: Option<String>,
        /// File path or URL.
        #[serde(default)]
        value: Option<String>,
        /// MIME type.
        #[serde(default)]
        content_type: Option<String>,
    },
    /// Inline binary content.
    #[serde(rename_all = "camelCase")]
    Blob {
        /// Short name.
        #[serde(default)]
        id_short: Option<String>,
        /// Base64-encoded content.
        #[serde(default)]
        value: Option<String>,
        /// MIME type.
        #[serde(default)]
        content_type: Option<String>,
    },
    /// A value translated into multiple languages.
    #[serde(rename_all = "camelCase")]
    MultiLanguageProperty {
        /// Short name.
        #[serde(default)]
        id_short: Option<String>,
        /// Translations.
        #[serde(default)]
        value: Vec<LangString>,
    },
    /// A reference-valued element.
    #[serde(rename_all = "camelCase")]
    ReferenceElement {
        /// Short name.
        #[serde(default)]
        id_short: Option<String>,
        /// Referenced identifiable.
        #[serde(default)]
        value: Option<Reference>,
    },
    /// An unordered group of named child elements.
    #[serde(rename_all = "camelCase")]
    SubmodelElementCollection {
        /// Short name.
        #[serde(default)]
        id_short: Option<String>,
        /// Child elements.
        #[serde(default)]
        value: Vec<SubmodelElement>,
    },
    /// An ordered list of child elements.
    #[serde(rename_all = "camelCase")]
    SubmodelElementList {
        /// Short name.
        #[serde(default)]
        id_short: Option<String>,
        /// Child elements.
        #[serde(default)]
        value: Vec<SubmodelElement>,
    },
    /// Any element kind the core does not model.
    #[serde(other)]
    Unsupported,
}

impl SubmodelElement {
    /// Short name of the element, if it has one.
    #[must_use]
    pub fn id_short(&self) -> Option<&str> {
        match self {
            Self::Property { id_short, .. }
            | Self::Range { id_short, .. }
            | Self::File { id_short, .. }
            | Self::Blob { id_short, .. }
            | Self::MultiLanguageProperty { id_short, .. }
            | Self::ReferenceElement { id_short, .. }
            | Self::SubmodelElementCollection { id_short, .. }
            | Self::SubmodelElementList { id_short, .. } => id_short.as_deref(),
            Self::Unsupported => None,
        }
    }

    /// Child elements of container variants; empty for leaf elements.
    #[must_use]
    pub fn children(&self) -> &[SubmodelElement] {
        match self {
            Self::SubmodelElementCollection { value, .. }
            | Self::SubmodelElementList { value, .. } => value,
            _ => &[],
        }
    }

    /// One-line human-readable summary, used when logging package contents.
    #[must_use]
    pub fn describe(&self) -> String {
        let name = self.id_short().unwrap_or("<unnamed>");
        match self {
            Self::Property {
                value, value_type, ..
            } => format!(
                "{name} (Property) = {} [{}]",
                value.as_deref().unwrap_or("null"),
                value_type.as_deref().unwrap_or("unknown")
            ),
            Self::Range {
                min,
                max,
                value_type,
                ..
            } => format!(
                "{name} (Range) = {} ~ {} [{}]",
                min.as_deref().unwrap_or("null"),
                max.as_deref().unwrap_or("null"),
                value_type.as_deref().unwrap_or("unknown")
            ),
            Self::File {
                value,
                content_type,
                ..
            } => format!(
                "{name} (File) = {} [{}]",
                value.as_deref().unwrap_or("null"),
                content_type.as_deref().unwrap_or("unknown")
            ),
            Self::Blob {
                value,
                content_type,
                ..
            } => {
                let size = value
                    .as_ref()
                    .map_or_else(|| "null".to_string(), |v| format!("{} bytes", v.len()));
                format!(
                    "{name} (Blob) = {size} [{}]",
                    content_type.as_deref().unwrap_or("unknown")
                )
            }
            Self::MultiLanguageProperty { value, .. } => {
                format!("{name} (MultiLanguageProperty) [{} translations]", value.len())
            }
            Self::ReferenceElement { value, .. } => format!(
                "{name} (ReferenceElement) -> {}",
                value
                    .as_ref()
                    .and_then(Reference::first_key)
                    .unwrap_or("null")
            ),
            Self::SubmodelElementCollection { value, .. } => {
                format!("{name} (Collection) [{} items]", value.len())
            }
            Self::SubmodelElementList { value, .. } => {
                format!("{name} (List) [{} items]", value.len())
            }
            Self::Unsupported => format!("{name} (Unsupported)"),
        }
    }
}

/// A structured payload describing one aspect of an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submodel {
    /// Business identifier.
    pub id: EntityId,
    /// Short human-readable name.
    #[serde(default)]
    pub id_short: Option<String>,
    /// Semantic reference classifying this submodel.
    #[serde(default)]
    pub semantic_id: Option<Reference>,
    /// Typed element tree.
    #[serde(default, rename = "submodelElements")]
    pub elements: Vec<SubmodelElement>,
}

impl Submodel {
    /// First key value of the semantic reference, if one is present.
    #[must_use]
    pub fn semantic_key(&self) -> Option<&str> {
        self.semantic_id.as_ref().and_then(Reference::first_key)
    }
}

/// A semantic dictionary entry referenced by submodel elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptDescription {
    /// Business identifier.
    pub id: EntityId,
    /// Short human-readable name.
    #[serde(default)]
    pub id_short: Option<String>,
}

/// One parsed package: the entity graph an upload decodes into.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Shells, in package order.
    #[serde(default, rename = "assetAdministrationShells")]
    pub shells: Vec<Shell>,
    /// Submodels, in package order.
    #[serde(default)]
    pub submodels: Vec<Submodel>,
    /// Concept descriptions, in package order.
    #[serde(default)]
    pub concept_descriptions: Vec<ConceptDescription>,
}

impl Package {
    /// Returns true when the package contains no entities at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shells.is_empty() && self.submodels.is_empty() && self.concept_descriptions.is_empty()
    }

    /// Total number of entities across all kinds.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.shells.len() + self.submodels.len() + self.concept_descriptions.len()
    }
}

/// Serializes an entity to its canonical JSON payload form.
///
/// # Errors
/// Returns the underlying serializer error when the value cannot be encoded.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}
