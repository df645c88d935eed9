//! The JSON interchange document for bundles.
//!
//! ```json
//! {
//!   "schemaName": "htsbundle",
//!   "schemaVersion": "0.1.0",
//!   "primary": "READS",
//!   "READS": { "path": "/data/sample.bam", "subtype": "BAM" },
//!   "READS_INDEX": { "path": "/data/sample.bam.bai" }
//! }
//! ```
//!
//! Every key other than the three reserved ones names a role. Roles are kept in
//! document order, including roles this crate does not know.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::bundle::{Bundle, BundleError};
use crate::core::path::IoPath;
use crate::core::resource::Resource;
use crate::core::types::{ContentSubtype, ContentType};

pub const BUNDLE_SCHEMA_NAME: &str = "htsbundle";
pub const BUNDLE_SCHEMA_VERSION: &str = "0.1.0";
pub const BUNDLE_EXTENSION: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleDocument {
    schema_name: String,
    #[serde(default)]
    schema_version: Option<String>,
    primary: String,
    #[serde(flatten)]
    resources: IndexMap<String, ResourceEntry>,
}

/// A role's value: either `{ "path": ..., "subtype": ... }` or a bare path string
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ResourceEntry {
    Path(String),
    Entry {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtype: Option<String>,
    },
}

impl Bundle {
    /// Serialize to the interchange document
    ///
    /// # Errors
    ///
    /// Returns `BundleError::NotSerializable` if any resource is stream-backed.
    pub fn to_json(&self) -> Result<String, BundleError> {
        let mut resources = IndexMap::with_capacity(self.len());
        for resource in self.resources() {
            let path = resource
                .io_path()
                .ok_or_else(|| BundleError::NotSerializable {
                    role: resource.role().clone(),
                    display_name: resource.display_name().to_string(),
                })?;
            resources.insert(
                resource.role().to_string(),
                ResourceEntry::Entry {
                    path: path.to_string(),
                    subtype: resource.subtype().map(ToString::to_string),
                },
            );
        }

        let document = BundleDocument {
            schema_name: BUNDLE_SCHEMA_NAME.to_string(),
            schema_version: Some(BUNDLE_SCHEMA_VERSION.to_string()),
            primary: self.primary_role().to_string(),
            resources,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Parse an interchange document, treating every path as an [`IoPath`]
    ///
    /// # Errors
    ///
    /// See [`Bundle::from_json_with`].
    pub fn from_json(text: &str) -> Result<Self, BundleError> {
        Self::from_json_with(text, |path| IoPath::new(path))
    }

    /// Parse an interchange document, building each resource location with
    /// `path_factory`
    ///
    /// # Errors
    ///
    /// Returns `BundleError::Json` for malformed JSON, `BundleError::InvalidDocument`
    /// for a wrong schema name, `BundleError::SubtypeMismatch` for a subtype outside its
    /// role's family, or the errors of [`Bundle::build`].
    pub fn from_json_with<F>(text: &str, path_factory: F) -> Result<Self, BundleError>
    where
        F: Fn(&str) -> IoPath,
    {
        let document: BundleDocument = serde_json::from_str(text)?;

        if document.schema_name != BUNDLE_SCHEMA_NAME {
            return Err(BundleError::InvalidDocument(format!(
                "expected schemaName '{BUNDLE_SCHEMA_NAME}', found '{}'",
                document.schema_name
            )));
        }
        match document.schema_version.as_deref() {
            Some(BUNDLE_SCHEMA_VERSION) => {}
            Some(version) => warn!(
                found = version,
                expected = BUNDLE_SCHEMA_VERSION,
                "Bundle document has a different schema version"
            ),
            None => warn!("Bundle document has no schema version"),
        }

        let resources = document
            .resources
            .into_iter()
            .map(|(role, entry)| {
                let (path, subtype) = match entry {
                    ResourceEntry::Path(path) => (path, None),
                    ResourceEntry::Entry { path, subtype } => (path, subtype),
                };
                Resource::with_subtype(
                    ContentType::new(role),
                    subtype.map(ContentSubtype::new),
                    path_factory(&path),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::build(resources, ContentType::new(document.primary))
    }

    /// Read an interchange document from a file
    ///
    /// # Errors
    ///
    /// Returns `BundleError::Io` if the file cannot be read, or any error of
    /// [`Bundle::from_json`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// True if `path` names an interchange document rather than a data file
#[must_use]
pub fn looks_like_bundle(path: &IoPath) -> bool {
    path.has_extension(BUNDLE_EXTENSION)
}
