//! Role-keyed collections of related resources.

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::core::index::IndexNamingRule;
use crate::core::inference::resource_for_role;
use crate::core::path::IoPath;
use crate::core::resource::Resource;
use crate::core::types::{ContentSubtype, ContentType};

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("No resource with role {role} in bundle")]
    MissingResource { role: ContentType },

    #[error("Bundle has no resource for its primary role {role}")]
    MissingPrimaryResource { role: ContentType },

    #[error("Role {role} appears more than once in bundle")]
    DuplicateRole { role: ContentType },

    #[error("Subtype {subtype} does not belong to the format family of role {role}")]
    SubtypeMismatch {
        role: ContentType,
        subtype: ContentSubtype,
    },

    #[error("Resource {display_name} ({role}) is stream-backed and cannot be serialized")]
    NotSerializable {
        role: ContentType,
        display_name: String,
    },

    #[error("Stream for {display_name} was already consumed")]
    StreamConsumed { display_name: String },

    #[error("Cannot infer a content type from {path}")]
    UnknownContentType { path: IoPath },

    #[error("Invalid bundle document: {0}")]
    InvalidDocument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An immutable, insertion-ordered collection of resources keyed by role.
///
/// Exactly one resource holds the primary role; every role appears at most once.
/// A changed bundle is a new bundle, see [`Bundle::with_resource`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    primary: ContentType,
    resources: IndexMap<ContentType, Resource>,
}

impl Bundle {
    /// Build a bundle from resources in order
    ///
    /// # Errors
    ///
    /// Returns `BundleError::DuplicateRole` if two resources share a role, or
    /// `BundleError::MissingPrimaryResource` if none holds `primary`.
    pub fn build(
        resources: impl IntoIterator<Item = Resource>,
        primary: ContentType,
    ) -> Result<Self, BundleError> {
        let mut map = IndexMap::new();
        for resource in resources {
            let role = resource.role().clone();
            if map.contains_key(&role) {
                return Err(BundleError::DuplicateRole { role });
            }
            map.insert(role, resource);
        }

        if !map.contains_key(&primary) {
            return Err(BundleError::MissingPrimaryResource { role: primary });
        }

        Ok(Self {
            primary,
            resources: map,
        })
    }

    /// A single-resource bundle whose only resource is primary. The subtype is
    /// inferred from the extension.
    pub fn from_path(role: ContentType, path: impl Into<IoPath>) -> Self {
        let resource = Resource::from_path(role.clone(), path);
        Self {
            primary: role.clone(),
            resources: IndexMap::from([(role, resource)]),
        }
    }

    /// A primary resource plus one companion resource
    ///
    /// # Errors
    ///
    /// Returns `BundleError::DuplicateRole` if both roles are the same.
    pub fn from_path_and_index(
        role: ContentType,
        path: impl Into<IoPath>,
        index_role: ContentType,
        index_path: impl Into<IoPath>,
    ) -> Result<Self, BundleError> {
        Self::build(
            [
                Resource::from_path(role.clone(), path),
                Resource::from_path(index_role, index_path),
            ],
            role,
        )
    }

    pub fn for_reads(path: impl Into<IoPath>) -> Self {
        Self::from_path(ContentType::READS, path)
    }

    /// A reads bundle with an explicit index path
    pub fn for_reads_with_index(path: impl Into<IoPath>, index: impl Into<IoPath>) -> Self {
        let reads = Resource::from_path(ContentType::READS, path);
        let index = Resource::from_path(ContentType::READS_INDEX, index);
        Self {
            primary: ContentType::READS,
            resources: IndexMap::from([
                (ContentType::READS, reads),
                (ContentType::READS_INDEX, index),
            ]),
        }
    }

    /// A bundle for `primary_path` plus its companion index, if one exists on disk.
    ///
    /// The rule's family decides both roles. An extension implying another family
    /// is logged as a role conflict and the rule's role is kept. A missing index is
    /// not an error: the bundle then holds only the primary resource.
    pub fn with_companion_index(primary_path: impl Into<IoPath>, rule: &IndexNamingRule) -> Self {
        let primary_path = primary_path.into();
        let role = rule.family().primary_role();
        let primary = resource_for_role(role.clone(), primary_path.clone()).resource;

        let mut resources = IndexMap::from([(role.clone(), primary)]);
        match rule.find_index(&primary_path) {
            Some(index_path) => {
                debug!(primary = %primary_path, index = %index_path, "Found companion index");
                let index_role = rule.family().index_role();
                resources.insert(
                    index_role.clone(),
                    Resource::path_backed(index_role, None, index_path),
                );
            }
            None => debug!(primary = %primary_path, "No companion index found"),
        }

        Self {
            primary: role,
            resources,
        }
    }

    #[must_use]
    pub fn get(&self, role: &ContentType) -> Option<&Resource> {
        self.resources.get(role)
    }

    /// # Errors
    ///
    /// Returns `BundleError::MissingResource` if no resource has `role`.
    pub fn get_or_fail(&self, role: &ContentType) -> Result<&Resource, BundleError> {
        self.get(role).ok_or_else(|| BundleError::MissingResource { role: role.clone() })
    }

    #[must_use]
    pub fn primary_role(&self) -> &ContentType {
        &self.primary
    }

    #[must_use]
    pub fn primary(&self) -> &Resource {
        // Construction guarantees the primary role is present
        &self.resources[&self.primary]
    }

    #[must_use]
    pub fn contains(&self, role: &ContentType) -> bool {
        self.resources.contains_key(role)
    }

    /// Resources in insertion order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Roles in insertion order
    pub fn roles(&self) -> impl Iterator<Item = &ContentType> {
        self.resources.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Always false for a built bundle
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// A new bundle with `resource` added, or replacing the resource of the same role.
    /// The replaced position is kept.
    #[must_use]
    pub fn with_resource(&self, resource: Resource) -> Self {
        let mut resources = self.resources.clone();
        resources.insert(resource.role().clone(), resource);
        Self {
            primary: self.primary.clone(),
            resources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FormatFamily;
    use tempfile::TempDir;

    #[test]
    fn test_build_requires_primary() {
        let index = Resource::from_path(ContentType::READS_INDEX, "x.bam.bai");
        let result = Bundle::build([index], ContentType::READS);
        assert!(matches!(
            result,
            Err(BundleError::MissingPrimaryResource { role }) if role == ContentType::READS
        ));
    }

    #[test]
    fn test_build_rejects_duplicate_roles() {
        let result = Bundle::build(
            [
                Resource::from_path(ContentType::READS, "a.bam"),
                Resource::from_path(ContentType::READS, "b.bam"),
            ],
            ContentType::READS,
        );
        assert!(matches!(result, Err(BundleError::DuplicateRole { .. })));
    }

    #[test]
    fn test_get_and_order() {
        let bundle = Bundle::for_reads_with_index("x.bam", "x.bam.bai");
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.primary().display_name(), "x.bam");
        assert_eq!(bundle.primary().subtype(), Some(&ContentSubtype::BAM));
        assert_eq!(
            bundle.get(&ContentType::READS_INDEX).unwrap().display_name(),
            "x.bam.bai"
        );
        assert!(bundle.get(&ContentType::VARIANTS_INDEX).is_none());
        assert!(matches!(
            bundle.get_or_fail(&ContentType::VARIANTS_INDEX),
            Err(BundleError::MissingResource { .. })
        ));

        let roles: Vec<_> = bundle.roles().map(ContentType::as_str).collect();
        assert_eq!(roles, vec!["READS", "READS_INDEX"]);
    }

    #[test]
    fn test_with_resource_builds_new_bundle() {
        let bundle = Bundle::for_reads("x.cram");
        let extended = bundle.with_resource(Resource::from_path(
            ContentType::HAPLOID_REFERENCE,
            "ref.fa",
        ));
        assert_eq!(bundle.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.primary_role(), &ContentType::READS);
    }

    #[test]
    fn test_companion_index_found() {
        let dir = TempDir::new().unwrap();
        let bam = dir.path().join("sample.bam");
        std::fs::write(&bam, b"").unwrap();
        std::fs::write(dir.path().join("sample.bam.bai"), b"").unwrap();

        let bundle = Bundle::with_companion_index(&bam, &IndexNamingRule::reads());
        assert_eq!(bundle.len(), 2);
        let index = bundle.get_or_fail(&ContentType::READS_INDEX).unwrap();
        assert!(index.display_name().ends_with("sample.bam.bai"));
    }

    #[test]
    fn test_companion_index_absent_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let bam = dir.path().join("sample.bam");
        std::fs::write(&bam, b"").unwrap();

        let bundle = Bundle::with_companion_index(&bam, &IndexNamingRule::reads());
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.primary_role(), &ContentType::READS);
    }

    #[test]
    fn test_companion_index_role_from_rule_family() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("reference.seq");
        std::fs::write(&primary, b">chr1\nACGT\n").unwrap();

        let rule = IndexNamingRule::haploid_reference();
        assert_eq!(rule.family(), FormatFamily::HaploidReference);
        let bundle = Bundle::with_companion_index(&primary, &rule);
        assert_eq!(bundle.primary_role(), &ContentType::HAPLOID_REFERENCE);
        assert_eq!(bundle.primary().subtype(), None);
    }
}
