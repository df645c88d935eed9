//! Content-type inference from file extensions.
//!
//! A fixed table maps recognized extensions to a [`Format`], which in turn gives the
//! primary role of its family and the content subtype. The table drives both default
//! role inference and the URI pre-filter of the built-in codecs.

use tracing::warn;

use crate::core::bundle::BundleError;
use crate::core::path::IoPath;
use crate::core::resource::Resource;
use crate::core::types::{ContentSubtype, ContentType, Format};

/// Recognized extensions, multi-part extensions first so that they win over their suffix
pub const EXTENSION_TABLE: &[(&str, Format)] = &[
    ("vcf.gz", Format::Vcf),
    ("vcf.bgz", Format::Vcf),
    ("fa.gz", Format::Fasta),
    ("fasta.gz", Format::Fasta),
    ("fna.gz", Format::Fasta),
    ("fa.bgz", Format::Fasta),
    ("fasta.bgz", Format::Fasta),
    ("fna.bgz", Format::Fasta),
    ("bam", Format::Bam),
    ("cram", Format::Cram),
    ("sam", Format::Sam),
    ("fa", Format::Fasta),
    ("fasta", Format::Fasta),
    ("fna", Format::Fasta),
    ("vcf", Format::Vcf),
    ("bcf", Format::Bcf),
];

/// The extensions the table associates with `format`
pub fn extensions_for(format: Format) -> impl Iterator<Item = &'static str> {
    EXTENSION_TABLE
        .iter()
        .filter(move |(_, f)| *f == format)
        .map(|(ext, _)| *ext)
}

/// What an extension says about a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredType {
    pub format: Format,
    pub role: ContentType,
    pub subtype: ContentSubtype,
}

/// Infer the format, primary role and subtype of a path from its extension
#[must_use]
pub fn infer_content_type(path: &IoPath) -> Option<InferredType> {
    EXTENSION_TABLE
        .iter()
        .find(|(ext, _)| path.has_extension(ext))
        .map(|&(_, format)| InferredType {
            format,
            role: format.family().primary_role(),
            subtype: format.subtype(),
        })
}

/// An explicitly supplied role that disagrees with the role implied by the extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleConflict {
    pub provided: ContentType,
    pub inferred: ContentType,
    pub path: IoPath,
}

/// A resource built from a path, plus any role conflict noticed while building it
#[derive(Debug, Clone, PartialEq)]
pub struct InferredResource {
    pub resource: Resource,
    pub conflict: Option<RoleConflict>,
}

/// Build a path-backed resource, inferring whatever was not supplied.
///
/// With no role, the role comes from the extension table. With an explicit role the
/// explicit role always wins; a disagreeing extension is reported as a [`RoleConflict`]
/// and logged as a warning, but never rejected.
///
/// # Errors
///
/// Returns `BundleError::UnknownContentType` if no role was supplied and the extension
/// is not in the table.
pub fn infer_resource(
    role: Option<ContentType>,
    path: IoPath,
) -> Result<InferredResource, BundleError> {
    match role {
        Some(role) => Ok(resource_for_role(role, path)),
        None => {
            let inferred = infer_content_type(&path)
                .ok_or_else(|| BundleError::UnknownContentType { path: path.clone() })?;
            Ok(InferredResource {
                resource: Resource::path_backed(inferred.role, Some(inferred.subtype), path),
                conflict: None,
            })
        }
    }
}

/// Build a path-backed resource with an explicit role; see [`infer_resource`]
pub fn resource_for_role(role: ContentType, path: IoPath) -> InferredResource {
    let Some(inferred) = infer_content_type(&path) else {
        return InferredResource {
            resource: Resource::path_backed(role, None, path),
            conflict: None,
        };
    };

    let conflict = (inferred.role != role).then(|| {
        warn!(
            provided = %role,
            inferred = %inferred.role,
            path = %path,
            "Provided content type doesn't match derived content type"
        );
        RoleConflict {
            provided: role.clone(),
            inferred: inferred.role.clone(),
            path: path.clone(),
        }
    });

    // Keep the inferred subtype only if it can describe the explicit role
    let subtype = (role.family() == Some(inferred.format.family())).then_some(inferred.subtype);

    InferredResource {
        resource: Resource::path_backed(role, subtype, path),
        conflict,
    }
}
