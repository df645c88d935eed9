//! A single entry of a [`Bundle`](crate::core::bundle::Bundle).

use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::bundle::BundleError;
use crate::core::inference::resource_for_role;
use crate::core::path::IoPath;
use crate::core::types::{ContentSubtype, ContentType};

/// A boxed byte source that can be handed across threads
pub type ByteSource = Box<dyn Read + Send>;

/// Where a resource's bytes come from
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceSource {
    /// A path or URI, opened on demand (serializable)
    Path(IoPath),
    /// An already-open byte stream (not serializable)
    Stream(StreamSource),
}

/// A shared slot holding an open byte stream.
///
/// Signature probing takes the stream out of the slot and puts back a reader that
/// replays the probed prefix, so a decoder created afterwards still starts at byte 0.
/// A decoder takes the stream for good; a second decoder then fails with
/// [`BundleError::StreamConsumed`].
#[derive(Clone)]
pub struct StreamSource {
    slot: Arc<Mutex<Option<ByteSource>>>,
}

impl StreamSource {
    pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(Box::new(reader)))),
        }
    }

    /// Take the stream out of the slot, leaving it empty
    #[must_use]
    pub fn take(&self) -> Option<ByteSource> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Put a stream (usually a prefix-replaying reader) back into the slot
    pub fn restore(&self, reader: ByteSource) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(reader);
    }

    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSource")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

/// Two stream sources are equal only if they share the same underlying stream
impl PartialEq for StreamSource {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

/// One role-tagged entry in a bundle
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    role: ContentType,
    subtype: Option<ContentSubtype>,
    source: ResourceSource,
    display_name: String,
}

impl Resource {
    /// Create a path-backed resource with an explicit role.
    ///
    /// The subtype is inferred from the path's extension. If the extension implies a
    /// different role, the explicit role is kept and a warning is logged; see
    /// [`resource_for_role`] to observe the conflict programmatically.
    pub fn from_path(role: ContentType, path: impl Into<IoPath>) -> Self {
        resource_for_role(role, path.into()).resource
    }

    /// Create a path-backed resource with an explicit role and subtype
    ///
    /// # Errors
    ///
    /// Returns `BundleError::SubtypeMismatch` if the subtype belongs to a different
    /// format family than the role.
    pub fn with_subtype(
        role: ContentType,
        subtype: Option<ContentSubtype>,
        path: impl Into<IoPath>,
    ) -> Result<Self, BundleError> {
        check_subtype(&role, subtype.as_ref())?;
        Ok(Self::path_backed(role, subtype, path.into()))
    }

    /// Path-backed constructor for callers that already checked the subtype
    pub(crate) fn path_backed(
        role: ContentType,
        subtype: Option<ContentSubtype>,
        path: IoPath,
    ) -> Self {
        Self {
            role,
            subtype,
            display_name: path.to_string(),
            source: ResourceSource::Path(path),
        }
    }

    /// Create a stream-backed resource. Stream-backed resources cannot be written to
    /// the interchange format.
    ///
    /// # Errors
    ///
    /// Returns `BundleError::SubtypeMismatch` if the subtype belongs to a different
    /// format family than the role.
    pub fn from_stream<R: Read + Send + 'static>(
        role: ContentType,
        subtype: Option<ContentSubtype>,
        reader: R,
        display_name: impl Into<String>,
    ) -> Result<Self, BundleError> {
        check_subtype(&role, subtype.as_ref())?;
        Ok(Self {
            role,
            subtype,
            source: ResourceSource::Stream(StreamSource::new(reader)),
            display_name: display_name.into(),
        })
    }

    #[must_use]
    pub fn role(&self) -> &ContentType {
        &self.role
    }

    #[must_use]
    pub fn subtype(&self) -> Option<&ContentSubtype> {
        self.subtype.as_ref()
    }

    #[must_use]
    pub fn source(&self) -> &ResourceSource {
        &self.source
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The backing path, if this resource is path-backed
    #[must_use]
    pub fn io_path(&self) -> Option<&IoPath> {
        match &self.source {
            ResourceSource::Path(path) => Some(path),
            ResourceSource::Stream(_) => None,
        }
    }

    #[must_use]
    pub fn is_serializable(&self) -> bool {
        matches!(self.source, ResourceSource::Path(_))
    }

    /// Open the resource for reading from its first byte.
    ///
    /// Path-backed resources are opened afresh on every call; stream-backed resources
    /// hand over their stream once.
    ///
    /// # Errors
    ///
    /// Returns `BundleError::Io` if the path cannot be opened, or
    /// `BundleError::StreamConsumed` if the stream was already handed out.
    pub fn open(&self) -> Result<ByteSource, BundleError> {
        match &self.source {
            ResourceSource::Path(path) => Ok(Box::new(path.open()?)),
            ResourceSource::Stream(stream) => {
                stream.take().ok_or_else(|| BundleError::StreamConsumed {
                    display_name: self.display_name.clone(),
                })
            }
        }
    }
}

/// A subtype must belong to the same family as its role, when both are known
pub(crate) fn check_subtype(
    role: &ContentType,
    subtype: Option<&ContentSubtype>,
) -> Result<(), BundleError> {
    let Some(subtype) = subtype else {
        return Ok(());
    };
    match (role.family(), subtype.family()) {
        (Some(role_family), Some(subtype_family)) if role_family != subtype_family => {
            Err(BundleError::SubtypeMismatch {
                role: role.clone(),
                subtype: subtype.clone(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_from_path_infers_subtype() {
        let resource = Resource::from_path(ContentType::READS, "sample.cram");
        assert_eq!(resource.role(), &ContentType::READS);
        assert_eq!(resource.subtype(), Some(&ContentSubtype::CRAM));
        assert_eq!(resource.display_name(), "sample.cram");
        assert!(resource.is_serializable());
    }

    #[test]
    fn test_subtype_must_match_family() {
        let result = Resource::with_subtype(
            ContentType::READS,
            Some(ContentSubtype::VCF),
            "calls.vcf",
        );
        assert!(matches!(result, Err(BundleError::SubtypeMismatch { .. })));

        // Unknown roles or subtypes are not checked
        assert!(Resource::with_subtype(
            ContentType::new("CUSTOM"),
            Some(ContentSubtype::BAM),
            "x.bam"
        )
        .is_ok());
        assert!(Resource::with_subtype(
            ContentType::READS,
            Some(ContentSubtype::new("SRA")),
            "x.sra"
        )
        .is_ok());
    }

    #[test]
    fn test_stream_is_handed_out_once() {
        let resource = Resource::from_stream(
            ContentType::READS,
            None,
            Cursor::new(b"@HD\tVN:1.6\n".to_vec()),
            "stdin",
        )
        .unwrap();
        assert!(!resource.is_serializable());
        assert!(resource.io_path().is_none());

        let mut contents = String::new();
        resource
            .open()
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "@HD\tVN:1.6\n");

        assert!(matches!(
            resource.open(),
            Err(BundleError::StreamConsumed { .. })
        ));
    }

    #[test]
    fn test_stream_equality_is_identity() {
        let a = Resource::from_stream(ContentType::READS, None, Cursor::new(vec![]), "a").unwrap();
        let b = Resource::from_stream(ContentType::READS, None, Cursor::new(vec![]), "a").unwrap();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
