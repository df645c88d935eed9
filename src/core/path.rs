//! Paths and URIs naming path-backed resources.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// A path-backed resource location: a plain filesystem path or a URI.
///
/// The raw input string is kept verbatim so that bundle documents round-trip exactly.
/// Only plain paths and `file://` URIs can be opened locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IoPath {
    raw: String,
}

impl IoPath {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The URI scheme (`file`, `s3`, `https`, ...), or `None` for a plain path
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        let (scheme, _) = self.raw.split_once("://")?;
        // Require more than one character so Windows drive letters aren't taken as schemes
        let valid = scheme.len() > 1
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        valid.then_some(scheme)
    }

    /// The path component, with any scheme, authority, query or fragment removed
    fn path_part(&self) -> &str {
        match self.scheme() {
            None => &self.raw,
            Some(scheme) => {
                let rest = &self.raw[scheme.len() + 3..];
                let rest = rest.split(['?', '#']).next().unwrap_or(rest);
                // Skip the authority; `file:///x` has an empty one
                match rest.find('/') {
                    Some(idx) => &rest[idx..],
                    None => "",
                }
            }
        }
    }

    /// The last path segment
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path_part()
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
    }

    /// The lowercased final extension (`bam` for `x.bam`, `gz` for `x.vcf.gz`)
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }

    /// Case-insensitive check for a (possibly multi-part) extension such as `vcf.gz`
    #[must_use]
    pub fn has_extension(&self, extension: &str) -> bool {
        let Some(name) = self.file_name() else {
            return false;
        };
        let extension = extension.trim_start_matches('.');
        let name = name.to_lowercase();
        let suffix = format!(".{}", extension.to_lowercase());
        name.len() > suffix.len() && name.ends_with(&suffix)
    }

    /// The local filesystem path, for plain paths and `file://` URIs only
    #[must_use]
    pub fn to_local_path(&self) -> Option<PathBuf> {
        match self.scheme() {
            None => Some(PathBuf::from(&self.raw)),
            Some(scheme) if scheme.eq_ignore_ascii_case("file") => {
                Some(PathBuf::from(self.path_part()))
            }
            Some(_) => None,
        }
    }

    /// True if this names an existing local file
    #[must_use]
    pub fn exists(&self) -> bool {
        self.to_local_path().is_some_and(|path| path.is_file())
    }

    /// Open the local file for reading
    ///
    /// # Errors
    ///
    /// Returns an `Unsupported` I/O error for non-local URIs, or the underlying
    /// error if the file cannot be opened.
    pub fn open(&self) -> io::Result<File> {
        File::open(self.require_local()?)
    }

    /// Create (or truncate) the local file for writing
    ///
    /// # Errors
    ///
    /// Returns an `Unsupported` I/O error for non-local URIs, or the underlying
    /// error if the file cannot be created.
    pub fn create(&self) -> io::Result<File> {
        File::create(self.require_local()?)
    }

    fn require_local(&self) -> io::Result<PathBuf> {
        self.to_local_path().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                format!("Cannot open non-local resource: {}", self.raw),
            )
        })
    }

    /// A sibling path with `.suffix` appended (`x.bam` -> `x.bam.bai`)
    #[must_use]
    pub fn with_appended_extension(&self, extension: &str) -> IoPath {
        IoPath::new(format!("{}.{}", self.raw, extension))
    }

    /// A sibling path with `old` replaced by `new` (`x.bam` -> `x.bai`); `None` if
    /// this path doesn't end in `old`
    #[must_use]
    pub fn with_replaced_extension(&self, old: &str, new: &str) -> Option<IoPath> {
        if !self.has_extension(old) {
            return None;
        }
        let cut = self.raw.len() - old.len();
        Some(IoPath::new(format!("{}{}", &self.raw[..cut], new)))
    }
}

impl fmt::Display for IoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for IoPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for IoPath {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&Path> for IoPath {
    fn from(path: &Path) -> Self {
        Self::new(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for IoPath {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl From<&PathBuf> for IoPath {
    fn from(path: &PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path() {
        let path = IoPath::new("/data/sample.bam");
        assert_eq!(path.scheme(), None);
        assert_eq!(path.file_name(), Some("sample.bam"));
        assert_eq!(path.extension(), Some("bam".to_string()));
        assert_eq!(path.to_local_path(), Some(PathBuf::from("/data/sample.bam")));
    }

    #[test]
    fn test_uris() {
        let file = IoPath::new("file:///data/calls.vcf.gz");
        assert_eq!(file.scheme(), Some("file"));
        assert_eq!(file.file_name(), Some("calls.vcf.gz"));
        assert_eq!(file.to_local_path(), Some(PathBuf::from("/data/calls.vcf.gz")));

        let remote = IoPath::new("https://example.org/bucket/reads.cram?token=abc");
        assert_eq!(remote.scheme(), Some("https"));
        assert_eq!(remote.extension(), Some("cram".to_string()));
        assert_eq!(remote.to_local_path(), None);
        assert_eq!(
            remote.open().unwrap_err().kind(),
            io::ErrorKind::Unsupported
        );
    }

    #[test]
    fn test_has_extension() {
        let path = IoPath::new("Calls.VCF.GZ");
        assert!(path.has_extension("vcf.gz"));
        assert!(path.has_extension(".gz"));
        assert!(!path.has_extension("vcf"));
        assert!(!IoPath::new(".bam").has_extension("bam"));
        assert!(!IoPath::new("noextension").has_extension("bam"));
        assert_eq!(IoPath::new(".bashrc").extension(), None);
    }

    #[test]
    fn test_sibling_paths() {
        let path = IoPath::new("/data/sample.bam");
        assert_eq!(
            path.with_appended_extension("bai").as_str(),
            "/data/sample.bam.bai"
        );
        assert_eq!(
            path.with_replaced_extension("bam", "bai").unwrap().as_str(),
            "/data/sample.bai"
        );
        assert!(path.with_replaced_extension("cram", "crai").is_none());
    }
}
