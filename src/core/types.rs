use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// The role a resource plays within a bundle (e.g. `READS`, `READS_INDEX`).
///
/// Roles are open-ended strings so that documents written by newer tools, with roles
/// this crate does not know about, can still be read and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentType(Cow<'static, str>);

impl ContentType {
    pub const READS: Self = Self(Cow::Borrowed("READS"));
    pub const READS_INDEX: Self = Self(Cow::Borrowed("READS_INDEX"));
    pub const HAPLOID_REFERENCE: Self = Self(Cow::Borrowed("HAPLOID_REFERENCE"));
    pub const HAPLOID_REFERENCE_INDEX: Self = Self(Cow::Borrowed("HAPLOID_REFERENCE_INDEX"));
    pub const HAPLOID_REFERENCE_DICTIONARY: Self =
        Self(Cow::Borrowed("HAPLOID_REFERENCE_DICTIONARY"));
    pub const VARIANT_CONTEXTS: Self = Self(Cow::Borrowed("VARIANT_CONTEXTS"));
    pub const VARIANTS_INDEX: Self = Self(Cow::Borrowed("VARIANTS_INDEX"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The format family this role belongs to, or `None` for roles this crate doesn't know
    #[must_use]
    pub fn family(&self) -> Option<FormatFamily> {
        match self.as_str() {
            "READS" | "READS_INDEX" => Some(FormatFamily::Reads),
            "HAPLOID_REFERENCE" | "HAPLOID_REFERENCE_INDEX" | "HAPLOID_REFERENCE_DICTIONARY" => {
                Some(FormatFamily::HaploidReference)
            }
            "VARIANT_CONTEXTS" | "VARIANTS_INDEX" => Some(FormatFamily::Variants),
            _ => None,
        }
    }

    /// True if this is the primary data role of its family
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.family()
            .is_some_and(|family| family.primary_role() == *self)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A finer-grained hint describing how a role is realized (e.g. `READS` as `BAM`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentSubtype(Cow<'static, str>);

impl ContentSubtype {
    pub const BAM: Self = Self(Cow::Borrowed("BAM"));
    pub const CRAM: Self = Self(Cow::Borrowed("CRAM"));
    pub const SAM: Self = Self(Cow::Borrowed("SAM"));
    pub const FASTA: Self = Self(Cow::Borrowed("FASTA"));
    pub const VCF: Self = Self(Cow::Borrowed("VCF"));
    pub const BCF: Self = Self(Cow::Borrowed("BCF"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The format this subtype names, if known
    #[must_use]
    pub fn format(&self) -> Option<Format> {
        Format::ALL
            .iter()
            .copied()
            .find(|format| format.subtype().as_str() == self.as_str())
    }

    #[must_use]
    pub fn family(&self) -> Option<FormatFamily> {
        self.format().map(Format::family)
    }
}

impl fmt::Display for ContentSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentSubtype {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A group of formats that carry the same kind of data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatFamily {
    /// Aligned or unaligned reads (BAM, CRAM, SAM)
    Reads,
    /// Haploid reference sequences (FASTA)
    HaploidReference,
    /// Variant calls (VCF, BCF)
    Variants,
}

impl FormatFamily {
    pub const ALL: [FormatFamily; 3] = [Self::Reads, Self::HaploidReference, Self::Variants];

    /// The single role holding this family's primary data
    #[must_use]
    pub fn primary_role(self) -> ContentType {
        match self {
            Self::Reads => ContentType::READS,
            Self::HaploidReference => ContentType::HAPLOID_REFERENCE,
            Self::Variants => ContentType::VARIANT_CONTEXTS,
        }
    }

    /// The role used for this family's companion index
    #[must_use]
    pub fn index_role(self) -> ContentType {
        match self {
            Self::Reads => ContentType::READS_INDEX,
            Self::HaploidReference => ContentType::HAPLOID_REFERENCE_INDEX,
            Self::Variants => ContentType::VARIANTS_INDEX,
        }
    }

    /// Formats in this family, in resolution priority order
    #[must_use]
    pub fn formats(self) -> &'static [Format] {
        match self {
            Self::Reads => &[Format::Bam, Format::Cram, Format::Sam],
            Self::HaploidReference => &[Format::Fasta],
            Self::Variants => &[Format::Vcf, Format::Bcf],
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Reads => "reads",
            Self::HaploidReference => "haploid reference",
            Self::Variants => "variants",
        }
    }
}

impl fmt::Display for FormatFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A concrete file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Format {
    Bam,
    Cram,
    Sam,
    Fasta,
    Vcf,
    Bcf,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Self::Bam,
        Self::Cram,
        Self::Sam,
        Self::Fasta,
        Self::Vcf,
        Self::Bcf,
    ];

    #[must_use]
    pub fn family(self) -> FormatFamily {
        match self {
            Self::Bam | Self::Cram | Self::Sam => FormatFamily::Reads,
            Self::Fasta => FormatFamily::HaploidReference,
            Self::Vcf | Self::Bcf => FormatFamily::Variants,
        }
    }

    /// The content subtype a resource of this format carries
    #[must_use]
    pub fn subtype(self) -> ContentSubtype {
        match self {
            Self::Bam => ContentSubtype::BAM,
            Self::Cram => ContentSubtype::CRAM,
            Self::Sam => ContentSubtype::SAM,
            Self::Fasta => ContentSubtype::FASTA,
            Self::Vcf => ContentSubtype::VCF,
            Self::Bcf => ContentSubtype::BCF,
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Bam => "BAM",
            Self::Cram => "CRAM",
            Self::Sam => "SAM",
            Self::Fasta => "FASTA",
            Self::Vcf => "VCF",
            Self::Bcf => "BCF",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A (major, minor, patch) codec version, ordered lexicographically.
///
/// Equality is an exact version match. Whether data at one version can be handled
/// by a codec at another is decided by the codec, see [`crate::codec::Codec::can_upgrade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodecVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl CodecVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    #[must_use]
    pub fn same_major(&self, other: &CodecVersion) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for CodecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("Invalid codec version '{0}': expected MAJOR.MINOR.PATCH")]
pub struct ParseVersionError(String);

impl FromStr for CodecVersion {
    type Err = ParseVersionError;

    /// Parses `MAJOR.MINOR.PATCH`; a missing patch (or minor) component defaults to zero
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = |required: bool| -> Result<u32, ParseVersionError> {
            match parts.next() {
                Some(part) => part.parse().map_err(|_| ParseVersionError(s.to_string())),
                None if required => Err(ParseVersionError(s.to_string())),
                None => Ok(0),
            }
        };
        let version = Self::new(next(true)?, next(false)?, next(false)?);
        if parts.next().is_some() {
            return Err(ParseVersionError(s.to_string()));
        }
        Ok(version)
    }
}
