//! Codecs: versioned format implementations the registry chooses between.
//!
//! A [`Codec`] is identified by its [`Format`] and [`CodecVersion`]. It answers two
//! questions for the registry, a cheap one ([`Codec::can_decode_uri`], from the
//! extension) and an authoritative one ([`Codec::can_decode_signature`], from the
//! first bytes), and once chosen it builds a [`Decoder`] or [`Encoder`] bound to a
//! bundle.
//!
//! ## Built-in codecs
//!
//! | Family | Format | Versions | Signature |
//! |--------|--------|----------|-----------|
//! | reads | BAM | 1.0.0 | BGZF block inflating to `BAM\1` |
//! | reads | CRAM | 3.0.0, 3.1.0 | `CRAM` + major + minor |
//! | reads | SAM | 1.0.0 | `@` + two letters, or text |
//! | haploid reference | FASTA | 1.0.0 | `>` |
//! | variants | VCF | 4.2.0, 4.3.0 | `##fileformat=VCFv4.x`, plain or gzip |
//! | variants | BCF | 2.2.0 | gzip member inflating to `BCF\2\2` |

use std::any::{type_name, Any};
use std::fs::File;
use std::io::{self, Read};

use flate2::read::{GzDecoder, MultiGzDecoder};
use thiserror::Error;
use tracing::debug;

use crate::core::bundle::{Bundle, BundleError};
use crate::core::contig::SequenceDictionary;
use crate::core::inference::extensions_for;
use crate::core::path::IoPath;
use crate::core::resource::ByteSource;
use crate::core::types::{CodecVersion, Format, FormatFamily};
use crate::utils::validation::is_gzip;

pub mod hapref;
pub mod probe;
pub mod reads;
pub mod tag;
pub mod variants;

use probe::SignatureProbingReader;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Truncated input in {source_name}: signature needs {needed} bytes, only {available} available")]
    TruncatedInput {
        source_name: String,
        needed: usize,
        available: usize,
    },

    #[error("{codec} does not support {operation}")]
    UnsupportedOperation {
        codec: String,
        operation: &'static str,
    },

    #[error("Invalid options for {codec}: {reason}")]
    InvalidOptions { codec: String, reason: String },

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Failed to decode {source_name}: {reason}")]
    Decode { source_name: String, reason: String },

    #[error("Too many contigs in {source_name}: exceeds maximum of {limit}")]
    TooManyContigs { source_name: String, limit: usize },

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A format/version implementation the registry can select
pub trait Codec: Send + Sync {
    fn format(&self) -> Format;

    fn version(&self) -> CodecVersion;

    /// Number of leading bytes [`Codec::can_decode_signature`] looks at
    fn signature_size(&self) -> usize;

    /// Decide from the first bytes of the input whether this codec can decode it.
    ///
    /// `probe` holds at most [`Codec::signature_size`] bytes and fewer only if the
    /// input ended. A prefix that could still become this codec's signature, had the
    /// input not ended, is reported as `CodecError::TruncatedInput` rather than a
    /// negative match.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::TruncatedInput` as described above.
    fn can_decode_signature(&self, probe: &[u8], source_name: &str) -> Result<bool, CodecError>;

    /// Cheap extension-based pre-filter. Never decisive on its own.
    fn can_decode_uri(&self, path: &IoPath) -> bool {
        extensions_for(self.format()).any(|ext| path.has_extension(ext))
    }

    /// # Errors
    ///
    /// Returns `CodecError::InvalidOptions` for options of the wrong type,
    /// `CodecError::UnsupportedOperation` if this codec cannot decode, or an error
    /// opening the bundle's primary resource.
    fn decoder(
        &self,
        bundle: &Bundle,
        options: Option<&dyn Any>,
    ) -> Result<Box<dyn Decoder>, CodecError>;

    /// # Errors
    ///
    /// Returns `CodecError::InvalidOptions` for options of the wrong type,
    /// `CodecError::UnsupportedOperation` if this codec cannot encode, or an error
    /// creating the bundle's primary resource.
    fn encoder(
        &self,
        bundle: &Bundle,
        options: Option<&dyn Any>,
    ) -> Result<Box<dyn Encoder>, CodecError>;

    /// Whether this codec can take data written at `from` to `to`. "No" is the
    /// default answer, not an error.
    fn can_upgrade(&self, _from: CodecVersion, _to: CodecVersion) -> bool {
        false
    }

    /// Whether an extension match may stand in for a signature match when probing
    /// is inconclusive (empty input or zero signature size)
    fn accepts_uri_only(&self) -> bool {
        false
    }

    fn display_name(&self) -> String {
        format!("{} {}", self.format(), self.version())
    }
}

/// Reads a bundle's primary resource. Owns its byte source; dropping the decoder
/// releases it.
pub trait Decoder: Send {
    fn format(&self) -> Format;

    fn version(&self) -> CodecVersion;

    fn display_name(&self) -> &str;

    /// The ordered contigs described by the resource
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Decode` for malformed input, `CodecError::TooManyContigs`
    /// if the configured limit is exceeded, or an I/O error.
    fn read_dictionary(&mut self) -> Result<SequenceDictionary, CodecError>;
}

/// Writes a bundle's primary resource
pub trait Encoder: Send {
    fn format(&self) -> Format;

    fn version(&self) -> CodecVersion;

    fn display_name(&self) -> &str;

    /// Write a header-only output describing `dictionary`
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails, or `CodecError::Decode` if the
    /// dictionary cannot be represented in this format.
    fn write_dictionary(&mut self, dictionary: &SequenceDictionary) -> Result<(), CodecError>;
}

/// Open the family's primary resource of `bundle` for decoding, returning the
/// source and its display name
pub(crate) fn open_primary(
    bundle: &Bundle,
    family: FormatFamily,
) -> Result<(ByteSource, String), CodecError> {
    let resource = bundle.get_or_fail(&family.primary_role())?;
    let source = resource.open()?;
    Ok((source, resource.display_name().to_string()))
}

/// Create the family's primary resource of `bundle` for encoding. Only path-backed
/// outputs can be written.
pub(crate) fn create_primary(
    bundle: &Bundle,
    family: FormatFamily,
    codec: &str,
) -> Result<(File, IoPath), CodecError> {
    let resource = bundle.get_or_fail(&family.primary_role())?;
    let path = resource
        .io_path()
        .ok_or_else(|| CodecError::UnsupportedOperation {
            codec: codec.to_string(),
            operation: "encoding to a stream-backed resource",
        })?;
    Ok((path.create()?, path.clone()))
}

/// Downcast opaque codec options, using the default when none are given
pub(crate) fn options_or_default<T>(
    options: Option<&dyn Any>,
    codec: &str,
) -> Result<T, CodecError>
where
    T: Any + Clone + Default,
{
    match options {
        None => Ok(T::default()),
        Some(options) => options
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| CodecError::InvalidOptions {
                codec: codec.to_string(),
                reason: format!("expected {}", type_name::<T>()),
            }),
    }
}

/// Reject any options for codecs that take none
pub(crate) fn require_no_options(options: Option<&dyn Any>, codec: &str) -> Result<(), CodecError> {
    match options {
        None => Ok(()),
        Some(_) => Err(CodecError::InvalidOptions {
            codec: codec.to_string(),
            reason: "options must be None".to_string(),
        }),
    }
}

/// Match a fixed magic prefix. A short probe that agrees with the magic so far is
/// truncated input, anything else short is a negative match.
pub(crate) fn match_magic(probe: &[u8], magic: &[u8], source_name: &str) -> Result<bool, CodecError> {
    if probe.len() >= magic.len() {
        return Ok(probe.starts_with(magic));
    }
    if magic.starts_with(probe) {
        return Err(CodecError::TruncatedInput {
            source_name: source_name.to_string(),
            needed: magic.len(),
            available: probe.len(),
        });
    }
    Ok(false)
}

/// Inflate up to `n` bytes from the gzip member at the start of `data`.
///
/// A member cut short by the end of the probe yields whatever inflated before the
/// cut; a corrupt member yields what inflated before the corruption.
pub(crate) fn inflate_prefix(data: &[u8], n: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(n);
    if let Err(e) = GzDecoder::new(data).take(n as u64).read_to_end(&mut out) {
        debug!(error = %e, inflated = out.len(), "Stopped inflating signature prefix");
    }
    out
}

/// Wrap `source` in a gzip decoder if it starts with a gzip member. BGZF files are
/// multi-member gzip and are handled the same way.
pub(crate) fn maybe_inflate(source: ByteSource) -> io::Result<ByteSource> {
    let probe = SignatureProbingReader::new(source, 2)?;
    let gzipped = is_gzip(probe.probe(2));
    let replay = probe.release_for_decoding();
    if gzipped {
        Ok(Box::new(MultiGzDecoder::new(replay)))
    } else {
        Ok(Box::new(replay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_match_magic() {
        assert!(match_magic(b"CRAM\x03\x00", b"CRAM", "x").unwrap());
        assert!(!match_magic(b"BAM\x01", b"CRAM", "x").unwrap());
        assert!(!match_magic(b"BA", b"CRAM", "x").unwrap());
        assert!(matches!(
            match_magic(b"CR", b"CRAM", "x"),
            Err(CodecError::TruncatedInput { needed: 4, available: 2, .. })
        ));
        assert!(matches!(
            match_magic(b"", b"CRAM", "x"),
            Err(CodecError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_inflate_prefix() {
        let compressed = gzip(b"##fileformat=VCFv4.2\n#CHROM\n");
        assert_eq!(inflate_prefix(&compressed, 20), b"##fileformat=VCFv4.2");
        assert!(inflate_prefix(b"not gzip", 4).is_empty());
    }

    #[test]
    fn test_maybe_inflate() {
        let mut plain = String::new();
        maybe_inflate(Box::new(Cursor::new(b">chr1\nACGT\n".to_vec())))
            .unwrap()
            .read_to_string(&mut plain)
            .unwrap();
        assert_eq!(plain, ">chr1\nACGT\n");

        let mut inflated = String::new();
        maybe_inflate(Box::new(Cursor::new(gzip(b">chr1\nACGT\n"))))
            .unwrap()
            .read_to_string(&mut inflated)
            .unwrap();
        assert_eq!(inflated, ">chr1\nACGT\n");
    }

    #[test]
    fn test_options() {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Opts(u32);

        assert_eq!(options_or_default::<Opts>(None, "x").unwrap(), Opts(0));
        let given = Opts(7);
        assert_eq!(
            options_or_default::<Opts>(Some(&given as &dyn Any), "x").unwrap(),
            Opts(7)
        );
        assert!(matches!(
            options_or_default::<Opts>(Some(&"wrong" as &dyn Any), "x"),
            Err(CodecError::InvalidOptions { .. })
        ));
        assert!(require_no_options(None, "x").is_ok());
        assert!(require_no_options(Some(&given as &dyn Any), "x").is_err());
    }
}
