use std::io;

use thiserror::Error;
use tracing::debug;

use crate::codec::probe::SignatureProbingReader;
use crate::codec::{Codec, CodecError};
use crate::core::bundle::{Bundle, BundleError};
use crate::core::inference::infer_content_type;
use crate::core::path::IoPath;
use crate::core::resource::{ByteSource, Resource, ResourceSource};
use crate::core::types::{CodecVersion, ContentSubtype, ContentType, Format};
use crate::registry::store::CodecRegistry;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No resource with role {role} in bundle for {bundle}")]
    MissingResource { role: ContentType, bundle: String },

    #[error("Cannot determine the format family of {display_name}")]
    UnknownFamily { display_name: String },

    #[error("Truncated input in {display_name}: too few bytes to identify any of [{}]", .attempted.join(", "))]
    TruncatedInput {
        display_name: String,
        attempted: Vec<String>,
    },

    #[error("No codec for {display_name} among [{}] (examined {prefix_len} bytes)", .attempted.join(", "))]
    NoMatchingCodec {
        display_name: String,
        attempted: Vec<String>,
        prefix_len: usize,
    },

    #[error("{display_name} does not match version {requested} of [{}]{}", .attempted.join(", "), detected_suffix(.detected))]
    VersionMismatch {
        display_name: String,
        attempted: Vec<String>,
        requested: CodecVersion,
        detected: Option<CodecVersion>,
    },

    #[error("No {format} codec can upgrade {from} to {to}")]
    AmbiguousUpgrade {
        format: Format,
        from: CodecVersion,
        to: CodecVersion,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("IO error reading {display_name}: {source}")]
    Io {
        display_name: String,
        #[source]
        source: io::Error,
    },
}

fn detected_suffix(detected: &Option<CodecVersion>) -> String {
    detected.map_or_else(String::new, |version| format!(" (detected {version})"))
}

/// What probing said about one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Accepted,
    Rejected,
    /// The codec needs no bytes to decide, so it cannot
    Inconclusive,
    Truncated,
}

/// A candidate with the outcome of its extension test
struct Candidate<'a> {
    codec: &'a dyn Codec,
    uri_match: bool,
}

impl CodecRegistry {
    /// Select the codec that decodes the resource at `role` of `bundle`.
    ///
    /// With no `format` every format of the role's family is tried. When the
    /// resource's extension is claimed by some of those codecs only they are probed;
    /// otherwise all of them are. With a `version` only codecs of exactly that
    /// version are eligible.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::MissingResource` if the bundle has no such role,
    /// `ResolveError::VersionMismatch` if the requested version rejects the input,
    /// `ResolveError::TruncatedInput` if the input ended before any codec could
    /// decide, `ResolveError::NoMatchingCodec` if every codec rejected it, or
    /// `ResolveError::Io` if the resource cannot be read.
    pub fn resolve(
        &self,
        bundle: &Bundle,
        role: &ContentType,
        format: Option<Format>,
        version: Option<CodecVersion>,
    ) -> Result<&dyn Codec, ResolveError> {
        let resource = bundle.get(role).ok_or_else(|| ResolveError::MissingResource {
            role: role.clone(),
            bundle: bundle.primary().display_name().to_string(),
        })?;
        let display_name = resource.display_name();
        let formats = self.candidate_formats(resource, format)?;

        let mut candidates: Vec<Candidate> = self
            .candidates(&formats)
            .into_iter()
            .map(|codec| Candidate {
                codec,
                uri_match: resource
                    .io_path()
                    .is_some_and(|path| codec.can_decode_uri(path)),
            })
            .collect();

        // A claimed extension narrows probing to the codecs claiming it
        if candidates.iter().any(|c| c.uri_match) {
            candidates.retain(|c| c.uri_match);
        }

        let max_signature_size = candidates
            .iter()
            .map(|c| c.codec.signature_size())
            .max()
            .unwrap_or(0);
        let probe = open_for_probing(resource, max_signature_size)?;

        let result = select(&candidates, probe.as_ref(), display_name, version);

        // Put the stream back, positioned at byte 0, for the decoder
        if let (Some(probe), ResourceSource::Stream(stream)) = (probe, resource.source()) {
            stream.restore(Box::new(probe.release_for_decoding()));
        }

        let codec = result?;
        debug!(
            resource = %display_name,
            codec = %codec.display_name(),
            "Resolved codec"
        );
        Ok(codec)
    }

    /// Resolve a bare path, inferring its role from the extension
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnknownFamily` if the extension is not recognized,
    /// otherwise as [`CodecRegistry::resolve`].
    pub fn resolve_path(&self, path: impl Into<IoPath>) -> Result<&dyn Codec, ResolveError> {
        let path = path.into();
        let inferred = infer_content_type(&path).ok_or_else(|| ResolveError::UnknownFamily {
            display_name: path.to_string(),
        })?;
        let bundle = Bundle::from_path(inferred.role.clone(), path);
        self.resolve(&bundle, &inferred.role, None, None)
    }

    /// Select the codec that writes the resource at `role` of `bundle`. Nothing is
    /// read: the format comes from `format`, else the resource's subtype, else its
    /// extension, and the version is `version` or the highest registered.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::MissingResource` if the bundle has no such role,
    /// `ResolveError::NoMatchingCodec` if no format can be determined, or
    /// `ResolveError::VersionMismatch` if the requested version is not registered.
    pub fn resolve_for_encoding(
        &self,
        bundle: &Bundle,
        role: &ContentType,
        format: Option<Format>,
        version: Option<CodecVersion>,
    ) -> Result<&dyn Codec, ResolveError> {
        let resource = bundle.get(role).ok_or_else(|| ResolveError::MissingResource {
            role: role.clone(),
            bundle: bundle.primary().display_name().to_string(),
        })?;
        let display_name = resource.display_name().to_string();

        let format = match format.or_else(|| resource.subtype().and_then(ContentSubtype::format))
        {
            Some(format) => format,
            None => {
                let formats = self.candidate_formats(resource, None)?;
                let candidates = self.candidates(&formats);
                resource
                    .io_path()
                    .and_then(|path| candidates.iter().find(|c| c.can_decode_uri(path)))
                    .map(|codec| codec.format())
                    .ok_or_else(|| ResolveError::NoMatchingCodec {
                        display_name: display_name.clone(),
                        attempted: candidates.iter().map(|c| c.display_name()).collect(),
                        prefix_len: 0,
                    })?
            }
        };

        let candidates = self.candidates(&[format]);
        let codec = match version {
            Some(version) => candidates.iter().find(|c| c.version() == version).copied(),
            None => candidates.first().copied(),
        };

        codec.ok_or_else(|| match version {
            Some(requested) => ResolveError::VersionMismatch {
                display_name,
                attempted: vec![format.to_string()],
                requested,
                detected: None,
            },
            None => ResolveError::NoMatchingCodec {
                display_name,
                attempted: vec![format.to_string()],
                prefix_len: 0,
            },
        })
    }

    /// The highest-version codec of `format` that declares it can take data
    /// written at `from` to `to`
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::AmbiguousUpgrade` if no codec declares the upgrade.
    pub fn resolve_upgrade(
        &self,
        format: Format,
        from: CodecVersion,
        to: CodecVersion,
    ) -> Result<&dyn Codec, ResolveError> {
        self.candidates(&[format])
            .into_iter()
            .find(|codec| codec.can_upgrade(from, to))
            .ok_or(ResolveError::AmbiguousUpgrade { format, from, to })
    }

    fn candidate_formats(
        &self,
        resource: &Resource,
        format: Option<Format>,
    ) -> Result<Vec<Format>, ResolveError> {
        if let Some(format) = format {
            return Ok(vec![format]);
        }
        let family = resource
            .role()
            .family()
            .or_else(|| resource.subtype().and_then(ContentSubtype::family))
            .ok_or_else(|| ResolveError::UnknownFamily {
                display_name: resource.display_name().to_string(),
            })?;
        Ok(self.formats_for_family(family))
    }
}

/// Buffer the prefix of `resource`, unless no codec needs a byte
fn open_for_probing(
    resource: &Resource,
    max_signature_size: usize,
) -> Result<Option<SignatureProbingReader<ByteSource>>, ResolveError> {
    if max_signature_size == 0 {
        return Ok(None);
    }
    let io_error = |source: io::Error| ResolveError::Io {
        display_name: resource.display_name().to_string(),
        source,
    };

    let source = resource.open().map_err(|e| match e {
        BundleError::Io(source) => io_error(source),
        other => ResolveError::Codec(CodecError::Bundle(other)),
    })?;
    match SignatureProbingReader::new(source, max_signature_size) {
        Ok(probe) => Ok(Some(probe)),
        Err(e) => Err(io_error(e)),
    }
}

fn probe_candidate(
    codec: &dyn Codec,
    probe: Option<&SignatureProbingReader<ByteSource>>,
    display_name: &str,
) -> Result<Probe, CodecError> {
    let size = codec.signature_size();
    let Some(probe) = probe.filter(|_| size > 0) else {
        return Ok(Probe::Inconclusive);
    };

    let result = probe
        .signature(size, display_name)
        .and_then(|signature| codec.can_decode_signature(signature, display_name));
    match result {
        Ok(true) => Ok(Probe::Accepted),
        Ok(false) => Ok(Probe::Rejected),
        Err(CodecError::TruncatedInput { .. }) => Ok(Probe::Truncated),
        Err(e) => Err(e),
    }
}

/// The resolution rules proper, over already-ordered candidates
fn select<'a>(
    candidates: &[Candidate<'a>],
    probe: Option<&SignatureProbingReader<ByteSource>>,
    display_name: &str,
    version: Option<CodecVersion>,
) -> Result<&'a dyn Codec, ResolveError> {
    let ordered: Vec<&Candidate<'a>> = candidates
        .iter()
        .filter(|c| version.map_or(true, |v| c.codec.version() == v))
        .collect();

    let mut outcomes = Vec::with_capacity(ordered.len());
    for candidate in &ordered {
        let outcome = probe_candidate(candidate.codec, probe, display_name)?;
        debug!(
            resource = %display_name,
            codec = %candidate.codec.display_name(),
            uri_match = candidate.uri_match,
            outcome = ?outcome,
            "Probed codec"
        );
        if outcome == Probe::Accepted {
            return Ok(candidate.codec);
        }
        outcomes.push((candidate, outcome));
    }

    // Extension-only acceptance, for codecs that allow it
    if let Some((candidate, _)) = outcomes.iter().find(|(c, outcome)| {
        c.uri_match
            && c.codec.accepts_uri_only()
            && matches!(outcome, Probe::Inconclusive | Probe::Truncated)
    }) {
        debug!(
            resource = %display_name,
            codec = %candidate.codec.display_name(),
            "Accepted codec on extension alone"
        );
        return Ok(candidate.codec);
    }

    let attempted: Vec<String> = ordered
        .iter()
        .map(|c| c.codec.display_name())
        .collect();
    if outcomes.iter().any(|(_, outcome)| *outcome == Probe::Truncated) {
        return Err(ResolveError::TruncatedInput {
            display_name: display_name.to_string(),
            attempted,
        });
    }

    if let Some(requested) = version {
        let mut detected = None;
        for candidate in candidates.iter().filter(|c| c.codec.version() != requested) {
            if probe_candidate(candidate.codec, probe, display_name)? == Probe::Accepted {
                detected = Some(candidate.codec.version());
                break;
            }
        }
        let attempted = if attempted.is_empty() {
            // Nothing registered at that version; name what was asked for
            let mut requested_codecs: Vec<String> = candidates
                .iter()
                .map(|c| format!("{} {requested}", c.codec.format()))
                .collect();
            requested_codecs.dedup();
            requested_codecs
        } else {
            attempted
        };
        return Err(ResolveError::VersionMismatch {
            display_name: display_name.to_string(),
            attempted,
            requested,
            detected,
        });
    }
    Err(ResolveError::NoMatchingCodec {
        display_name: display_name.to_string(),
        attempted,
        prefix_len: probe.map_or(0, SignatureProbingReader::prefix_len),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn stream_bundle(data: &[u8], name: &str) -> Bundle {
        let resource = Resource::from_stream(
            ContentType::READS,
            None,
            Cursor::new(data.to_vec()),
            name,
        )
        .unwrap();
        Bundle::build([resource], ContentType::READS).unwrap()
    }

    #[test]
    fn test_resolve_cram_by_signature() {
        let registry = CodecRegistry::with_builtin_codecs();
        let bundle = stream_bundle(b"CRAM\x03\x00file-id-and-more", "stdin");
        let codec = registry
            .resolve(&bundle, &ContentType::READS, None, None)
            .unwrap();
        assert_eq!(codec.format(), Format::Cram);
        assert_eq!(codec.version(), CodecVersion::new(3, 0, 0));
    }

    #[test]
    fn test_stream_is_restored_after_probing() {
        let data = b"CRAM\x03\x01rest";
        let registry = CodecRegistry::with_builtin_codecs();
        let bundle = stream_bundle(data, "stdin");
        registry
            .resolve(&bundle, &ContentType::READS, None, None)
            .unwrap();

        let mut replayed = Vec::new();
        bundle
            .primary()
            .open()
            .unwrap()
            .read_to_end(&mut replayed)
            .unwrap();
        assert_eq!(replayed, data);
    }

    #[test]
    fn test_explicit_version_is_authoritative() {
        let registry = CodecRegistry::with_builtin_codecs();
        let bundle = stream_bundle(b"CRAM\x03\x01rest", "sample.cram");
        let err = registry
            .resolve(
                &bundle,
                &ContentType::READS,
                Some(Format::Cram),
                Some(CodecVersion::new(3, 0, 0)),
            )
            .err()
            .unwrap();
        match err {
            ResolveError::VersionMismatch {
                requested,
                detected,
                ..
            } => {
                assert_eq!(requested, CodecVersion::new(3, 0, 0));
                assert_eq!(detected, Some(CodecVersion::new(3, 1, 0)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_matching_codec_names_attempts() {
        let registry = CodecRegistry::with_builtin_codecs();
        let bundle = stream_bundle(b"\x00\x01\x02\x03\x04\x05\x06", "junk");
        let err = registry
            .resolve(&bundle, &ContentType::READS, None, None)
            .err()
            .unwrap();
        assert!(matches!(err, ResolveError::NoMatchingCodec { prefix_len: 7, .. }));
        let message = err.to_string();
        assert!(message.contains("junk"));
        assert!(message.contains("BAM 1.0.0"));
        assert!(message.contains("CRAM 3.1.0"));
    }

    #[test]
    fn test_unrecognized_reads_are_reported_not_guessed() {
        let registry = CodecRegistry::with_builtin_codecs();
        let resolve = |data: &[u8]| {
            let bundle = stream_bundle(data, "stdin");
            registry
                .resolve(&bundle, &ContentType::READS, None, None)
                .map(|codec| codec.display_name())
        };

        for truncated in [&b"CRAM"[..], &b"CR"[..]] {
            assert!(matches!(
                resolve(truncated),
                Err(ResolveError::TruncatedInput { .. })
            ));
        }
        for foreign in [
            &b"CRAM\x04\x00rest"[..],
            &b"CRAM\x02\x01rest"[..],
            &b"\x89PNG\r\n\x1a\n"[..],
            &b"\xff\xfe\xfd\xfc\x00"[..],
            &b"r001\t0\tchr1\t1\n"[..],
        ] {
            assert!(matches!(
                resolve(foreign),
                Err(ResolveError::NoMatchingCodec { .. })
            ));
        }
    }

    #[test]
    fn test_missing_role() {
        let registry = CodecRegistry::with_builtin_codecs();
        let bundle = stream_bundle(b"CRAM\x03\x01", "stdin");
        assert!(matches!(
            registry.resolve(&bundle, &ContentType::READS_INDEX, None, None),
            Err(ResolveError::MissingResource { .. })
        ));
    }

    #[test]
    fn test_resolve_for_encoding() {
        let registry = CodecRegistry::with_builtin_codecs();

        let bundle = Bundle::for_reads("out.cram");
        let codec = registry
            .resolve_for_encoding(&bundle, &ContentType::READS, None, None)
            .unwrap();
        assert_eq!(codec.display_name(), "CRAM 3.1.0");

        let codec = registry
            .resolve_for_encoding(
                &bundle,
                &ContentType::READS,
                Some(Format::Bam),
                Some(CodecVersion::new(1, 0, 0)),
            )
            .unwrap();
        assert_eq!(codec.format(), Format::Bam);

        assert!(matches!(
            registry.resolve_for_encoding(
                &bundle,
                &ContentType::READS,
                None,
                Some(CodecVersion::new(9, 0, 0))
            ),
            Err(ResolveError::VersionMismatch { detected: None, .. })
        ));
    }

    #[test]
    fn test_resolve_upgrade() {
        let registry = CodecRegistry::with_builtin_codecs();
        let codec = registry
            .resolve_upgrade(
                Format::Vcf,
                CodecVersion::new(4, 2, 0),
                CodecVersion::new(4, 3, 0),
            )
            .unwrap();
        assert_eq!(codec.version(), CodecVersion::new(4, 3, 0));

        assert!(matches!(
            registry.resolve_upgrade(
                Format::Bam,
                CodecVersion::new(1, 0, 0),
                CodecVersion::new(2, 0, 0)
            ),
            Err(ResolveError::AmbiguousUpgrade { .. })
        ));
    }

    #[test]
    fn test_unknown_extension() {
        let registry = CodecRegistry::with_builtin_codecs();
        assert!(matches!(
            registry.resolve_path("notes.txt"),
            Err(ResolveError::UnknownFamily { .. })
        ));
    }
}
