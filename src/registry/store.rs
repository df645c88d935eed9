use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::codec::hapref::FastaCodec;
use crate::codec::reads::{BamCodec, CramCodec, SamCodec};
use crate::codec::variants::{BcfCodec, VcfCodec};
use crate::codec::Codec;
use crate::core::types::{Format, FormatFamily};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry is sealed; cannot register {codec}")]
    Sealed { codec: String },

    #[error("Codec {codec} is already registered")]
    DuplicateCodec { codec: String },
}

/// The codec table, keyed by format, in registration order
pub struct CodecRegistry {
    codecs: IndexMap<Format, Vec<Box<dyn Codec>>>,
    sealed: AtomicBool,
}

impl CodecRegistry {
    /// Create an empty, open registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            codecs: IndexMap::new(),
            sealed: AtomicBool::new(false),
        }
    }

    /// Create an open registry holding every built-in codec
    #[must_use]
    pub fn with_builtin_codecs() -> Self {
        let builtin: Vec<Box<dyn Codec>> = vec![
            Box::new(BamCodec),
            Box::new(CramCodec::v3_1()),
            Box::new(CramCodec::v3_0()),
            Box::new(SamCodec),
            Box::new(FastaCodec),
            Box::new(VcfCodec::v4_3()),
            Box::new(VcfCodec::v4_2()),
            Box::new(BcfCodec),
        ];

        let mut codecs: IndexMap<Format, Vec<Box<dyn Codec>>> = IndexMap::new();
        for codec in builtin {
            codecs.entry(codec.format()).or_default().push(codec);
        }
        Self {
            codecs,
            sealed: AtomicBool::new(false),
        }
    }

    /// Add a codec
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Sealed` once any lookup has happened, or
    /// `RegistryError::DuplicateCodec` if a codec with the same format and version
    /// is already registered.
    pub fn register(&mut self, codec: impl Codec + 'static) -> Result<(), RegistryError> {
        if self.is_sealed() {
            return Err(RegistryError::Sealed {
                codec: codec.display_name(),
            });
        }

        let existing = self.codecs.entry(codec.format()).or_default();
        if existing.iter().any(|c| c.version() == codec.version()) {
            return Err(RegistryError::DuplicateCodec {
                codec: codec.display_name(),
            });
        }

        debug!(codec = %codec.display_name(), "Registered codec");
        existing.push(Box::new(codec));
        Ok(())
    }

    /// End the registration phase
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            debug!(codecs = self.len(), "Sealed codec registry");
        }
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Number of registered codecs
    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Codecs registered for `format`, in registration order. Seals the registry.
    #[must_use]
    pub fn codecs_for_format(&self, format: Format) -> &[Box<dyn Codec>] {
        self.seal();
        self.codecs
            .get(&format)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Formats of `family` with at least one codec, in family order. Seals the
    /// registry.
    #[must_use]
    pub fn formats_for_family(&self, family: FormatFamily) -> Vec<Format> {
        self.seal();
        family
            .formats()
            .iter()
            .copied()
            .filter(|format| self.codecs.get(format).is_some_and(|c| !c.is_empty()))
            .collect()
    }

    /// Largest signature size over the codecs of `formats`. Seals the registry.
    #[must_use]
    pub fn max_signature_size(&self, formats: &[Format]) -> usize {
        formats
            .iter()
            .flat_map(|format| self.codecs_for_format(*format))
            .map(|codec| codec.signature_size())
            .max()
            .unwrap_or(0)
    }

    /// Codecs of `formats`: format order first, then version descending
    pub(crate) fn candidates(&self, formats: &[Format]) -> Vec<&dyn Codec> {
        let mut candidates = Vec::new();
        for format in formats {
            let mut codecs: Vec<&dyn Codec> = self
                .codecs_for_format(*format)
                .iter()
                .map(|codec| &**codec)
                .collect();
            // Registration order says nothing about version order
            codecs.sort_by(|a, b| b.version().cmp(&a.version()));
            candidates.extend(codecs);
        }
        candidates
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codecs: Vec<String> = self
            .codecs
            .values()
            .flatten()
            .map(|codec| codec.display_name())
            .collect();
        f.debug_struct("CodecRegistry")
            .field("codecs", &codecs)
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CodecVersion;

    #[test]
    fn test_builtin_codecs() {
        let registry = CodecRegistry::with_builtin_codecs();
        assert_eq!(registry.len(), 8);
        assert!(!registry.is_sealed());

        assert_eq!(
            registry.formats_for_family(FormatFamily::Reads),
            vec![Format::Bam, Format::Cram, Format::Sam]
        );
        assert_eq!(
            registry.formats_for_family(FormatFamily::Variants),
            vec![Format::Vcf, Format::Bcf]
        );
        assert_eq!(registry.codecs_for_format(Format::Cram).len(), 2);
        assert!(registry.is_sealed());
    }

    #[test]
    fn test_candidates_sorted_by_version() {
        let registry = CodecRegistry::with_builtin_codecs();
        let versions: Vec<CodecVersion> = registry
            .candidates(&[Format::Cram, Format::Vcf])
            .iter()
            .map(|codec| codec.version())
            .collect();
        assert_eq!(
            versions,
            vec![
                CramCodec::V3_1,
                CramCodec::V3_0,
                VcfCodec::V4_3,
                VcfCodec::V4_2
            ]
        );
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = CodecRegistry::new();
        registry.register(CramCodec::v3_0()).unwrap();
        registry.register(CramCodec::v3_1()).unwrap();
        assert!(matches!(
            registry.register(CramCodec::v3_0()),
            Err(RegistryError::DuplicateCodec { .. })
        ));
    }

    #[test]
    fn test_register_after_lookup_fails() {
        let mut registry = CodecRegistry::new();
        registry.register(BamCodec).unwrap();
        assert_eq!(registry.max_signature_size(&[Format::Bam]), 65536);

        let err = registry.register(SamCodec).unwrap_err();
        assert!(matches!(err, RegistryError::Sealed { .. }));
        assert_eq!(err.to_string(), "Registry is sealed; cannot register SAM 1.0.0");
    }

    #[test]
    fn test_empty_registry() {
        let registry = CodecRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.codecs_for_format(Format::Bam).is_empty());
        assert_eq!(registry.max_signature_size(&[Format::Bam]), 0);
        assert!(registry.formats_for_family(FormatFamily::Reads).is_empty());
    }
}
