//! Reads codecs: BAM, CRAM and SAM.
//!
//! All three decode to the `@SQ` sequence dictionary of the file header, read with
//! noodles. BAM and SAM can also write a header-only file; CRAM is read-only.

use std::io::{BufReader, BufWriter, Write};
use std::num::NonZeroUsize;

use noodles::sam::header::record::value::map::tag::Other;
use noodles::sam::header::record::value::map::ReferenceSequence;
use noodles::sam::header::record::value::Map;
use noodles::sam::Header;
use tracing::{debug, warn};

use crate::codec::{CodecError, Decoder, Encoder};
use crate::core::contig::{Contig, SequenceDictionary};
use crate::core::path::IoPath;
use crate::core::resource::ByteSource;
use crate::core::types::{CodecVersion, Format};
use crate::utils::validation::{check_contig_limit, normalize_md5, MAX_CONTIGS};

pub mod bam;
pub mod cram;
pub mod sam;

pub use bam::BamCodec;
pub use cram::CramCodec;
pub use sam::SamCodec;

/// Options accepted by the reads decoders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadsDecoderOptions {
    /// Maximum number of `@SQ` lines to accept
    pub max_contigs: usize,
}

impl Default for ReadsDecoderOptions {
    fn default() -> Self {
        Self {
            max_contigs: MAX_CONTIGS,
        }
    }
}

/// Decodes the header of a BAM, CRAM or SAM source
pub(crate) struct ReadsDecoder {
    format: Format,
    version: CodecVersion,
    display_name: String,
    options: ReadsDecoderOptions,
    source: Option<ByteSource>,
    dictionary: Option<SequenceDictionary>,
}

impl ReadsDecoder {
    pub(crate) fn new(
        format: Format,
        version: CodecVersion,
        source: ByteSource,
        display_name: String,
        options: ReadsDecoderOptions,
    ) -> Self {
        Self {
            format,
            version,
            display_name,
            options,
            source: Some(source),
            dictionary: None,
        }
    }

    fn read_header(&self, source: ByteSource) -> Result<Header, CodecError> {
        let noodles_error = |e: std::io::Error| CodecError::Decode {
            source_name: self.display_name.clone(),
            reason: format!("noodles error: {e}"),
        };

        match self.format {
            Format::Bam => noodles::bam::io::Reader::new(source)
                .read_header()
                .map_err(noodles_error),
            Format::Cram => {
                let mut reader = noodles::cram::io::Reader::new(source);
                reader.read_file_definition().map_err(noodles_error)?;
                reader.read_file_header().map_err(noodles_error)
            }
            _ => noodles::sam::io::Reader::new(BufReader::new(source))
                .read_header()
                .map_err(noodles_error),
        }
    }
}

impl Decoder for ReadsDecoder {
    fn format(&self) -> Format {
        self.format
    }

    fn version(&self) -> CodecVersion {
        self.version
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn read_dictionary(&mut self) -> Result<SequenceDictionary, CodecError> {
        if let Some(dictionary) = &self.dictionary {
            return Ok(dictionary.clone());
        }
        // The header is read once; the source is released afterwards
        let source = self.source.take().ok_or_else(|| CodecError::Decode {
            source_name: self.display_name.clone(),
            reason: "header could not be read".to_string(),
        })?;
        let header = self.read_header(source)?;
        let dictionary =
            header_to_dictionary(&header, &self.display_name, self.options.max_contigs)?;
        debug!(
            source = %self.display_name,
            contigs = dictionary.len(),
            "Read sequence dictionary"
        );
        self.dictionary = Some(dictionary.clone());
        Ok(dictionary)
    }
}

/// Writes a header-only BAM or SAM file
pub(crate) struct ReadsEncoder {
    format: Format,
    version: CodecVersion,
    path: IoPath,
    output: Option<std::fs::File>,
}

impl ReadsEncoder {
    pub(crate) fn new(
        format: Format,
        version: CodecVersion,
        output: std::fs::File,
        path: IoPath,
    ) -> Self {
        Self {
            format,
            version,
            path,
            output: Some(output),
        }
    }
}

impl Encoder for ReadsEncoder {
    fn format(&self) -> Format {
        self.format
    }

    fn version(&self) -> CodecVersion {
        self.version
    }

    fn display_name(&self) -> &str {
        self.path.as_str()
    }

    fn write_dictionary(&mut self, dictionary: &SequenceDictionary) -> Result<(), CodecError> {
        let header = dictionary_to_header(dictionary, self.path.as_str())?;
        let output = self.output.take().ok_or_else(|| CodecError::UnsupportedOperation {
            codec: format!("{} {}", self.format, self.version),
            operation: "writing a second header",
        })?;

        match self.format {
            Format::Bam => {
                let mut writer = noodles::bam::io::Writer::new(output);
                writer.write_header(&header)?;
                writer.try_finish()?;
            }
            _ => {
                let mut writer = noodles::sam::io::Writer::new(BufWriter::new(output));
                writer.write_header(&header)?;
                writer.get_mut().flush()?;
            }
        }

        debug!(path = %self.path, contigs = dictionary.len(), "Wrote header");
        Ok(())
    }
}

/// Convert a noodles header into a sequence dictionary
pub(crate) fn header_to_dictionary(
    header: &Header,
    source_name: &str,
    max_contigs: usize,
) -> Result<SequenceDictionary, CodecError> {
    let mut contigs = Vec::new();

    for (name, map) in header.reference_sequences() {
        if check_contig_limit(contigs.len(), max_contigs).is_some() {
            return Err(CodecError::TooManyContigs {
                source_name: source_name.to_string(),
                limit: max_contigs,
            });
        }

        let mut contig = Contig::new(name.to_string(), map.length().get() as u64);
        let other = |tag: [u8; 2]| {
            Other::try_from(tag)
                .ok()
                .and_then(|tag| map.other_fields().get(&tag))
                .map(ToString::to_string)
        };

        if let Some(md5) = other(*b"M5") {
            match normalize_md5(&md5) {
                Some(normalized) => contig.md5 = Some(normalized),
                None => warn!(
                    contig = %contig.name,
                    md5 = %md5,
                    "Invalid MD5 checksum format, ignoring"
                ),
            }
        }
        contig.assembly = other(*b"AS");
        contig.uri = other(*b"UR");
        contig.species = other(*b"SP");
        if let Some(aliases) = other(*b"AN") {
            contig.aliases = aliases
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        contigs.push(contig);
    }

    Ok(SequenceDictionary::new(contigs).with_source(source_name))
}

/// Build a noodles header holding one `@SQ` line per contig
pub(crate) fn dictionary_to_header(
    dictionary: &SequenceDictionary,
    target: &str,
) -> Result<Header, CodecError> {
    let mut builder = Header::builder();

    for contig in &dictionary.contigs {
        let length = usize::try_from(contig.length)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| CodecError::Decode {
                source_name: target.to_string(),
                reason: format!("contig '{}' has invalid length {}", contig.name, contig.length),
            })?;

        let mut map = Map::<ReferenceSequence>::new(length);
        let mut set = |tag: [u8; 2], value: &str| {
            if let Ok(tag) = Other::try_from(tag) {
                map.other_fields_mut().insert(tag, value.into());
            }
        };
        if let Some(md5) = &contig.md5 {
            set(*b"M5", md5);
        }
        if let Some(assembly) = &contig.assembly {
            set(*b"AS", assembly);
        }
        if let Some(uri) = &contig.uri {
            set(*b"UR", uri);
        }
        if let Some(species) = &contig.species {
            set(*b"SP", species);
        }
        if !contig.aliases.is_empty() {
            set(*b"AN", &contig.aliases.join(","));
        }

        builder = builder.add_reference_sequence(contig.name.as_str(), map);
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "@HD\tVN:1.6\tSO:coordinate
@SQ\tSN:chr1\tLN:248956422\tM5:6AEF897C3D6FF0C78AFF06AC189178DD\tAN:1,NC_000001.11
@SQ\tSN:chr2\tLN:242193529\tAS:GRCh38
@SQ\tSN:chrM\tLN:16569\tM5:not-an-md5
";

    fn sam_decoder(text: &str, options: ReadsDecoderOptions) -> ReadsDecoder {
        ReadsDecoder::new(
            Format::Sam,
            CodecVersion::new(1, 0, 0),
            Box::new(Cursor::new(text.as_bytes().to_vec())),
            "test.sam".to_string(),
            options,
        )
    }

    #[test]
    fn test_header_to_dictionary() {
        let mut decoder = sam_decoder(HEADER, ReadsDecoderOptions::default());
        let dict = decoder.read_dictionary().unwrap();

        assert_eq!(dict.source.as_deref(), Some("test.sam"));
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.contigs[0].name, "chr1");
        assert_eq!(dict.contigs[0].length, 248_956_422);
        assert_eq!(
            dict.contigs[0].md5.as_deref(),
            Some("6aef897c3d6ff0c78aff06ac189178dd")
        );
        assert_eq!(dict.contigs[0].aliases, vec!["1", "NC_000001.11"]);
        assert_eq!(dict.contigs[1].assembly.as_deref(), Some("GRCh38"));
        // Invalid MD5s are dropped with a warning
        assert!(dict.contigs[2].md5.is_none());

        // A second call returns the same dictionary without re-reading
        assert_eq!(decoder.read_dictionary().unwrap(), dict);
    }

    #[test]
    fn test_contig_limit() {
        let mut decoder = sam_decoder(HEADER, ReadsDecoderOptions { max_contigs: 2 });
        assert!(matches!(
            decoder.read_dictionary(),
            Err(CodecError::TooManyContigs { limit: 2, .. })
        ));
    }

    #[test]
    fn test_dictionary_to_header() {
        let dict = SequenceDictionary::new(vec![
            Contig::new("chr1", 100).with_md5("6aef897c3d6ff0c78aff06ac189178dd"),
            Contig::new("chr2", 50),
        ]);
        let header = dictionary_to_header(&dict, "out.sam").unwrap();
        let back = header_to_dictionary(&header, "out.sam", MAX_CONTIGS).unwrap();
        assert_eq!(back.contigs, dict.contigs);

        let zero = SequenceDictionary::new(vec![Contig::new("empty", 0)]);
        assert!(matches!(
            dictionary_to_header(&zero, "out.sam"),
            Err(CodecError::Decode { .. })
        ));
    }
}
