//! FASTA reference sequences, plain or gzip/bgzip compressed. Read-only.
//!
//! Decoding reads every record to get sequence lengths and computes each sequence's
//! MD5 on the uppercased bases, the checksum convention of SAM `M5` tags.

use std::any::Any;
use std::io::{BufRead, BufReader};

use noodles::fasta;
use tracing::debug;

use crate::codec::probe::BGZF_MAX_BLOCK_SIZE;
use crate::codec::{
    inflate_prefix, maybe_inflate, open_primary, require_no_options, Codec, CodecError, Decoder,
    Encoder,
};
use crate::core::bundle::Bundle;
use crate::core::contig::{Contig, SequenceDictionary};
use crate::core::resource::ByteSource;
use crate::core::types::{CodecVersion, Format, FormatFamily};
use crate::utils::validation::{check_contig_limit, is_gzip, MAX_CONTIGS};

#[derive(Debug, Default)]
pub struct FastaCodec;

impl FastaCodec {
    pub const VERSION: CodecVersion = CodecVersion::new(1, 0, 0);
}

impl Codec for FastaCodec {
    fn format(&self) -> Format {
        Format::Fasta
    }

    fn version(&self) -> CodecVersion {
        Self::VERSION
    }

    /// One byte for plain FASTA; a compressed file may need its first block
    fn signature_size(&self) -> usize {
        BGZF_MAX_BLOCK_SIZE
    }

    fn can_decode_signature(&self, probe: &[u8], _source_name: &str) -> Result<bool, CodecError> {
        if is_gzip(probe) {
            return Ok(inflate_prefix(probe, 1).first() == Some(&b'>'));
        }
        Ok(probe.first() == Some(&b'>'))
    }

    /// Takes no options
    fn decoder(
        &self,
        bundle: &Bundle,
        options: Option<&dyn Any>,
    ) -> Result<Box<dyn Decoder>, CodecError> {
        require_no_options(options, &self.display_name())?;
        let (source, display_name) = open_primary(bundle, FormatFamily::HaploidReference)?;
        Ok(Box::new(FastaDecoder {
            display_name,
            source: Some(source),
            dictionary: None,
        }))
    }

    fn encoder(
        &self,
        _bundle: &Bundle,
        _options: Option<&dyn Any>,
    ) -> Result<Box<dyn Encoder>, CodecError> {
        Err(CodecError::UnsupportedOperation {
            codec: self.display_name(),
            operation: "encoding",
        })
    }
}

struct FastaDecoder {
    display_name: String,
    source: Option<ByteSource>,
    dictionary: Option<SequenceDictionary>,
}

impl Decoder for FastaDecoder {
    fn format(&self) -> Format {
        Format::Fasta
    }

    fn version(&self) -> CodecVersion {
        FastaCodec::VERSION
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn read_dictionary(&mut self) -> Result<SequenceDictionary, CodecError> {
        if let Some(dictionary) = &self.dictionary {
            return Ok(dictionary.clone());
        }
        let source = self.source.take().ok_or_else(|| CodecError::Decode {
            source_name: self.display_name.clone(),
            reason: "sequences could not be read".to_string(),
        })?;

        let mut reader = fasta::io::Reader::new(BufReader::new(maybe_inflate(source)?));
        let dictionary = read_sequences(&mut reader, &self.display_name)?;
        debug!(
            source = %self.display_name,
            contigs = dictionary.len(),
            "Read FASTA sequences"
        );
        self.dictionary = Some(dictionary.clone());
        Ok(dictionary)
    }
}

fn read_sequences<R: BufRead>(
    reader: &mut fasta::io::Reader<R>,
    source_name: &str,
) -> Result<SequenceDictionary, CodecError> {
    let mut contigs = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| CodecError::Decode {
            source_name: source_name.to_string(),
            reason: format!("Failed to parse FASTA record: {e}"),
        })?;

        if check_contig_limit(contigs.len(), MAX_CONTIGS).is_some() {
            return Err(CodecError::TooManyContigs {
                source_name: source_name.to_string(),
                limit: MAX_CONTIGS,
            });
        }

        let name = String::from_utf8_lossy(record.name()).to_string();
        let sequence = record.sequence();

        let uppercase: Vec<u8> = sequence
            .as_ref()
            .iter()
            .map(u8::to_ascii_uppercase)
            .collect();
        let md5 = format!("{:x}", md5::compute(&uppercase));

        contigs.push(Contig::new(name, sequence.len() as u64).with_md5(md5));
    }

    if contigs.is_empty() {
        return Err(CodecError::Decode {
            source_name: source_name.to_string(),
            reason: "No sequences found in FASTA file".to_string(),
        });
    }

    Ok(SequenceDictionary::new(contigs).with_source(source_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ContentType;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    const FASTA: &[u8] = b">chr1 description\nACGTacgt\nNN\n>chr2\nGGCC\n";

    #[test]
    fn test_signature() {
        let codec = FastaCodec;
        assert!(codec.can_decode_signature(b">chr1", "ref.fa").unwrap());
        assert!(!codec.can_decode_signature(b"@HD\t", "ref.fa").unwrap());

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(FASTA).unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(codec.can_decode_signature(&compressed, "ref.fa.gz").unwrap());
    }

    #[test]
    fn test_decode_lengths_and_md5() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ref.fa");
        std::fs::write(&path, FASTA).unwrap();

        let bundle = Bundle::from_path(ContentType::HAPLOID_REFERENCE, &path);
        let mut decoder = FastaCodec.decoder(&bundle, None).unwrap();
        let dict = decoder.read_dictionary().unwrap();

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.contigs[0].name, "chr1");
        assert_eq!(dict.contigs[0].length, 10);
        assert_eq!(
            dict.contigs[0].md5,
            Some(format!("{:x}", md5::compute(b"ACGTACGTNN")))
        );
        assert_eq!(dict.contigs[1].name, "chr2");
        assert_eq!(dict.contigs[1].length, 4);
    }

    #[test]
    fn test_decode_gzipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ref.fa.gz");
        let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        encoder.write_all(FASTA).unwrap();
        encoder.finish().unwrap();

        let bundle = Bundle::from_path(ContentType::HAPLOID_REFERENCE, &path);
        let dict = FastaCodec
            .decoder(&bundle, None)
            .unwrap()
            .read_dictionary()
            .unwrap();
        assert_eq!(dict.total_length(), 14);
    }

    #[test]
    fn test_options_must_be_none() {
        let bundle = Bundle::from_path(ContentType::HAPLOID_REFERENCE, "ref.fa");
        let options = crate::codec::reads::ReadsDecoderOptions::default();
        assert!(matches!(
            FastaCodec.decoder(&bundle, Some(&options as &dyn Any)),
            Err(CodecError::InvalidOptions { .. })
        ));
    }
}
