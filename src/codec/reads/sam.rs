//! SAM: tab-delimited text alignments.

use std::any::Any;

use crate::codec::reads::{ReadsDecoder, ReadsDecoderOptions, ReadsEncoder};
use crate::codec::{
    create_primary, open_primary, options_or_default, require_no_options, Codec, CodecError,
    Decoder, Encoder,
};
use crate::core::bundle::Bundle;
use crate::core::types::{CodecVersion, Format, FormatFamily};

/// `@` + two-letter record type + tab
const SAM_SIGNATURE_SIZE: usize = 4;

#[derive(Debug, Default)]
pub struct SamCodec;

impl SamCodec {
    pub const VERSION: CodecVersion = CodecVersion::new(1, 0, 0);
}

impl Codec for SamCodec {
    fn format(&self) -> Format {
        Format::Sam
    }

    fn version(&self) -> CodecVersion {
        Self::VERSION
    }

    fn signature_size(&self) -> usize {
        SAM_SIGNATURE_SIZE
    }

    /// A header line (`@HD`, `@SQ`, ...). Headerless files are only recognized
    /// when empty, through their extension.
    fn can_decode_signature(&self, probe: &[u8], source_name: &str) -> Result<bool, CodecError> {
        match probe {
            [b'@', rest @ ..] => {
                if rest.len() < 2 {
                    return Err(CodecError::TruncatedInput {
                        source_name: source_name.to_string(),
                        needed: 3,
                        available: probe.len(),
                    });
                }
                Ok(rest[..2].iter().all(u8::is_ascii_uppercase)
                    && rest.get(2).map_or(true, |&b| b == b'\t'))
            }
            [] => Err(CodecError::TruncatedInput {
                source_name: source_name.to_string(),
                needed: 1,
                available: 0,
            }),
            _ => Ok(false),
        }
    }

    fn decoder(
        &self,
        bundle: &Bundle,
        options: Option<&dyn Any>,
    ) -> Result<Box<dyn Decoder>, CodecError> {
        let options: ReadsDecoderOptions = options_or_default(options, &self.display_name())?;
        let (source, display_name) = open_primary(bundle, FormatFamily::Reads)?;
        Ok(Box::new(ReadsDecoder::new(
            Format::Sam,
            Self::VERSION,
            source,
            display_name,
            options,
        )))
    }

    fn encoder(
        &self,
        bundle: &Bundle,
        options: Option<&dyn Any>,
    ) -> Result<Box<dyn Encoder>, CodecError> {
        require_no_options(options, &self.display_name())?;
        let (output, path) = create_primary(bundle, FormatFamily::Reads, &self.display_name())?;
        Ok(Box::new(ReadsEncoder::new(
            Format::Sam,
            Self::VERSION,
            output,
            path,
        )))
    }

    /// An empty `.sam` file is a valid SAM file with no header and no records
    fn accepts_uri_only(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_signature() {
        let codec = SamCodec;
        assert!(codec.can_decode_signature(b"@HD\t", "x.sam").unwrap());
        assert!(codec.can_decode_signature(b"@SQ", "x.sam").unwrap());
        assert!(!codec.can_decode_signature(b"@hd\t", "x.sam").unwrap());
        assert!(!codec.can_decode_signature(b"@HD ", "x.sam").unwrap());
        assert!(matches!(
            codec.can_decode_signature(b"@H", "x.sam"),
            Err(CodecError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_non_header_bytes_are_rejected() {
        let codec = SamCodec;
        assert!(!codec.can_decode_signature(b"r001", "x.sam").unwrap());
        assert!(!codec.can_decode_signature(b"CRAM", "x.sam").unwrap());
        assert!(!codec.can_decode_signature(b"\x89PNG", "x.sam").unwrap());
        assert!(!codec.can_decode_signature(&[0xff, 0xfe, 0xfd, 0xfc], "x.sam").unwrap());
        assert!(matches!(
            codec.can_decode_signature(b"", "x.sam"),
            Err(CodecError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_accepts_uri_only() {
        assert!(SamCodec.accepts_uri_only());
        assert!(SamCodec.can_decode_uri(&"reads.SAM".into()));
        assert!(!SamCodec.can_decode_uri(&"reads.bam".into()));
    }
}
