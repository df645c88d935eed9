//! BAM: BGZF-compressed binary alignments.

use std::any::Any;

use crate::codec::probe::BGZF_MAX_BLOCK_SIZE;
use crate::codec::reads::{ReadsDecoder, ReadsDecoderOptions, ReadsEncoder};
use crate::codec::{
    create_primary, inflate_prefix, match_magic, open_primary, options_or_default,
    require_no_options, Codec, CodecError, Decoder, Encoder,
};
use crate::core::bundle::Bundle;
use crate::core::types::{CodecVersion, Format, FormatFamily};

const BAM_MAGIC: &[u8] = b"BAM\x01";

/// gzip magic, deflate, FEXTRA set: the start of every BGZF block
const BGZF_MAGIC: &[u8] = &[0x1f, 0x8b, 0x08, 0x04];

#[derive(Debug, Default)]
pub struct BamCodec;

impl BamCodec {
    pub const VERSION: CodecVersion = CodecVersion::new(1, 0, 0);
}

impl Codec for BamCodec {
    fn format(&self) -> Format {
        Format::Bam
    }

    fn version(&self) -> CodecVersion {
        Self::VERSION
    }

    /// The magic is inside the first BGZF block, so the whole block may be needed
    fn signature_size(&self) -> usize {
        BGZF_MAX_BLOCK_SIZE
    }

    fn can_decode_signature(&self, probe: &[u8], source_name: &str) -> Result<bool, CodecError> {
        if !match_magic(probe, BGZF_MAGIC, source_name)? {
            return Ok(false);
        }
        let inflated = inflate_prefix(probe, BAM_MAGIC.len());
        match_magic(&inflated, BAM_MAGIC, source_name)
    }

    fn decoder(
        &self,
        bundle: &Bundle,
        options: Option<&dyn Any>,
    ) -> Result<Box<dyn Decoder>, CodecError> {
        let options: ReadsDecoderOptions = options_or_default(options, &self.display_name())?;
        let (source, display_name) = open_primary(bundle, FormatFamily::Reads)?;
        Ok(Box::new(ReadsDecoder::new(
            Format::Bam,
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
            Format::Bam,
            Self::VERSION,
            output,
            path,
        )))
    }
}
