//! BCF: binary variant calls in BGZF blocks. Read-only.

use std::any::Any;

use crate::codec::probe::BGZF_MAX_BLOCK_SIZE;
use crate::codec::variants::{VariantsDecoder, VariantsDecoderOptions};
use crate::codec::{
    inflate_prefix, match_magic, open_primary, options_or_default, Codec, CodecError, Decoder,
    Encoder,
};
use crate::core::bundle::Bundle;
use crate::core::types::{CodecVersion, Format, FormatFamily};
use crate::utils::validation::is_gzip;

/// `BCF` followed by the major and minor version bytes
const BCF_MAGIC: [u8; 5] = [b'B', b'C', b'F', 2, 2];

#[derive(Debug, Default)]
pub struct BcfCodec;

impl BcfCodec {
    pub const VERSION: CodecVersion = CodecVersion::new(2, 2, 0);
}

impl Codec for BcfCodec {
    fn format(&self) -> Format {
        Format::Bcf
    }

    fn version(&self) -> CodecVersion {
        Self::VERSION
    }

    fn signature_size(&self) -> usize {
        BGZF_MAX_BLOCK_SIZE
    }

    /// Compressed BCF is the norm; uncompressed BCF is accepted as well
    fn can_decode_signature(&self, probe: &[u8], source_name: &str) -> Result<bool, CodecError> {
        if is_gzip(probe) {
            return match_magic(&inflate_prefix(probe, BCF_MAGIC.len()), &BCF_MAGIC, source_name);
        }
        match_magic(probe, &BCF_MAGIC, source_name)
    }

    fn decoder(
        &self,
        bundle: &Bundle,
        options: Option<&dyn Any>,
    ) -> Result<Box<dyn Decoder>, CodecError> {
        let options: VariantsDecoderOptions = options_or_default(options, &self.display_name())?;
        let (source, display_name) = open_primary(bundle, FormatFamily::Variants)?;
        Ok(Box::new(VariantsDecoder::new(
            Format::Bcf,
            Self::VERSION,
            source,
            display_name,
            options,
        )))
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
