//! CRAM: reference-based compressed alignments. Read-only.

use std::any::Any;

use crate::codec::reads::{ReadsDecoder, ReadsDecoderOptions};
use crate::codec::{
    match_magic, open_primary, options_or_default, Codec, CodecError, Decoder, Encoder,
};
use crate::core::bundle::Bundle;
use crate::core::types::{CodecVersion, Format, FormatFamily};

/// `CRAM` followed by the major and minor version bytes of the file definition
const CRAM_SIGNATURE_SIZE: usize = 6;

/// One CRAM codec per minor version; the file definition names the exact version
#[derive(Debug, Clone, Copy)]
pub struct CramCodec {
    version: CodecVersion,
}

impl CramCodec {
    pub const V3_0: CodecVersion = CodecVersion::new(3, 0, 0);
    pub const V3_1: CodecVersion = CodecVersion::new(3, 1, 0);

    #[must_use]
    pub fn v3_0() -> Self {
        Self { version: Self::V3_0 }
    }

    #[must_use]
    pub fn v3_1() -> Self {
        Self { version: Self::V3_1 }
    }

    fn signature(&self) -> [u8; CRAM_SIGNATURE_SIZE] {
        // Built-in versions are single-digit
        let major = u8::try_from(self.version.major).unwrap_or(u8::MAX);
        let minor = u8::try_from(self.version.minor).unwrap_or(u8::MAX);
        [b'C', b'R', b'A', b'M', major, minor]
    }
}

impl Codec for CramCodec {
    fn format(&self) -> Format {
        Format::Cram
    }

    fn version(&self) -> CodecVersion {
        self.version
    }

    fn signature_size(&self) -> usize {
        CRAM_SIGNATURE_SIZE
    }

    fn can_decode_signature(&self, probe: &[u8], source_name: &str) -> Result<bool, CodecError> {
        match_magic(probe, &self.signature(), source_name)
    }

    fn decoder(
        &self,
        bundle: &Bundle,
        options: Option<&dyn Any>,
    ) -> Result<Box<dyn Decoder>, CodecError> {
        let options: ReadsDecoderOptions = options_or_default(options, &self.display_name())?;
        let (source, display_name) = open_primary(bundle, FormatFamily::Reads)?;
        Ok(Box::new(ReadsDecoder::new(
            Format::Cram,
            self.version,
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

    /// A newer minor version of the same major version can take older data
    fn can_upgrade(&self, from: CodecVersion, to: CodecVersion) -> bool {
        to == self.version && from.same_major(&to) && from < to
    }
}
