//! VCF: text variant calls, plain or gzip/bgzip compressed.
//!
//! The `##fileformat` line names the version. The 4.2 codec also reads 4.0 and 4.1
//! files; 4.3 changed enough of the header grammar to get its own codec.

use std::any::Any;

use crate::codec::probe::BGZF_MAX_BLOCK_SIZE;
use crate::codec::variants::{VariantsDecoder, VariantsDecoderOptions, VcfEncoder};
use crate::codec::{
    create_primary, inflate_prefix, match_magic, open_primary, options_or_default,
    require_no_options, Codec, CodecError, Decoder, Encoder,
};
use crate::core::bundle::Bundle;
use crate::core::types::{CodecVersion, Format, FormatFamily};
use crate::utils::validation::is_gzip;

const FILEFORMAT_PREFIX: &str = "##fileformat=VCFv";

/// Longest minor version read from the `##fileformat` line
const MAX_MINOR_DIGITS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct VcfCodec {
    version: CodecVersion,
    oldest_minor: u32,
}

impl VcfCodec {
    pub const V4_2: CodecVersion = CodecVersion::new(4, 2, 0);
    pub const V4_3: CodecVersion = CodecVersion::new(4, 3, 0);

    #[must_use]
    pub fn v4_2() -> Self {
        Self {
            version: Self::V4_2,
            oldest_minor: 0,
        }
    }

    #[must_use]
    pub fn v4_3() -> Self {
        Self {
            version: Self::V4_3,
            oldest_minor: 3,
        }
    }

    /// `##fileformat=VCFv4.`
    fn magic(&self) -> Vec<u8> {
        format!("{FILEFORMAT_PREFIX}{}.", self.version.major).into_bytes()
    }
}

impl Codec for VcfCodec {
    fn format(&self) -> Format {
        Format::Vcf
    }

    fn version(&self) -> CodecVersion {
        self.version
    }

    fn signature_size(&self) -> usize {
        BGZF_MAX_BLOCK_SIZE
    }

    fn can_decode_signature(&self, probe: &[u8], source_name: &str) -> Result<bool, CodecError> {
        let magic = self.magic();
        // The minor version digits and the byte ending them follow the magic
        let window = magic.len() + MAX_MINOR_DIGITS + 1;
        let text = if is_gzip(probe) {
            inflate_prefix(probe, window)
        } else {
            probe[..window.min(probe.len())].to_vec()
        };

        if !match_magic(&text, &magic, source_name)? {
            return Ok(false);
        }
        let digits: Vec<u8> = text[magic.len()..]
            .iter()
            .copied()
            .take_while(u8::is_ascii_digit)
            .collect();
        if digits.is_empty() {
            if text.len() == magic.len() {
                return Err(CodecError::TruncatedInput {
                    source_name: source_name.to_string(),
                    needed: magic.len() + 1,
                    available: text.len(),
                });
            }
            return Ok(false);
        }
        if digits.len() > MAX_MINOR_DIGITS {
            return Ok(false);
        }
        let minor = digits
            .iter()
            .fold(0u32, |acc, &d| acc * 10 + u32::from(d - b'0'));
        Ok((self.oldest_minor..=self.version.minor).contains(&minor))
    }

    fn decoder(
        &self,
        bundle: &Bundle,
        options: Option<&dyn Any>,
    ) -> Result<Box<dyn Decoder>, CodecError> {
        let options: VariantsDecoderOptions = options_or_default(options, &self.display_name())?;
        let (source, display_name) = open_primary(bundle, FormatFamily::Variants)?;
        Ok(Box::new(VariantsDecoder::new(
            Format::Vcf,
            self.version,
            source,
            display_name,
            options,
        )))
    }

    /// Writes `##fileformat`, the `##contig` lines and the `#CHROM` line
    fn encoder(
        &self,
        bundle: &Bundle,
        options: Option<&dyn Any>,
    ) -> Result<Box<dyn Encoder>, CodecError> {
        let name = self.display_name();
        require_no_options(options, &name)?;
        let (output, path) = create_primary(bundle, FormatFamily::Variants, &name)?;
        Ok(Box::new(VcfEncoder::new(self.version, output, path)))
    }

    fn can_upgrade(&self, from: CodecVersion, to: CodecVersion) -> bool {
        to == self.version && from.same_major(&to) && from < to
    }
}
