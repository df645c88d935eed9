//! Variants codecs: VCF and BCF.
//!
//! Both decode the `##contig=<...>` lines of the VCF header text. BCF embeds that
//! text after its magic and a length prefix.

use std::io::{BufRead, BufReader, Read, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::codec::{maybe_inflate, CodecError, Decoder, Encoder};
use crate::core::contig::{Contig, SequenceDictionary};
use crate::core::path::IoPath;
use crate::core::resource::ByteSource;
use crate::core::types::{CodecVersion, Format};
use crate::utils::validation::{check_contig_limit, normalize_md5, MAX_CONTIGS};

pub mod bcf;
pub mod vcf;

pub use bcf::BcfCodec;
pub use vcf::VcfCodec;

/// Largest BCF header text accepted (DOS protection)
pub const MAX_BCF_HEADER_LEN: u32 = 64 * 1024 * 1024;

/// Options accepted by the variants decoders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantsDecoderOptions {
    /// Maximum number of `##contig` lines to accept
    pub max_contigs: usize,
}

impl Default for VariantsDecoderOptions {
    fn default() -> Self {
        Self {
            max_contigs: MAX_CONTIGS,
        }
    }
}

pub(crate) struct VariantsDecoder {
    format: Format,
    version: CodecVersion,
    display_name: String,
    options: VariantsDecoderOptions,
    source: Option<ByteSource>,
    dictionary: Option<SequenceDictionary>,
}

impl VariantsDecoder {
    pub(crate) fn new(
        format: Format,
        version: CodecVersion,
        source: ByteSource,
        display_name: String,
        options: VariantsDecoderOptions,
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

    fn decode_error(&self, reason: impl Into<String>) -> CodecError {
        CodecError::Decode {
            source_name: self.display_name.clone(),
            reason: reason.into(),
        }
    }

    /// The `##` meta lines of a VCF, up to the `#CHROM` line
    fn read_vcf_header(&self, source: ByteSource) -> Result<String, CodecError> {
        let mut reader = BufReader::new(maybe_inflate(source)?);
        let mut text = String::new();
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 || !line.starts_with("##") {
                break;
            }
            text.push_str(&line);
        }
        Ok(text)
    }

    /// The header text embedded in a BCF file
    fn read_bcf_header(&self, source: ByteSource) -> Result<String, CodecError> {
        let mut reader = maybe_inflate(source)?;

        let mut magic = [0u8; 5];
        reader.read_exact(&mut magic)?;
        if &magic[..3] != b"BCF" {
            return Err(self.decode_error("missing BCF magic"));
        }

        let mut len = [0u8; 4];
        reader.read_exact(&mut len)?;
        let len = u32::from_le_bytes(len);
        if len > MAX_BCF_HEADER_LEN {
            return Err(self.decode_error(format!(
                "header length {len} exceeds maximum of {MAX_BCF_HEADER_LEN}"
            )));
        }

        let mut text = Vec::new();
        reader.take(u64::from(len)).read_to_end(&mut text)?;
        if text.len() < len as usize {
            return Err(self.decode_error("header text is truncated"));
        }
        // The text is NUL-terminated
        while text.last() == Some(&0) {
            text.pop();
        }
        String::from_utf8(text).map_err(|e| self.decode_error(format!("header is not UTF-8: {e}")))
    }
}

impl Decoder for VariantsDecoder {
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
        let source = self
            .source
            .take()
            .ok_or_else(|| self.decode_error("header could not be read"))?;

        let text = match self.format {
            Format::Bcf => self.read_bcf_header(source)?,
            _ => self.read_vcf_header(source)?,
        };
        let dictionary = parse_vcf_header_text(&text, &self.display_name, self.options.max_contigs)?;
        debug!(
            source = %self.display_name,
            contigs = dictionary.len(),
            "Read VCF contig lines"
        );
        self.dictionary = Some(dictionary.clone());
        Ok(dictionary)
    }
}

/// Writes a header-only VCF, gzip-compressed when the path ends in `.gz` or `.bgz`
pub(crate) struct VcfEncoder {
    version: CodecVersion,
    path: IoPath,
    output: Option<std::fs::File>,
}

impl VcfEncoder {
    pub(crate) fn new(version: CodecVersion, output: std::fs::File, path: IoPath) -> Self {
        Self {
            version,
            path,
            output: Some(output),
        }
    }
}

impl Encoder for VcfEncoder {
    fn format(&self) -> Format {
        Format::Vcf
    }

    fn version(&self) -> CodecVersion {
        self.version
    }

    fn display_name(&self) -> &str {
        self.path.as_str()
    }

    fn write_dictionary(&mut self, dictionary: &SequenceDictionary) -> Result<(), CodecError> {
        let output = self.output.take().ok_or_else(|| CodecError::UnsupportedOperation {
            codec: format!("{} {}", Format::Vcf, self.version),
            operation: "writing a second header",
        })?;
        let header = format_vcf_header(self.version, dictionary);

        if self.path.has_extension("gz") || self.path.has_extension("bgz") {
            let mut encoder = GzEncoder::new(output, Compression::default());
            encoder.write_all(header.as_bytes())?;
            encoder.finish()?;
        } else {
            let mut output = output;
            output.write_all(header.as_bytes())?;
            output.flush()?;
        }

        debug!(path = %self.path, contigs = dictionary.len(), "Wrote VCF header");
        Ok(())
    }
}

/// `##fileformat`, one `##contig` line per contig and the `#CHROM` column line
fn format_vcf_header(version: CodecVersion, dictionary: &SequenceDictionary) -> String {
    let mut text = format!("##fileformat=VCFv{}.{}\n", version.major, version.minor);
    for contig in &dictionary.contigs {
        text.push_str(&format!("##contig=<ID={},length={}", contig.name, contig.length));
        if let Some(md5) = &contig.md5 {
            text.push_str(&format!(",md5={md5}"));
        }
        if let Some(assembly) = &contig.assembly {
            text.push_str(&format!(",assembly=\"{assembly}\""));
        }
        text.push_str(">\n");
    }
    text.push_str("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n");
    text
}

/// Extract contig definitions from VCF header text
///
/// # Errors
///
/// Returns `CodecError::Decode` for a malformed contig line or
/// `CodecError::TooManyContigs` if the limit is exceeded.
pub fn parse_vcf_header_text(
    text: &str,
    source_name: &str,
    max_contigs: usize,
) -> Result<SequenceDictionary, CodecError> {
    let mut contigs = Vec::new();

    for line in text.lines() {
        if !line.starts_with("##contig=") {
            if line.starts_with("#CHROM") {
                break;
            }
            continue;
        }

        if let Some(contig) = parse_contig_line(line, source_name)? {
            if check_contig_limit(contigs.len(), max_contigs).is_some() {
                return Err(CodecError::TooManyContigs {
                    source_name: source_name.to_string(),
                    limit: max_contigs,
                });
            }
            contigs.push(contig);
        }
    }

    Ok(SequenceDictionary::new(contigs).with_source(source_name))
}

/// Parse a single `##contig=<...>` line; lines without an ID are skipped
fn parse_contig_line(line: &str, source_name: &str) -> Result<Option<Contig>, CodecError> {
    let invalid = |reason: String| CodecError::Decode {
        source_name: source_name.to_string(),
        reason,
    };
    let content = line
        .strip_prefix("##contig=<")
        .and_then(|s| s.strip_suffix('>'))
        .ok_or_else(|| invalid(format!("Invalid contig line format: {line}")))?;

    let mut name = None;
    let mut length = None;
    let mut md5 = None;
    let mut assembly = None;

    for part in split_contig_fields(content) {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim().trim_matches('"');
            match key.trim().to_lowercase().as_str() {
                "id" => name = Some(value.to_string()),
                "length" => length = value.parse::<u64>().ok(),
                "md5" => md5 = normalize_md5(value),
                "assembly" => assembly = Some(value.to_string()),
                _ => {}
            }
        }
    }

    match (name, length) {
        (Some(name), Some(length)) => {
            let mut contig = Contig::new(name, length);
            contig.md5 = md5;
            contig.assembly = assembly;
            Ok(Some(contig))
        }
        (Some(name), None) => Err(invalid(format!("Contig '{name}' missing length"))),
        _ => Ok(None),
    }
}

/// Split contig fields on commas outside double quotes
fn split_contig_fields(content: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in content.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(&content[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(&content[start..]);

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const VCF: &str = r#"##fileformat=VCFv4.2
##contig=<ID=chr1,length=248956422>
##contig=<ID=chr2,length=242193529,md5=F98DB672EB0993DCFDABAFE2A882905C>
##contig=<ID=chrM,length=16569,assembly="GRCh38, primary">
##INFO=<ID=DP,Number=1,Type=Integer,Description="Depth">
#CHROM	POS	ID	REF	ALT	QUAL	FILTER	INFO
"#;

    #[test]
    fn test_parse_vcf_header() {
        let dict = parse_vcf_header_text(VCF, "calls.vcf", MAX_CONTIGS).unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.contigs[0].name, "chr1");
        assert_eq!(dict.contigs[0].length, 248_956_422);
        assert!(dict.contigs[0].md5.is_none());
        assert_eq!(
            dict.contigs[1].md5.as_deref(),
            Some("f98db672eb0993dcfdabafe2a882905c")
        );
        assert_eq!(dict.contigs[2].assembly.as_deref(), Some("GRCh38, primary"));
    }

    #[test]
    fn test_missing_length_is_an_error() {
        let text = "##fileformat=VCFv4.2\n##contig=<ID=chr1>\n";
        assert!(matches!(
            parse_vcf_header_text(text, "calls.vcf", MAX_CONTIGS),
            Err(CodecError::Decode { .. })
        ));
    }

    #[test]
    fn test_contig_limit() {
        assert!(matches!(
            parse_vcf_header_text(VCF, "calls.vcf", 2),
            Err(CodecError::TooManyContigs { limit: 2, .. })
        ));
    }

    #[test]
    fn test_split_contig_fields() {
        let fields = split_contig_fields(r#"ID=chr1,length=123,desc="foo,bar""#);
        assert_eq!(fields, vec!["ID=chr1", "length=123", r#"desc="foo,bar""#]);
        assert_eq!(split_contig_fields("ID=chrα,desc=日本語"), vec!["ID=chrα", "desc=日本語"]);
        assert_eq!(split_contig_fields(""), vec![""]);
    }

    #[test]
    fn test_header_text_round_trip() {
        let dict = parse_vcf_header_text(VCF, "calls.vcf", MAX_CONTIGS).unwrap();
        let text = format_vcf_header(CodecVersion::new(4, 3, 0), &dict);
        assert!(text.starts_with("##fileformat=VCFv4.3\n"));
        assert!(text.ends_with("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n"));
        let reparsed = parse_vcf_header_text(&text, "calls.vcf", MAX_CONTIGS).unwrap();
        assert_eq!(reparsed.contigs, dict.contigs);
    }
}
