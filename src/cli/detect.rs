use std::io;

use anyhow::{bail, Context};
use clap::Args;

use crate::cli::OutputFormat;
use crate::codec::Codec;
use crate::core::bundle::Bundle;
use crate::core::bundle_json::looks_like_bundle;
use crate::core::contig::SequenceDictionary;
use crate::core::inference::infer_resource;
use crate::core::path::IoPath;
use crate::core::resource::Resource;
use crate::core::types::{CodecVersion, ContentType, Format};
use crate::registry::CodecRegistry;

#[derive(Args)]
pub struct DetectArgs {
    /// Input path or URI, a bundle JSON document, or '-' for stdin
    #[arg(required = true)]
    pub input: String,

    /// Role of the resource to detect (READS, VARIANT_CONTEXTS, ...).
    /// Defaults to the extension's role, or the bundle's primary role
    #[arg(long)]
    pub role: Option<String>,

    /// Only consider this format
    #[arg(long, value_enum)]
    pub input_format: Option<Format>,

    /// Require exactly this codec version (e.g. 3.1.0)
    #[arg(long)]
    pub codec_version: Option<CodecVersion>,

    /// Also decode the resource and report its sequence dictionary
    #[arg(long)]
    pub contigs: bool,
}

/// Execute detect subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be read or no codec accepts it.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: DetectArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let (bundle, role) = load_input(&args)?;
    let registry = CodecRegistry::with_builtin_codecs();

    let codec = registry.resolve(&bundle, &role, args.input_format, args.codec_version)?;
    let source = bundle.get_or_fail(&role)?.display_name().to_string();

    let dictionary = if args.contigs {
        if !role.is_primary() {
            bail!("--contigs needs a primary role, not {role}");
        }
        let mut decoder = codec.decoder(&bundle, None)?;
        Some(
            decoder
                .read_dictionary()
                .with_context(|| format!("Failed to decode {source}"))?,
        )
    } else {
        None
    };

    if verbose {
        eprintln!("Resolved {source} ({role}) to {}", codec.display_name());
    }

    match format {
        OutputFormat::Text => print_text(&source, &role, codec, dictionary.as_ref(), verbose),
        OutputFormat::Json => print_json(&source, &role, codec, dictionary.as_ref())?,
        OutputFormat::Tsv => print_tsv(&source, &role, codec, dictionary.as_ref()),
    }

    Ok(())
}

/// Lift the input into a bundle and pick the role to resolve
fn load_input(args: &DetectArgs) -> anyhow::Result<(Bundle, ContentType)> {
    let role = args.role.as_deref().map(ContentType::from);

    if args.input == "-" {
        let role = role.unwrap_or(ContentType::READS);
        let resource = Resource::from_stream(role.clone(), None, io::stdin(), "<stdin>")?;
        return Ok((Bundle::build([resource], role.clone())?, role));
    }

    let path = IoPath::new(&args.input);
    if looks_like_bundle(&path) {
        let local = path
            .to_local_path()
            .with_context(|| format!("Cannot read bundle document {path}"))?;
        let bundle = Bundle::from_json_file(local)?;
        let role = role.unwrap_or_else(|| bundle.primary_role().clone());
        return Ok((bundle, role));
    }

    let resource = infer_resource(role, path)?.resource;
    let role = resource.role().clone();
    Ok((Bundle::build([resource], role.clone())?, role))
}

fn print_text(
    source: &str,
    role: &ContentType,
    codec: &dyn Codec,
    dictionary: Option<&SequenceDictionary>,
    verbose: bool,
) {
    println!("Source:  {source}");
    println!("Role:    {role}");
    println!("Format:  {}", codec.format());
    println!("Version: {}", codec.version());

    if let Some(dictionary) = dictionary {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Percentage 0-100
        let md5_pct = (dictionary.md5_coverage() * 100.0) as u32;
        println!(
            "Contigs: {} ({md5_pct}% have MD5, {} bp total)",
            dictionary.len(),
            dictionary.total_length()
        );
        if verbose {
            for contig in &dictionary.contigs {
                println!(
                    "   {}\t{}\t{}",
                    contig.name,
                    contig.length,
                    contig.md5.as_deref().unwrap_or("-")
                );
            }
        }
    }
}

fn print_json(
    source: &str,
    role: &ContentType,
    codec: &dyn Codec,
    dictionary: Option<&SequenceDictionary>,
) -> anyhow::Result<()> {
    let mut json = serde_json::json!({
        "source": source,
        "role": role,
        "format": codec.format().to_string(),
        "version": codec.version().to_string(),
        "codec": codec.display_name(),
    });
    if let Some(dictionary) = dictionary {
        json["contigs"] = serde_json::to_value(&dictionary.contigs)?;
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_tsv(
    source: &str,
    role: &ContentType,
    codec: &dyn Codec,
    dictionary: Option<&SequenceDictionary>,
) {
    println!("source\trole\tformat\tversion\tcontigs");
    println!(
        "{source}\t{role}\t{}\t{}\t{}",
        codec.format(),
        codec.version(),
        dictionary.map_or_else(|| "-".to_string(), |d| d.len().to_string())
    );
}
