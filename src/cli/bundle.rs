use anyhow::anyhow;
use clap::Args;

use crate::cli::OutputFormat;
use crate::core::bundle::Bundle;
use crate::core::index::IndexNamingRule;
use crate::core::inference::infer_resource;
use crate::core::path::IoPath;
use crate::core::resource::Resource;
use crate::core::types::ContentType;

#[derive(Args)]
pub struct BundleArgs {
    /// Primary resource path or URI
    #[arg(required = true)]
    pub input: String,

    /// Role of the primary resource (inferred from the extension by default)
    #[arg(long)]
    pub role: Option<String>,

    /// Companion index path
    #[arg(long, conflicts_with = "discover_index")]
    pub index: Option<String>,

    /// Look for a companion index next to the input (e.g. sample.bam.bai)
    #[arg(long)]
    pub discover_index: bool,
}

/// Execute bundle subcommand
///
/// # Errors
///
/// Returns an error if no role can be determined for the input or the bundle
/// cannot be serialized.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: BundleArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let path = IoPath::new(&args.input);
    let inferred = infer_resource(args.role.as_deref().map(ContentType::from), path.clone())?;
    let role = inferred.resource.role().clone();

    let index = match (&args.index, args.discover_index) {
        (Some(index), _) => Some(IoPath::new(index)),
        (None, true) => {
            let family = role
                .family()
                .ok_or_else(|| anyhow!("Role {role} has no index naming convention"))?;
            IndexNamingRule::for_family(family).find_index(&path)
        }
        (None, false) => None,
    };

    let bundle = match index {
        Some(index) => {
            let family = role
                .family()
                .ok_or_else(|| anyhow!("Role {role} has no index role"))?;
            if verbose {
                eprintln!("Using index {index}");
            }
            let index = Resource::from_path(family.index_role(), index);
            Bundle::build([inferred.resource, index], role)?
        }
        None => {
            if verbose && args.discover_index {
                eprintln!("No companion index found for {path}");
            }
            Bundle::build([inferred.resource], role)?
        }
    };

    match format {
        OutputFormat::Text | OutputFormat::Json => println!("{}", bundle.to_json()?),
        OutputFormat::Tsv => {
            println!("role\tsubtype\tpath");
            for resource in bundle.resources() {
                println!(
                    "{}\t{}\t{}",
                    resource.role(),
                    resource.subtype().map_or("-", |s| s.as_str()),
                    resource.display_name()
                );
            }
        }
    }

    Ok(())
}
