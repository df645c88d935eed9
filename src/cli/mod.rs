//! Command-line interface for hts-codecs.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **detect**: Resolve the codec for a file, URI, bundle document or stdin
//! - **bundle**: Print the interchange JSON for a file and its companion index
//!
//! ## Usage
//!
//! ```text
//! # Which codec reads this file?
//! hts-codecs detect sample.bam
//!
//! # Pipe from another tool; the role says which family to probe
//! cat sample.cram | hts-codecs detect - --role READS
//!
//! # Insist on a version and list the decoded contigs as JSON
//! hts-codecs detect calls.vcf.gz --codec-version 4.2.0 --contigs --format json
//!
//! # Bundle a BAM with whatever index sits next to it
//! hts-codecs bundle sample.bam --discover-index
//! ```

use clap::{Parser, Subcommand};

pub mod bundle;
pub mod detect;

#[derive(Parser)]
#[command(name = "hts-codecs")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Detect codecs and build resource bundles for BAM/CRAM/SAM, FASTA and VCF/BCF")]
#[command(
    long_about = "hts-codecs works out which versioned codec can read a genomics file by probing its first bytes, without consuming the input.\n\nIt also describes related files (a BAM and its index, a VCF and its tabix index) as a bundle that can be written to and read from JSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the codec that can decode an input
    Detect(detect::DetectArgs),

    /// Print the bundle document for a file
    Bundle(bundle::BundleArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
