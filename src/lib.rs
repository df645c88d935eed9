//! # hts-codecs
//!
//! Codec discovery and resource bundling for genomics file formats.
//!
//! A genomics dataset is rarely one file: a BAM comes with its `.bai`, a VCF with
//! its `.tbi`, a FASTA with its `.fai`. And one logical kind of data has several
//! competing, versioned encodings (BAM, CRAM 3.0 and 3.1, SAM for aligned reads).
//! `hts-codecs` answers two questions:
//!
//! - **Which codec reads this?** The [`CodecRegistry`] probes the first bytes of a
//!   file or stream against every candidate codec, without consuming the input, and
//!   picks the highest version that accepts it.
//! - **What belongs together?** A [`Bundle`] names each related resource by its role
//!   (`READS`, `READS_INDEX`, ...) and round-trips through a small JSON document.
//!
//! ## Example
//!
//! ```rust,no_run
//! use hts_codecs::{Bundle, CodecRegistry, ContentType};
//!
//! let registry = CodecRegistry::with_builtin_codecs();
//! let bundle = Bundle::for_reads("sample.bam");
//!
//! let codec = registry.resolve(&bundle, &ContentType::READS, None, None).unwrap();
//! println!("{} reads it", codec.display_name());
//!
//! let dictionary = codec.decoder(&bundle, None).unwrap().read_dictionary().unwrap();
//! for contig in &dictionary.contigs {
//!     println!("{}\t{}", contig.name, contig.length);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Roles, formats, versions, resources, bundles and their JSON form
//! - [`codec`]: The codec traits, signature probing and the built-in codecs
//! - [`registry`]: Codec registration and resolution
//! - [`utils`]: Validation helpers and resource limits
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod codec;
pub mod core;
pub mod registry;
pub mod utils;

// Re-export commonly used types for convenience
pub use codec::{Codec, CodecError, Decoder, Encoder};
pub use core::bundle::{Bundle, BundleError};
pub use core::contig::{Contig, SequenceDictionary};
pub use core::path::IoPath;
pub use core::resource::Resource;
pub use core::types::*;
pub use registry::{CodecRegistry, RegistryError, ResolveError};
