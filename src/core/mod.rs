//! Core data types for resources, bundles and formats.
//!
//! - [`types`]: roles ([`ContentType`](types::ContentType)), subtypes, format families,
//!   formats and codec versions
//! - [`path`]: [`IoPath`](path::IoPath), a local path or URI
//! - [`resource`]: a single role-tagged [`Resource`](resource::Resource), path- or stream-backed
//! - [`bundle`]: the immutable [`Bundle`](bundle::Bundle) and its JSON interchange form
//! - [`inference`]: the extension table used for role inference and URI filtering
//! - [`index`]: companion index naming conventions
//! - [`contig`]: the sequence dictionary decoders hand back
//!
//! ## Roles and families
//!
//! | Family | Primary role | Other roles | Subtypes |
//! |--------|--------------|-------------|----------|
//! | reads | `READS` | `READS_INDEX` | BAM, CRAM, SAM |
//! | haploid reference | `HAPLOID_REFERENCE` | `HAPLOID_REFERENCE_INDEX`, `HAPLOID_REFERENCE_DICTIONARY` | FASTA |
//! | variants | `VARIANT_CONTEXTS` | `VARIANTS_INDEX` | VCF, BCF |
//!
//! Roles outside this table are carried through bundles unchanged but belong to no
//! family.

pub mod bundle;
pub mod bundle_json;
pub mod contig;
pub mod index;
pub mod inference;
pub mod path;
pub mod resource;
pub mod types;
