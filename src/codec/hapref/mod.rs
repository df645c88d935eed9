//! Haploid reference codecs.

pub mod fasta;

pub use fasta::FastaCodec;
