//! Codec registry and resolution.
//!
//! A [`CodecRegistry`] has two phases. While open, codecs are added with
//! [`CodecRegistry::register`]. The registry seals itself on the first lookup (or
//! on an explicit [`CodecRegistry::seal`]); from then on it is read-only and can be
//! shared across threads without locking, and registration fails with
//! [`RegistryError::Sealed`].
//!
//! ## Resolution
//!
//! [`CodecRegistry::resolve`] picks the codec for one resource of a bundle:
//!
//! 1. Candidates are the codecs of the requested format, or of every format in the
//!    role's family, ordered by family format order and then by version, highest
//!    first.
//! 2. If some candidates claim the resource's extension, only those are probed:
//!    a `.bam` holding CRAM bytes matches nothing. Streams, and paths whose
//!    extension no candidate claims, are probed against every candidate.
//! 3. The first candidate whose signature test accepts the probed prefix wins. An
//!    explicit version restricts the candidates to that version; if it rejects the
//!    input the result is [`ResolveError::VersionMismatch`], never another version.
//! 4. A codec that allows it may be selected on its extension alone when probing
//!    was inconclusive (empty input or zero signature size).
//!
//! Probing never consumes the input: stream-backed resources get a replaying
//! reader back in their slot.

pub mod resolver;
pub mod store;

pub use resolver::ResolveError;
pub use store::{CodecRegistry, RegistryError};
