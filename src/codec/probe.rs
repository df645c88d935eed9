//! Non-destructive signature probing.
//!
//! [`SignatureProbingReader`] buffers the first bytes of a source once so that any
//! number of codecs can inspect them as if each were reading from byte 0. When
//! probing is done, [`SignatureProbingReader::release_for_decoding`] hands back a
//! reader that replays the buffered prefix and then continues with the rest of the
//! source.

use std::io::{self, Chain, Cursor, Read};

use crate::codec::CodecError;

/// Largest BGZF block, and so the most a BGZF-wrapped signature can need
pub const BGZF_MAX_BLOCK_SIZE: usize = 65536;

/// A reader positioned at the true start of the input: the probed prefix followed
/// by the unread remainder of the source
pub type ReplayReader<R> = Chain<Cursor<Vec<u8>>, R>;

pub struct SignatureProbingReader<R> {
    prefix: Vec<u8>,
    requested: usize,
    inner: R,
}

impl<R: Read> SignatureProbingReader<R> {
    /// Buffer up to `max_signature_size` bytes from `inner`.
    ///
    /// Short reads from the source are retried until the prefix is full or the
    /// source reports end of input.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error unchanged if the source fails.
    pub fn new(mut inner: R, max_signature_size: usize) -> io::Result<Self> {
        let mut prefix = Vec::with_capacity(max_signature_size.min(BGZF_MAX_BLOCK_SIZE));
        (&mut inner)
            .take(max_signature_size as u64)
            .read_to_end(&mut prefix)?;
        Ok(Self {
            prefix,
            requested: max_signature_size,
            inner,
        })
    }

    /// Up to `n` bytes from the start of the input. Fewer bytes means the input
    /// ended first.
    #[must_use]
    pub fn probe(&self, n: usize) -> &[u8] {
        &self.prefix[..n.min(self.prefix.len())]
    }

    /// The bytes a codec with signature size `n` gets to see.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::TruncatedInput` if `n` is at least one and the input is
    /// empty. A short but non-empty prefix is returned as is.
    pub fn signature(&self, n: usize, source_name: &str) -> Result<&[u8], CodecError> {
        if n > 0 && self.prefix.is_empty() {
            return Err(CodecError::TruncatedInput {
                source_name: source_name.to_string(),
                needed: n,
                available: 0,
            });
        }
        Ok(self.probe(n))
    }

    /// Number of bytes buffered
    #[must_use]
    pub fn prefix_len(&self) -> usize {
        self.prefix.len()
    }

    /// True if the input ended before the requested prefix was filled
    #[must_use]
    pub fn reached_end(&self) -> bool {
        self.prefix.len() < self.requested
    }

    /// Give up probing and return a reader positioned at the start of the input
    pub fn release_for_decoding(self) -> ReplayReader<R> {
        Cursor::new(self.prefix).chain(self.inner)
    }
}
