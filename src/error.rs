//! Error types of the decoder, the blob providers and the whole read pass.
use std::io;

use thiserror::Error;

/// Failure to decode a single fixed-layout record (or a value inside one).
///
/// Raised deep inside the object traversal and resolved there into a skip or an
/// abort decision; it only escapes a read pass when the snapshot header itself
/// is unreadable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{record} at offset {offset} needs {needed} bytes, only {available} available")]
    Truncated {
        record: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("{record} offset overflows: {base} + {delta}")]
    OffsetOverflow {
        record: &'static str,
        base: usize,
        delta: usize,
    },
    #[error("{record} at offset {offset} does not advance the cursor")]
    NoProgress { record: &'static str, offset: usize },
}

/// Failure of a [`BlobProvider`](crate::provider::BlobProvider).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("buffer limit of {limit} bytes reached")]
    SizeExceeded { limit: usize },
    #[error("{context}: {source}")]
    Os {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("blob unavailable: {0}")]
    Unavailable(String),
}

/// Pass-level failure: nothing was decoded.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("invalid performance data signature {found:?}, expected \"PERF\"")]
    SignatureMismatch { found: String },
    #[error("unreadable performance data header: {0}")]
    Header(#[source] DecodeError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
