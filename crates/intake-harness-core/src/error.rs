//! Typed errors for the extraction core.
//!
//! Every parser in this crate fails with one of these instead of panicking.
//! Callers in the application crate fold them into per-document failure
//! categories; they never abort a whole batch.

use thiserror::Error;

/// A read would run past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("read of {len} bytes at offset {pos} exceeds buffer of {available} bytes")]
pub struct OutOfBounds {
    pub pos: usize,
    pub len: usize,
    pub available: usize,
}

/// The raw DEFLATE stream could not be decoded.
#[derive(Debug, Error)]
pub enum DecompressionError {
    #[error("corrupt DEFLATE stream: {0}")]
    Corrupt(String),

    #[error("DEFLATE stream ended before its final block")]
    Truncated,

    #[error("inflated output exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Errors from the ZIP local-header reader.
#[derive(Debug, Error)]
pub enum ZipError {
    /// The entry uses a compression method other than stored (0) or deflate (8).
    #[error("unsupported ZIP compression method {0}")]
    UnsupportedCompression(u16),

    /// The entry payload extends past the end of the container.
    #[error("ZIP entry payload is truncated: {0}")]
    Truncated(#[from] OutOfBounds),

    /// The deflated payload is corrupt.
    #[error(transparent)]
    Decompression(#[from] DecompressionError),

    /// No local header with this name was reachable.
    #[error("ZIP entry not found: {0}")]
    EntryNotFound(String),
}

/// Errors from document-level extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file extension maps to no extractor.
    #[error("unsupported document type: {0}")]
    UnsupportedType(String),

    /// The container could not be read.
    #[error("container error: {0}")]
    Zip(#[from] ZipError),

    /// Extraction succeeded but produced no usable text.
    #[error("no extractable text")]
    Empty,
}
