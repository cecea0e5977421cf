//! Custom error types for the corsika-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum CorsikaError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The leading framing word matches no known sub-block size.
    #[error("cannot determine shower file shape from leading framing word {marker:#018x}")]
    UnknownShape { marker: u64 },

    /// The padding words bracketing a disk sector disagree.
    #[error("sector framing mismatch: leading padding {start} != trailing padding {end}")]
    Framing { start: u32, end: u32 },

    /// A read ended mid-sector or mid-block.
    #[error("truncated file: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// A block's classification contradicts the position recorded in the index,
    /// or a structural scan invariant does not hold.
    #[error("structural error: {0}")]
    Structural(String),

    /// Random access was requested on a source that can neither seek nor reopen.
    #[error("random access requested on a non-seekable source with no reopen path")]
    NotSeekable,

    /// The requested event id is absent from the index.
    #[error("event {0} not found in this file")]
    NotFound(u32),

    /// A numeric field inside a known `.long` section failed to parse.
    #[error("malformed longitudinal file: {0}")]
    MalformedLong(String),

    /// The particle cursor was advanced after its terminal block.
    #[error("particle iterator used after the end of the particle records")]
    IteratorExhausted,
}

/// A convenience `Result` type alias using the crate's `CorsikaError` type.
pub type Result<T> = std::result::Result<T, CorsikaError>;
