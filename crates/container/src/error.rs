//! Container Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A container error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The byte source itself could not be opened. Detection never got to
    /// look at any content.
    #[display("content unavailable: {}", _0.display())]
    Unavailable(#[error(not(source))] PathBuf),
    /// The requested container name is not known.
    #[display("unsupported container: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// Reading the byte source failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}
