//! Record Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A record error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for record operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The record body is too broken to process at all.
    #[display("malformed record: {_0}")]
    MalformedRecord(#[error(not(source))] String),
    /// A required field could not be found.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending value.
        value: String,
    },
    /// A row does not have as many columns as the header.
    #[display("expected {expected} columns, found {found}")]
    ColumnCount {
        /// Number of columns in the header.
        expected: usize,
        /// Number of columns in the row.
        found: usize,
    },
    /// Reading from or writing to the underlying stream failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }

    /// Returns `true` if the error is caused by the content, rather than
    /// by the transport.
    pub fn is_parse_error(&self) -> bool {
        !matches!(self, ErrorKind::Io)
    }
}
