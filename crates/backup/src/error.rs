//! Backup Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A backup error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for backup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message used when a container kind is recognised but cannot be handled in
/// the requested direction.
pub const NO_READER_OR_WRITER: &str = "No reader/writer available";
/// Message used when the archive header is missing or unusable.
pub const INVALID_HEADER: &str = "Invalid archive header";

/// Classifies the origin of a backup failure.
///
/// ### Archive Errors
/// Scoped to the archive as a whole and always fatal to the operation:
/// - [`ErrorKind::InvalidArchive`]
/// - [`ErrorKind::Io`]
/// - [`ErrorKind::Security`]
///
/// ### Record Errors
/// - [`ErrorKind::ImportParsing`]: fatal to one record only; the reader
///   catches it and carries on with the next record.
///
/// ### Dependency Errors
/// - [`ErrorKind::Catalog`]
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Record`]
/// - [`ErrorKind::Container`]
/// - [`ErrorKind::Report`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The container is unrecognised, cannot be handled in this direction,
    /// or has an unusable header.
    #[display("invalid archive: {_0}")]
    InvalidArchive(#[error(not(source))] String),
    /// A record body could not be parsed.
    #[display("could not parse record: {_0}")]
    ImportParsing(#[error(not(source))] String),
    /// Reading or writing the archive stream failed.
    #[display("archive I/O error")]
    Io,
    /// The archive tried something unsafe, such as an entry name that
    /// escapes its root.
    #[display("security error: {_0}")]
    Security(#[error(not(source))] String),
    /// The catalog or settings store rejected an operation.
    Catalog,
    /// The cover store rejected an operation.
    Storage,
    /// A record could not be encoded.
    Record,
    /// The container could not be detected.
    Container,
    /// The summary report could not be rendered.
    Report,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io | ErrorKind::Storage)
    }

    /// Returns `true` if the message can be shown to a user as-is, as
    /// opposed to a raw I/O failure that needs the error tree to make sense.
    pub fn is_user_presentable(&self) -> bool {
        matches!(self, ErrorKind::InvalidArchive(_) | ErrorKind::ImportParsing(_) | ErrorKind::Security(_))
    }

    pub(crate) fn unsupported() -> Self {
        ErrorKind::InvalidArchive(NO_READER_OR_WRITER.to_string())
    }

    pub(crate) fn invalid_header() -> Self {
        ErrorKind::InvalidArchive(INVALID_HEADER.to_string())
    }
}
