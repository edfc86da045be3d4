use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong with a cover file, by what the caller can do about it.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No cover by that name; for imports this just means the cover is new.
    #[display("cover not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("cover I/O error: {_0}")]
    Io(IoError),
    /// The name is absolute, climbs out of the cover directory, or is empty.
    #[display("invalid cover name: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// A listed file turned out not to live under the store's root.
    #[display("outside cover directory: {}", _0.display())]
    OutsideRoot(#[error(not(source))] PathBuf),
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
