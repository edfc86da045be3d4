//! Cover store trait and implementations.
//!
//! Covers are addressed by a name relative to the store root (in practice a
//! bare file name like `<uuid>.jpg`). All implementations validate names
//! with [`validate_path`](crate::validate_path) before touching anything.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalCoverStore;
#[cfg(feature = "mock")]
pub use self::mock::MockCoverStore;
use crate::error::Result;
use crate::models::CoverInfo;
use std::io::Read;
use std::path::Path;
use time::OffsetDateTime;

type BoxSyncRead = Box<dyn Read + Send + 'static>;

/// Unified interface for cover storage.
///
/// Synchronous on purpose: archive operations run on a single worker thread
/// and never yield between entries.
///
/// # Examples
///
/// ```
/// use shelf_storage::{CoverStore, error::Result};
/// use std::path::Path;
///
/// fn front_cover_size(store: &dyn CoverStore, uuid: &str) -> Result<Option<u64>> {
///     let name = format!("{uuid}.jpg");
///     match store.exists(Path::new(&name))? {
///         true => Ok(Some(store.stat(Path::new(&name))?.size)),
///         false => Ok(None),
///     }
/// }
/// ```
pub trait CoverStore: Send + Sync {
    /// Name of the configured store, for logging only.
    fn name(&self) -> &str;

    /// List every cover file in the store.
    fn list(&self) -> Result<Vec<CoverInfo>>;

    /// Check if a cover exists.
    fn exists(&self, name: &Path) -> Result<bool>;

    /// Get cover metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the cover
    /// does not exist.
    fn stat(&self, name: &Path) -> Result<CoverInfo>;

    /// Open a cover for streaming reads.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the cover
    /// does not exist.
    fn reader(&self, name: &Path) -> Result<BoxSyncRead>;

    /// Copy a byte stream into a cover file, creating or truncating it.
    ///
    /// When `modified` is given the file's modified time is stamped with it
    /// after the copy, so that later comparisons see the time of the source
    /// rather than the time of the copy. Returns the number of bytes written.
    fn write_from(&self, name: &Path, source: &mut dyn Read, modified: Option<OffsetDateTime>) -> Result<u64>;

    /// Rename a cover, replacing the destination if it already exists.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the source
    /// does not exist.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a cover.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the cover
    /// does not exist.
    fn delete(&self, name: &Path) -> Result<()>;
}
