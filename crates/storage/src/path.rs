//! Cover name validation.
//!
//! Cover names come out of archives written elsewhere, so they are treated as
//! untrusted input and must never resolve outside the cover directory.

use crate::error::{ErrorKind, Result};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Normalise a cover name relative to the store root.
///
/// `.` segments and doubled or trailing separators are dropped, and `..`
/// cancels the segment before it. The name is rejected as
/// [`InvalidPath`](ErrorKind::InvalidPath) when it climbs above the root,
/// carries a drive prefix or a NUL byte, or normalises to nothing.
///
/// ```
/// use std::path::Path;
/// use shelf_storage::validate_path;
/// assert_eq!(validate_path("./thumbs//0b6e1c_1.jpg").unwrap(), Path::new("thumbs/0b6e1c_1.jpg"));
/// assert!(validate_path("../0b6e1c.jpg").is_err());
/// ```
pub fn validate(name: impl AsRef<Path>) -> Result<PathBuf> {
    let name = name.as_ref();
    let mut segments: Vec<&OsStr> = Vec::new();
    let contained = name.components().all(|component| match component {
        Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => false,
        Component::Normal(segment) => {
            segments.push(segment);
            true
        },
        Component::CurDir | Component::RootDir => true,
        Component::ParentDir => segments.pop().is_some(),
        Component::Prefix(_) => false,
    });
    if !contained || segments.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(name.to_path_buf()));
    }
    Ok(segments.into_iter().collect())
}
