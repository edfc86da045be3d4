//! Local filesystem cover store.

use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::{CoverInfo, CoverStore};
use exn::ResultExt;
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::OffsetDateTime;

/// Stores covers in a directory on the local filesystem.
///
/// # Examples
///
/// ```no_run
/// use shelf_storage::backend::LocalCoverStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalCoverStore::new("covers", "/absolute/path/to/covers")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalCoverStore {
    name: String,
    root: PathBuf,
}
impl LocalCoverStore {
    /// Create a store rooted at an absolute directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute or is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            fs::create_dir_all(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    fn absolute_path(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(name.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn relative_path(&self, absolute: &Path) -> Result<PathBuf> {
        let relative =
            absolute.strip_prefix(&self.root).or_raise(|| ErrorKind::OutsideRoot(absolute.to_path_buf()))?;
        validate_path(relative)
    }

    fn info(name: &Path, metadata: &Metadata) -> Result<CoverInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?;
        Ok(CoverInfo::new(name, metadata.len(), OffsetDateTime::from(modified)))
    }

    fn map_io_error(e: io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    fn ensure_parent(&self, absolute: &Path, name: &Path) -> Result<()> {
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::map_io_error(e, name))?;
        }
        Ok(())
    }
}

impl CoverStore for LocalCoverStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self) -> Result<Vec<CoverInfo>> {
        let mut covers = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(current) = stack.pop() {
            let entries = match fs::read_dir(&current) {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => exn::bail!(Self::map_io_error(err, &current)),
            };
            for entry in entries {
                let path = entry.map_err(|e| Self::map_io_error(e, &current))?.path();
                let metadata = fs::metadata(&path).map_err(|e| Self::map_io_error(e, &path));
                match metadata {
                    Ok(metadata) if metadata.is_dir() => stack.push(path),
                    Ok(metadata) if metadata.is_file() => {
                        covers.push(Self::info(&self.relative_path(&path)?, &metadata)?);
                    },
                    // Most likely a broken symlink.
                    Ok(_) | Err(_) => tracing::debug!(path = %path.display(), "ignoring non-file cover entry"),
                }
            }
        }
        Ok(covers)
    }

    fn exists(&self, name: &Path) -> Result<bool> {
        let absolute = self.absolute_path(name)?;
        Ok(fs::exists(&absolute).map_err(ErrorKind::Io)?)
    }

    fn stat(&self, name: &Path) -> Result<CoverInfo> {
        let absolute = self.absolute_path(name)?;
        let metadata = fs::metadata(&absolute).map_err(|e| Self::map_io_error(e, name))?;
        Self::info(name, &metadata)
    }

    fn reader(&self, name: &Path) -> Result<Box<dyn Read + Send + 'static>> {
        let absolute = self.absolute_path(name)?;
        let file = File::open(&absolute).map_err(|e| Self::map_io_error(e, name))?;
        Ok(Box::new(file))
    }

    fn write_from(&self, name: &Path, source: &mut dyn Read, modified: Option<OffsetDateTime>) -> Result<u64> {
        let absolute = self.absolute_path(name)?;
        self.ensure_parent(&absolute, name)?;
        let mut file = File::create(&absolute).map_err(|e| Self::map_io_error(e, name))?;
        let written = io::copy(source, &mut file).map_err(ErrorKind::Io)?;
        file.flush().map_err(ErrorKind::Io)?;
        if let Some(modified) = modified {
            file.set_modified(SystemTime::from(modified)).map_err(ErrorKind::Io)?;
        }
        Ok(written)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_path = self.absolute_path(from)?;
        let to_path = self.absolute_path(to)?;
        self.ensure_parent(&to_path, to)?;
        Ok(fs::rename(&from_path, &to_path).map_err(|e| Self::map_io_error(e, from))?)
    }

    fn delete(&self, name: &Path) -> Result<()> {
        let absolute = self.absolute_path(name)?;
        Ok(fs::remove_file(&absolute).map_err(|e| Self::map_io_error(e, name))?)
    }
}
