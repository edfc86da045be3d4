//! In-memory cover store for testing.

use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::{CoverInfo, CoverStore};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use time::OffsetDateTime;

type Files = HashMap<PathBuf, (OffsetDateTime, Vec<u8>)>;

/// In-memory cover store for testing.
///
/// Covers are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation.
///
/// # Examples
///
/// ```
/// use shelf_storage::CoverStore;
/// use shelf_storage::backend::MockCoverStore;
/// use std::path::Path;
///
/// let store = MockCoverStore::with_files([("abc.jpg", b"jpeg bytes")]);
/// assert!(store.exists(Path::new("abc.jpg")).unwrap());
/// ```
pub struct MockCoverStore {
    name: String,
    storage: RwLock<Files>,
}

impl MockCoverStore {
    /// Create a mock store pre-populated with covers, all modified "now".
    ///
    /// Panics if any path fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = OffsetDateTime::now_utc();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockCoverStore::with_files: invalid path {}", path.display());
            };
            map.insert(validated, (now, data.into()));
        }
        Self { name: "mock".to_string(), storage: RwLock::new(map) }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the modified time of an existing cover.
    ///
    /// Panics if the cover does not exist.
    pub fn set_modified(&self, name: impl AsRef<Path>, modified: OffsetDateTime) {
        let mut guard = self.write();
        let Some(entry) = guard.get_mut(name.as_ref()) else {
            panic!("MockCoverStore::set_modified: no cover {}", name.as_ref().display());
        };
        entry.0 = modified;
    }

    /// Contents of a cover, if it exists.
    pub fn contents(&self, name: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.read().get(name.as_ref()).map(|(_, data)| data.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, Files> {
        self.storage.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Files> {
        self.storage.write().unwrap_or_else(PoisonError::into_inner)
    }
}
impl Default for MockCoverStore {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

impl CoverStore for MockCoverStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self) -> Result<Vec<CoverInfo>> {
        let guard = self.read();
        Ok(guard.iter().map(|(path, (modified, data))| CoverInfo::new(path, data.len() as u64, *modified)).collect())
    }

    fn exists(&self, name: &Path) -> Result<bool> {
        let name = validate_path(name)?;
        Ok(self.read().contains_key(&name))
    }

    fn stat(&self, name: &Path) -> Result<CoverInfo> {
        let name = validate_path(name)?;
        let guard = self.read();
        let (modified, data) = guard.get(&name).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(name.clone())))?;
        Ok(CoverInfo::new(&name, data.len() as u64, *modified))
    }

    fn reader(&self, name: &Path) -> Result<Box<dyn Read + Send + 'static>> {
        let name = validate_path(name)?;
        let data = self.contents(&name).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(name)))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn write_from(&self, name: &Path, source: &mut dyn Read, modified: Option<OffsetDateTime>) -> Result<u64> {
        let name = validate_path(name)?;
        let mut data = Vec::new();
        source.read_to_end(&mut data).map_err(ErrorKind::Io)?;
        let written = data.len() as u64;
        self.write().insert(name, (modified.unwrap_or_else(OffsetDateTime::now_utc), data));
        Ok(written)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = validate_path(from)?;
        let to = validate_path(to)?;
        let mut guard = self.write();
        let entry = guard.remove(&from).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(from)))?;
        guard.insert(to, entry);
        Ok(())
    }

    fn delete(&self, name: &Path) -> Result<()> {
        let name = validate_path(name)?;
        self.write().remove(&name).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_write_and_read() {
        let store = MockCoverStore::default();
        store.write_from(Path::new("a.jpg"), &mut Cursor::new(b"hello"), None).unwrap();
        let mut data = Vec::new();
        store.reader(Path::new("a.jpg")).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"hello");
    }

    #[test]
    fn test_write_keeps_given_modified_time() {
        let store = MockCoverStore::default();
        let stamp = datetime!(2020-02-02 02:02:02 UTC);
        store.write_from(Path::new("a.jpg"), &mut Cursor::new(b"x"), Some(stamp)).unwrap();
        assert_eq!(store.stat(Path::new("a.jpg")).unwrap().modified, stamp);
    }

    #[test]
    fn test_set_modified() {
        let store = MockCoverStore::with_files([("a.jpg", Vec::from(*b"x"))]);
        let stamp = datetime!(2000-01-01 00:00:00 UTC);
        store.set_modified("a.jpg", stamp);
        assert_eq!(store.list().unwrap()[0].modified, stamp);
    }

    #[test]
    fn test_rename_and_delete() {
        let store = MockCoverStore::with_files([("a.tmp", Vec::from(*b"x"))]);
        store.rename(Path::new("a.tmp"), Path::new("a.jpg")).unwrap();
        assert_eq!(store.contents("a.jpg").unwrap(), b"x");
        store.delete(Path::new("a.jpg")).unwrap();
        let err = store.delete(Path::new("a.jpg")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockCoverStore::with_files([("../escape", Vec::from(*b"bad"))]);
    }
}
