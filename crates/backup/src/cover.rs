use crate::cursor::RecordEntry;
use crate::options::UpdatePolicy;
use crate::results::Action;
use shelf_storage::CoverStore;
use shelf_storage::error::ErrorKind as StorageErrorKind;
use std::io::Read;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Millisecond timestamps are compared with this many low bits dropped, so
/// that the coarse times some containers record still compare as equal.
const TIME_SHIFT: u32 = 16;

/// Writes cover entries into the cover store.
///
/// Never fails: covers are expendable, so anything that goes wrong with one
/// is logged and the cover counted as skipped.
pub(crate) struct CoverMaterializer<'a> {
    store: &'a dyn CoverStore,
    min_size: u64,
    policy: UpdatePolicy,
}

impl<'a> CoverMaterializer<'a> {
    pub(crate) fn new(store: &'a dyn CoverStore, min_size: u64, policy: UpdatePolicy) -> Self {
        Self { store, min_size, policy }
    }

    pub(crate) fn materialize(&self, entry: &RecordEntry, body: &mut dyn Read) -> Action {
        let target = PathBuf::from(entry.file_name());
        let existing = match self.store.stat(&target) {
            Ok(info) => Some(info),
            Err(err) if matches!(&*err, StorageErrorKind::NotFound(_)) => None,
            Err(err) => {
                tracing::warn!(store = self.store.name(), cover = %entry.name, error = ?err, "cannot inspect cover");
                return Action::Skipped;
            },
        };
        if let Some(local) = &existing
            && !self.may_replace(local.modified_millis(), entry.modified)
        {
            return Action::Skipped;
        }

        let staging = PathBuf::from(format!("{}.tmp", entry.file_name()));
        match self.store.write_from(&staging, body, entry.modified) {
            Ok(written) if written < self.min_size => {
                tracing::debug!(cover = %entry.name, written, "cover too small, discarding");
                self.discard(&staging);
                return Action::Skipped;
            },
            Ok(_) => {},
            Err(err) => {
                tracing::warn!(store = self.store.name(), cover = %entry.name, error = ?err, "cannot write cover");
                self.discard(&staging);
                return Action::Skipped;
            },
        }
        if let Err(err) = self.store.rename(&staging, &target) {
            tracing::warn!(store = self.store.name(), cover = %entry.name, error = ?err, "cannot move cover in place");
            self.discard(&staging);
            return Action::Skipped;
        }
        match existing {
            Some(_) => Action::Updated,
            None => Action::Created,
        }
    }

    fn may_replace(&self, local_millis: i64, remote: Option<OffsetDateTime>) -> bool {
        match self.policy {
            UpdatePolicy::Skip => false,
            UpdatePolicy::Overwrite => true,
            UpdatePolicy::OnlyNewer => match remote {
                None => false,
                Some(remote) => {
                    let remote_millis = i64::try_from(remote.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX);
                    local_millis >> TIME_SHIFT <= remote_millis >> TIME_SHIFT
                },
            },
        }
    }

    fn discard(&self, staging: &Path) {
        if let Err(err) = self.store.delete(staging)
            && !matches!(&*err, StorageErrorKind::NotFound(_))
        {
            tracing::debug!(cover = %staging.display(), error = ?err, "cannot remove staging file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shelf_storage::backend::MockCoverStore;
    use time::Duration;
    use time::macros::datetime;

    const LOCAL: OffsetDateTime = datetime!(2024-01-01 12:00 UTC);

    fn entry(name: &str, modified: Option<OffsetDateTime>) -> RecordEntry {
        RecordEntry::new(name, modified, None)
    }

    fn store_with_local() -> MockCoverStore {
        let store = MockCoverStore::with_files([("abc.jpg", b"old cover".to_vec())]);
        store.set_modified("abc.jpg", LOCAL);
        store
    }

    #[test]
    fn test_new_cover_is_created() {
        let store = MockCoverStore::default();
        let covers = CoverMaterializer::new(&store, 4, UpdatePolicy::Skip);
        let action = covers.materialize(&entry("covers/abc.jpg", Some(LOCAL)), &mut &b"new cover"[..]);
        assert_eq!(action, Action::Created);
        assert_eq!(store.contents("abc.jpg").unwrap(), b"new cover");
        assert!(store.contents("abc.jpg.tmp").is_none());
        assert_eq!(store.stat(Path::new("abc.jpg")).unwrap().modified, LOCAL);
    }

    #[test]
    fn test_small_cover_is_discarded() {
        let store = MockCoverStore::default();
        let covers = CoverMaterializer::new(&store, 2048, UpdatePolicy::Overwrite);
        assert_eq!(covers.materialize(&entry("abc.jpg", None), &mut &b"tiny"[..]), Action::Skipped);
        assert!(store.list().unwrap().is_empty());
    }

    #[rstest]
    #[case(UpdatePolicy::Skip, Some(LOCAL + Duration::days(1)), Action::Skipped)]
    #[case(UpdatePolicy::Overwrite, Some(LOCAL - Duration::days(1)), Action::Updated)]
    #[case(UpdatePolicy::OnlyNewer, Some(LOCAL + Duration::days(1)), Action::Updated)]
    #[case(UpdatePolicy::OnlyNewer, Some(LOCAL - Duration::days(1)), Action::Skipped)]
    // Within the comparison granularity counts as the same time.
    #[case(UpdatePolicy::OnlyNewer, Some(LOCAL - Duration::seconds(1)), Action::Updated)]
    #[case(UpdatePolicy::OnlyNewer, None, Action::Skipped)]
    fn test_existing_cover(
        #[case] policy: UpdatePolicy,
        #[case] remote: Option<OffsetDateTime>,
        #[case] expected: Action,
    ) {
        let store = store_with_local();
        let covers = CoverMaterializer::new(&store, 0, policy);
        assert_eq!(covers.materialize(&entry("abc.jpg", remote), &mut &b"new cover"[..]), expected);
        let contents = store.contents("abc.jpg").unwrap();
        match expected {
            Action::Updated => assert_eq!(contents, b"new cover"),
            _ => assert_eq!(contents, b"old cover"),
        }
    }
}
