use std::path::PathBuf;
use time::OffsetDateTime;

/// Cover file metadata returned by a [`CoverStore`](crate::CoverStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverInfo {
    /// Path relative to the cover directory
    pub name: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl CoverInfo {
    pub fn new(name: impl Into<PathBuf>, size: u64, modified: impl Into<OffsetDateTime>) -> Self {
        Self { name: name.into(), size, modified: modified.into() }
    }

    /// Modified time in whole milliseconds since the epoch.
    #[must_use]
    pub fn modified_millis(&self) -> i64 {
        i64::try_from(self.modified.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_modified_millis() {
        let info = CoverInfo::new("a.jpg", 1, datetime!(1970-01-01 00:00:01.5 UTC));
        assert_eq!(info.modified_millis(), 1500);
    }
}
