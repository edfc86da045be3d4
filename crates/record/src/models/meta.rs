use crate::error::{ErrorKind, Result};
use crate::models::{Bundle, Value};
use crate::record::FormatVersion;
use exn::ResultExt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const ARCHIVE_VERSION: &str = "archive_version";
pub const CREATE_DATE: &str = "create_date";
pub const APP_PACKAGE: &str = "app_package";
pub const APP_VERSION_NAME: &str = "app_version_name";
pub const APP_VERSION_CODE: &str = "app_version_code";
pub const DATABASE_VERSION: &str = "database_version";
pub const PLATFORM: &str = "platform";
pub const BOOK_COUNT: &str = "book_count";
pub const COVER_COUNT: &str = "cover_count";
pub const HAS_STYLES: &str = "has_styles";
pub const HAS_PREFERENCES: &str = "has_preferences";

/// Identity of the application writing an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceApp {
    pub package: String,
    pub version_name: String,
    pub version_code: i64,
    pub database_version: i64,
    pub platform: String,
}

impl Default for SourceApp {
    fn default() -> Self {
        Self {
            package: env!("CARGO_PKG_NAME").to_string(),
            version_name: env!("CARGO_PKG_VERSION").to_string(),
            version_code: 0,
            database_version: 0,
            platform: std::env::consts::OS.to_string(),
        }
    }
}

/// The archive header.
///
/// A flat key-value bundle rather than a fixed struct: archives from other
/// releases may carry keys this one does not know about, and those survive a
/// read. The version key is the only mandatory one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveMetaData {
    values: Bundle,
}

impl ArchiveMetaData {
    /// Build the header for a new archive.
    pub fn create(
        version: FormatVersion,
        app: &SourceApp,
        book_count: Option<u64>,
        cover_count: Option<u64>,
    ) -> Result<Self> {
        let created = OffsetDateTime::now_utc().format(&Rfc3339).or_raise(|| ErrorKind::ParseError {
            field: CREATE_DATE,
            value: "now".to_string(),
        })?;
        let mut values = Bundle::new();
        values.insert(ARCHIVE_VERSION.to_string(), Value::Int(version.number()));
        values.insert(CREATE_DATE.to_string(), Value::Text(created));
        values.insert(APP_PACKAGE.to_string(), Value::Text(app.package.clone()));
        values.insert(APP_VERSION_NAME.to_string(), Value::Text(app.version_name.clone()));
        values.insert(APP_VERSION_CODE.to_string(), Value::Int(app.version_code));
        values.insert(DATABASE_VERSION.to_string(), Value::Int(app.database_version));
        values.insert(PLATFORM.to_string(), Value::Text(app.platform.clone()));
        let mut meta = Self { values };
        meta.set_counts(book_count, cover_count);
        Ok(meta)
    }

    pub fn set_counts(&mut self, book_count: Option<u64>, cover_count: Option<u64>) {
        for (key, count) in [(BOOK_COUNT, book_count), (COVER_COUNT, cover_count)] {
            match count.and_then(|c| i64::try_from(c).ok()) {
                Some(count) => self.values.insert(key.to_string(), Value::Int(count)),
                None => self.values.remove(key),
            };
        }
    }

    pub fn set_flag(&mut self, key: &str, flag: bool) {
        self.values.insert(key.to_string(), Value::Bool(flag));
    }

    /// Check the header is usable: the version key must be present and be a
    /// number. Whether that version is supported is the reader's decision.
    pub fn validate(&self) -> Result<i64> {
        match self.values.get(ARCHIVE_VERSION) {
            None => exn::bail!(ErrorKind::MissingField(ARCHIVE_VERSION)),
            Some(value) => value.as_int().ok_or_else(|| {
                exn::Exn::from(ErrorKind::ParseError { field: ARCHIVE_VERSION, value: value.to_string() })
            }),
        }
    }

    #[must_use]
    pub fn version(&self) -> Option<i64> {
        self.values.get(ARCHIVE_VERSION).and_then(Value::as_int)
    }

    /// Creation date; `None` if missing or unparseable.
    #[must_use]
    pub fn created(&self) -> Option<OffsetDateTime> {
        self.values.get(CREATE_DATE).and_then(Value::as_str).and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
    }

    #[must_use]
    pub fn book_count(&self) -> Option<u64> {
        self.count(BOOK_COUNT)
    }

    #[must_use]
    pub fn cover_count(&self) -> Option<u64> {
        self.count(COVER_COUNT)
    }

    #[must_use]
    pub fn app_package(&self) -> Option<&str> {
        self.values.get(APP_PACKAGE).and_then(Value::as_str)
    }

    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.values.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    #[must_use]
    pub fn values(&self) -> &Bundle {
        &self.values
    }

    fn count(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(Value::as_int).and_then(|c| u64::try_from(c).ok())
    }
}

impl From<Bundle> for ArchiveMetaData {
    fn from(values: Bundle) -> Self {
        Self { values }
    }
}

impl From<ArchiveMetaData> for Bundle {
    fn from(meta: ArchiveMetaData) -> Self {
        meta.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_create_has_version_and_counts() {
        let meta = ArchiveMetaData::create(FormatVersion::V2, &SourceApp::default(), Some(3), Some(5)).unwrap();
        assert_eq!(meta.validate().unwrap(), 2);
        assert_eq!(meta.book_count(), Some(3));
        assert_eq!(meta.cover_count(), Some(5));
        assert!(meta.created().is_some());
    }

    #[test]
    fn test_unknown_counts_are_omitted() {
        let meta = ArchiveMetaData::create(FormatVersion::V2, &SourceApp::default(), None, None).unwrap();
        assert!(!meta.values().contains_key(BOOK_COUNT));
        assert_eq!(meta.cover_count(), None);
    }

    #[test]
    fn test_validate_missing_version() {
        let mut bundle = Bundle::new();
        bundle.insert(CREATE_DATE.to_string(), Value::from("2024-01-01T00:00:00Z"));
        let err = ArchiveMetaData::from(bundle).validate().unwrap_err();
        assert_eq!(*err, ErrorKind::MissingField(ARCHIVE_VERSION));
    }

    #[rstest]
    #[case(Value::Int(1), 1)]
    #[case(Value::Int(99), 99)]
    #[case(Value::from("3"), 3)]
    fn test_validate_any_integer_version(#[case] version: Value, #[case] expected: i64) {
        let mut bundle = Bundle::new();
        bundle.insert(ARCHIVE_VERSION.to_string(), version);
        assert_eq!(ArchiveMetaData::from(bundle).validate().unwrap(), expected);
    }

    #[test]
    fn test_validate_non_numeric_version() {
        let mut bundle = Bundle::new();
        bundle.insert(ARCHIVE_VERSION.to_string(), Value::from("two"));
        assert!(ArchiveMetaData::from(bundle).validate().is_err());
    }
}
