//! Logical record taxonomy.
//!
//! Entries inside a container are identified purely by name: a fixed lowercase
//! prefix gives the [`RecordType`], the suffix gives the [`RecordEncoding`].
//! Which combinations are legal depends on the [`FormatVersion`] the archive
//! was written with.

use crate::consts::IMAGE_SUFFIXES;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The logical unit of catalog data held by a container entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    /// The archive header.
    InfoHeader,
    /// Book-list display styles.
    Styles,
    /// Application preferences.
    Preferences,
    /// The books themselves.
    Books,
    /// A single cover image. May repeat.
    Cover,
    /// Anything else.
    Unknown,
}

impl RecordType {
    const PREFIXED: [RecordType; 4] =
        [RecordType::InfoHeader, RecordType::Styles, RecordType::Preferences, RecordType::Books];

    /// Identify the record type from an entry name.
    ///
    /// Image files are covers; otherwise the longest known prefix of the
    /// (lowercased) base name wins.
    #[must_use]
    pub fn from_name(name: impl AsRef<str>) -> Self {
        let name = base_name(name.as_ref()).to_lowercase();
        if has_image_suffix(&name) {
            return RecordType::Cover;
        }
        Self::PREFIXED
            .into_iter()
            .filter_map(|kind| kind.prefix().map(|prefix| (prefix, kind)))
            .filter(|(prefix, _)| name.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, kind)| kind)
            .unwrap_or(RecordType::Unknown)
    }

    /// The fixed entry name prefix, if the record type has one.
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            RecordType::InfoHeader => Some("info"),
            RecordType::Styles => Some("styles"),
            RecordType::Preferences => Some("preferences"),
            RecordType::Books => Some("books"),
            RecordType::Cover | RecordType::Unknown => None,
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RecordType::Cover => write!(f, "cover"),
            RecordType::Unknown => write!(f, "unknown"),
            other => write!(f, "{}", other.prefix().unwrap_or_default()),
        }
    }
}

/// How a record's body is serialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordEncoding {
    Xml,
    Csv,
    Json,
    /// Raw image bytes.
    Cover,
    Unknown,
}

impl RecordEncoding {
    /// Derive the encoding from an entry name's suffix (case-insensitive).
    #[must_use]
    pub fn from_name(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().to_lowercase();
        if has_image_suffix(&name) {
            return RecordEncoding::Cover;
        }
        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("xml") => RecordEncoding::Xml,
            Some("csv") => RecordEncoding::Csv,
            Some("json") => RecordEncoding::Json,
            _ => RecordEncoding::Unknown,
        }
    }

    /// File extension used for entries in this encoding. Covers keep their
    /// native image extension, so have none here.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            RecordEncoding::Xml => ".xml",
            RecordEncoding::Csv => ".csv",
            RecordEncoding::Json => ".json",
            RecordEncoding::Cover | RecordEncoding::Unknown => "",
        }
    }
}

/// Archive format version as recorded in the header.
///
/// Monotonically increasing across releases. Writers only ever emit
/// [`FormatVersion::CURRENT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatVersion {
    /// XML header, styles and preferences; CSV books.
    V2,
    /// JSON header, styles and books; XML preferences.
    V3,
}

impl FormatVersion {
    pub const CURRENT: FormatVersion = FormatVersion::V2;

    /// Map the numeric header value, `None` when not recognised.
    #[must_use]
    pub fn from_number(version: i64) -> Option<Self> {
        match version {
            2 => Some(FormatVersion::V2),
            3 => Some(FormatVersion::V3),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn number(&self) -> i64 {
        match self {
            FormatVersion::V2 => 2,
            FormatVersion::V3 => 3,
        }
    }

    /// The encoding a record of the given type uses in this version.
    #[must_use]
    pub fn encoding(&self, kind: RecordType) -> RecordEncoding {
        match (self, kind) {
            (_, RecordType::Cover) => RecordEncoding::Cover,
            (_, RecordType::Unknown) => RecordEncoding::Unknown,
            (_, RecordType::Preferences) => RecordEncoding::Xml,
            (FormatVersion::V2, RecordType::Books) => RecordEncoding::Csv,
            (FormatVersion::V2, _) => RecordEncoding::Xml,
            (FormatVersion::V3, _) => RecordEncoding::Json,
        }
    }

    /// Full entry name for a record of the given type, `None` for covers.
    #[must_use]
    pub fn entry_name(&self, kind: RecordType) -> Option<String> {
        kind.prefix().map(|prefix| format!("{prefix}{}", self.encoding(kind).extension()))
    }
}

impl Display for FormatVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.number())
    }
}

fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

pub(crate) fn has_image_suffix(name: &str) -> bool {
    let name = name.to_lowercase();
    IMAGE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}
