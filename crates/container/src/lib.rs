//! Archive container detection.
//!
//! A container is the physical framing of an archive: how its bytes are split
//! into named entries. This crate classifies an incoming byte source into one
//! of a closed set of [`ArchiveContainer`] kinds, providing:
//!
//! - **Magic byte sniffing** over a bounded prefix
//!   ([`ArchiveContainer::from_magic_bytes`])
//! - **File name fallback** tolerant of OS-appended disambiguation suffixes
//!   such as `" (1)"` ([`ArchiveContainer::from_name`])
//! - **Combined detection** reading at most [`SNIFF_LIMIT`] bytes from a
//!   stream via [`PeekableReader`] ([`ArchiveContainer::detect`])
//!
//! Byte sniffing is primary. Content sources do not reliably expose file
//! extensions, so the name is only consulted when no signature matched.

mod construct;
pub mod error;
mod peekable;
mod util;

pub use crate::construct::SNIFF_LIMIT;
pub use crate::peekable::PeekableReader;

/// A supported archive container kind.
///
/// Defaults to [`Unknown`](Self::Unknown).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ArchiveContainer {
    /// Zip archive (.zip)
    Zip,
    /// Tar archive (.tar)
    Tar,
    /// Books-only comma separated values (.csv)
    Csv,
    /// Single JSON document (.json)
    Json,
    /// Single XML document (.xml)
    Xml,
    /// Raw copy of the catalog database (.db)
    SqliteDb,
    /// Content served by a remote server, no local file.
    RemoteServer,
    /// Not recognised.
    #[default]
    Unknown,
}
