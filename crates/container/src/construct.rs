use crate::error::{Error, ErrorKind, Result};
use crate::{ArchiveContainer, PeekableReader};
use exn::ResultExt;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::instrument;

/// Maximum number of bytes inspected when sniffing a byte source.
pub const SNIFF_LIMIT: usize = 0x200;

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const TAR_MAGIC: &[u8; 5] = b"ustar";
const TAR_MAGIC_OFFSET: usize = 0x101;
// A tar header is only trusted once enough of it has been read.
const TAR_MIN_LENGTH: usize = 0x110;
const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";
const XML_MAGIC: &[u8; 6] = b"<?xml ";
// Only our own books export starts like this; arbitrary CSV is not detected.
const CSV_MAGIC: &[u8; 6] = b"\"_id\",";
// No whitespace tolerance at all.
const JSON_MAGIC: &[u8; 2] = b"{\"";

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^.*\.(csv|json|xml)(?: \(\d+\))?$").unwrap());

impl FromStr for ArchiveContainer {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zip" => Ok(ArchiveContainer::Zip),
            "tar" => Ok(ArchiveContainer::Tar),
            "csv" => Ok(ArchiveContainer::Csv),
            "json" => Ok(ArchiveContainer::Json),
            "xml" => Ok(ArchiveContainer::Xml),
            "db" | "sqlite" | "sqlitedb" => Ok(ArchiveContainer::SqliteDb),
            "remote" | "remoteserver" => Ok(ArchiveContainer::RemoteServer),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}
impl From<&[u8]> for ArchiveContainer {
    fn from(value: &[u8]) -> Self {
        ArchiveContainer::from_magic_bytes(value)
    }
}
impl ArchiveContainer {
    /// Detect the container from its magic bytes.
    ///
    /// Rules are checked in a fixed order and the first match wins. Returns
    /// [`Unknown`](Self::Unknown) when nothing matched, including when the
    /// input is too short for a signature's offset and length.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&ZIP_MAGIC) {
            return ArchiveContainer::Zip;
        }
        if bytes.len() >= TAR_MIN_LENGTH && &bytes[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()] == TAR_MAGIC {
            return ArchiveContainer::Tar;
        }
        if bytes.starts_with(SQLITE_MAGIC) {
            return ArchiveContainer::SqliteDb;
        }
        if bytes.starts_with(XML_MAGIC) {
            return ArchiveContainer::Xml;
        }
        if bytes.starts_with(CSV_MAGIC) {
            return ArchiveContainer::Csv;
        }
        if bytes.starts_with(JSON_MAGIC) {
            return ArchiveContainer::Json;
        }
        ArchiveContainer::Unknown
    }

    /// Detect the container from a display name.
    ///
    /// Only the flat document kinds (csv, json, xml) are recognised, and a
    /// trailing `" (n)"` added by the OS to disambiguate copies is tolerated.
    #[must_use]
    pub fn from_name(name: impl AsRef<str>) -> Self {
        NAME_REGEX
            .captures(name.as_ref())
            .and_then(|captures| captures.get(1))
            .map(|ext| match ext.as_str().to_lowercase().as_str() {
                "csv" => ArchiveContainer::Csv,
                "json" => ArchiveContainer::Json,
                "xml" => ArchiveContainer::Xml,
                _ => ArchiveContainer::Unknown,
            })
            .unwrap_or(ArchiveContainer::Unknown)
    }

    /// Detect the container of a stream, reading at most [`SNIFF_LIMIT`] bytes.
    ///
    /// Read failures are not fatal here: detection falls through to the name.
    #[instrument(skip(reader))]
    pub fn detect(reader: impl Read, name: Option<&str>) -> Self {
        let mut peekable = PeekableReader::new(reader);
        let detected = match peekable.peek(SNIFF_LIMIT) {
            Ok(head) => ArchiveContainer::from_magic_bytes(head),
            Err(e) => {
                tracing::debug!(error = ?e, "could not sniff container, using name");
                ArchiveContainer::Unknown
            },
        };
        match detected {
            ArchiveContainer::Unknown => name.map(ArchiveContainer::from_name).unwrap_or_default(),
            kind => kind,
        }
    }

    /// Detect the container of a file on disk.
    ///
    /// A file that cannot be opened at all is an error; the file name is used
    /// as the display name for the fallback.
    pub fn detect_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).or_raise(|| ErrorKind::Unavailable(path.to_path_buf()))?;
        let name = path.file_name().and_then(|n| n.to_str());
        Ok(ArchiveContainer::detect(file, name))
    }
}

#[cfg(test)]
mod tests {
    use crate::ArchiveContainer;
    use crate::error::ErrorKind;
    use rstest::rstest;
    use std::io::{Cursor, Write};

    fn tar_header() -> Vec<u8> {
        let mut bytes = vec![0u8; 0x200];
        bytes[0x101..0x106].copy_from_slice(b"ustar");
        bytes
    }

    #[rstest]
    #[case("zip", ArchiveContainer::Zip)]
    #[case("TAR", ArchiveContainer::Tar)]
    #[case("csv", ArchiveContainer::Csv)]
    #[case("json", ArchiveContainer::Json)]
    #[case("xml", ArchiveContainer::Xml)]
    #[case("db", ArchiveContainer::SqliteDb)]
    #[case("sqlite", ArchiveContainer::SqliteDb)]
    fn test_from_str(#[case] test: &str, #[case] expected: ArchiveContainer) {
        assert_eq!(test.parse::<ArchiveContainer>().unwrap(), expected);
    }

    #[rstest]
    #[case("rar")]
    #[case(" ")]
    fn test_from_str_invalid(#[case] test: &str) {
        assert!(test.parse::<ArchiveContainer>().is_err());
    }

    #[rstest]
    #[case(b"PK\x03\x04\x14\x00", ArchiveContainer::Zip)]
    #[case(b"SQLite format 3\0\x10\x00", ArchiveContainer::SqliteDb)]
    #[case(b"<?xml version=\"1.0\"?>", ArchiveContainer::Xml)]
    #[case(b"\"_id\",\"book_uuid\"", ArchiveContainer::Csv)]
    #[case(b"{\"info\":{}}", ArchiveContainer::Json)]
    #[case(b"{ \"info\":{}}", ArchiveContainer::Unknown)]
    #[case(b"\n{\"info\":{}}", ArchiveContainer::Unknown)]
    #[case(b"_id,title", ArchiveContainer::Unknown)]
    #[case(b"PK\x03\x04", ArchiveContainer::Zip)]
    #[case(b"PK\x03", ArchiveContainer::Unknown)]
    #[case(b"", ArchiveContainer::Unknown)]
    fn test_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: ArchiveContainer) {
        assert_eq!(ArchiveContainer::from_magic_bytes(bytes), expected);
        assert_eq!(<&[u8] as Into<ArchiveContainer>>::into(bytes), expected);
    }

    #[test]
    fn test_tar_requires_full_header() {
        let header = tar_header();
        assert_eq!(ArchiveContainer::from_magic_bytes(&header), ArchiveContainer::Tar);
        assert_eq!(ArchiveContainer::from_magic_bytes(&header[..0x110]), ArchiveContainer::Tar);
        assert_eq!(ArchiveContainer::from_magic_bytes(&header[..0x10F]), ArchiveContainer::Unknown);
    }

    #[test]
    fn test_magic_ignores_trailing_length() {
        let mut bytes = b"PK\x03\x04".to_vec();
        bytes.extend(std::iter::repeat_n(0xAB, 10_000));
        assert_eq!(ArchiveContainer::from_magic_bytes(&bytes), ArchiveContainer::Zip);
    }

    #[rstest]
    #[case("books.csv", ArchiveContainer::Csv)]
    #[case("books.CSV", ArchiveContainer::Csv)]
    #[case("books.csv (1)", ArchiveContainer::Csv)]
    #[case("export.json (12)", ArchiveContainer::Json)]
    #[case("export.Xml", ArchiveContainer::Xml)]
    #[case("books.csv(1)", ArchiveContainer::Unknown)]
    #[case("books.csv.bak", ArchiveContainer::Unknown)]
    #[case("backup.zip", ArchiveContainer::Unknown)]
    #[case("", ArchiveContainer::Unknown)]
    fn test_from_name(#[case] name: &str, #[case] expected: ArchiveContainer) {
        assert_eq!(ArchiveContainer::from_name(name), expected);
    }

    #[rstest]
    #[case(b"title,author\nfoo,bar", Some("books.csv (1)"), ArchiveContainer::Csv)]
    #[case(b"garbage", Some("data.json"), ArchiveContainer::Json)]
    #[case(b"garbage", None, ArchiveContainer::Unknown)]
    // Bytes win over the name.
    #[case(b"PK\x03\x04\x14\x00", Some("books.csv"), ArchiveContainer::Zip)]
    fn test_detect(#[case] bytes: &[u8], #[case] name: Option<&str>, #[case] expected: ArchiveContainer) {
        assert_eq!(ArchiveContainer::detect(Cursor::new(bytes), name), expected);
    }

    #[test]
    fn test_detect_reads_bounded_prefix() {
        struct Counting<'a>(Cursor<&'a [u8]>, usize);
        impl std::io::Read for Counting<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let n = self.0.read(buf)?;
                self.1 += n;
                Ok(n)
            }
        }
        let data = vec![b'x'; 64 * 1024];
        let mut reader = Counting(Cursor::new(&data), 0);
        ArchiveContainer::detect(&mut reader, None);
        assert!(reader.1 <= super::SNIFF_LIMIT);
    }

    #[test]
    fn test_detect_unreadable_falls_back_to_name() {
        struct Broken;
        impl std::io::Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("device gone"))
            }
        }
        assert_eq!(ArchiveContainer::detect(Broken, Some("backup.xml")), ArchiveContainer::Xml);
    }

    #[test]
    fn test_detect_path() {
        let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        file.write_all(&tar_header()).unwrap();
        assert_eq!(ArchiveContainer::detect_path(file.path()).unwrap(), ArchiveContainer::Tar);
    }

    #[test]
    fn test_detect_path_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArchiveContainer::detect_path(dir.path().join("gone.csv")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable(_)));
    }
}
