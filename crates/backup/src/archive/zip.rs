use crate::cursor::{EntryCursor, ReadSeek, RecordEntry, check_entry_name};
use crate::error::{ErrorKind, Result};
use crate::records;
use crate::writer::{ArchiveWriter, BookSpool, WriterCapabilities};
use exn::ResultExt;
use shelf_record::models::{ArchiveMetaData, Bundle, Style};
use shelf_record::{FormatVersion, RecordEncoding, RecordType};
use shelf_storage::CoverInfo;
use std::io::{Read, Seek, Write};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Zip entries carry local time without a zone; it is taken to be UTC both
/// ways so that a round trip is lossless (down to the two second resolution
/// of the format).
fn from_zip_time(time: DateTime) -> Option<OffsetDateTime> {
    let month = Month::try_from(time.month()).ok()?;
    let date = Date::from_calendar_date(i32::from(time.year()), month, time.day()).ok()?;
    let time = Time::from_hms(time.hour(), time.minute(), time.second()).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

fn to_zip_time(time: OffsetDateTime) -> Option<DateTime> {
    let time = time.to_offset(UtcOffset::UTC);
    let year = u16::try_from(time.year()).ok()?;
    DateTime::from_date_and_time(year, time.month().into(), time.day(), time.hour(), time.minute(), time.second())
        .ok()
}

pub struct ZipCursor {
    archive: ZipArchive<Box<dyn ReadSeek>>,
    position: usize,
    current: Option<usize>,
}

impl ZipCursor {
    pub fn new(source: Box<dyn ReadSeek>) -> Result<Self> {
        let archive = ZipArchive::new(source).or_raise(|| ErrorKind::invalid_header())?;
        Ok(Self { archive, position: 0, current: None })
    }
}

impl EntryCursor for ZipCursor {
    fn next_entry(&mut self) -> Result<Option<RecordEntry>> {
        while self.position < self.archive.len() {
            let index = self.position;
            self.position += 1;
            let file = self.archive.by_index_raw(index).or_raise(|| ErrorKind::Io)?;
            if file.is_dir() {
                continue;
            }
            check_entry_name(file.name())?;
            let entry = RecordEntry::new(file.name(), file.last_modified().and_then(from_zip_time), Some(file.size()));
            self.current = Some(index);
            return Ok(Some(entry));
        }
        self.current = None;
        Ok(None)
    }

    fn open_entry(&mut self) -> Result<Box<dyn Read + '_>> {
        let index = self.current.ok_or_else(|| exn::Exn::from(ErrorKind::Io))?;
        let file = self.archive.by_index(index).or_raise(|| ErrorKind::Io)?;
        Ok(Box::new(file))
    }

    fn restart(&mut self) -> Result<()> {
        self.position = 0;
        self.current = None;
        Ok(())
    }
}

/// The full archive: every record gets its own entry, covers are stored
/// without compression since images do not shrink.
pub struct ZipArchiveWriter<W: Write + Seek> {
    zip: Option<ZipWriter<W>>,
    version: FormatVersion,
}

impl<W: Write + Seek> ZipArchiveWriter<W> {
    pub fn new(out: W) -> Self {
        Self { zip: Some(ZipWriter::new(out)), version: FormatVersion::CURRENT }
    }

    fn zip(&mut self) -> Result<&mut ZipWriter<W>> {
        self.zip.as_mut().ok_or_else(|| exn::Exn::from(ErrorKind::Io))
    }

    /// Start the entry for a record, named and compressed as it should be.
    fn record(&mut self, kind: RecordType) -> Result<(&mut ZipWriter<W>, RecordEncoding)> {
        let name = self.version.entry_name(kind).ok_or_else(|| exn::Exn::from(ErrorKind::unsupported()))?;
        let encoding = self.version.encoding(kind);
        let zip = self.zip()?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name, options).or_raise(|| ErrorKind::Io)?;
        Ok((zip, encoding))
    }
}

impl<W: Write + Seek> ArchiveWriter for ZipArchiveWriter<W> {
    fn version(&self) -> FormatVersion {
        self.version
    }

    fn capabilities(&self) -> WriterCapabilities {
        WriterCapabilities::ALL
    }

    fn book_encoding(&self) -> RecordEncoding {
        self.version.encoding(RecordType::Books)
    }

    fn write_header(&mut self, meta: &ArchiveMetaData) -> Result<()> {
        let (zip, encoding) = self.record(RecordType::InfoHeader)?;
        records::write_header(zip, encoding, meta)
    }

    fn write_styles(&mut self, styles: &[Style]) -> Result<()> {
        let (zip, encoding) = self.record(RecordType::Styles)?;
        records::write_styles(zip, encoding, styles)
    }

    fn write_preferences(&mut self, preferences: &Bundle) -> Result<()> {
        let (zip, encoding) = self.record(RecordType::Preferences)?;
        records::write_preferences(zip, encoding, preferences)
    }

    fn write_books(&mut self, spool: &mut BookSpool) -> Result<()> {
        let mut books = spool.reader()?;
        let (zip, _) = self.record(RecordType::Books)?;
        std::io::copy(&mut books, zip).or_raise(|| ErrorKind::Io)?;
        Ok(())
    }

    fn write_cover(&mut self, cover: &CoverInfo, body: &mut dyn Read) -> Result<()> {
        let mut options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        if let Some(modified) = to_zip_time(cover.modified) {
            options = options.last_modified_time(modified);
        }
        let zip = self.zip()?;
        zip.start_file(cover.name.to_string_lossy().into_owned(), options).or_raise(|| ErrorKind::Io)?;
        std::io::copy(body, zip).or_raise(|| ErrorKind::Io)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(zip) = self.zip.take() {
            zip.finish().or_raise(|| ErrorKind::Io)?.flush().or_raise(|| ErrorKind::Io)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use time::macros::datetime;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            let time = to_zip_time(datetime!(2024-03-01 10:20:30 UTC)).unwrap();
            zip.start_file(*name, SimpleFileOptions::default().last_modified_time(time)).unwrap();
            zip.write_all(body).unwrap();
        }
        zip.add_directory("covers/", SimpleFileOptions::default()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_cursor_walks_and_restarts() {
        let data = archive(&[("info.xml", b"<info/>"), ("books.csv", b"title\nDune\n")]);
        let mut cursor = ZipCursor::new(Box::new(Cursor::new(data))).unwrap();

        let info = cursor.next_entry().unwrap().unwrap();
        assert_eq!(info.record_type, RecordType::InfoHeader);
        assert_eq!(info.modified, Some(datetime!(2024-03-01 10:20:30 UTC)));
        let books = cursor.next_entry().unwrap().unwrap();
        assert_eq!(books.size, Some(11));
        let mut body = String::new();
        cursor.open_entry().unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "title\nDune\n");
        // The directory entry is not reported.
        assert!(cursor.next_entry().unwrap().is_none());

        cursor.restart().unwrap();
        assert_eq!(cursor.next_entry().unwrap().unwrap().name, "info.xml");
    }

    #[test]
    fn test_unsafe_entry_rejected() {
        let data = archive(&[("../escape.jpg", b"x")]);
        let mut cursor = ZipCursor::new(Box::new(Cursor::new(data))).unwrap();
        let err = cursor.next_entry().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Security(_)));
    }

    #[test]
    fn test_not_a_zip() {
        let err = ZipCursor::new(Box::new(Cursor::new(b"PK\x03\x04 but not really".to_vec()))).err().unwrap();
        assert!(matches!(&*err, ErrorKind::InvalidArchive(_)));
    }

    #[test]
    fn test_zip_time_round_trip() {
        let time = datetime!(2023-12-31 23:59:58 UTC);
        assert_eq!(from_zip_time(to_zip_time(time).unwrap()), Some(time));
    }
}
