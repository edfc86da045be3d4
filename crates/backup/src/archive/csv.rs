use crate::cursor::{EntryCursor, ReadSeek, RecordEntry};
use crate::error::{ErrorKind, Result};
use crate::writer::{ArchiveWriter, BookSpool, WriterCapabilities};
use exn::ResultExt;
use shelf_record::{FormatVersion, RecordEncoding, RecordType};
use std::io::{Read, Seek, SeekFrom, Write};

/// A bare books CSV: one books record and nothing else.
pub struct CsvCursor {
    source: Box<dyn ReadSeek>,
    name: String,
    done: bool,
}

impl CsvCursor {
    pub fn new(source: Box<dyn ReadSeek>) -> Self {
        let name = FormatVersion::V2.entry_name(RecordType::Books).unwrap_or_else(|| "books.csv".to_string());
        Self { source, name, done: false }
    }
}

impl EntryCursor for CsvCursor {
    fn next_entry(&mut self) -> Result<Option<RecordEntry>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        Ok(Some(RecordEntry::new(self.name.as_str(), None, None)))
    }

    fn open_entry(&mut self) -> Result<Box<dyn Read + '_>> {
        self.source.seek(SeekFrom::Start(0)).or_raise(|| ErrorKind::Io)?;
        Ok(Box::new(&mut self.source))
    }

    fn restart(&mut self) -> Result<()> {
        self.done = false;
        Ok(())
    }
}

/// Writes the books record as the whole output.
pub struct CsvArchiveWriter<W: Write> {
    out: Option<W>,
}

impl<W: Write> CsvArchiveWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Some(out) }
    }
}

impl<W: Write> ArchiveWriter for CsvArchiveWriter<W> {
    fn capabilities(&self) -> WriterCapabilities {
        WriterCapabilities::BOOKS_ONLY
    }

    fn book_encoding(&self) -> RecordEncoding {
        RecordEncoding::Csv
    }

    fn write_books(&mut self, spool: &mut BookSpool) -> Result<()> {
        let out = self.out.as_mut().ok_or_else(|| exn::Exn::from(ErrorKind::Io))?;
        std::io::copy(&mut spool.reader()?, out).or_raise(|| ErrorKind::Io)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush().or_raise(|| ErrorKind::Io)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_single_books_entry() {
        let mut cursor = CsvCursor::new(Box::new(Cursor::new(b"\"_id\",\"title\"\n".to_vec())));
        let entry = cursor.next_entry().unwrap().unwrap();
        assert_eq!(entry.record_type, RecordType::Books);
        assert_eq!(entry.encoding, RecordEncoding::Csv);
        assert!(cursor.next_entry().unwrap().is_none());

        cursor.restart().unwrap();
        assert!(cursor.next_entry().unwrap().is_some());
        let mut body = String::new();
        cursor.open_entry().unwrap().read_to_string(&mut body).unwrap();
        assert!(body.starts_with("\"_id\""));
    }
}
