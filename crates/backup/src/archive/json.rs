use crate::cursor::{EntryCursor, ReadSeek, RecordEntry};
use crate::error::{ErrorKind, Result};
use crate::writer::{ArchiveWriter, BookSpool, WriterCapabilities};
use exn::ResultExt;
use shelf_record::RecordEncoding;
use shelf_record::codec::json::{self, ArchiveDocument, DocumentWriter};
use shelf_record::models::{ArchiveMetaData, Bundle, Style};
use std::io::{BufReader, BufWriter, Read, Write};

/// A single JSON document holding every record as a top-level section.
///
/// The document is parsed whole when the cursor is built and each section
/// is handed out as an entry of its own, named as it would be in a zip.
/// Sections stay untyped here, so a section that does not decode fails as
/// that one record when it is read.
pub struct JsonCursor {
    entries: Vec<(RecordEntry, Vec<u8>)>,
    position: usize,
}

impl JsonCursor {
    pub fn new(source: Box<dyn ReadSeek>) -> Result<Self> {
        let document: ArchiveDocument = json::read(BufReader::new(source)).map_err(|err| {
            let message = (*err).to_string();
            err.raise(ErrorKind::InvalidArchive(message))
        })?;
        let entries = document
            .sections()
            .map(|(key, value)| {
                let mut body = Vec::new();
                json::write(&mut body, value).or_raise(|| ErrorKind::Record)?;
                let name = format!("{key}{}", RecordEncoding::Json.extension());
                Ok((RecordEntry::new(name, None, Some(body.len() as u64)), body))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries, position: 0 })
    }
}

impl EntryCursor for JsonCursor {
    fn next_entry(&mut self) -> Result<Option<RecordEntry>> {
        let entry = self.entries.get(self.position).map(|(entry, _)| entry.clone());
        self.position = (self.position + 1).min(self.entries.len() + 1);
        Ok(entry)
    }

    fn open_entry(&mut self) -> Result<Box<dyn Read + '_>> {
        match self.position.checked_sub(1).and_then(|current| self.entries.get(current)) {
            Some((_, body)) => Ok(Box::new(body.as_slice())),
            None => exn::bail!(ErrorKind::Io),
        }
    }

    fn restart(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }
}

/// Everything but covers, as one JSON document.
pub struct JsonArchiveWriter<W: Write> {
    document: Option<DocumentWriter<BufWriter<W>>>,
}

impl<W: Write> JsonArchiveWriter<W> {
    pub fn new(out: W) -> Self {
        Self { document: Some(DocumentWriter::new(BufWriter::new(out))) }
    }

    fn document(&mut self) -> Result<&mut DocumentWriter<BufWriter<W>>> {
        self.document.as_mut().ok_or_else(|| exn::Exn::from(ErrorKind::Io))
    }
}

impl<W: Write> ArchiveWriter for JsonArchiveWriter<W> {
    fn capabilities(&self) -> WriterCapabilities {
        WriterCapabilities { covers: false, ..WriterCapabilities::ALL }
    }

    fn book_encoding(&self) -> RecordEncoding {
        RecordEncoding::Json
    }

    fn write_header(&mut self, meta: &ArchiveMetaData) -> Result<()> {
        self.document()?.section(json::INFO, meta.values()).or_raise(|| ErrorKind::Record)
    }

    fn write_styles(&mut self, styles: &[Style]) -> Result<()> {
        self.document()?.section(json::STYLES, styles).or_raise(|| ErrorKind::Record)
    }

    fn write_preferences(&mut self, preferences: &Bundle) -> Result<()> {
        self.document()?.section(json::PREFERENCES, preferences).or_raise(|| ErrorKind::Record)
    }

    fn write_books(&mut self, spool: &mut BookSpool) -> Result<()> {
        let mut books = spool.reader()?;
        self.document()?.raw_section(json::BOOKS, &mut books).or_raise(|| ErrorKind::Record)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(document) = self.document.take() {
            document.finish().or_raise(|| ErrorKind::Record)?;
        }
        Ok(())
    }
}
