use crate::error::{ErrorKind, Result};
use crate::writer::{ArchiveWriter, BookSpool, WriterCapabilities};
use exn::ResultExt;
use shelf_record::codec::xml::{self, XmlWriter};
use shelf_record::models::{ArchiveMetaData, Bundle, Style};
use shelf_record::{FormatVersion, RecordEncoding};
use std::io::{BufWriter, Write};

const ROOT: &str = "shelf-archive";

/// Everything but covers, as one XML document. Export only: nothing reads
/// XML books back.
pub struct XmlArchiveWriter<W: Write> {
    xml: Option<XmlWriter<BufWriter<W>>>,
}

impl<W: Write> XmlArchiveWriter<W> {
    pub fn new(out: W) -> Result<Self> {
        let mut xml = XmlWriter::new(BufWriter::new(out)).or_raise(|| ErrorKind::Record)?;
        let version = FormatVersion::CURRENT.to_string();
        xml.start(ROOT, &[("version", version.as_str())]).or_raise(|| ErrorKind::Record)?;
        Ok(Self { xml: Some(xml) })
    }

    fn xml(&mut self) -> Result<&mut XmlWriter<BufWriter<W>>> {
        self.xml.as_mut().ok_or_else(|| exn::Exn::from(ErrorKind::Io))
    }
}

impl<W: Write> ArchiveWriter for XmlArchiveWriter<W> {
    fn capabilities(&self) -> WriterCapabilities {
        WriterCapabilities { covers: false, ..WriterCapabilities::ALL }
    }

    fn book_encoding(&self) -> RecordEncoding {
        RecordEncoding::Xml
    }

    fn write_header(&mut self, meta: &ArchiveMetaData) -> Result<()> {
        self.xml()?.bundle(xml::INFO, meta.values()).or_raise(|| ErrorKind::Record)
    }

    fn write_styles(&mut self, styles: &[Style]) -> Result<()> {
        self.xml()?.styles(styles).or_raise(|| ErrorKind::Record)
    }

    fn write_preferences(&mut self, preferences: &Bundle) -> Result<()> {
        self.xml()?.bundle(xml::PREFERENCES, preferences).or_raise(|| ErrorKind::Record)
    }

    fn write_books(&mut self, spool: &mut BookSpool) -> Result<()> {
        let mut books = spool.reader()?;
        let xml = self.xml()?;
        xml.start(xml::BOOKS, &[]).or_raise(|| ErrorKind::Record)?;
        xml.raw(&mut books).or_raise(|| ErrorKind::Record)?;
        xml.end(xml::BOOKS).or_raise(|| ErrorKind::Record)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut xml) = self.xml.take() {
            xml.end(ROOT).or_raise(|| ErrorKind::Record)?;
            xml.finish().or_raise(|| ErrorKind::Record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_record::models::{SourceApp, Value};

    #[test]
    fn test_sections_are_readable_back() {
        let path = tempfile::NamedTempFile::new().unwrap();
        let mut writer = XmlArchiveWriter::new(path.reopen().unwrap()).unwrap();
        let meta = ArchiveMetaData::create(FormatVersion::CURRENT, &SourceApp::default(), Some(0), None).unwrap();
        let mut preferences = Bundle::new();
        preferences.insert("list.level".to_string(), Value::Int(2));
        writer.write_header(&meta).unwrap();
        writer.write_preferences(&preferences).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        let document = std::fs::read_to_string(path.path()).unwrap();
        assert!(document.starts_with("<?xml"));
        assert!(document.trim_end().ends_with("</shelf-archive>"));
        let info = xml::read_bundle(document.as_bytes(), xml::INFO).unwrap();
        assert_eq!(ArchiveMetaData::from(info).version(), Some(2));
        assert_eq!(xml::read_bundle(document.as_bytes(), xml::PREFERENCES).unwrap(), preferences);
    }
}
