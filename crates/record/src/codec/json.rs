//! JSON records.
//!
//! Structured, so success and failure are whole-record: a single bad book in
//! a JSON books record fails the record. Output is always compact; a flat
//! JSON document must start with `{"` and nothing else to be recognised.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

pub const INFO: &str = "info";
pub const STYLES: &str = "styles";
pub const PREFERENCES: &str = "preferences";
pub const BOOKS: &str = "books";

/// A whole single-document archive, every section optional.
///
/// Sections are kept as untyped JSON so that a section which does not match
/// its record type fails on its own when decoded, not the whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub books: Option<serde_json::Value>,
}

impl ArchiveDocument {
    /// Present sections in reading order: header first, books last.
    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &serde_json::Value)> {
        [(INFO, &self.info), (STYLES, &self.styles), (PREFERENCES, &self.preferences), (BOOKS, &self.books)]
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|value| (key, value)))
    }
}

/// Decode a whole JSON value.
pub fn read<T: DeserializeOwned>(reader: impl Read) -> Result<T> {
    serde_json::from_reader(reader).or_else(|e: serde_json::Error| {
        let kind = match e.is_io() {
            true => ErrorKind::Io,
            false => ErrorKind::MalformedRecord(e.to_string()),
        };
        Err(e).or_raise(|| kind)
    })
}

/// Encode a whole JSON value, compact.
pub fn write<T: Serialize + ?Sized>(writer: impl Write, value: &T) -> Result<()> {
    serde_json::to_writer(writer, value).or_raise(|| ErrorKind::Io)
}

/// Writes one JSON object section by section, so that sections too large to
/// hold in memory can be streamed in from elsewhere.
pub struct DocumentWriter<W: Write> {
    inner: W,
    sections: usize,
}

impl<W: Write> DocumentWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, sections: 0 }
    }

    pub fn section<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        self.key(key)?;
        write(&mut self.inner, value)
    }

    /// Copy an already-encoded JSON value in as a section.
    pub fn raw_section(&mut self, key: &str, encoded: &mut dyn Read) -> Result<u64> {
        self.key(key)?;
        std::io::copy(encoded, &mut self.inner).or_raise(|| ErrorKind::Io)
    }

    /// Close the object and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        let closing: &[u8] = if self.sections == 0 { b"{}" } else { b"}" };
        self.inner.write_all(closing).or_raise(|| ErrorKind::Io)?;
        self.inner.flush().or_raise(|| ErrorKind::Io)?;
        Ok(self.inner)
    }

    fn key(&mut self, key: &str) -> Result<()> {
        let separator: &[u8] = if self.sections == 0 { b"{" } else { b"," };
        self.inner.write_all(separator).or_raise(|| ErrorKind::Io)?;
        write(&mut self.inner, key)?;
        self.inner.write_all(b":").or_raise(|| ErrorKind::Io)?;
        self.sections += 1;
        Ok(())
    }
}

/// Writes a JSON array one element at a time.
pub struct ArrayWriter<W: Write> {
    inner: W,
    items: usize,
}

impl<W: Write> ArrayWriter<W> {
    pub fn new(mut inner: W) -> Result<Self> {
        inner.write_all(b"[").or_raise(|| ErrorKind::Io)?;
        Ok(Self { inner, items: 0 })
    }

    pub fn push<T: Serialize>(&mut self, item: &T) -> Result<()> {
        if self.items > 0 {
            self.inner.write_all(b",").or_raise(|| ErrorKind::Io)?;
        }
        write(&mut self.inner, item)?;
        self.items += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.inner.write_all(b"]").or_raise(|| ErrorKind::Io)?;
        self.inner.flush().or_raise(|| ErrorKind::Io)?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, Bundle, Value};
    use std::io::Cursor;

    #[test]
    fn test_document_writer_sections() {
        let mut writer = DocumentWriter::new(Vec::new());
        let mut info = Bundle::new();
        info.insert("archive_version".to_string(), Value::Int(3));
        writer.section(INFO, &info).unwrap();
        writer.raw_section(BOOKS, &mut Cursor::new(b"[{\"title\":\"Dune\"}]")).unwrap();
        let out = writer.finish().unwrap();
        assert!(out.starts_with(b"{\"info\""));

        let document: ArchiveDocument = read(Cursor::new(out)).unwrap();
        assert_eq!(document.sections().map(|(key, _)| key).collect::<Vec<_>>(), vec![INFO, BOOKS]);
        let books: Vec<Book> = read(Cursor::new(document.books.unwrap().to_string())).unwrap();
        assert_eq!(books[0].title, "Dune");
        assert!(document.styles.is_none());
    }

    #[test]
    fn test_mistyped_section_is_left_to_the_record() {
        let document: ArchiveDocument =
            read(Cursor::new(br#"{"books":[{"title":"Emma","pages":"many"}],"styles":[]}"#)).unwrap();
        assert_eq!(document.sections().map(|(key, _)| key).collect::<Vec<_>>(), vec![STYLES, BOOKS]);
        let err = read::<Vec<Book>>(Cursor::new(document.books.unwrap().to_string())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedRecord(_)));
    }

    #[test]
    fn test_empty_document() {
        let out = DocumentWriter::new(Vec::new()).finish().unwrap();
        assert_eq!(out, b"{}");
    }

    #[test]
    fn test_array_writer() {
        let mut writer = ArrayWriter::new(Vec::new()).unwrap();
        writer.push(&Book { title: "A".to_string(), ..Default::default() }).unwrap();
        writer.push(&Book { title: "B".to_string(), ..Default::default() }).unwrap();
        let books: Vec<Book> = read(Cursor::new(writer.finish().unwrap())).unwrap();
        assert_eq!(books.iter().map(|b| b.title.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_malformed_is_record_error() {
        let err = read::<Vec<Book>>(Cursor::new(b"[{\"title\":")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedRecord(_)));
    }
}
