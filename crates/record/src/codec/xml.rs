//! XML records.
//!
//! Bundles (header, preferences, style settings) are lists of typed elements:
//!
//! ```xml
//! <preferences>
//!   <boolean name="sort.ascending" value="true"/>
//!   <int name="list.level" value="2"/>
//!   <string name="ui.theme" value="dark"/>
//!   <set name="list.groups"><item value="author"/><item value="series"/></set>
//! </preferences>
//! ```
//!
//! Readers look for the first element with the requested name anywhere in the
//! document, so a record can be read both from its own entry and from a
//! single-document archive holding every record.

use crate::codec::format_timestamp;
use crate::error::{Error, ErrorKind, Result};
use crate::models::{Book, Bundle, Style, Value};
use exn::ResultExt;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{BufRead, Read, Write};

pub const INFO: &str = "info";
pub const STYLES: &str = "styles";
pub const PREFERENCES: &str = "preferences";
pub const BOOKS: &str = "books";
const STYLE: &str = "style";
const BOOK: &str = "book";
const ITEM: &str = "item";
const NAME: &str = "name";
const VALUE: &str = "value";

/// Streams records out as XML.
pub struct XmlWriter<W: Write> {
    inner: Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    /// Start a standalone document, with its declaration.
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = Self::fragment(inner);
        writer.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(writer)
    }

    /// Start a fragment meant to be embedded in another document.
    pub fn fragment(inner: W) -> Self {
        Self { inner: Writer::new_with_indent(inner, b' ', 2) }
    }

    pub fn start(&mut self, tag: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Start(BytesStart::new(tag).with_attributes(attributes.iter().copied())))
    }

    pub fn end(&mut self, tag: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    /// Write a bundle as a list of typed elements inside `tag`.
    pub fn bundle(&mut self, tag: &str, bundle: &Bundle) -> Result<()> {
        self.start(tag, &[])?;
        self.values(bundle)?;
        self.end(tag)
    }

    pub fn styles(&mut self, styles: &[Style]) -> Result<()> {
        self.start(STYLES, &[])?;
        for style in styles {
            let preferred = style.preferred.to_string();
            let attributes =
                [("uuid", style.uuid.as_str()), (NAME, style.name.as_str()), ("preferred", preferred.as_str())];
            self.start(STYLE, &attributes)?;
            self.values(&style.settings)?;
            self.end(STYLE)?;
        }
        self.end(STYLES)
    }

    /// Write a single book element. Books are never read back from XML.
    pub fn book(&mut self, book: &Book) -> Result<()> {
        let id = book.id.map(|id| id.to_string()).unwrap_or_default();
        let pages = book.pages.map(|p| p.to_string()).unwrap_or_default();
        let rating = book.rating.map(|r| r.to_string()).unwrap_or_default();
        let updated = book.last_updated.as_ref().map(|d| format_timestamp("last_updated", d)).transpose()?;
        let read = book.read.to_string();
        let mut attributes = vec![("id", id.as_str()), ("title", book.title.as_str()), ("read", read.as_str())];
        let optional = [
            ("uuid", book.uuid.as_deref()),
            ("isbn", book.isbn.as_deref()),
            ("pages", Some(pages.as_str()).filter(|p| !p.is_empty())),
            ("date_published", book.date_published.as_deref()),
            ("language", book.language.as_deref()),
            ("rating", Some(rating.as_str()).filter(|r| !r.is_empty())),
            ("style", book.style.as_deref()),
            ("last_update_date", updated.as_deref()),
        ];
        attributes.extend(optional.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));
        self.start(BOOK, &attributes)?;
        for author in &book.authors {
            let attributes = [("family", author.family_name.as_str()), ("given", author.given_names.as_str())];
            self.empty("author", &attributes)?;
        }
        for series in &book.series {
            let number = series.number.as_deref().unwrap_or_default();
            self.empty("series", &[("title", series.title.as_str()), ("number", number)])?;
        }
        for publisher in &book.publishers {
            self.empty("publisher", &[(NAME, publisher.as_str())])?;
        }
        for shelf in &book.bookshelves {
            self.empty("bookshelf", &[(NAME, shelf.as_str())])?;
        }
        for (tag, text) in [("description", &book.description), ("notes", &book.notes)] {
            if let Some(text) = text {
                self.start(tag, &[])?;
                self.event(Event::Text(BytesText::new(text)))?;
                self.end(tag)?;
            }
        }
        self.end(BOOK)
    }

    /// Copy an already-encoded fragment in verbatim.
    pub fn raw(&mut self, fragment: &mut dyn Read) -> Result<u64> {
        let inner = self.inner.get_mut();
        inner.write_all(b"\n").or_raise(|| ErrorKind::Io)?;
        std::io::copy(fragment, inner).or_raise(|| ErrorKind::Io)
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        let mut inner = self.inner.into_inner();
        inner.write_all(b"\n").or_raise(|| ErrorKind::Io)?;
        inner.flush().or_raise(|| ErrorKind::Io)?;
        Ok(inner)
    }

    fn values(&mut self, bundle: &Bundle) -> Result<()> {
        for (name, value) in bundle {
            match value {
                Value::Set(items) => {
                    self.start(value.tag(), &[(NAME, name.as_str())])?;
                    for item in items {
                        self.empty(ITEM, &[(VALUE, item.as_str())])?;
                    }
                    self.end(value.tag())?;
                },
                scalar => {
                    let raw = scalar.to_string();
                    self.empty(scalar.tag(), &[(NAME, name.as_str()), (VALUE, raw.as_str())])?
                },
            }
        }
        Ok(())
    }

    fn empty(&mut self, tag: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Empty(BytesStart::new(tag).with_attributes(attributes.iter().copied())))
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.inner.write_event(event).or_raise(|| ErrorKind::Io)
    }
}

/// Read the bundle held by the first `tag` element in the document.
pub fn read_bundle(reader: impl BufRead, tag: &str) -> Result<Bundle> {
    let mut events = Events::new(reader);
    match events.find(tag)? {
        Event::Start(_) => events.values(tag),
        _ => Ok(Bundle::new()),
    }
}

/// Read the styles held by the first `styles` element in the document.
pub fn read_styles(reader: impl BufRead) -> Result<Vec<Style>> {
    let mut events = Events::new(reader);
    if !matches!(events.find(STYLES)?, Event::Start(_)) {
        return Ok(vec![]);
    }
    let mut styles = vec![];
    loop {
        match events.next()? {
            Event::Start(e) if e.name().as_ref() == STYLE.as_bytes() => {
                let mut style = style_from(&e)?;
                style.settings = events.values(STYLE)?;
                styles.push(style);
            },
            Event::Empty(e) if e.name().as_ref() == STYLE.as_bytes() => styles.push(style_from(&e)?),
            Event::End(e) if e.name().as_ref() == STYLES.as_bytes() => return Ok(styles),
            Event::Eof => exn::bail!(malformed("unexpected end of document")),
            _ => {},
        }
    }
}

fn style_from(e: &BytesStart<'_>) -> Result<Style> {
    Ok(Style {
        uuid: attribute(e, "uuid")?.ok_or_else(|| exn::Exn::from(ErrorKind::MissingField("uuid")))?,
        name: attribute(e, NAME)?.unwrap_or_default(),
        preferred: attribute(e, "preferred")?.is_some_and(|p| p == "true"),
        settings: Bundle::new(),
    })
}

/// Owned event pump over a quick-xml reader.
struct Events<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> Events<R> {
    fn new(inner: R) -> Self {
        let mut reader = Reader::from_reader(inner);
        reader.config_mut().trim_text(true);
        Self { reader, buffer: Vec::new() }
    }

    fn next(&mut self) -> Result<Event<'static>> {
        self.buffer.clear();
        let event = self.reader.read_event_into(&mut self.buffer).map_err(xml_error)?;
        Ok(event.into_owned())
    }

    /// Skip forward to the first start (or empty) element named `tag`.
    fn find(&mut self, tag: &str) -> Result<Event<'static>> {
        loop {
            match self.next()? {
                event @ (Event::Start(_) | Event::Empty(_)) if element_name(&event) == Some(tag.as_bytes()) => {
                    return Ok(event);
                },
                Event::Eof => exn::bail!(ErrorKind::MissingField(static_tag(tag))),
                _ => {},
            }
        }
    }

    /// Read typed value elements until the end of `parent`.
    fn values(&mut self, parent: &str) -> Result<Bundle> {
        let mut bundle = Bundle::new();
        loop {
            match self.next()? {
                Event::Empty(e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if let Some(name) = attribute(&e, NAME)? {
                        let raw = attribute(&e, VALUE)?.unwrap_or_default();
                        bundle.insert(name, typed(&tag, raw)?);
                    }
                },
                Event::Start(e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let name = attribute(&e, NAME)?;
                    let value = match tag.as_str() {
                        "set" => Value::Set(self.items(&tag)?),
                        _ => typed(&tag, self.text(&tag)?)?,
                    };
                    if let Some(name) = name {
                        bundle.insert(name, value);
                    }
                },
                Event::End(e) if e.name().as_ref() == parent.as_bytes() => return Ok(bundle),
                Event::Eof => exn::bail!(malformed("unexpected end of document")),
                _ => {},
            }
        }
    }

    fn items(&mut self, parent: &str) -> Result<Vec<String>> {
        let mut items = vec![];
        loop {
            match self.next()? {
                Event::Empty(e) if e.name().as_ref() == ITEM.as_bytes() => {
                    items.extend(attribute(&e, VALUE)?);
                },
                Event::End(e) if e.name().as_ref() == parent.as_bytes() => return Ok(items),
                Event::Eof => exn::bail!(malformed("unexpected end of document")),
                _ => {},
            }
        }
    }

    fn text(&mut self, parent: &str) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => text.push_str(&t.unescape().map_err(xml_error)?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
                Event::End(e) if e.name().as_ref() == parent.as_bytes() => return Ok(text),
                Event::Eof => exn::bail!(malformed("unexpected end of document")),
                _ => {},
            }
        }
    }
}

fn element_name<'a>(event: &'a Event<'_>) -> Option<&'a [u8]> {
    match event {
        Event::Start(e) | Event::Empty(e) => Some(e.name().into_inner()),
        _ => None,
    }
}

fn typed(tag: &str, raw: String) -> Result<Value> {
    let invalid = || ErrorKind::ParseError { field: "value", value: raw.clone() };
    Ok(match tag {
        "boolean" => Value::Bool(raw.trim().parse::<bool>().or_raise(invalid)?),
        "int" | "long" => Value::Int(raw.trim().parse::<i64>().or_raise(invalid)?),
        "float" | "double" => Value::Float(raw.trim().parse::<f64>().or_raise(invalid)?),
        "string" => Value::Text(raw),
        other => exn::bail!(malformed(&format!("unknown value type <{other}>"))),
    })
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    let Some(attr) = e.try_get_attribute(key).or_raise(|| malformed("invalid attribute"))? else {
        return Ok(None);
    };
    Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned()))
}

fn static_tag(tag: &str) -> &'static str {
    match tag {
        INFO => INFO,
        STYLES => STYLES,
        PREFERENCES => PREFERENCES,
        BOOKS => BOOKS,
        _ => "element",
    }
}

fn malformed(message: &str) -> ErrorKind {
    ErrorKind::MalformedRecord(message.to_string())
}

fn xml_error(e: quick_xml::Error) -> Error {
    let kind = match &e {
        quick_xml::Error::Io(_) => ErrorKind::Io,
        other => ErrorKind::MalformedRecord(other.to_string()),
    };
    exn::Exn::from(e).raise(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn bundle() -> Bundle {
        let mut bundle = Bundle::new();
        bundle.insert("flag".to_string(), Value::Bool(true));
        bundle.insert("level".to_string(), Value::Int(2));
        bundle.insert("ratio".to_string(), Value::Float(0.5));
        bundle.insert("theme".to_string(), Value::Text("dark & <light>".to_string()));
        bundle.insert("groups".to_string(), Value::Set(vec!["author".to_string(), "series".to_string()]));
        bundle
    }

    fn write<F: FnOnce(&mut XmlWriter<Vec<u8>>)>(f: F) -> Vec<u8> {
        let mut writer = XmlWriter::new(Vec::new()).unwrap();
        f(&mut writer);
        writer.finish().unwrap()
    }

    #[test]
    fn test_document_has_declaration() {
        let out = write(|w| w.bundle(PREFERENCES, &Bundle::new()).unwrap());
        assert!(out.starts_with(b"<?xml "));
    }

    #[test]
    fn test_bundle_reads_back() {
        let out = write(|w| w.bundle(PREFERENCES, &bundle()).unwrap());
        assert_eq!(read_bundle(Cursor::new(out), PREFERENCES).unwrap(), bundle());
    }

    #[test]
    fn test_styles_read_back() {
        let styles = vec![
            Style { uuid: "s-1".to_string(), name: "Compact".to_string(), preferred: true, settings: bundle() },
            Style { uuid: "s-2".to_string(), name: "Plain".to_string(), preferred: false, settings: Bundle::new() },
        ];
        let out = write(|w| w.styles(&styles).unwrap());
        assert_eq!(read_styles(Cursor::new(out)).unwrap(), styles);
    }

    #[test]
    fn test_reads_record_from_combined_document() {
        let out = write(|w| {
            w.start("archive", &[]).unwrap();
            w.bundle(INFO, &bundle()).unwrap();
            w.bundle(PREFERENCES, &Bundle::new()).unwrap();
            w.end("archive").unwrap();
        });
        assert_eq!(read_bundle(Cursor::new(&out), INFO).unwrap(), bundle());
        assert!(read_bundle(Cursor::new(&out), PREFERENCES).unwrap().is_empty());
    }

    #[test]
    fn test_text_form_values() {
        let doc = br#"<preferences><string name="a">hello</string><int name="b">5</int></preferences>"#;
        let bundle = read_bundle(Cursor::new(&doc[..]), PREFERENCES).unwrap();
        assert_eq!(bundle["a"], Value::from("hello"));
        assert_eq!(bundle["b"], Value::Int(5));
    }

    #[test]
    fn test_missing_element() {
        let err = read_bundle(Cursor::new(b"<other/>"), INFO).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingField(INFO));
    }

    #[test]
    fn test_bad_value_is_parse_error() {
        let doc = br#"<info><int name="archive_version" value="two"/></info>"#;
        let err = read_bundle(Cursor::new(&doc[..]), INFO).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ParseError { .. }));
    }

    #[test]
    fn test_truncated_document() {
        let err = read_bundle(Cursor::new(b"<info><int name=\"a\" value=\"1\"/>"), INFO).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedRecord(_)));
    }

    #[test]
    fn test_book_element() {
        let book = Book {
            id: Some(1),
            title: "Dune".to_string(),
            notes: Some("multi\nline".to_string()),
            ..Default::default()
        };
        let out = String::from_utf8(write(|w| w.book(&book).unwrap())).unwrap();
        assert!(out.contains("<book id=\"1\" title=\"Dune\""));
        assert!(out.contains("<notes>multi\nline</notes>"));
    }
}
