//! Books as comma separated values.
//!
//! The house format: a header row naming the columns, every field
//! double-quoted, embedded quotes doubled, and backslash, newline, carriage
//! return and tab escaped as `\\`, `\n`, `\r`, `\t` so that every row is a
//! single physical line. Multi-valued fields are joined with `|`.
//!
//! Reading is tolerant in two directions. Columns missing from the header
//! (files from older releases) take their default. A broken row is reported
//! with its line number and reading carries on with the next one.

use crate::codec::{format_timestamp, parse_timestamp};
use crate::consts::LIST_SEPARATOR;
use crate::error::{ErrorKind, Result};
use crate::models::{Author, Book, Series};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use exn::ResultExt;
use std::collections::HashMap;
use std::io::{Read, Write};

pub const ID: &str = "_id";
pub const UUID: &str = "book_uuid";
pub const LAST_UPDATED: &str = "last_update_date";
const DATE_ADDED: &str = "date_added";
const TITLE: &str = "title";
const ISBN: &str = "isbn";
const AUTHORS: &str = "author_details";
const SERIES: &str = "series_details";
const PUBLISHERS: &str = "publisher";
const BOOKSHELVES: &str = "bookshelf";
const PAGES: &str = "pages";
const DATE_PUBLISHED: &str = "date_published";
const LANGUAGE: &str = "language";
const READ: &str = "read";
const RATING: &str = "rating";
const STYLE: &str = "style";
const DESCRIPTION: &str = "description";
const NOTES: &str = "notes";
// Column name used before the uuid column was renamed.
const LEGACY_UUID: &str = "uuid";

/// Columns in the order they are written. `_id` must stay first: the
/// container detector relies on it.
pub const COLUMNS: [&str; 18] = [
    ID,
    UUID,
    LAST_UPDATED,
    DATE_ADDED,
    TITLE,
    ISBN,
    AUTHORS,
    SERIES,
    PUBLISHERS,
    BOOKSHELVES,
    PAGES,
    DATE_PUBLISHED,
    LANGUAGE,
    READ,
    RATING,
    STYLE,
    DESCRIPTION,
    NOTES,
];

/// Streams books out as CSV, header first.
pub struct BookCsvWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> BookCsvWriter<W> {
    pub fn new(writer: W) -> Result<Self> {
        let mut inner = WriterBuilder::new().quote_style(QuoteStyle::Always).from_writer(writer);
        inner.write_record(COLUMNS).or_raise(|| ErrorKind::Io)?;
        Ok(Self { inner })
    }

    pub fn write(&mut self, book: &Book) -> Result<()> {
        let timestamp = |field, value: &Option<_>| value.as_ref().map(|v| format_timestamp(field, v)).transpose();
        let fields: [String; 18] = [
            book.id.map(|id| id.to_string()).unwrap_or_default(),
            book.uuid.clone().unwrap_or_default(),
            timestamp(LAST_UPDATED, &book.last_updated)?.unwrap_or_default(),
            timestamp(DATE_ADDED, &book.date_added)?.unwrap_or_default(),
            book.title.clone(),
            book.isbn.clone().unwrap_or_default(),
            join_list(book.authors.iter().map(Author::to_string)),
            join_list(book.series.iter().map(Series::to_string)),
            join_list(book.publishers.iter().cloned()),
            join_list(book.bookshelves.iter().cloned()),
            book.pages.map(|p| p.to_string()).unwrap_or_default(),
            book.date_published.clone().unwrap_or_default(),
            book.language.clone().unwrap_or_default(),
            if book.read { "1" } else { "0" }.to_string(),
            book.rating.map(|r| r.to_string()).unwrap_or_default(),
            book.style.clone().unwrap_or_default(),
            book.description.clone().unwrap_or_default(),
            book.notes.clone().unwrap_or_default(),
        ];
        self.inner.write_record(fields.iter().map(|f| escape(f))).or_raise(|| ErrorKind::Io)
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush().or_raise(|| ErrorKind::Io)?;
        self.inner.into_inner().map_err(|e| e.into_error()).or_raise(|| ErrorKind::Io)
    }
}

/// One data row read from a books CSV.
#[derive(Debug)]
pub struct Row {
    /// 1-based physical line; the header is line 1.
    pub line: u64,
    pub book: Result<Book>,
}

/// Reads books from CSV, one [`Row`] at a time.
pub struct BookCsvReader<R: Read> {
    inner: csv::Reader<R>,
    columns: HashMap<String, usize>,
    width: usize,
}

impl<R: Read> BookCsvReader<R> {
    /// Wrap a reader and consume the header row.
    ///
    /// Column names are matched case-insensitively.
    pub fn new(reader: R) -> Result<Self> {
        let mut inner = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);
        let header = inner.headers().or_raise(|| ErrorKind::MalformedRecord("unreadable header".to_string()))?;
        if header.is_empty() {
            exn::bail!(ErrorKind::MalformedRecord("missing header".to_string()));
        }
        let columns: HashMap<String, usize> =
            header.iter().enumerate().map(|(i, name)| (name.trim().to_lowercase(), i)).collect();
        if !columns.contains_key(TITLE) {
            exn::bail!(ErrorKind::MissingField(TITLE));
        }
        let width = header.len();
        Ok(Self { inner, columns, width })
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Read the next row.
    ///
    /// The outer result fails only when the stream itself does. Anything wrong
    /// with the row's content is reported in [`Row::book`].
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        let mut record = StringRecord::new();
        match self.inner.read_record(&mut record) {
            Ok(false) => Ok(None),
            Ok(true) => {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                let book = self.decode(&record);
                if let Err(err) = &book {
                    tracing::debug!(line, error = ?err, "skipping undecodable book row");
                }
                Ok(Some(Row { line, book }))
            },
            Err(e) if e.is_io_error() => Err(e).or_raise(|| ErrorKind::Io),
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                let book = Err(exn::Exn::from(ErrorKind::MalformedRecord(e.to_string())));
                Ok(Some(Row { line, book }))
            },
        }
    }

    fn decode(&self, record: &StringRecord) -> Result<Book> {
        if record.len() != self.width {
            exn::bail!(ErrorKind::ColumnCount { expected: self.width, found: record.len() });
        }
        let get = |name: &str| {
            self.columns.get(name).and_then(|&i| record.get(i)).map(unescape).filter(|v| !v.trim().is_empty())
        };
        let title = get(TITLE).ok_or_else(|| exn::Exn::from(ErrorKind::MissingField(TITLE)))?;
        Ok(Book {
            id: get(ID).map(|v| parse_number(ID, &v)).transpose()?,
            uuid: get(UUID).or_else(|| get(LEGACY_UUID)),
            title,
            isbn: get(ISBN),
            authors: split_list(get(AUTHORS)).iter().filter_map(|a| a.parse().ok()).collect(),
            series: split_list(get(SERIES)).iter().filter_map(|s| s.parse().ok()).collect(),
            publishers: split_list(get(PUBLISHERS)),
            bookshelves: split_list(get(BOOKSHELVES)),
            pages: get(PAGES).map(|v| parse_number(PAGES, &v)).transpose()?,
            date_published: get(DATE_PUBLISHED),
            language: get(LANGUAGE),
            read: get(READ).map(|v| parse_bool(READ, &v)).transpose()?.unwrap_or(false),
            rating: get(RATING).map(|v| parse_number(RATING, &v)).transpose()?,
            style: get(STYLE),
            description: get(DESCRIPTION),
            notes: get(NOTES),
            date_added: get(DATE_ADDED).map(|v| parse_timestamp(DATE_ADDED, &v)).transpose()?,
            last_updated: get(LAST_UPDATED).map(|v| parse_timestamp(LAST_UPDATED, &v)).transpose()?,
        })
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|err| exn::Exn::new(err).raise(ErrorKind::ParseError { field, value: value.to_string() }))
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => exn::bail!(ErrorKind::ParseError { field, value: value.to_string() }),
    }
}

/// Escape control characters so a field never spans lines.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape`]. Unknown escapes are kept verbatim.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            },
            None => out.push('\\'),
        }
    }
    out
}

fn join_list(items: impl Iterator<Item = String>) -> String {
    items
        .map(|item| item.replace('\\', "\\\\").replace(LIST_SEPARATOR, "\\|"))
        .collect::<Vec<_>>()
        .join(String::from(LIST_SEPARATOR).as_str())
}

fn split_list(value: Option<String>) -> Vec<String> {
    let Some(value) = value else {
        return vec![];
    };
    let mut items = vec![];
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.extend(chars.next()),
            LIST_SEPARATOR => items.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    items.push(current);
    items.into_iter().map(|i| i.trim().to_string()).filter(|i| !i.is_empty()).collect()
}
