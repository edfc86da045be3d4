//! Record-level reading and writing.
//!
//! Readers decode one container entry in whatever encoding its name says and
//! hand the result to the catalog or settings store. A record that cannot be
//! decoded at all fails with [`ErrorKind::ImportParsing`]; single bad book
//! rows never do, they are counted and listed instead.

use crate::books::BookImporter;
use crate::context::Context;
use crate::cursor::RecordEntry;
use crate::error::{ErrorKind, Result};
use crate::options::UpdatePolicy;
use crate::progress::ProgressListener;
use crate::results::ImportResults;
use exn::ResultExt;
use shelf_record::RecordEncoding;
use shelf_record::codec::csv::{self, BookCsvReader, BookCsvWriter};
use shelf_record::codec::json::{self, ArrayWriter};
use shelf_record::codec::xml::{self, XmlWriter};
use shelf_record::error::Error as RecordError;
use shelf_record::models::{ArchiveMetaData, Book, Bundle, Style};
use std::io::{BufReader, Read, Write};

fn parsing(entry: &RecordEntry) -> impl FnOnce(RecordError) -> crate::error::Error + '_ {
    move |err| {
        let message = format!("{}: {}", entry.name, *err);
        err.raise(ErrorKind::ImportParsing(message))
    }
}

fn unreadable(entry: &RecordEntry) -> ErrorKind {
    ErrorKind::ImportParsing(format!("{}: no decoder for {:?} records", entry.name, entry.encoding))
}

pub(crate) fn read_header(entry: &RecordEntry, body: &mut dyn Read) -> Result<ArchiveMetaData> {
    let values = match entry.encoding {
        RecordEncoding::Xml => xml::read_bundle(BufReader::new(body), xml::INFO),
        RecordEncoding::Json => json::read::<Bundle>(body),
        _ => exn::bail!(unreadable(entry)),
    };
    Ok(ArchiveMetaData::from(values.map_err(parsing(entry))?))
}

/// Decode styles and apply them. Returns how many were applied.
pub(crate) fn read_styles(ctx: &Context, entry: &RecordEntry, body: &mut dyn Read) -> Result<u64> {
    let styles = match entry.encoding {
        RecordEncoding::Xml => xml::read_styles(BufReader::new(body)),
        RecordEncoding::Json => json::read::<Vec<Style>>(body),
        _ => exn::bail!(unreadable(entry)),
    };
    let applied = ctx.settings.apply_styles(styles.map_err(parsing(entry))?).or_raise(|| ErrorKind::Catalog)?;
    Ok(applied as u64)
}

/// Decode preferences and apply them. Returns how many were applied.
pub(crate) fn read_preferences(ctx: &Context, entry: &RecordEntry, body: &mut dyn Read) -> Result<u64> {
    let preferences = match entry.encoding {
        RecordEncoding::Xml => xml::read_bundle(BufReader::new(body), xml::PREFERENCES),
        RecordEncoding::Json => json::read::<Bundle>(body),
        _ => exn::bail!(unreadable(entry)),
    };
    let preferences = preferences.map_err(parsing(entry))?;
    let applied = ctx.settings.apply_preferences(preferences).or_raise(|| ErrorKind::Catalog)?;
    Ok(applied as u64)
}

/// Import every book in the record, one progress step per book.
pub(crate) fn read_books(
    ctx: &Context,
    entry: &RecordEntry,
    body: &mut dyn Read,
    policy: UpdatePolicy,
    progress: &dyn ProgressListener,
) -> Result<ImportResults> {
    let importer = BookImporter::new(&*ctx.catalog, &*ctx.settings, policy);
    let mut results = ImportResults::default();
    match entry.encoding {
        RecordEncoding::Csv => {
            let buffered = BufReader::with_capacity(ctx.config.buffer_size, body);
            let mut reader = BookCsvReader::new(buffered).map_err(parsing(entry))?;
            if policy == UpdatePolicy::OnlyNewer && !reader.has_column(csv::LAST_UPDATED) {
                exn::bail!(ErrorKind::ImportParsing(format!(
                    "{}: the {} column is required to import only newer books",
                    entry.name,
                    csv::LAST_UPDATED
                )));
            }
            while !progress.is_cancelled()
                && let Some(row) = reader.next_row().or_raise(|| ErrorKind::Io)?
            {
                match row.book {
                    Ok(book) => apply(&importer, row.line, &book, &mut results),
                    Err(err) => {
                        tracing::warn!(record = %entry.name, line = row.line, error = ?err, "unreadable book row");
                        results.book_failed(row.line, (*err).to_string());
                    },
                }
                progress.publish(1, None);
            }
        },
        RecordEncoding::Json => {
            let books: Vec<Book> = json::read(body).map_err(parsing(entry))?;
            for (index, book) in books.iter().enumerate() {
                if progress.is_cancelled() {
                    break;
                }
                apply(&importer, index as u64 + 1, book, &mut results);
                progress.publish(1, None);
            }
        },
        _ => exn::bail!(unreadable(entry)),
    }
    tracing::debug!(record = %entry.name, books = ?results.books, failed = results.failed_lines.len(), "books read");
    Ok(results)
}

fn apply(importer: &BookImporter<'_>, line: u64, book: &Book, results: &mut ImportResults) {
    match importer.import(book) {
        Ok(action) => results.books.record(action),
        Err(err) => {
            tracing::warn!(line, title = %book.title, error = ?err, "cannot import book");
            results.book_failed(line, (*err).to_string());
        },
    }
}

/// Write the archive header as a standalone record.
pub(crate) fn write_header(out: &mut dyn Write, encoding: RecordEncoding, meta: &ArchiveMetaData) -> Result<()> {
    match encoding {
        RecordEncoding::Xml => XmlWriter::new(out)
            .and_then(|mut writer| {
                writer.bundle(xml::INFO, meta.values())?;
                writer.finish()
            })
            .map(drop),
        RecordEncoding::Json => json::write(out, meta.values()),
        _ => exn::bail!(ErrorKind::unsupported()),
    }
    .or_raise(|| ErrorKind::Record)
}

pub(crate) fn write_styles(out: &mut dyn Write, encoding: RecordEncoding, styles: &[Style]) -> Result<()> {
    match encoding {
        RecordEncoding::Xml => XmlWriter::new(out)
            .and_then(|mut writer| {
                writer.styles(styles)?;
                writer.finish()
            })
            .map(drop),
        RecordEncoding::Json => json::write(out, styles),
        _ => exn::bail!(ErrorKind::unsupported()),
    }
    .or_raise(|| ErrorKind::Record)
}

pub(crate) fn write_preferences(out: &mut dyn Write, encoding: RecordEncoding, preferences: &Bundle) -> Result<()> {
    match encoding {
        RecordEncoding::Xml => XmlWriter::new(out)
            .and_then(|mut writer| {
                writer.bundle(xml::PREFERENCES, preferences)?;
                writer.finish()
            })
            .map(drop),
        RecordEncoding::Json => json::write(out, preferences),
        _ => exn::bail!(ErrorKind::unsupported()),
    }
    .or_raise(|| ErrorKind::Record)
}

/// Encodes books one at a time in a given encoding.
///
/// XML books are written as a bare fragment of `<book>` elements, ready to be
/// embedded in a larger document.
pub(crate) enum BookSink<W: Write> {
    Csv(BookCsvWriter<W>),
    Json(ArrayWriter<W>),
    Xml(XmlWriter<W>),
}

impl<W: Write> BookSink<W> {
    pub(crate) fn new(encoding: RecordEncoding, out: W) -> Result<Self> {
        let sink = match encoding {
            RecordEncoding::Csv => BookCsvWriter::new(out).map(BookSink::Csv),
            RecordEncoding::Json => ArrayWriter::new(out).map(BookSink::Json),
            RecordEncoding::Xml => Ok(BookSink::Xml(XmlWriter::fragment(out))),
            RecordEncoding::Cover | RecordEncoding::Unknown => exn::bail!(ErrorKind::unsupported()),
        };
        sink.or_raise(|| ErrorKind::Record)
    }

    pub(crate) fn push(&mut self, book: &Book) -> Result<()> {
        match self {
            BookSink::Csv(writer) => writer.write(book),
            BookSink::Json(writer) => writer.push(book),
            BookSink::Xml(writer) => writer.book(book),
        }
        .or_raise(|| ErrorKind::Record)
    }

    pub(crate) fn finish(self) -> Result<W> {
        match self {
            BookSink::Csv(writer) => writer.finish(),
            BookSink::Json(writer) => writer.finish(),
            BookSink::Xml(writer) => writer.finish(),
        }
        .or_raise(|| ErrorKind::Record)
    }
}
