//! Archive writing.
//!
//! Every container writer runs the same sequence of phases:
//!
//! 1. Purge the catalog and count what is to be exported.
//! 2. Encode all books into a spool file, noting the covers they have. The
//!    header needs the final counts, so this always comes first.
//! 3. Header, styles and preferences, as far as the writer supports them.
//! 4. Copy the spooled books in.
//! 5. Covers, last.
//!
//! A phase is skipped when the writer lacks the capability, when it was not
//! requested, or when cancellation was seen before it started. The writer is
//! closed whatever happens.

use crate::context::Context;
use crate::error::{ErrorKind, Result};
use crate::options::{Entities, ExportOptions};
use crate::progress::ProgressListener;
use crate::records::BookSink;
use crate::results::{ExportOutcome, ExportResults};
use exn::ResultExt;
use shelf_record::models::{ArchiveMetaData, Bundle, Style, keys};
use shelf_record::{FormatVersion, RecordEncoding};
use shelf_storage::CoverInfo;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;
use tempfile::NamedTempFile;
use time::OffsetDateTime;

/// Progress steps beyond one per book and one per cover: header, styles,
/// preferences, the books record itself, and some slack.
const EXTRA_STEPS: u64 = 10;

/// Which optional phases a writer takes part in. Books are always written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriterCapabilities {
    pub header: bool,
    pub styles: bool,
    pub preferences: bool,
    pub covers: bool,
}

impl WriterCapabilities {
    pub const BOOKS_ONLY: WriterCapabilities =
        WriterCapabilities { header: false, styles: false, preferences: false, covers: false };
    pub const ALL: WriterCapabilities =
        WriterCapabilities { header: true, styles: true, preferences: true, covers: true };

    #[must_use]
    pub fn entities(&self) -> Entities {
        let mut entities = Entities::BOOKS;
        for (supported, entity) in [
            (self.header, Entities::INFO),
            (self.styles, Entities::STYLES),
            (self.preferences, Entities::PREFERENCES),
            (self.covers, Entities::COVERS),
        ] {
            if supported {
                entities.insert(entity);
            }
        }
        entities
    }
}

/// Books already encoded for the writer, held in a temporary file, along
/// with their ids and the covers listed for them.
pub struct BookSpool {
    file: NamedTempFile,
    encoding: RecordEncoding,
    count: u64,
    ids: Vec<i64>,
    covers: Vec<String>,
}

impl BookSpool {
    #[must_use]
    pub fn encoding(&self) -> RecordEncoding {
        self.encoding
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// A fresh reader over the encoded books, from the start.
    pub fn reader(&self) -> Result<BufReader<File>> {
        self.file.reopen().map(BufReader::new).or_raise(|| ErrorKind::Io)
    }
}

/// A container writer.
///
/// Only books and closing are mandatory. The optional phases default to
/// failing; the orchestration never calls them unless
/// [`capabilities`](Self::capabilities) says they are supported.
pub trait ArchiveWriter {
    /// The format version written. Always the current one.
    fn version(&self) -> FormatVersion {
        FormatVersion::CURRENT
    }

    fn capabilities(&self) -> WriterCapabilities;

    /// How books must be encoded for this writer.
    fn book_encoding(&self) -> RecordEncoding;

    fn write_header(&mut self, _meta: &ArchiveMetaData) -> Result<()> {
        exn::bail!(ErrorKind::unsupported())
    }

    fn write_styles(&mut self, _styles: &[Style]) -> Result<()> {
        exn::bail!(ErrorKind::unsupported())
    }

    fn write_preferences(&mut self, _preferences: &Bundle) -> Result<()> {
        exn::bail!(ErrorKind::unsupported())
    }

    fn write_books(&mut self, spool: &mut BookSpool) -> Result<()>;

    fn write_cover(&mut self, _cover: &CoverInfo, _body: &mut dyn Read) -> Result<()> {
        exn::bail!(ErrorKind::unsupported())
    }

    /// Flush and release the output. Must be safe to call more than once.
    fn close(&mut self) -> Result<()>;

    /// Run a whole export into this writer.
    fn write(
        &mut self,
        ctx: &Context,
        options: &ExportOptions,
        progress: &dyn ProgressListener,
    ) -> Result<ExportOutcome> {
        run(self, ctx, options, progress)
    }
}

#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(entities = %options.entities, incremental = options.incremental)
)]
pub(crate) fn run<W: ArchiveWriter + ?Sized>(
    writer: &mut W,
    ctx: &Context,
    options: &ExportOptions,
    progress: &dyn ProgressListener,
) -> Result<ExportOutcome> {
    let started = OffsetDateTime::now_utc();
    let mut outcome = ExportOutcome { requested: options.entities, ..Default::default() };
    let written = write_phases(writer, ctx, options, progress, &mut outcome);
    let closed = writer.close();
    outcome.cancelled = progress.is_cancelled();
    match written.and(closed) {
        Ok(()) => {},
        Err(err) if outcome.cancelled => {
            tracing::debug!(error = ?err, "export interrupted by cancellation");
        },
        Err(err) => return Err(err),
    }
    if !options.incremental && !outcome.cancelled {
        ctx.settings.set_last_full_backup(started).or_raise(|| ErrorKind::Catalog)?;
    }
    tracing::info!(
        books = outcome.results.book_count(),
        covers = outcome.results.cover_count(),
        skipped_covers = outcome.results.skipped_covers.len(),
        styles = outcome.results.styles,
        preferences = outcome.results.preferences,
        cancelled = outcome.cancelled,
        "export finished"
    );
    Ok(outcome)
}

fn write_phases<W: ArchiveWriter + ?Sized>(
    writer: &mut W,
    ctx: &Context,
    options: &ExportOptions,
    progress: &dyn ProgressListener,
    outcome: &mut ExportOutcome,
) -> Result<()> {
    let wanted = options.entities.intersection(writer.capabilities().entities());
    ctx.catalog.purge().or_raise(|| ErrorKind::Catalog)?;
    let since = match options.incremental {
        true => ctx.settings.last_full_backup().or_raise(|| ErrorKind::Catalog)?,
        false => None,
    };
    let estimate = ctx.catalog.count_books_since(since).or_raise(|| ErrorKind::Catalog)?;
    progress.set_max(estimate * 2 + EXTRA_STEPS);

    let mut spool = None;
    let (mut books, mut covers) = (0, 0);
    if (wanted.contains(Entities::BOOKS) || wanted.contains(Entities::COVERS)) && !progress.is_cancelled() {
        tracing::debug!(estimate, ?since, "preparing books");
        let prepared = prepare_books(writer.book_encoding(), ctx, since, wanted.contains(Entities::COVERS), progress)?;
        if wanted.contains(Entities::BOOKS) {
            books = prepared.ids.len() as u64;
        }
        covers = prepared.covers.len() as u64;
        progress.set_max(books + covers + EXTRA_STEPS);
        spool = Some(prepared);
    }

    if wanted.contains(Entities::INFO) && !progress.is_cancelled() {
        let mut meta = ArchiveMetaData::create(writer.version(), &ctx.app, Some(books), Some(covers))
            .or_raise(|| ErrorKind::Record)?;
        meta.set_flag(keys::HAS_STYLES, wanted.contains(Entities::STYLES));
        meta.set_flag(keys::HAS_PREFERENCES, wanted.contains(Entities::PREFERENCES));
        writer.write_header(&meta)?;
        outcome.actual.insert(Entities::INFO);
        progress.publish(1, Some("header"));
    }

    if wanted.contains(Entities::STYLES) && !progress.is_cancelled() {
        let styles = ctx.settings.styles().or_raise(|| ErrorKind::Catalog)?;
        writer.write_styles(&styles)?;
        outcome.results.styles = styles.len() as u64;
        outcome.actual.insert(Entities::STYLES);
        progress.publish(1, Some("styles"));
    }

    if wanted.contains(Entities::PREFERENCES) && !progress.is_cancelled() {
        let preferences = ctx.settings.preferences().or_raise(|| ErrorKind::Catalog)?;
        writer.write_preferences(&preferences)?;
        outcome.results.preferences = preferences.len() as u64;
        outcome.actual.insert(Entities::PREFERENCES);
        progress.publish(1, Some("preferences"));
    }

    if let Some(spool) = spool.as_mut()
        && wanted.contains(Entities::BOOKS)
        && !progress.is_cancelled()
    {
        writer.write_books(spool)?;
        outcome.results.books.extend(&spool.ids);
        outcome.actual.insert(Entities::BOOKS);
        progress.publish(1, Some("books"));
    }

    if let Some(spool) = spool.as_ref()
        && wanted.contains(Entities::COVERS)
        && !progress.is_cancelled()
    {
        write_covers(writer, ctx, progress, &spool.covers, &mut outcome.results);
        outcome.actual.insert(Entities::COVERS);
    }
    Ok(())
}

/// Encode every book to export into a spool file, collecting ids and the
/// names of covers present in the store.
fn prepare_books(
    encoding: RecordEncoding,
    ctx: &Context,
    since: Option<OffsetDateTime>,
    with_covers: bool,
    progress: &dyn ProgressListener,
) -> Result<BookSpool> {
    let file = NamedTempFile::new().or_raise(|| ErrorKind::Io)?;
    let out = file.as_file().try_clone().or_raise(|| ErrorKind::Io)?;
    let mut sink = BookSink::new(encoding, BufWriter::with_capacity(ctx.config.buffer_size, out))?;
    let (mut ids, mut covers) = (Vec::new(), Vec::new());
    let mut count = 0;
    for book in ctx.catalog.books_since(since).or_raise(|| ErrorKind::Catalog)? {
        if progress.is_cancelled() {
            break;
        }
        let book = book.or_raise(|| ErrorKind::Catalog)?;
        sink.push(&book)?;
        count += 1;
        ids.extend(book.id);
        if with_covers {
            for name in book.cover_names() {
                match ctx.covers.exists(Path::new(&name)) {
                    Ok(true) => covers.push(name),
                    Ok(false) => {},
                    Err(err) => tracing::warn!(cover = %name, error = ?err, "cannot check cover, leaving it out"),
                }
            }
        }
        progress.publish(1, None);
    }
    sink.finish()?;
    Ok(BookSpool { file, encoding, count, ids, covers })
}

/// Copy the listed covers in. A cover that cannot be read or written is
/// left out and noted in [`ExportResults::skipped_covers`].
fn write_covers<W: ArchiveWriter + ?Sized>(
    writer: &mut W,
    ctx: &Context,
    progress: &dyn ProgressListener,
    listed: &[String],
    results: &mut ExportResults,
) {
    for name in listed {
        if progress.is_cancelled() {
            break;
        }
        let path = Path::new(name);
        let written = ctx
            .covers
            .stat(path)
            .and_then(|info| Ok((info, ctx.covers.reader(path)?)))
            .or_raise(|| ErrorKind::Storage)
            .and_then(|(info, mut body)| writer.write_cover(&info, &mut body));
        match written {
            Ok(()) => results.covers.push(name.clone()),
            Err(err) => {
                tracing::warn!(store = ctx.covers.name(), cover = %name, error = ?err, "cannot export cover");
                results.skipped_covers.push(name.clone());
            },
        }
        progress.publish(1, None);
    }
}
