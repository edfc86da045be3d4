use crate::context::Context;
use crate::error::{ErrorKind, Result};
use crate::options::{Entities, ExportOptions};
use crate::progress::ProgressListener;
use crate::results::ExportOutcome;
use crate::writer::{ArchiveWriter, BookSpool, WriterCapabilities};
use exn::ResultExt;
use shelf_record::RecordEncoding;
use std::fs::File;
use std::io::{BufReader, Write};
use time::OffsetDateTime;

/// A raw copy of the catalog database file.
///
/// None of the usual phases apply: there are no records, just the one file
/// copied byte for byte.
pub struct SqliteArchiveWriter<W: Write> {
    out: Option<W>,
}

impl<W: Write> SqliteArchiveWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Some(out) }
    }
}

impl<W: Write> ArchiveWriter for SqliteArchiveWriter<W> {
    fn capabilities(&self) -> WriterCapabilities {
        WriterCapabilities::BOOKS_ONLY
    }

    fn book_encoding(&self) -> RecordEncoding {
        RecordEncoding::Unknown
    }

    fn write_books(&mut self, _spool: &mut BookSpool) -> Result<()> {
        exn::bail!(ErrorKind::unsupported())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush().or_raise(|| ErrorKind::Io)?;
        }
        Ok(())
    }

    /// Purge, then copy the database file if books were requested. The copy
    /// only counts when it completed without cancellation.
    #[tracing::instrument(level = "debug", skip_all, fields(entities = %options.entities))]
    fn write(
        &mut self,
        ctx: &Context,
        options: &ExportOptions,
        progress: &dyn ProgressListener,
    ) -> Result<ExportOutcome> {
        let started = OffsetDateTime::now_utc();
        let mut outcome = ExportOutcome { requested: options.entities, ..Default::default() };
        let copied = self.copy_phase(ctx, options, progress);
        let closed = self.close();
        outcome.cancelled = progress.is_cancelled();
        match copied.and_then(|copied| closed.map(|()| copied)) {
            Ok(true) if !outcome.cancelled => {
                outcome.results.database = true;
                outcome.actual = Entities::BOOKS;
            },
            Ok(_) => {},
            Err(err) if outcome.cancelled => {
                tracing::debug!(error = ?err, "database copy interrupted by cancellation");
            },
            Err(err) => return Err(err),
        }
        if !options.incremental && outcome.results.database {
            ctx.settings.set_last_full_backup(started).or_raise(|| ErrorKind::Catalog)?;
        }
        tracing::info!(database = outcome.results.database, cancelled = outcome.cancelled, "export finished");
        Ok(outcome)
    }
}

impl<W: Write> SqliteArchiveWriter<W> {
    fn copy_phase(&mut self, ctx: &Context, options: &ExportOptions, progress: &dyn ProgressListener) -> Result<bool> {
        ctx.catalog.purge().or_raise(|| ErrorKind::Catalog)?;
        if !options.entities.contains(Entities::BOOKS) || progress.is_cancelled() {
            return Ok(false);
        }
        self.copy_database(ctx, progress)?;
        Ok(true)
    }

    fn copy_database(&mut self, ctx: &Context, progress: &dyn ProgressListener) -> Result<()> {
        let Some(path) = ctx.catalog.database_path() else {
            exn::bail!(ErrorKind::Catalog);
        };
        let out = self.out.as_mut().ok_or_else(|| exn::Exn::from(ErrorKind::Io))?;
        let file = File::open(path).or_raise(|| ErrorKind::Io)?;
        progress.set_max(1);
        let mut database = BufReader::with_capacity(ctx.config.buffer_size, file);
        let copied = std::io::copy(&mut database, out).or_raise(|| ErrorKind::Io)?;
        tracing::debug!(path = %path.display(), copied, "database file copied");
        progress.publish(1, Some("database"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Progress;
    use rstest::rstest;
    use shelf_catalog::memory::{Journal, MemoryCatalog, MemorySettings};
    use shelf_record::models::Bundle;
    use shelf_storage::backend::MockCoverStore;
    use std::sync::Arc;

    fn context(catalog: MemoryCatalog, journal: &Journal) -> Context {
        let settings = MemorySettings::new(vec![], Bundle::new()).with_journal(journal.clone());
        let catalog = catalog.with_journal(journal.clone());
        Context::new(Arc::new(catalog), Arc::new(settings), Arc::new(MockCoverStore::default()))
    }

    fn database() -> tempfile::NamedTempFile {
        let database = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(database.path(), b"SQLite format 3\0rest of it").unwrap();
        database
    }

    #[test]
    fn test_database_copied() {
        let database = database();
        let journal = Journal::new();
        let ctx = context(MemoryCatalog::default().with_database(database.path()), &journal);

        let mut writer = SqliteArchiveWriter::new(Vec::new());
        let outcome = writer.write(&ctx, &ExportOptions::default(), &Progress::default()).unwrap();
        assert!(outcome.results.database);
        assert!(!outcome.cancelled);
        assert_eq!(outcome.actual, Entities::BOOKS);
        assert_eq!(journal.entries(), vec!["purge"]);
        assert!(ctx.settings.last_full_backup().unwrap().is_some());
        assert!(writer.out.is_none());
    }

    #[rstest]
    #[case::cancelled(Entities::ALL, true)]
    #[case::books_not_requested(Entities::STYLES | Entities::PREFERENCES, false)]
    fn test_nothing_copied(#[case] entities: Entities, #[case] cancelled: bool) {
        let database = database();
        let journal = Journal::new();
        let ctx = context(MemoryCatalog::default().with_database(database.path()), &journal);
        let progress = Progress::default();
        if cancelled {
            progress.cancel();
        }

        let mut out = Vec::new();
        let options = ExportOptions { entities, ..Default::default() };
        let outcome = SqliteArchiveWriter::new(&mut out).write(&ctx, &options, &progress).unwrap();
        assert_eq!(outcome.cancelled, cancelled);
        assert!(!outcome.results.database);
        assert_eq!(outcome.actual, Entities::NONE);
        assert!(out.is_empty());
        assert_eq!(journal.entries(), vec!["purge"]);
        assert!(ctx.settings.last_full_backup().unwrap().is_none());
    }

    #[test]
    fn test_no_database_file() {
        let ctx = context(MemoryCatalog::default(), &Journal::new());
        let mut writer = SqliteArchiveWriter::new(Vec::new());
        let err = writer.write(&ctx, &ExportOptions::default(), &Progress::default()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Catalog));
    }
}
