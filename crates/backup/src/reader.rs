//! Archive reading.
//!
//! Styles and preferences are looked for first, each with a seek followed by
//! a restart, since books may refer to them. The main pass then walks every
//! entry in order: covers go to the cover store, books to the catalog, and
//! anything already handled or unknown is passed over.

use crate::archive;
use crate::context::Context;
use crate::cover::CoverMaterializer;
use crate::cursor::{ArchiveSource, EntryCursor, RecordEntry};
use crate::error::{ErrorKind, Result};
use crate::options::{Entities, ImportOptions};
use crate::progress::ProgressListener;
use crate::records;
use crate::results::{Action, ImportOutcome};
use exn::ResultExt;
use shelf_container::ArchiveContainer;
use shelf_record::models::ArchiveMetaData;
use shelf_record::{FormatVersion, RecordEncoding, RecordType};
use std::io::Read;
use tracing::instrument;

pub struct ArchiveReader {
    kind: ArchiveContainer,
    cursor: Option<Box<dyn EntryCursor>>,
    /// `None` until looked for; `Some(None)` when there is no header.
    info: Option<Option<ArchiveMetaData>>,
}

impl ArchiveReader {
    /// Open a reader for a source already known to be of the given kind.
    pub fn open(kind: ArchiveContainer, source: &ArchiveSource) -> Result<Self> {
        Ok(Self::from_cursor(kind, archive::open_cursor(kind, source)?))
    }

    pub fn from_cursor(kind: ArchiveContainer, cursor: Box<dyn EntryCursor>) -> Self {
        Self { kind, cursor: Some(cursor), info: None }
    }

    #[must_use]
    pub fn kind(&self) -> ArchiveContainer {
        self.kind
    }

    fn cursor(&mut self) -> Result<&mut dyn EntryCursor> {
        match self.cursor.as_deref_mut() {
            Some(cursor) => Ok(cursor),
            None => exn::bail!(ErrorKind::Io),
        }
    }

    /// The archive header, or `None` for containers without one.
    ///
    /// Read on first use and cached. Leaves the cursor at the start.
    pub fn info(&mut self) -> Result<Option<&ArchiveMetaData>> {
        if self.info.is_none() {
            let cursor = self.cursor()?;
            cursor.restart()?;
            let header = match cursor.seek(&|entry| entry.record_type == RecordType::InfoHeader)? {
                Some(entry) => {
                    let header = records::read_header(&entry, &mut cursor.open_entry()?);
                    Some(header.or_raise(|| ErrorKind::invalid_header())?)
                },
                None => None,
            };
            cursor.restart()?;
            self.info = Some(header);
        }
        Ok(self.info.as_ref().and_then(Option::as_ref))
    }

    /// Cheap sanity check: a header with a version, or for single-document
    /// containers without a header, at least a books record.
    pub fn validate(&mut self) -> Result<()> {
        let has_header = match self.info()? {
            Some(meta) => {
                meta.validate().or_raise(|| ErrorKind::invalid_header())?;
                true
            },
            None => false,
        };
        if has_header {
            return Ok(());
        }
        if !self.kind.is_flat_document() {
            exn::bail!(ErrorKind::invalid_header());
        }
        let cursor = self.cursor()?;
        let books = cursor.seek(&|entry| entry.record_type == RecordType::Books)?;
        cursor.restart()?;
        match books {
            Some(_) => Ok(()),
            None => exn::bail!(ErrorKind::invalid_header()),
        }
    }

    /// The format version from the header, `None` when there is no header.
    pub fn version(&mut self) -> Result<Option<FormatVersion>> {
        let Some(number) = self.info()?.and_then(ArchiveMetaData::version) else {
            return Ok(None);
        };
        match FormatVersion::from_number(number) {
            Some(version) => Ok(Some(version)),
            None => exn::bail!(ErrorKind::InvalidArchive(format!("version={number}"))),
        }
    }

    /// Import the archive.
    ///
    /// Errors scoped to one record or one cover are logged and counted; only
    /// failures of the archive as a whole are returned, and not even those
    /// when cancellation was requested. The reader is closed afterwards
    /// either way.
    #[instrument(skip_all, fields(kind = %self.kind, entities = %options.entities, policy = ?options.policy))]
    pub fn read(
        &mut self,
        ctx: &Context,
        options: &ImportOptions,
        progress: &dyn ProgressListener,
    ) -> Result<ImportOutcome> {
        let mut outcome = ImportOutcome { requested: options.entities, ..Default::default() };
        let read = self.read_phases(ctx, options, progress, &mut outcome);
        if outcome.actual.contains(Entities::BOOKS)
            && let Err(err) = ctx.catalog.purge()
        {
            tracing::warn!(error = ?err, "cannot purge catalog after import");
        }
        self.close();
        outcome.cancelled = progress.is_cancelled();
        match read {
            Ok(()) => {},
            Err(err) if outcome.cancelled => {
                tracing::debug!(error = ?err, "import interrupted by cancellation");
            },
            Err(err) => return Err(err),
        }
        let results = &outcome.results;
        tracing::info!(
            books = ?results.books,
            covers = ?results.covers,
            styles = results.styles,
            preferences = results.preferences,
            failed = results.failed_lines.len(),
            cancelled = outcome.cancelled,
            "import finished"
        );
        Ok(outcome)
    }

    /// Release the underlying container. Further reads fail.
    pub fn close(&mut self) {
        self.cursor = None;
    }

    fn read_phases(
        &mut self,
        ctx: &Context,
        options: &ImportOptions,
        progress: &dyn ProgressListener,
        outcome: &mut ImportOutcome,
    ) -> Result<()> {
        self.validate()?;
        let version = self.version()?;
        let header = self.info()?;
        outcome.actual.insert(header.map_or(Entities::NONE, |_| Entities::INFO));
        let books = header.and_then(ArchiveMetaData::book_count).unwrap_or(0);
        let covers = header.and_then(ArchiveMetaData::cover_count).unwrap_or(books);
        progress.set_max(1 + books + covers);
        progress.publish(1, Some("header"));
        tracing::debug!(?version, books, covers, "archive header read");

        let wanted = options.entities;
        if wanted.contains(Entities::STYLES) && !progress.is_cancelled() {
            let styles =
                self.read_ahead(RecordType::Styles, |entry, body| records::read_styles(ctx, entry, body))?;
            if let Some(styles) = styles {
                outcome.results.styles += styles;
                outcome.actual.insert(Entities::STYLES);
            }
        }
        if wanted.contains(Entities::PREFERENCES) && !progress.is_cancelled() {
            let preferences =
                self.read_ahead(RecordType::Preferences, |entry, body| records::read_preferences(ctx, entry, body))?;
            if let Some(preferences) = preferences {
                outcome.results.preferences += preferences;
                outcome.actual.insert(Entities::PREFERENCES);
            }
        }

        let materializer = CoverMaterializer::new(&*ctx.covers, ctx.config.min_cover_size, options.policy);
        let cursor = self.cursor()?;
        cursor.restart()?;
        while !progress.is_cancelled()
            && let Some(entry) = cursor.next_entry()?
        {
            match entry.record_type {
                RecordType::Cover if wanted.contains(Entities::COVERS) => {
                    let action = match cursor.open_entry() {
                        Ok(mut body) => materializer.materialize(&entry, &mut body),
                        Err(err) => {
                            tracing::warn!(cover = %entry.name, error = ?err, "cannot open cover entry");
                            Action::Skipped
                        },
                    };
                    outcome.results.covers.record(action);
                    outcome.actual.insert(Entities::COVERS);
                    progress.publish(1, Some(&entry.name));
                },
                RecordType::Books if wanted.contains(Entities::BOOKS) && entry.encoding != RecordEncoding::Xml => {
                    let mut body = cursor.open_entry()?;
                    match records::read_books(ctx, &entry, &mut body, options.policy, progress) {
                        Ok(results) => {
                            outcome.results.add(results);
                            outcome.actual.insert(Entities::BOOKS);
                        },
                        Err(err) if matches!(&*err, ErrorKind::ImportParsing(_)) => {
                            tracing::warn!(record = %entry.name, error = ?err, "skipping unreadable books record");
                        },
                        Err(err) => return Err(err),
                    }
                },
                RecordType::InfoHeader | RecordType::Styles | RecordType::Preferences => {},
                _ => tracing::debug!(entry = %entry.name, "skipping entry"),
            }
        }
        Ok(())
    }

    /// Seek to the first record of a type and hand it to `read`, then
    /// restart. `None` when there is no such record or it could not be
    /// parsed.
    fn read_ahead(
        &mut self,
        kind: RecordType,
        read: impl FnOnce(&RecordEntry, &mut dyn Read) -> Result<u64>,
    ) -> Result<Option<u64>> {
        let cursor = self.cursor()?;
        cursor.restart()?;
        let applied = match cursor.seek(&|entry| entry.record_type == kind)? {
            Some(entry) => match read(&entry, &mut cursor.open_entry()?) {
                Ok(applied) => Some(applied),
                Err(err) if matches!(&*err, ErrorKind::ImportParsing(_)) => {
                    tracing::warn!(record = %entry.name, error = ?err, "skipping unreadable record");
                    None
                },
                Err(err) => return Err(err),
            },
            None => None,
        };
        cursor.restart()?;
        Ok(applied)
    }
}
