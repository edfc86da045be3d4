//! Entry points: one archive in, or one archive out.

use crate::archive;
use crate::context::Context;
use crate::cursor::ArchiveSource;
use crate::error::{ErrorKind, Result};
use crate::options::{ExportOptions, ImportOptions};
use crate::progress::ProgressListener;
use crate::reader::ArchiveReader;
use crate::results::{ExportOutcome, ImportOutcome};
use exn::ResultExt;
use shelf_config::BackupConfig;
use shelf_container::ArchiveContainer;
use shelf_record::models::ArchiveMetaData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use time::{Date, OffsetDateTime};
use tracing::instrument;

/// Imports one archive.
///
/// The container kind is detected on first use unless given up front, and
/// the header is cached so that previewing an archive and then importing it
/// only reads the header once per helper.
#[derive(Debug)]
pub struct ImportHelper {
    source: ArchiveSource,
    kind: Option<ArchiveContainer>,
    info: Option<Option<ArchiveMetaData>>,
}

impl ImportHelper {
    pub fn new(source: ArchiveSource) -> Self {
        Self { source, kind: None, info: None }
    }

    /// Skip detection and treat the source as this kind.
    pub fn with_container(mut self, kind: ArchiveContainer) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn source(&self) -> &ArchiveSource {
        &self.source
    }

    pub fn container(&mut self) -> Result<ArchiveContainer> {
        let kind = match self.kind {
            Some(kind) => kind,
            None => {
                let kind = self.source.detect()?;
                tracing::debug!(source = ?self.source, %kind, "container detected");
                self.kind = Some(kind);
                kind
            },
        };
        match kind {
            ArchiveContainer::Unknown => exn::bail!(ErrorKind::unsupported()),
            kind => Ok(kind),
        }
    }

    /// The archive header without importing anything. `None` for containers
    /// that have no header.
    pub fn info(&mut self) -> Result<Option<&ArchiveMetaData>> {
        if self.info.is_none() {
            let mut reader = ArchiveReader::open(self.container()?, &self.source)?;
            let info = reader.info()?.cloned();
            reader.close();
            self.info = Some(info);
        }
        Ok(self.info.as_ref().and_then(Option::as_ref))
    }

    /// When the archive was written, if its header says so.
    pub fn archive_creation_date(&mut self) -> Result<Option<OffsetDateTime>> {
        Ok(self.info()?.and_then(ArchiveMetaData::created))
    }

    #[instrument(skip_all, fields(source = ?self.source))]
    pub fn import(
        &mut self,
        ctx: &Context,
        options: &ImportOptions,
        progress: &dyn ProgressListener,
    ) -> Result<ImportOutcome> {
        let kind = self.container()?;
        ArchiveReader::open(kind, &self.source)?.read(ctx, options, progress)
    }
}

/// Exports to one destination file.
///
/// The archive is written to a temporary file in the destination's directory
/// and only moved into place once the write succeeded and was not cancelled.
/// A failed or cancelled export leaves the destination untouched.
#[derive(Debug)]
pub struct ExportHelper {
    destination: PathBuf,
    kind: ArchiveContainer,
}

impl ExportHelper {
    pub fn new(destination: impl Into<PathBuf>, kind: ArchiveContainer) -> Self {
        Self { destination: destination.into(), kind }
    }

    /// Export into `directory` using the configured container and a dated
    /// default file name.
    pub fn from_config(directory: impl AsRef<Path>, config: &BackupConfig) -> Result<Self> {
        let name = Self::file_name(config.container, OffsetDateTime::now_utc().date())?;
        Ok(Self::new(directory.as_ref().join(name), config.container))
    }

    /// Default file name for an export made on `date`, e.g.
    /// `shelf-2024-03-01.zip`.
    pub fn file_name(kind: ArchiveContainer, date: Date) -> Result<String> {
        let Some(extension) = kind.extension() else {
            exn::bail!(ErrorKind::unsupported());
        };
        Ok(format!("shelf-{:04}-{:02}-{:02}{extension}", date.year(), u8::from(date.month()), date.day()))
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    #[must_use]
    pub fn kind(&self) -> ArchiveContainer {
        self.kind
    }

    #[instrument(skip_all, fields(destination = %self.destination.display(), kind = %self.kind))]
    pub fn export(
        &self,
        ctx: &Context,
        options: &ExportOptions,
        progress: &dyn ProgressListener,
    ) -> Result<ExportOutcome> {
        let directory = match self.destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(directory).or_raise(|| ErrorKind::Io)?;
        let mut writer = archive::open_writer(self.kind, temp.reopen().or_raise(|| ErrorKind::Io)?)?;
        let outcome = writer.write(ctx, options, progress)?;
        drop(writer);

        if outcome.cancelled {
            tracing::debug!(temp = %temp.path().display(), "export cancelled, discarding output");
            return Ok(outcome);
        }
        temp.persist(&self.destination).or_raise(|| ErrorKind::Io)?;
        tracing::debug!("export promoted to destination");
        Ok(outcome)
    }
}
