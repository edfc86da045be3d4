//! Restartable, ordered access to the entries of a container.
//!
//! Readers first look for styles and preferences, then rewind and walk every
//! entry in order. Containers therefore need exactly two primitives: step to
//! the next entry, and restart from the first one. Sources that cannot be
//! rewound are turned away when the cursor is built, never mid-read.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelf_container::ArchiveContainer;
use shelf_record::{RecordEncoding, RecordType};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;

/// A readable, seekable byte source.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// One named entry inside a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordEntry {
    pub name: String,
    pub record_type: RecordType,
    pub encoding: RecordEncoding,
    /// Modification time recorded by the container, if any.
    pub modified: Option<OffsetDateTime>,
    pub size: Option<u64>,
}

impl RecordEntry {
    /// Classify an entry by its name.
    pub fn new(name: impl Into<String>, modified: Option<OffsetDateTime>, size: Option<u64>) -> Self {
        let name = name.into();
        Self {
            record_type: RecordType::from_name(&name),
            encoding: RecordEncoding::from_name(&name),
            name,
            modified,
            size,
        }
    }

    /// The bare file name, without any directories the container put in front.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.name.rsplit(['/', '\\']).next().unwrap_or(&self.name)
    }
}

/// Reject entry names that could point outside of wherever they are
/// extracted to.
pub(crate) fn check_entry_name(name: &str) -> Result<()> {
    let escapes = Path::new(name)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes || name.contains('\0') {
        exn::bail!(ErrorKind::Security(format!("unsafe entry name: {name}")));
    }
    Ok(())
}

pub trait EntryCursor {
    /// Step to the next entry, `None` once past the last one.
    fn next_entry(&mut self) -> Result<Option<RecordEntry>>;

    /// Open the body of the entry most recently returned by
    /// [`next_entry`](Self::next_entry).
    fn open_entry(&mut self) -> Result<Box<dyn Read + '_>>;

    /// Go back to before the first entry.
    fn restart(&mut self) -> Result<()>;

    /// Step forward to the next entry matching `predicate`.
    fn seek(&mut self, predicate: &dyn Fn(&RecordEntry) -> bool) -> Result<Option<RecordEntry>> {
        while let Some(entry) = self.next_entry()? {
            if predicate(&entry) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

/// Where an archive to import comes from.
#[derive(Clone)]
pub enum ArchiveSource {
    File(PathBuf),
    /// Bytes already in memory, with an optional display name used as a
    /// detection fallback.
    Memory { name: Option<String>, data: Arc<[u8]> },
}

impl Debug for ArchiveSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArchiveSource::File(path) => write!(f, "File({})", path.display()),
            ArchiveSource::Memory { name, data } => write!(f, "Memory({name:?}, {} bytes)", data.len()),
        }
    }
}

impl ArchiveSource {
    pub fn memory(name: Option<&str>, data: impl Into<Arc<[u8]>>) -> Self {
        ArchiveSource::Memory { name: name.map(str::to_string), data: data.into() }
    }

    /// Open a fresh stream positioned at the start.
    pub fn open(&self) -> Result<Box<dyn ReadSeek>> {
        match self {
            ArchiveSource::File(path) => {
                let file = File::open(path).or_raise(|| ErrorKind::Io)?;
                Ok(Box::new(file))
            },
            ArchiveSource::Memory { data, .. } => Ok(Box::new(Cursor::new(Arc::clone(data)))),
        }
    }

    pub fn detect(&self) -> Result<ArchiveContainer> {
        match self {
            ArchiveSource::File(path) => ArchiveContainer::detect_path(path).or_raise(|| ErrorKind::Container),
            ArchiveSource::Memory { name, data } => Ok(ArchiveContainer::detect(&data[..], name.as_deref())),
        }
    }
}
