//! Container readers and writers.
//!
//! | Container | Read | Write |
//! |-----------|------|-------|
//! | Zip       | yes  | yes   |
//! | Tar       | yes  | no    |
//! | Csv       | yes  | yes   |
//! | Json      | yes  | yes   |
//! | Xml       | no   | yes   |
//! | SqliteDb  | no   | yes   |
//!
//! Anything else fails with the fixed "No reader/writer available" message.

mod csv;
mod json;
mod sqlite;
mod tar;
mod xml;
mod zip;

pub use self::csv::{CsvArchiveWriter, CsvCursor};
pub use self::json::{JsonArchiveWriter, JsonCursor};
pub use self::sqlite::SqliteArchiveWriter;
pub use self::tar::TarCursor;
pub use self::xml::XmlArchiveWriter;
pub use self::zip::{ZipArchiveWriter, ZipCursor};
use crate::cursor::{ArchiveSource, EntryCursor};
use crate::error::{ErrorKind, Result};
use crate::writer::ArchiveWriter;
use shelf_container::ArchiveContainer;
use std::fs::File;

/// Open an entry cursor over a source of the given kind.
pub fn open_cursor(kind: ArchiveContainer, source: &ArchiveSource) -> Result<Box<dyn EntryCursor>> {
    Ok(match kind {
        ArchiveContainer::Zip => Box::new(ZipCursor::new(source.open()?)?),
        ArchiveContainer::Tar => Box::new(TarCursor::new(source.open()?)?),
        ArchiveContainer::Csv => Box::new(CsvCursor::new(source.open()?)),
        ArchiveContainer::Json => Box::new(JsonCursor::new(source.open()?)?),
        ArchiveContainer::Xml
        | ArchiveContainer::SqliteDb
        | ArchiveContainer::RemoteServer
        | ArchiveContainer::Unknown => exn::bail!(ErrorKind::unsupported()),
    })
}

/// Create a writer of the given kind over an output file.
pub fn open_writer(kind: ArchiveContainer, out: File) -> Result<Box<dyn ArchiveWriter>> {
    Ok(match kind {
        ArchiveContainer::Zip => Box::new(ZipArchiveWriter::new(out)),
        ArchiveContainer::Csv => Box::new(CsvArchiveWriter::new(out)),
        ArchiveContainer::Json => Box::new(JsonArchiveWriter::new(out)),
        ArchiveContainer::Xml => Box::new(XmlArchiveWriter::new(out)?),
        ArchiveContainer::SqliteDb => Box::new(SqliteArchiveWriter::new(out)),
        ArchiveContainer::Tar | ArchiveContainer::RemoteServer | ArchiveContainer::Unknown => {
            exn::bail!(ErrorKind::unsupported())
        },
    })
}
