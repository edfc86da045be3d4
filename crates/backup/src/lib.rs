//! Backup, export and import of the book catalog as archives.
//!
//! An export walks the catalog and settings store and writes whatever the
//! chosen container supports: a header, styles, preferences, books and cover
//! images, in that order. An import does the reverse, applying styles and
//! preferences before any book that might refer to them.
//!
//! [`ImportHelper`] and [`ExportHelper`] are the usual entry points; the
//! [`ArchiveReader`] and [`ArchiveWriter`] underneath can be driven directly
//! for containers built in memory.

pub mod archive;
mod books;
mod context;
mod cover;
mod cursor;
pub mod error;
mod helper;
mod options;
mod progress;
mod reader;
mod records;
mod report;
mod results;
mod writer;

pub use crate::context::Context;
pub use crate::cursor::{ArchiveSource, EntryCursor, ReadSeek, RecordEntry};
pub use crate::helper::{ExportHelper, ImportHelper};
pub use crate::options::{Entities, ExportOptions, ImportOptions, UpdatePolicy};
pub use crate::progress::{Progress, ProgressListener};
pub use crate::reader::ArchiveReader;
pub use crate::report::{DEFAULT_TEMPLATE_EXPORT, DEFAULT_TEMPLATE_IMPORT, ReportRenderer};
pub use crate::results::{
    Action, Counts, ExportOutcome, ExportResults, FailedLine, ImportOutcome, ImportResults, Outcome,
};
pub use crate::writer::{ArchiveWriter, BookSpool, WriterCapabilities};
