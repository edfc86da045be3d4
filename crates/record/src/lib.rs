//! Records are the unit of content inside a shelf archive: the info header,
//! styles, preferences, books and covers. This crate knows what each record
//! looks like in every encoding it is written in, and nothing about the
//! container holding it.
//!
//! - [`RecordType`] and [`RecordEncoding`] classify an entry by its name.
//! - [`FormatVersion`] decides which encoding a record is written in.
//! - [`codec`] holds the CSV, JSON and XML serializers.

pub mod codec;
mod consts;
pub mod error;
pub mod models;
mod record;

pub use crate::record::{FormatVersion, RecordEncoding, RecordType};
