//! The narrow view of the catalog database and the settings store that
//! archive import and export need.
//!
//! The catalog itself (schema, DAOs, migrations) lives elsewhere; this crate
//! only defines the boundary:
//! - [`Catalog`]: count, stream, insert and update book rows, and purge.
//! - [`SettingsStore`]: book-list styles and preferences as flat bundles, and
//!   the date of the last full backup.
//!
//! With the `mock` feature, in-memory implementations of both are available
//! for tests, optionally sharing a [`Journal`](memory::Journal) that records
//! every mutating call in order.

mod catalog;
pub mod error;
#[cfg(feature = "mock")]
pub mod memory;
mod settings;

pub use crate::catalog::{BookStream, Catalog};
pub use crate::settings::SettingsStore;
use std::sync::Arc;

pub type CatalogHandle = Arc<dyn Catalog + Send + Sync>;
pub type SettingsHandle = Arc<dyn SettingsStore + Send + Sync>;
