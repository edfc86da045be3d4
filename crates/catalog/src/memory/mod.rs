//! In-memory collaborators for testing.

mod catalog;
mod journal;
mod settings;

pub use self::catalog::MemoryCatalog;
pub use self::journal::Journal;
pub use self::settings::MemorySettings;
