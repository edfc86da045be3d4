mod book;
mod meta;
mod style;
mod value;

pub use self::book::{Author, Book, Series};
pub use self::meta::{ArchiveMetaData, SourceApp};
pub use self::style::Style;
pub use self::value::{Bundle, Value};

/// Header keys.
pub mod keys {
    pub use super::meta::{
        APP_PACKAGE, APP_VERSION_CODE, APP_VERSION_NAME, ARCHIVE_VERSION, BOOK_COUNT, COVER_COUNT, CREATE_DATE,
        DATABASE_VERSION, HAS_PREFERENCES, HAS_STYLES, PLATFORM,
    };
}
