use crate::error::Result;
use shelf_record::models::Book;
use std::path::Path;
use time::OffsetDateTime;

/// Book rows in export order.
pub type BookStream<'a> = Box<dyn Iterator<Item = Result<Book>> + 'a>;

/// Book data access needed by archive import and export.
///
/// `since` filters on a book's last-updated date, strictly after. `None`
/// means every book.
pub trait Catalog: Send + Sync {
    /// Number of books an export since `since` would contain.
    fn count_books_since(&self, since: Option<OffsetDateTime>) -> Result<u64>;

    /// Stream the books an export since `since` would contain.
    fn books_since(&self, since: Option<OffsetDateTime>) -> Result<BookStream<'_>>;

    /// Remove stale rows. Run before every export and after every import.
    fn purge(&self) -> Result<()>;

    /// Total number of books.
    fn count(&self) -> Result<u64>;

    /// Local id of the book with the given UUID.
    fn find_by_uuid(&self, uuid: &str) -> Result<Option<i64>>;

    fn exists(&self, id: i64) -> Result<bool>;

    /// Last-updated date of a book, `None` if the book is unknown or was
    /// never stamped.
    fn last_updated(&self, id: i64) -> Result<Option<OffsetDateTime>>;

    /// Insert a new book and return its local id.
    ///
    /// With `keep_id`, the incoming `book.id` is re-used; the caller has
    /// already checked it is free.
    fn insert(&self, book: &Book, keep_id: bool) -> Result<i64>;

    /// Replace the data of an existing book, keeping its local id.
    fn update(&self, id: i64, book: &Book) -> Result<()>;

    /// Location of the database file, for containers that copy it whole.
    fn database_path(&self) -> Option<&Path> {
        None
    }
}
