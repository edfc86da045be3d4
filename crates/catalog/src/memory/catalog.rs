use super::Journal;
use crate::error::{ErrorKind, Result};
use crate::{BookStream, Catalog};
use shelf_record::models::Book;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;

#[derive(Default)]
struct State {
    books: BTreeMap<i64, Book>,
    next_id: i64,
}

/// In-memory catalog keyed by local id.
///
/// # Examples
///
/// ```
/// use shelf_catalog::Catalog;
/// use shelf_catalog::memory::MemoryCatalog;
/// use shelf_record::models::Book;
///
/// let catalog = MemoryCatalog::default();
/// let id = catalog.insert(&Book { title: "Dune".to_string(), ..Default::default() }, false).unwrap();
/// assert!(catalog.exists(id).unwrap());
/// ```
#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
    database: Option<PathBuf>,
    journal: Option<Journal>,
}

impl MemoryCatalog {
    /// Pre-populate with books, assigning ids to those without one.
    ///
    /// Panics on a duplicate id or UUID.
    pub fn with_books(books: impl IntoIterator<Item = Book>) -> Self {
        let catalog = Self::default();
        for book in books {
            let keep_id = book.id.is_some();
            if let Err(err) = catalog.insert(&book, keep_id) {
                panic!("MemoryCatalog::with_books: {err:?}");
            }
        }
        catalog
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Pretend the catalog lives in this database file.
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(path.into());
        self
    }

    /// Snapshot of every book, in id order.
    pub fn books(&self) -> Vec<Book> {
        self.lock().books.values().cloned().collect()
    }

    pub fn get(&self, id: i64) -> Option<Book> {
        self.lock().books.get(&id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, entry: impl FnOnce() -> String) {
        if let Some(journal) = &self.journal {
            journal.record(entry());
        }
    }

    fn matches(book: &Book, since: Option<OffsetDateTime>) -> bool {
        match since {
            None => true,
            Some(since) => book.last_updated.is_some_and(|updated| updated > since),
        }
    }

    fn check_uuid(state: &State, book: &Book, except: Option<i64>) -> Result<()> {
        let Some(uuid) = book.uuid.as_deref().filter(|uuid| !uuid.is_empty()) else {
            return Ok(());
        };
        let taken = state.books.iter().any(|(id, other)| Some(*id) != except && other.uuid.as_deref() == Some(uuid));
        if taken {
            exn::bail!(ErrorKind::Constraint(format!("duplicate uuid {uuid}")));
        }
        Ok(())
    }
}

impl Catalog for MemoryCatalog {
    fn count_books_since(&self, since: Option<OffsetDateTime>) -> Result<u64> {
        Ok(self.lock().books.values().filter(|book| Self::matches(book, since)).count() as u64)
    }

    fn books_since(&self, since: Option<OffsetDateTime>) -> Result<BookStream<'_>> {
        let books: Vec<Book> = self.lock().books.values().filter(|book| Self::matches(book, since)).cloned().collect();
        Ok(Box::new(books.into_iter().map(Ok)))
    }

    fn purge(&self) -> Result<()> {
        let mut state = self.lock();
        state.books.retain(|_, book| !book.title.trim().is_empty());
        drop(state);
        self.record(|| "purge".to_string());
        Ok(())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.lock().books.len() as u64)
    }

    fn find_by_uuid(&self, uuid: &str) -> Result<Option<i64>> {
        let state = self.lock();
        Ok(state.books.iter().find(|(_, book)| book.uuid.as_deref() == Some(uuid)).map(|(id, _)| *id))
    }

    fn exists(&self, id: i64) -> Result<bool> {
        Ok(self.lock().books.contains_key(&id))
    }

    fn last_updated(&self, id: i64) -> Result<Option<OffsetDateTime>> {
        Ok(self.lock().books.get(&id).and_then(|book| book.last_updated))
    }

    fn insert(&self, book: &Book, keep_id: bool) -> Result<i64> {
        let mut state = self.lock();
        Self::check_uuid(&state, book, None)?;
        let id = match (keep_id, book.id) {
            (true, Some(id)) if id > 0 => {
                if state.books.contains_key(&id) {
                    exn::bail!(ErrorKind::Constraint(format!("duplicate id {id}")));
                }
                id
            },
            _ => state.next_id.max(state.books.keys().next_back().copied().unwrap_or(0)) + 1,
        };
        state.next_id = state.next_id.max(id);
        let now = OffsetDateTime::now_utc();
        let stored = Book {
            id: Some(id),
            date_added: book.date_added.or(Some(now)),
            last_updated: book.last_updated.or(Some(now)),
            ..book.clone()
        };
        state.books.insert(id, stored);
        drop(state);
        self.record(|| format!("insert:{}", book.title));
        Ok(id)
    }

    fn update(&self, id: i64, book: &Book) -> Result<()> {
        let mut state = self.lock();
        if !state.books.contains_key(&id) {
            exn::bail!(ErrorKind::BookNotFound(id));
        }
        Self::check_uuid(&state, book, Some(id))?;
        let stored = Book {
            id: Some(id),
            last_updated: book.last_updated.or(Some(OffsetDateTime::now_utc())),
            ..book.clone()
        };
        state.books.insert(id, stored);
        drop(state);
        self.record(|| format!("update:{}", book.title));
        Ok(())
    }

    fn database_path(&self) -> Option<&Path> {
        self.database.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn book(title: &str, uuid: Option<&str>) -> Book {
        Book { title: title.to_string(), uuid: uuid.map(str::to_string), ..Default::default() }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let catalog = MemoryCatalog::default();
        assert_eq!(catalog.insert(&book("A", None), false).unwrap(), 1);
        assert_eq!(catalog.insert(&book("B", None), false).unwrap(), 2);
        assert_eq!(catalog.count().unwrap(), 2);
    }

    #[test]
    fn test_insert_keeps_requested_id() {
        let catalog = MemoryCatalog::default();
        let incoming = Book { id: Some(42), ..book("A", None) };
        assert_eq!(catalog.insert(&incoming, true).unwrap(), 42);
        assert_eq!(catalog.insert(&book("B", None), false).unwrap(), 43);
        let err = catalog.insert(&incoming, true).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Constraint(_)));
    }

    #[test]
    fn test_duplicate_uuid_rejected() {
        let catalog = MemoryCatalog::with_books([book("A", Some("u1"))]);
        let err = catalog.insert(&book("B", Some("u1")), false).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Constraint(_)));
        assert_eq!(catalog.find_by_uuid("u1").unwrap(), Some(1));
    }

    #[test]
    fn test_update() {
        let catalog = MemoryCatalog::with_books([book("A", Some("u1"))]);
        catalog.update(1, &book("A2", Some("u1"))).unwrap();
        assert_eq!(catalog.get(1).unwrap().title, "A2");
        let err = catalog.update(9, &book("X", None)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::BookNotFound(9)));
    }

    #[test]
    fn test_books_since() {
        let old = Book { last_updated: Some(datetime!(2020-01-01 00:00 UTC)), ..book("Old", None) };
        let new = Book { last_updated: Some(datetime!(2024-01-01 00:00 UTC)), ..book("New", None) };
        let catalog = MemoryCatalog::with_books([old, new]);
        let since = Some(datetime!(2022-01-01 00:00 UTC));
        assert_eq!(catalog.count_books_since(since).unwrap(), 1);
        assert_eq!(catalog.count_books_since(None).unwrap(), 2);
        let titles: Vec<_> = catalog.books_since(since).unwrap().map(|b| b.unwrap().title).collect();
        assert_eq!(titles, vec!["New"]);
    }

    #[test]
    fn test_journal_records_mutations() {
        let journal = Journal::new();
        let catalog = MemoryCatalog::default().with_journal(journal.clone());
        catalog.insert(&book("A", None), false).unwrap();
        catalog.update(1, &book("B", None)).unwrap();
        catalog.purge().unwrap();
        assert_eq!(journal.entries(), vec!["insert:A", "update:B", "purge"]);
    }

    #[test]
    fn test_purge_drops_untitled() {
        let catalog = MemoryCatalog::with_books([book("A", None), book("  ", None)]);
        catalog.purge().unwrap();
        assert_eq!(catalog.count().unwrap(), 1);
    }
}
