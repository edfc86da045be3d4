use crate::options::UpdatePolicy;
use crate::results::Action;
use shelf_catalog::error::Result;
use shelf_catalog::{Catalog, SettingsStore};
use shelf_record::models::Book;
use std::borrow::Cow;

/// Decides, book by book, whether an incoming row creates, updates or is
/// skipped, and applies that decision to the catalog.
pub(crate) struct BookImporter<'a> {
    catalog: &'a dyn Catalog,
    settings: &'a dyn SettingsStore,
    policy: UpdatePolicy,
}

impl<'a> BookImporter<'a> {
    pub(crate) fn new(catalog: &'a dyn Catalog, settings: &'a dyn SettingsStore, policy: UpdatePolicy) -> Self {
        Self { catalog, settings, policy }
    }

    /// Import one book.
    ///
    /// A UUID identifies the book across devices and always wins. Without
    /// one, the numeric id is only trusted to find a row exported from this
    /// very catalog. Ids are kept on insert whenever they are still free.
    pub(crate) fn import(&self, book: &Book) -> Result<Action> {
        let book = self.resolve_style(book)?;
        let uuid = book.uuid.as_deref().filter(|uuid| !uuid.is_empty());
        let existing = match (uuid, book.id) {
            (Some(uuid), _) => self.catalog.find_by_uuid(uuid)?,
            (None, Some(id)) if self.catalog.exists(id)? => Some(id),
            (None, _) => None,
        };
        match existing {
            Some(id) => self.update_or_skip(id, &book),
            None => {
                let keep_id = match book.id {
                    Some(id) => !self.catalog.exists(id)?,
                    None => false,
                };
                self.catalog.insert(&book, keep_id)?;
                Ok(Action::Created)
            },
        }
    }

    fn update_or_skip(&self, id: i64, book: &Book) -> Result<Action> {
        let overwrite = match self.policy {
            UpdatePolicy::Skip => false,
            UpdatePolicy::Overwrite => true,
            UpdatePolicy::OnlyNewer => match (book.last_updated, self.catalog.last_updated(id)?) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(incoming), Some(local)) => incoming > local,
            },
        };
        if !overwrite {
            return Ok(Action::Skipped);
        }
        self.catalog.update(id, book)?;
        Ok(Action::Updated)
    }

    /// Drop a style reference the settings store does not know about.
    fn resolve_style<'b>(&self, book: &'b Book) -> Result<Cow<'b, Book>> {
        match book.style.as_deref() {
            Some(uuid) if !self.settings.has_style(uuid)? => {
                tracing::debug!(style = uuid, title = %book.title, "dropping unknown style reference");
                Ok(Cow::Owned(Book { style: None, ..book.clone() }))
            },
            _ => Ok(Cow::Borrowed(book)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shelf_catalog::memory::{MemoryCatalog, MemorySettings};
    use shelf_record::models::{Bundle, Style};
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn book(title: &str, id: Option<i64>, uuid: Option<&str>) -> Book {
        Book { id, uuid: uuid.map(str::to_string), title: title.to_string(), ..Default::default() }
    }

    fn settings() -> MemorySettings {
        let style = Style { uuid: "known".to_string(), ..Default::default() };
        MemorySettings::new(vec![style], Bundle::new())
    }

    #[test]
    fn test_unknown_uuid_inserts_keeping_free_id() {
        let catalog = MemoryCatalog::default();
        let settings = settings();
        let importer = BookImporter::new(&catalog, &settings, UpdatePolicy::Skip);
        assert_eq!(importer.import(&book("Dune", Some(7), Some("u1"))).unwrap(), Action::Created);
        assert_eq!(catalog.get(7).unwrap().title, "Dune");
    }

    #[test]
    fn test_taken_id_gets_a_new_one() {
        let catalog = MemoryCatalog::with_books([book("Local", Some(7), Some("u0"))]);
        let settings = settings();
        let importer = BookImporter::new(&catalog, &settings, UpdatePolicy::Skip);
        assert_eq!(importer.import(&book("Remote", Some(7), Some("u1"))).unwrap(), Action::Created);
        assert_eq!(catalog.get(7).unwrap().title, "Local");
        assert_eq!(catalog.count().unwrap(), 2);
    }

    #[rstest]
    #[case(UpdatePolicy::Skip, Action::Skipped, "Old")]
    #[case(UpdatePolicy::Overwrite, Action::Updated, "New")]
    fn test_known_uuid(#[case] policy: UpdatePolicy, #[case] expected: Action, #[case] title: &str) {
        let catalog = MemoryCatalog::with_books([book("Old", Some(3), Some("u1"))]);
        let settings = settings();
        let importer = BookImporter::new(&catalog, &settings, policy);
        assert_eq!(importer.import(&book("New", Some(99), Some("u1"))).unwrap(), expected);
        assert_eq!(catalog.get(3).unwrap().title, title);
    }

    #[test]
    fn test_id_without_uuid_matches_existing_row() {
        let catalog = MemoryCatalog::with_books([book("Old", Some(3), None)]);
        let settings = settings();
        let importer = BookImporter::new(&catalog, &settings, UpdatePolicy::Overwrite);
        assert_eq!(importer.import(&book("New", Some(3), None)).unwrap(), Action::Updated);
        assert_eq!(importer.import(&book("Other", None, None)).unwrap(), Action::Created);
        assert_eq!(catalog.count().unwrap(), 2);
    }

    #[rstest]
    #[case(Some(datetime!(2024-02-01 00:00 UTC)), Action::Updated)]
    #[case(Some(datetime!(2024-01-01 00:00 UTC)), Action::Skipped)]
    #[case(Some(datetime!(2023-12-01 00:00 UTC)), Action::Skipped)]
    #[case(None, Action::Skipped)]
    fn test_only_newer(#[case] incoming: Option<OffsetDateTime>, #[case] expected: Action) {
        let local = Book { last_updated: Some(datetime!(2024-01-01 00:00 UTC)), ..book("Old", Some(1), Some("u1")) };
        let catalog = MemoryCatalog::with_books([local]);
        let settings = settings();
        let importer = BookImporter::new(&catalog, &settings, UpdatePolicy::OnlyNewer);
        let remote = Book { last_updated: incoming, ..book("New", None, Some("u1")) };
        assert_eq!(importer.import(&remote).unwrap(), expected);
    }

    #[test]
    fn test_unknown_style_is_cleared() {
        let catalog = MemoryCatalog::default();
        let settings = settings();
        let importer = BookImporter::new(&catalog, &settings, UpdatePolicy::Skip);
        let known = Book { style: Some("known".to_string()), ..book("A", Some(1), None) };
        let unknown = Book { style: Some("gone".to_string()), ..book("B", Some(2), None) };
        importer.import(&known).unwrap();
        importer.import(&unknown).unwrap();
        assert_eq!(catalog.get(1).unwrap().style.as_deref(), Some("known"));
        assert_eq!(catalog.get(2).unwrap().style, None);
    }
}
