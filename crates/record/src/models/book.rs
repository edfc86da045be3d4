use crate::consts::{AUTHOR_REGEX, SERIES_REGEX};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use time::OffsetDateTime;

/// A book row as exported from, and imported into, the catalog.
///
/// Both identifiers are optional: the numeric `id` is only meaningful to the
/// catalog that exported it, while the `uuid` is stable across devices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub title: String,
    pub isbn: Option<String>,
    pub authors: Vec<Author>,
    pub series: Vec<Series>,
    pub publishers: Vec<String>,
    pub bookshelves: Vec<String>,
    pub pages: Option<u32>,
    pub date_published: Option<String>,
    pub language: Option<String>,
    pub read: bool,
    pub rating: Option<f32>,
    /// UUID of the book-list style assigned to this book.
    pub style: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub date_added: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_updated: Option<OffsetDateTime>,
}

impl Book {
    /// Names of the cover files that may belong to this book, front first.
    #[must_use]
    pub fn cover_names(&self) -> Vec<String> {
        match &self.uuid {
            Some(uuid) if !uuid.is_empty() => vec![format!("{uuid}.jpg"), format!("{uuid}_1.jpg")],
            _ => vec![],
        }
    }
}

/// An author, written as `Family, Given`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    pub family_name: String,
    pub given_names: String,
}

impl Display for Author {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.given_names.is_empty() {
            true => write!(f, "{}", self.family_name),
            false => write!(f, "{}, {}", self.family_name, self.given_names),
        }
    }
}

impl FromStr for Author {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = AUTHOR_REGEX.captures(s.trim());
        let part = |name| {
            captures.as_ref().and_then(|c| c.name(name)).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
        };
        Ok(Author { family_name: part("family"), given_names: part("given") })
    }
}

/// A series the book belongs to, written as `Title (number)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Series {
    pub title: String,
    /// Position in the series. Free text: "3", "3.5", "IV".
    pub number: Option<String>,
}

impl Display for Series {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.number {
            Some(number) => write!(f, "{} ({number})", self.title),
            None => write!(f, "{}", self.title),
        }
    }
}

impl FromStr for Series {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match SERIES_REGEX.captures(s) {
            Some(c) => Series {
                title: c.name("title").map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
                number: c.name("number").map(|m| m.as_str().trim().to_string()),
            },
            None => Series { title: s.to_string(), number: None },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Dune Chronicles (1)", "Dune Chronicles", Some("1"))]
    #[case("Discworld (3.5)", "Discworld", Some("3.5"))]
    #[case("Standalone", "Standalone", None)]
    #[case("  Padded  (IV) ", "Padded", Some("IV"))]
    fn test_series_from_str(#[case] input: &str, #[case] title: &str, #[case] number: Option<&str>) {
        let series: Series = input.parse().unwrap();
        assert_eq!(series.title, title);
        assert_eq!(series.number.as_deref(), number);
    }

    #[rstest]
    #[case("Herbert, Frank", "Herbert", "Frank")]
    #[case("Le Guin, Ursula K.", "Le Guin", "Ursula K.")]
    #[case("Homer", "Homer", "")]
    fn test_author_from_str(#[case] input: &str, #[case] family: &str, #[case] given: &str) {
        let author: Author = input.parse().unwrap();
        assert_eq!(author.family_name, family);
        assert_eq!(author.given_names, given);
        assert_eq!(author.to_string(), input);
    }

    #[test]
    fn test_cover_names() {
        let book = Book { uuid: Some("abc".to_string()), ..Default::default() };
        assert_eq!(book.cover_names(), vec!["abc.jpg".to_string(), "abc_1.jpg".to_string()]);
        assert!(Book::default().cover_names().is_empty());
    }
}
