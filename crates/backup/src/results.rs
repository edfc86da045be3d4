//! Outcome accounting.
//!
//! Every sub-operation returns only what it touched itself; the caller folds
//! them together with `add`, which is commutative and associative over the
//! totals.

use crate::options::Entities;
use std::ops::{Add, AddAssign};

/// Created/updated/skipped tallies for one kind of entity.
///
/// Every processed item resolves to exactly one of the three, so
/// `processed == created + updated + skipped` always holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
}

/// How one incoming book or cover was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Skipped,
}

impl Counts {
    pub fn record(&mut self, action: Action) {
        match action {
            Action::Created => self.created(),
            Action::Updated => self.updated(),
            Action::Skipped => self.skipped(),
        }
    }

    pub fn created(&mut self) {
        self.processed += 1;
        self.created += 1;
    }

    pub fn updated(&mut self) {
        self.processed += 1;
        self.updated += 1;
    }

    pub fn skipped(&mut self) {
        self.processed += 1;
        self.skipped += 1;
    }
}

impl Add for Counts {
    type Output = Counts;
    fn add(self, rhs: Self) -> Self::Output {
        Counts {
            processed: self.processed + rhs.processed,
            created: self.created + rhs.created,
            updated: self.updated + rhs.updated,
            skipped: self.skipped + rhs.skipped,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// A row that could not be imported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedLine {
    pub line: u64,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportResults {
    pub books: Counts,
    pub covers: Counts,
    pub styles: u64,
    pub preferences: u64,
    /// Failed book rows, also counted in `books.skipped`.
    pub failed_lines: Vec<FailedLine>,
}

impl ImportResults {
    pub fn add(&mut self, other: ImportResults) {
        self.books += other.books;
        self.covers += other.covers;
        self.styles += other.styles;
        self.preferences += other.preferences;
        self.failed_lines.extend(other.failed_lines);
        self.failed_lines.sort_by_key(|failed| failed.line);
    }

    /// Record a book row that failed, as skipped.
    pub fn book_failed(&mut self, line: u64, message: impl Into<String>) {
        self.books.skipped();
        self.failed_lines.push(FailedLine { line, message: message.into() });
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportResults {
    /// Local ids of exported books, in export order.
    pub books: Vec<i64>,
    /// Names of exported cover files, in export order.
    pub covers: Vec<String>,
    /// Listed covers that could not be read or written.
    pub skipped_covers: Vec<String>,
    pub styles: u64,
    pub preferences: u64,
    /// Whether the raw database file was included.
    pub database: bool,
}

impl ExportResults {
    pub fn add(&mut self, other: ExportResults) {
        self.books.extend(other.books);
        self.covers.extend(other.covers);
        self.skipped_covers.extend(other.skipped_covers);
        self.styles += other.styles;
        self.preferences += other.preferences;
        self.database |= other.database;
    }

    #[must_use]
    pub fn book_count(&self) -> u64 {
        self.books.len() as u64
    }

    #[must_use]
    pub fn cover_count(&self) -> u64 {
        self.covers.len() as u64
    }
}

/// What an operation was asked to do, what it did, and how it went.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome<R> {
    pub requested: Entities,
    pub actual: Entities,
    pub cancelled: bool,
    pub results: R,
}

pub type ImportOutcome = Outcome<ImportResults>;
pub type ExportOutcome = Outcome<ExportResults>;
