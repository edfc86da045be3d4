//! What an import or export should touch, and how.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::{BitOr, BitOrAssign};

/// A set of entity kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Entities(u8);

impl Entities {
    pub const NONE: Entities = Entities(0);
    pub const INFO: Entities = Entities(1);
    pub const BOOKS: Entities = Entities(1 << 1);
    pub const COVERS: Entities = Entities(1 << 2);
    pub const PREFERENCES: Entities = Entities(1 << 3);
    pub const STYLES: Entities = Entities(1 << 4);
    pub const ALL: Entities = Entities(0b1_1111);

    const NAMES: [(Entities, &'static str); 5] = [
        (Entities::INFO, "info"),
        (Entities::BOOKS, "books"),
        (Entities::COVERS, "covers"),
        (Entities::PREFERENCES, "preferences"),
        (Entities::STYLES, "styles"),
    ];

    #[inline]
    #[must_use]
    pub fn contains(&self, other: Entities) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Entities) {
        self.0 |= other.0;
    }

    #[must_use]
    pub fn intersection(&self, other: Entities) -> Entities {
        Entities(self.0 & other.0)
    }
}

impl BitOr for Entities {
    type Output = Entities;
    fn bitor(self, rhs: Self) -> Self::Output {
        Entities(self.0 | rhs.0)
    }
}

impl BitOrAssign for Entities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl Display for Entities {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let names: Vec<_> =
            Self::NAMES.iter().filter(|(bit, _)| self.contains(*bit)).map(|(_, name)| *name).collect();
        match names.is_empty() {
            true => write!(f, "none"),
            false => write!(f, "{}", names.join("|")),
        }
    }
}

/// What to do with an incoming book or cover that already exists locally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpdatePolicy {
    /// Keep the local copy.
    #[default]
    Skip,
    /// Always replace the local copy.
    Overwrite,
    /// Replace the local copy only when the incoming one is newer. Books
    /// compare last-updated dates, covers compare modified times.
    OnlyNewer,
}

impl UpdatePolicy {
    #[inline]
    #[must_use]
    pub fn may_overwrite(&self) -> bool {
        !matches!(self, UpdatePolicy::Skip)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    pub entities: Entities,
    pub policy: UpdatePolicy,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { entities: Entities::ALL, policy: UpdatePolicy::default() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    pub entities: Entities,
    /// Only export books changed since the last full backup.
    pub incremental: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { entities: Entities::ALL, incremental: false }
    }
}
