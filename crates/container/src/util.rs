use crate::ArchiveContainer;
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for ArchiveContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for ArchiveContainer {
    fn as_ref(&self) -> &'static str {
        self.as_str()
    }
}

impl ArchiveContainer {
    /// Returns the proposed file extension (including the leading dot) for
    /// files written in this container, or `None` if there is no file.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ArchiveContainer::Zip => Some(".zip"),
            ArchiveContainer::Tar => Some(".tar"),
            ArchiveContainer::Csv => Some(".csv"),
            ArchiveContainer::Json => Some(".json"),
            ArchiveContainer::Xml => Some(".xml"),
            ArchiveContainer::SqliteDb => Some(".db"),
            ArchiveContainer::RemoteServer | ArchiveContainer::Unknown => None,
        }
    }

    /// Returns the short name for configuration (for displaying to user)
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveContainer::Zip => "zip",
            ArchiveContainer::Tar => "tar",
            ArchiveContainer::Csv => "csv",
            ArchiveContainer::Json => "json",
            ArchiveContainer::Xml => "xml",
            ArchiveContainer::SqliteDb => "sqlite",
            ArchiveContainer::RemoteServer => "remote",
            ArchiveContainer::Unknown => "unknown",
        }
    }

    /// Whether this container is a single flat document rather than a set of
    /// named entries.
    #[inline]
    #[must_use]
    pub fn is_flat_document(&self) -> bool {
        matches!(self, ArchiveContainer::Csv | ArchiveContainer::Json | ArchiveContainer::Xml)
    }
}

#[cfg(test)]
mod tests {
    use crate::ArchiveContainer;
    use rstest::rstest;

    #[rstest]
    #[case(ArchiveContainer::Zip, Some(".zip"))]
    #[case(ArchiveContainer::Tar, Some(".tar"))]
    #[case(ArchiveContainer::Csv, Some(".csv"))]
    #[case(ArchiveContainer::Json, Some(".json"))]
    #[case(ArchiveContainer::Xml, Some(".xml"))]
    #[case(ArchiveContainer::SqliteDb, Some(".db"))]
    #[case(ArchiveContainer::RemoteServer, None)]
    #[case(ArchiveContainer::Unknown, None)]
    fn test_extension(#[case] container: ArchiveContainer, #[case] expected: Option<&str>) {
        assert_eq!(container.extension(), expected);
    }

    #[rstest]
    #[case(ArchiveContainer::Zip)]
    #[case(ArchiveContainer::Tar)]
    #[case(ArchiveContainer::Csv)]
    #[case(ArchiveContainer::Json)]
    #[case(ArchiveContainer::Xml)]
    #[case(ArchiveContainer::SqliteDb)]
    fn test_name_parses_back(#[case] container: ArchiveContainer) {
        assert_eq!(container.to_string().parse::<ArchiveContainer>().unwrap(), container);
    }
}
