use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Suffixes of files stored as covers.
pub(crate) const IMAGE_SUFFIXES: [&str; 5] = [".jpg", ".jpeg", ".png", ".webp", ".gif"];

/// Separator between elements of a multi-valued CSV field.
pub(crate) const LIST_SEPARATOR: char = '|';

// "Title (3)", "Title (3.5)", "Title (IV)"; the number is optional.
regex!(SERIES_REGEX, r"^(?P<title>.*?)\s*\((?P<number>[^()]+)\)\s*$");
// "Family, Given"; a name without a comma is all family name.
regex!(AUTHOR_REGEX, r"^(?P<family>[^,]*?)\s*(?:,\s*(?P<given>.*?))?\s*$");
