//! Pure per-encoding serializers.
//!
//! Nothing in here knows about containers or collaborators: each codec turns
//! domain models into bytes on a [`Write`](std::io::Write) and back from a
//! [`Read`](std::io::Read).

pub mod csv;
pub mod json;
pub mod xml;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Parse a timestamp as written by this or an older release.
///
/// RFC 3339 is current; the bare `YYYY-MM-DD HH:MM:SS` form is what older
/// database exports used and is taken to be UTC.
pub(crate) fn parse_timestamp(field: &'static str, value: &str) -> Result<OffsetDateTime> {
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(parsed);
    }
    PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .map(PrimitiveDateTime::assume_utc)
        .or_raise(|| ErrorKind::ParseError { field, value: value.to_string() })
}

pub(crate) fn format_timestamp(field: &'static str, value: &OffsetDateTime) -> Result<String> {
    value.format(&Rfc3339).or_raise(|| ErrorKind::ParseError { field, value: value.to_string() })
}
