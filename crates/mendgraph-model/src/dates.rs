//! Date-valued properties (`<DateCreated val="2011-2-2 19:39:28.829"/>`).

use chrono::NaiveDateTime;

/// Properties whose `val` attribute holds a timestamp.
pub const DATE_PROPERTIES: &[&str] = &["DateCreated", "DateModified", "DateResolved", "DateOfEvent"];

/// Value written over a timestamp that cannot be parsed.
pub const ZERO_DATE: &str = "0001-01-01 00:00:00.000";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

pub fn is_date_property(name: &str) -> bool {
    DATE_PROPERTIES.contains(&name)
}

/// Whether `value` parses as a stored timestamp. Month, day and time fields
/// may be written without zero padding.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}
