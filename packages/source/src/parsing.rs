//! Shared field parsing for the government datasets.

use chrono::NaiveDate;

/// Parses a yes/no flag: `1`/`0`, `true`/`false`, `Y`/`N` (any case).
#[must_use]
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "y" | "yes" => Some(true),
        "0" | "false" | "n" | "no" => Some(false),
        _ => None,
    }
}

/// Parses `YYYY-MM-DD` or `M/D/YYYY`. A trailing time part is ignored.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    let date = text.split_whitespace().next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%m/%d/%Y"))
        .ok()
}

/// Trims a raw field, returning `None` when nothing is left.
#[must_use]
pub fn non_empty(raw: &str) -> Option<&str> {
    let text = raw.trim();
    if text.is_empty() { None } else { Some(text) }
}
