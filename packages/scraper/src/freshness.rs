//! Staleness decisions for cached pages.
//!
//! A page is stale when the date the site advertises for it is strictly
//! newer than the newest local file matching its filename pattern. Local
//! dates come from filesystem modification times, never from content.

use std::path::Path;
use std::sync::LazyLock;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDate};
use regex::Regex;

use crate::ScrapeError;

/// Two-digit years that land past this year belong to the previous century.
pub const YEAR_PIVOT: i32 = 2050;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)/(\d+)/(\d+)").expect("valid regex"));

/// Freshness of a target with no local copy at all (`0001-01-01`).
#[must_use]
pub fn epoch_zero() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Pulls a year past [`YEAR_PIVOT`] back by one century.
#[must_use]
pub const fn pivot_year(year: i32) -> i32 {
    if year > YEAR_PIVOT { year - 100 } else { year }
}

/// Extracts the first `M/D/YY` date from a page fragment.
///
/// Two-digit years are read as `20YY` before the pivot is applied, so
/// `8/5/97` is 1997 and `3/4/08` is 2008. Longer years are taken verbatim
/// and pivoted the same way.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] if no date-shaped text is present or the
/// first match is not a real calendar date.
pub fn remote_last_modified(fragment: &str) -> Result<NaiveDate, ScrapeError> {
    let caps = DATE_RE
        .captures(fragment)
        .ok_or_else(|| ScrapeError::Parse("no M/D/YY date in fragment".to_owned()))?;

    let text = &caps[0];
    let invalid = || ScrapeError::Parse(format!("invalid date {text:?}"));

    let month: u32 = caps[1].parse().map_err(|_| invalid())?;
    let day: u32 = caps[2].parse().map_err(|_| invalid())?;
    let year_digits = &caps[3];
    let nominal: i32 = year_digits.parse().map_err(|_| invalid())?;
    let nominal = if year_digits.len() <= 2 {
        2000 + nominal
    } else {
        nominal
    };

    NaiveDate::from_ymd_opt(pivot_year(nominal), month, day).ok_or_else(invalid)
}

/// Local calendar date of a modification time.
#[must_use]
pub fn local_date(time: SystemTime) -> NaiveDate {
    DateTime::<Local>::from(time).date_naive()
}

/// Newest modification date among files in `dir` whose names match the
/// glob `pattern`.
///
/// Returns [`epoch_zero`] when nothing matches or `dir` does not exist yet.
///
/// # Errors
///
/// Returns [`ScrapeError::Pattern`] for a malformed glob and
/// [`ScrapeError::Io`] if the directory cannot be listed.
pub fn local_freshness(dir: &Path, pattern: &str) -> Result<NaiveDate, ScrapeError> {
    let matcher = glob::Pattern::new(pattern).map_err(|source| ScrapeError::Pattern {
        pattern: pattern.to_owned(),
        source,
    })?;

    if !dir.is_dir() {
        return Ok(epoch_zero());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ScrapeError::io(dir, e))?;

    let mut newest: Option<SystemTime> = None;
    for entry in entries {
        let entry = entry.map_err(|e| ScrapeError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !matcher.matches(name) {
            continue;
        }

        let path = entry.path();
        let metadata = match std::fs::metadata(&path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => return Err(ScrapeError::io(&path, e)),
        };
        let modified = metadata
            .modified()
            .map_err(|e| ScrapeError::io(&path, e))?;

        if newest.is_none_or(|n| modified > n) {
            newest = Some(modified);
        }
    }

    Ok(newest.map_or_else(epoch_zero, local_date))
}

/// A target is fetched iff the remote date is strictly newer than the
/// local one.
#[must_use]
pub fn is_stale(remote: NaiveDate, local: NaiveDate) -> bool {
    remote > local
}
