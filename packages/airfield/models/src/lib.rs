#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Airfield record types shared across the airfield-recon toolchain.
//!
//! Every data source (the mirrored historical site, the BTS master
//! coordinate list, the NFDC facility file) decodes into
//! [`AirfieldRecord`]s. Records whose coordinates cannot be validated are
//! kept alongside the good ones as [`InvalidRecord`]s so that callers can
//! report skip counts instead of silently dropping rows.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which dataset produced a record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordSource {
    /// Pages mirrored from the abandoned-airfields site.
    Site,
    /// BTS master coordinate list (reference dataset A).
    Bts,
    /// FAA NFDC facility file (reference dataset B).
    Nfdc,
}

/// Operational status flag carried by the government datasets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacilityStatus {
    Open,
    Closed,
}

/// Which candidates take part in a reconciliation pass, by status.
///
/// Records with no status only take part in [`MatchMode::All`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchMode {
    /// Every candidate, regardless of status.
    #[default]
    All,
    /// Only candidates flagged closed.
    Closed,
    /// Only candidates flagged open.
    Open,
}

impl MatchMode {
    /// Returns `true` if a candidate with the given status takes part.
    #[must_use]
    pub const fn admits(self, status: Option<FacilityStatus>) -> bool {
        match self {
            Self::All => true,
            Self::Closed => matches!(status, Some(FacilityStatus::Closed)),
            Self::Open => matches!(status, Some(FacilityStatus::Open)),
        }
    }
}

/// One airfield observation from any source.
///
/// `name` is a display label only. Matching is purely by coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirfieldRecord {
    /// Dataset that produced this record.
    pub source: RecordSource,
    /// Display name (may be empty or ambiguous).
    pub name: String,
    /// Two-letter state code, used for output grouping.
    pub state: String,
    /// Latitude in decimal degrees (WGS84).
    pub latitude: f64,
    /// Longitude in decimal degrees; western hemisphere is negative.
    pub longitude: f64,
    /// Provenance URI or file path.
    pub source_link: String,
    pub status: Option<FacilityStatus>,
    pub effective_date: Option<NaiveDate>,
    pub decommission_date: Option<NaiveDate>,
    /// Identifier within the source dataset (airport id, site number).
    pub source_id: Option<String>,
    /// 1-based line or entry number within the source dataset.
    #[serde(default)]
    pub position: Option<usize>,
}

impl AirfieldRecord {
    /// Creates a record with no optional provenance fields set.
    #[must_use]
    pub fn new(
        source: RecordSource,
        name: impl Into<String>,
        state: impl Into<String>,
        latitude: f64,
        longitude: f64,
        source_link: impl Into<String>,
    ) -> Self {
        Self {
            source,
            name: name.into(),
            state: state.into(),
            latitude,
            longitude,
            source_link: source_link.into(),
            status: None,
            effective_date: None,
            decommission_date: None,
            source_id: None,
            position: None,
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: Option<FacilityStatus>) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn with_effective_date(mut self, date: Option<NaiveDate>) -> Self {
        self.effective_date = date;
        self
    }

    #[must_use]
    pub const fn with_decommission_date(mut self, date: Option<NaiveDate>) -> Self {
        self.decommission_date = date;
        self
    }

    #[must_use]
    pub fn with_source_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.source_id = if id.is_empty() { None } else { Some(id) };
        self
    }

    #[must_use]
    pub const fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Checks that the coordinates are finite and in range.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidReason`] found, latitude first.
    pub fn validate(&self) -> Result<(), InvalidReason> {
        check_range(CoordinateField::Latitude, self.latitude)?;
        check_range(CoordinateField::Longitude, self.longitude)?;
        Ok(())
    }
}

/// Names a coordinate field in validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CoordinateField {
    Latitude,
    Longitude,
}

impl CoordinateField {
    const fn limit(self) -> f64 {
        match self {
            Self::Latitude => 90.0,
            Self::Longitude => 180.0,
        }
    }
}

/// Why a record could not be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidReason {
    /// The coordinate field was absent or blank.
    #[error("missing {field}")]
    MissingCoordinate {
        /// Which coordinate.
        field: CoordinateField,
    },

    /// The coordinate field did not parse as a number.
    #[error("non-numeric {field} {value:?}")]
    NonNumeric {
        /// Which coordinate.
        field: CoordinateField,
        /// The raw text.
        value: String,
    },

    /// The coordinate was not finite or outside its valid range.
    #[error("{field} {value} out of range")]
    OutOfRange {
        /// Which coordinate.
        field: CoordinateField,
        /// The offending value.
        value: f64,
    },

    /// The input row was shorter than its layout requires.
    #[error("row too short: expected {expected}, got {actual}")]
    Truncated {
        /// Minimum width (columns or bytes) required.
        expected: usize,
        /// Width actually present.
        actual: usize,
    },

    /// The input holding the record could not be read.
    #[error("unreadable: {message}")]
    Unreadable {
        /// The underlying error.
        message: String,
    },
}

/// A record that was dropped before any distance computation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRecord {
    /// Dataset the record came from.
    pub dataset: RecordSource,
    /// 1-based line or entry number within the input.
    pub position: usize,
    /// Record name, if it could be read.
    pub name: Option<String>,
    pub reason: InvalidReason,
}

impl InvalidRecord {
    #[must_use]
    pub const fn new(
        dataset: RecordSource,
        position: usize,
        name: Option<String>,
        reason: InvalidReason,
    ) -> Self {
        Self {
            dataset,
            position,
            name,
            reason,
        }
    }
}

impl fmt::Display for InvalidRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entry {}", self.dataset, self.position)?;
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            write!(f, " ({name})")?;
        }
        write!(f, ": {}", self.reason)
    }
}

impl std::error::Error for InvalidRecord {}

/// A decoded record or the reason it was rejected.
pub type RecordEntry = Result<AirfieldRecord, InvalidRecord>;

fn check_range(field: CoordinateField, value: f64) -> Result<f64, InvalidReason> {
    if value.is_finite() && value.abs() <= field.limit() {
        Ok(value)
    } else {
        Err(InvalidReason::OutOfRange { field, value })
    }
}

/// Wraps a longitude into `[-180, 180]`.
///
/// Values already in range are returned unchanged, so `180.0` stays `180.0`.
#[must_use]
pub fn normalize_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) || !longitude.is_finite() {
        return longitude;
    }
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && longitude > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Validates a decimal-degree pair, wrapping the longitude into range.
///
/// # Errors
///
/// Returns [`InvalidReason::OutOfRange`] for non-finite values or a
/// latitude beyond the poles.
pub fn normalize_coordinates(latitude: f64, longitude: f64) -> Result<(f64, f64), InvalidReason> {
    let latitude = check_range(CoordinateField::Latitude, latitude)?;
    if !longitude.is_finite() {
        return Err(InvalidReason::OutOfRange {
            field: CoordinateField::Longitude,
            value: longitude,
        });
    }
    Ok((latitude, normalize_longitude(longitude)))
}

/// Parses one raw coordinate field as decimal degrees.
///
/// # Errors
///
/// Returns [`InvalidReason::MissingCoordinate`] for absent or blank input
/// and [`InvalidReason::NonNumeric`] when the text is not a number.
pub fn parse_coordinate(field: CoordinateField, raw: Option<&str>) -> Result<f64, InvalidReason> {
    let text = raw.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(InvalidReason::MissingCoordinate { field });
    }
    text.parse::<f64>().map_err(|_| InvalidReason::NonNumeric {
        field,
        value: text.to_owned(),
    })
}

/// Parses and normalizes a raw latitude/longitude pair.
///
/// # Errors
///
/// Returns the first [`InvalidReason`] encountered.
pub fn parse_coordinates(
    latitude: Option<&str>,
    longitude: Option<&str>,
) -> Result<(f64, f64), InvalidReason> {
    let latitude = parse_coordinate(CoordinateField::Latitude, latitude)?;
    let longitude = parse_coordinate(CoordinateField::Longitude, longitude)?;
    normalize_coordinates(latitude, longitude)
}

/// The decoded output of a single source, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    pub source: RecordSource,
    pub entries: Vec<RecordEntry>,
}

impl RecordSet {
    #[must_use]
    pub const fn new(source: RecordSource) -> Self {
        Self {
            source,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub const fn from_entries(source: RecordSource, entries: Vec<RecordEntry>) -> Self {
        Self { source, entries }
    }

    pub fn push(&mut self, entry: RecordEntry) {
        self.entries.push(entry);
    }

    /// Appends every entry of `other`, keeping order.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Iterates the successfully decoded records.
    pub fn valid(&self) -> impl Iterator<Item = &AirfieldRecord> {
        self.entries.iter().filter_map(|e| e.as_ref().ok())
    }

    /// Iterates the rejected entries.
    pub fn invalid(&self) -> impl Iterator<Item = &InvalidRecord> {
        self.entries.iter().filter_map(|e| e.as_ref().err())
    }

    /// Clones the successfully decoded records into a `Vec`.
    #[must_use]
    pub fn valid_records(&self) -> Vec<AirfieldRecord> {
        self.valid().cloned().collect()
    }

    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.valid().count()
    }

    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.invalid().count()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A candidate annotated with its distance to the nearest reference point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRecord {
    pub record: AirfieldRecord,
    /// Kilometers to the nearest reference point. `None` when the
    /// reference set was empty (infinitely far).
    pub distance_km: Option<f64>,
}

/// Outcome of one reconciliation pass.
///
/// `unmatched` preserves candidate input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult {
    pub unmatched: Vec<ScoredRecord>,
    /// Candidates within the threshold of some reference point.
    pub matched_count: usize,
    /// Candidates dropped for bad coordinates.
    pub skipped: Vec<InvalidRecord>,
    /// Reference records dropped for bad coordinates.
    pub skipped_reference: usize,
    pub threshold_km: f64,
}

impl ReconciliationResult {
    /// Iterates the unmatched records without their distances.
    pub fn unmatched_records(&self) -> impl Iterator<Item = &AirfieldRecord> {
        self.unmatched.iter().map(|s| &s.record)
    }

    /// Turns the unmatched set into candidates for a further pass.
    #[must_use]
    pub fn into_candidates(self) -> Vec<RecordEntry> {
        self.unmatched.into_iter().map(|s| Ok(s.record)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lat: f64, lon: f64) -> AirfieldRecord {
        AirfieldRecord::new(RecordSource::Site, "Test Field", "CA", lat, lon, "")
    }

    #[test]
    fn parses_valid_coordinates() {
        let (lat, lon) = parse_coordinates(Some(" 34.05 "), Some("-118.25")).unwrap();
        assert!((lat - 34.05).abs() < f64::EPSILON);
        assert!((lon - -118.25).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_non_numeric_longitude() {
        let err = parse_coordinates(Some("34.0"), Some("abc")).unwrap_err();
        assert_eq!(
            err,
            InvalidReason::NonNumeric {
                field: CoordinateField::Longitude,
                value: "abc".to_string(),
            }
        );
    }

    #[test]
    fn rejects_blank_latitude() {
        let err = parse_coordinates(Some("  "), Some("1.0")).unwrap_err();
        assert_eq!(
            err,
            InvalidReason::MissingCoordinate {
                field: CoordinateField::Latitude
            }
        );
    }

    #[test]
    fn rejects_latitude_beyond_pole() {
        assert!(matches!(
            normalize_coordinates(91.0, 0.0),
            Err(InvalidReason::OutOfRange {
                field: CoordinateField::Latitude,
                ..
            })
        ));
    }

    #[test]
    fn wraps_longitude_into_range() {
        assert!((normalize_longitude(181.0) - -179.0).abs() < 1e-9);
        assert!((normalize_longitude(-190.0) - 170.0).abs() < 1e-9);
        assert!((normalize_longitude(540.0) - 180.0).abs() < 1e-9);
        assert!((normalize_longitude(180.0) - 180.0).abs() < f64::EPSILON);
        assert!((normalize_longitude(-75.5) - -75.5).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_flags_nan() {
        assert!(record(f64::NAN, 0.0).validate().is_err());
        assert!(record(10.0, 200.0).validate().is_err());
        assert!(record(-90.0, -180.0).validate().is_ok());
    }

    #[test]
    fn unmatched_become_valid_candidates_in_order() {
        let result = ReconciliationResult {
            unmatched: vec![
                ScoredRecord {
                    record: record(1.0, 1.0).with_position(4),
                    distance_km: Some(12.0),
                },
                ScoredRecord {
                    record: record(2.0, 2.0),
                    distance_km: None,
                },
            ],
            matched_count: 3,
            skipped: Vec::new(),
            skipped_reference: 0,
            threshold_km: 5.0,
        };

        let candidates = result.into_candidates();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].as_ref().unwrap().position, Some(4));
        assert!((candidates[1].as_ref().unwrap().latitude - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn match_mode_admission() {
        assert!(MatchMode::All.admits(None));
        assert!(MatchMode::Closed.admits(Some(FacilityStatus::Closed)));
        assert!(!MatchMode::Closed.admits(Some(FacilityStatus::Open)));
        assert!(!MatchMode::Closed.admits(None));
        assert!(MatchMode::Open.admits(Some(FacilityStatus::Open)));
    }

    #[test]
    fn match_mode_parses_from_str() {
        assert_eq!("closed".parse::<MatchMode>().unwrap(), MatchMode::Closed);
        assert_eq!(MatchMode::default().to_string(), "all");
    }

    #[test]
    fn record_set_counts() {
        let mut set = RecordSet::new(RecordSource::Bts);
        set.push(Ok(record(1.0, 1.0)));
        set.push(Err(InvalidRecord::new(
            RecordSource::Bts,
            2,
            Some("Bad".to_string()),
            InvalidReason::MissingCoordinate {
                field: CoordinateField::Latitude,
            },
        )));
        set.push(Ok(record(2.0, 2.0)));

        assert_eq!(set.len(), 3);
        assert_eq!(set.valid_count(), 2);
        assert_eq!(set.invalid_count(), 1);
        assert!((set.valid_records()[1].latitude - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_record_display_includes_name() {
        let invalid = InvalidRecord::new(
            RecordSource::Nfdc,
            7,
            Some("Muddy Strip".to_string()),
            InvalidReason::Truncated {
                expected: 600,
                actual: 20,
            },
        );
        assert_eq!(
            invalid.to_string(),
            "nfdc entry 7 (Muddy Strip): row too short: expected 600, got 20"
        );
    }

    #[test]
    fn source_id_blank_becomes_none() {
        assert_eq!(record(0.0, 0.0).with_source_id("").source_id, None);
        assert_eq!(
            record(0.0, 0.0).with_source_id("LAX").source_id.as_deref(),
            Some("LAX")
        );
    }
}
