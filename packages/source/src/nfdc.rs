//! Decoder for the NFDC facility file (reference dataset B).
//!
//! The file is fixed-width text holding several record types. Only lines
//! starting with `APT` describe landing facilities; every field of such a
//! line is read through a [`FieldSpan`] in [`NfdcLayout`].

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use airfield_recon_airfield_models::{
    AirfieldRecord, CoordinateField, FacilityStatus, InvalidReason, InvalidRecord, RecordEntry,
    RecordSet, RecordSource, normalize_coordinates,
};
use serde::{Deserialize, Serialize};

use crate::SourceError;
use crate::parsing::{non_empty, parse_date};

/// Prefix identifying landing facility records.
pub const APT_PREFIX: &[u8] = b"APT";

/// A fixed-width field: 1-based start column and width in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpan {
    pub start: usize,
    pub width: usize,
}

impl FieldSpan {
    #[must_use]
    pub const fn new(start: usize, width: usize) -> Self {
        Self { start, width }
    }

    /// Last column covered (1-based, inclusive).
    #[must_use]
    pub const fn end(self) -> usize {
        self.start.saturating_sub(1) + self.width
    }

    /// The field's bytes within `line`, or `None` if the line is too short.
    #[must_use]
    pub fn slice(self, line: &[u8]) -> Option<&[u8]> {
        line.get(self.start.saturating_sub(1)..self.end())
    }
}

/// Where each decoded field lives on an `APT` line.
///
/// Defaults follow the legacy 28-day subscription `APT.txt` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NfdcLayout {
    pub site_number: FieldSpan,
    pub facility_type: FieldSpan,
    pub location_id: FieldSpan,
    pub effective_date: FieldSpan,
    pub state_code: FieldSpan,
    pub city: FieldSpan,
    pub facility_name: FieldSpan,
    pub latitude_seconds: FieldSpan,
    pub longitude_seconds: FieldSpan,
    pub status_code: FieldSpan,
}

impl Default for NfdcLayout {
    fn default() -> Self {
        Self {
            site_number: FieldSpan::new(4, 11),
            facility_type: FieldSpan::new(15, 13),
            location_id: FieldSpan::new(28, 4),
            effective_date: FieldSpan::new(32, 10),
            state_code: FieldSpan::new(49, 2),
            city: FieldSpan::new(94, 40),
            facility_name: FieldSpan::new(134, 50),
            latitude_seconds: FieldSpan::new(539, 12),
            longitude_seconds: FieldSpan::new(566, 12),
            status_code: FieldSpan::new(837, 2),
        }
    }
}

impl NfdcLayout {
    fn spans(&self) -> [FieldSpan; 10] {
        [
            self.site_number,
            self.facility_type,
            self.location_id,
            self.effective_date,
            self.state_code,
            self.city,
            self.facility_name,
            self.latitude_seconds,
            self.longitude_seconds,
            self.status_code,
        ]
    }

    /// Minimum line length holding every field.
    #[must_use]
    pub fn width(&self) -> usize {
        self.spans()
            .into_iter()
            .map(FieldSpan::end)
            .max()
            .unwrap_or_default()
    }

    fn validate(&self, path: &Path) -> Result<(), SourceError> {
        if self.spans().iter().any(|s| s.start == 0 || s.width == 0) {
            return Err(SourceError::layout(
                path,
                "field spans need a 1-based start and a non-zero width",
            ));
        }
        Ok(())
    }
}

/// Reads a field as trimmed text.
fn text(span: FieldSpan, line: &[u8]) -> String {
    span.slice(line)
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_owned())
        .unwrap_or_default()
}

/// Parses signed seconds-of-arc with a trailing hemisphere letter
/// (`136545.1250N`) into decimal degrees. `S` and `W` are negative.
///
/// # Errors
///
/// Returns [`InvalidReason`] for blank, malformed, or unknown-hemisphere
/// input.
pub fn parse_hemisphere_seconds(field: CoordinateField, raw: &str) -> Result<f64, InvalidReason> {
    let Some(text) = non_empty(raw) else {
        return Err(InvalidReason::MissingCoordinate { field });
    };
    let non_numeric = || InvalidReason::NonNumeric {
        field,
        value: text.to_owned(),
    };

    let split = text.char_indices().last().map_or(0, |(i, _)| i);
    let (number, hemisphere) = text.split_at(split);
    let sign = match hemisphere.to_ascii_uppercase().as_str() {
        "N" | "E" => 1.0,
        "S" | "W" => -1.0,
        _ => return Err(non_numeric()),
    };
    let seconds: f64 = number.trim().parse().map_err(|_| non_numeric())?;

    Ok(sign * seconds / 3600.0)
}

fn parse_status(code: &str) -> Option<FacilityStatus> {
    match code {
        "O" => Some(FacilityStatus::Open),
        "CI" | "CP" => Some(FacilityStatus::Closed),
        _ => None,
    }
}

/// Loads every `APT` record from `path`.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or the layout is
/// malformed.
pub fn load_nfdc(path: &Path, layout: &NfdcLayout) -> Result<RecordSet, SourceError> {
    log::info!("Loading NFDC facilities from {}", path.display());
    let file = std::fs::File::open(path).map_err(|e| SourceError::io(path, e))?;
    let set = decode_nfdc(file, path, layout)?;
    log::info!(
        "NFDC: {} facility record(s), {} invalid",
        set.valid_count(),
        set.invalid_count()
    );
    Ok(set)
}

/// Decodes `APT` records from any reader. `path` is only used for
/// provenance and error messages.
///
/// # Errors
///
/// See [`load_nfdc`].
pub fn decode_nfdc<R: Read>(
    reader: R,
    path: &Path,
    layout: &NfdcLayout,
) -> Result<RecordSet, SourceError> {
    layout.validate(path)?;

    let link = path.display().to_string();
    let width = layout.width();
    let mut set = RecordSet::new(RecordSource::Nfdc);

    for (index, line) in BufReader::new(reader).split(b'\n').enumerate() {
        let mut line = line.map_err(|e| SourceError::io(path, e))?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if !line.starts_with(APT_PREFIX) {
            continue;
        }

        let position = index + 1;
        if line.len() < width {
            let name = non_empty(&text(layout.facility_name, &line)).map(str::to_owned);
            set.push(Err(InvalidRecord::new(
                RecordSource::Nfdc,
                position,
                name,
                InvalidReason::Truncated {
                    expected: width,
                    actual: line.len(),
                },
            )));
            continue;
        }

        set.push(decode_line(&line, layout, &link, position));
    }

    Ok(set)
}

fn decode_line(line: &[u8], layout: &NfdcLayout, link: &str, position: usize) -> RecordEntry {
    let name = text(layout.facility_name, line);

    let coordinates = parse_hemisphere_seconds(
        CoordinateField::Latitude,
        &text(layout.latitude_seconds, line),
    )
    .and_then(|lat| {
        parse_hemisphere_seconds(
            CoordinateField::Longitude,
            &text(layout.longitude_seconds, line),
        )
        .map(|lon| (lat, lon))
    })
    .and_then(|(lat, lon)| normalize_coordinates(lat, lon));

    let (lat, lon) = match coordinates {
        Ok(pair) => pair,
        Err(reason) => {
            return Err(InvalidRecord::new(
                RecordSource::Nfdc,
                position,
                non_empty(&name).map(str::to_owned),
                reason,
            ));
        }
    };

    let location_id = text(layout.location_id, line);
    let source_id = if location_id.is_empty() {
        text(layout.site_number, line)
    } else {
        location_id
    };

    log::trace!(
        "NFDC {source_id}: {} {name}",
        text(layout.facility_type, line)
    );

    let display = if name.is_empty() {
        text(layout.city, line)
    } else {
        name
    };

    Ok(AirfieldRecord::new(
        RecordSource::Nfdc,
        display,
        text(layout.state_code, line),
        lat,
        lon,
        link,
    )
    .with_status(parse_status(&text(layout.status_code, line)))
    .with_effective_date(parse_date(&text(layout.effective_date, line)))
    .with_source_id(source_id)
    .with_position(position))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    /// A compact layout so test lines stay readable.
    fn layout() -> NfdcLayout {
        NfdcLayout {
            site_number: FieldSpan::new(4, 6),
            facility_type: FieldSpan::new(10, 8),
            location_id: FieldSpan::new(18, 4),
            effective_date: FieldSpan::new(22, 10),
            state_code: FieldSpan::new(32, 2),
            city: FieldSpan::new(34, 10),
            facility_name: FieldSpan::new(44, 12),
            latitude_seconds: FieldSpan::new(56, 12),
            longitude_seconds: FieldSpan::new(68, 12),
            status_code: FieldSpan::new(80, 2),
        }
    }

    fn apt_line(id: &str, name: &str, lat: &str, lon: &str, status: &str) -> String {
        format!(
            "APT{:<6}{:<8}{:<4}{:<10}{:<2}{:<10}{:<12}{:>12}{:>12}{:<2}",
            "1234.A", "AIRPORT", id, "06/15/2023", "ID", "BOISE", name, lat, lon, status
        )
    }

    fn decode(body: &str) -> RecordSet {
        decode_nfdc(body.as_bytes(), Path::new("APT.txt"), &layout()).unwrap()
    }

    #[test]
    fn decodes_apt_lines_only() {
        let body = format!(
            "{}\r\nATT1234.A  skipped attendance record\n{}\n",
            apt_line("BOI", "BOISE AIR", "156222.0000N", "418386.0000W", "O"),
            apt_line("X01", "OLD STRIP", "156000.0000N", "418000.0000W", "CI"),
        );
        let set = decode(&body);

        assert_eq!(set.valid_count(), 2);
        let boise = set.valid().next().unwrap();
        assert_eq!(boise.name, "BOISE AIR");
        assert_eq!(boise.state, "ID");
        assert_eq!(boise.source_id.as_deref(), Some("BOI"));
        assert_eq!(boise.status, Some(FacilityStatus::Open));
        assert_eq!(boise.effective_date, NaiveDate::from_ymd_opt(2023, 6, 15));
        assert!((boise.latitude - 43.395).abs() < 1e-9);
        assert!((boise.longitude + 116.218_333_333).abs() < 1e-6);

        let old = set.valid().nth(1).unwrap();
        assert_eq!(old.status, Some(FacilityStatus::Closed));
    }

    #[test]
    fn hemisphere_seconds_signs() {
        let f = CoordinateField::Latitude;
        assert!((parse_hemisphere_seconds(f, "3600N").unwrap() - 1.0).abs() < 1e-12);
        assert!((parse_hemisphere_seconds(f, "3600S").unwrap() + 1.0).abs() < 1e-12);
        assert!((parse_hemisphere_seconds(f, " 7200.0000W").unwrap() + 2.0).abs() < 1e-12);
        assert!(matches!(
            parse_hemisphere_seconds(f, "3600X"),
            Err(InvalidReason::NonNumeric { .. })
        ));
        assert!(matches!(
            parse_hemisphere_seconds(f, "   "),
            Err(InvalidReason::MissingCoordinate { .. })
        ));
    }

    #[test]
    fn short_lines_become_invalid() {
        let set = decode("APT1234.A AIRPORT\n");
        let invalid = set.invalid().next().unwrap();
        assert_eq!(invalid.position, 1);
        assert!(matches!(
            invalid.reason,
            InvalidReason::Truncated { expected: 81, .. }
        ));
    }

    #[test]
    fn unknown_status_and_bad_latitude() {
        let set = decode(&format!(
            "{}\n{}\n",
            apt_line("AAA", "ODD", "10800.0000N", "3600.0000W", "X"),
            apt_line("BBB", "BROKEN", "abcN", "3600.0000W", "O"),
        ));
        assert_eq!(set.valid().next().unwrap().status, None);
        let invalid = set.invalid().next().unwrap();
        assert_eq!(invalid.position, 2);
        assert_eq!(invalid.name.as_deref(), Some("BROKEN"));
    }

    #[test]
    fn zero_start_is_a_layout_error() {
        let mut bad = layout();
        bad.city = FieldSpan::new(0, 5);
        let result = decode_nfdc("".as_bytes(), Path::new("APT.txt"), &bad);
        assert!(matches!(result, Err(SourceError::Layout { .. })));
    }

    #[test]
    fn default_layout_spans_the_status_code() {
        assert_eq!(NfdcLayout::default().width(), 838);
    }
}
