#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Finds candidates with no reference record nearby.
//!
//! Each candidate is compared against every reference point by great-circle
//! distance. A candidate whose nearest reference lies further than the
//! threshold is "unmatched", i.e. likely missing from the reference set.

use airfield_recon_airfield_models::{
    AirfieldRecord, InvalidRecord, MatchMode, ReconciliationResult, RecordEntry, ScoredRecord,
};
use airfield_recon_spatial::{nearest, point};

/// Default match radius.
pub const DEFAULT_THRESHOLD_KM: f64 = 5.0;

/// Errors that can occur during reconciliation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    /// A parameter was unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Reference coordinates projected into parallel columns.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    skipped: usize,
}

impl ReferenceIndex {
    /// Projects `records`, dropping any with invalid coordinates.
    #[must_use]
    pub fn build(records: &[AirfieldRecord]) -> Self {
        let mut index = Self {
            latitudes: Vec::with_capacity(records.len()),
            longitudes: Vec::with_capacity(records.len()),
            skipped: 0,
        };
        for record in records {
            if let Err(reason) = record.validate() {
                log::debug!("Reference {:?} skipped: {reason}", record.name);
                index.skipped += 1;
                continue;
            }
            index.latitudes.push(record.latitude);
            index.longitudes.push(record.longitude);
        }
        index
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.latitudes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.latitudes.is_empty()
    }

    /// Reference records excluded for bad coordinates.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    /// Distance to the nearest reference point, `None` when empty.
    #[must_use]
    pub fn nearest_km(&self, latitude: f64, longitude: f64) -> Option<f64> {
        let columns = self
            .latitudes
            .iter()
            .zip(&self.longitudes)
            .map(|(&lat, &lon)| point(lat, lon));
        nearest(point(latitude, longitude), columns).map(|(_, km)| km)
    }
}

/// Reports every candidate with no reference point within `threshold_km`.
///
/// A distance equal to the threshold counts as a match. With an empty
/// reference set every valid candidate is unmatched with no distance.
/// Candidates that are `Err`, or whose coordinates fail validation, are
/// listed in [`ReconciliationResult::skipped`].
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidInput`] if `threshold_km` is negative
/// or not finite.
pub fn reconcile(
    reference: &[AirfieldRecord],
    candidates: &[RecordEntry],
    threshold_km: f64,
) -> Result<ReconciliationResult, ReconcileError> {
    if !threshold_km.is_finite() || threshold_km < 0.0 {
        return Err(ReconcileError::InvalidInput(format!(
            "threshold must be a non-negative number of km, got {threshold_km}"
        )));
    }

    let index = ReferenceIndex::build(reference);
    if index.is_empty() {
        log::warn!("Reference set is empty, every candidate will be unmatched");
    }

    let mut result = ReconciliationResult {
        unmatched: Vec::new(),
        matched_count: 0,
        skipped: Vec::new(),
        skipped_reference: index.skipped(),
        threshold_km,
    };

    for (i, entry) in candidates.iter().enumerate() {
        let record = match entry {
            Ok(record) => record,
            Err(invalid) => {
                result.skipped.push(invalid.clone());
                continue;
            }
        };
        if let Err(reason) = record.validate() {
            // Records built without a dataset position fall back to their
            // place in this pass.
            result.skipped.push(InvalidRecord::new(
                record.source,
                record.position.unwrap_or(i + 1),
                Some(record.name.clone()),
                reason,
            ));
            continue;
        }

        let distance_km = index.nearest_km(record.latitude, record.longitude);
        if distance_km.is_some_and(|d| d <= threshold_km) {
            result.matched_count += 1;
        } else {
            result.unmatched.push(ScoredRecord {
                record: record.clone(),
                distance_km,
            });
        }
    }

    log::info!(
        "Reconciled {} candidate(s) against {} reference point(s): {} unmatched, {} matched, {} skipped",
        candidates.len(),
        index.len(),
        result.unmatched.len(),
        result.matched_count,
        result.skipped.len()
    );

    Ok(result)
}

/// Candidates left after [`filter_by_mode`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModeFilter {
    pub admitted: Vec<RecordEntry>,
    /// Valid candidates whose status the mode excludes.
    pub filtered_out: usize,
}

/// Keeps the candidates `mode` admits.
///
/// Invalid entries are always kept so they are still reported as skipped.
#[must_use]
pub fn filter_by_mode(candidates: Vec<RecordEntry>, mode: MatchMode) -> ModeFilter {
    let total = candidates.len();
    let admitted: Vec<RecordEntry> = candidates
        .into_iter()
        .filter(|entry| entry.as_ref().map_or(true, |r| mode.admits(r.status)))
        .collect();
    let filtered_out = total - admitted.len();
    if filtered_out > 0 {
        log::info!("Match mode {mode}: {filtered_out} candidate(s) filtered out by status");
    }
    ModeFilter {
        admitted,
        filtered_out,
    }
}
