#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Great-circle distance on a spherical Earth.
//!
//! Points are [`geo::Point`]s with `x` = longitude and `y` = latitude, both
//! in decimal degrees. Distances are haversine kilometers on a sphere of
//! radius [`EARTH_RADIUS_KM`].

use geo::Point;

/// Mean Earth radius used for all distance computations, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6367.0;

/// Builds a point from a latitude/longitude pair.
#[must_use]
pub fn point(latitude: f64, longitude: f64) -> Point<f64> {
    Point::new(longitude, latitude)
}

/// Haversine distance between two points, in kilometers.
///
/// The square-root argument is clamped to `[0, 1]`, so coincident and
/// antipodal points never produce `NaN` from rounding.
#[must_use]
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.x() - a.x()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Distances from `origin` to every point in `points`, in the same order.
#[must_use]
pub fn haversine_km_many(origin: Point<f64>, points: &[Point<f64>]) -> Vec<f64> {
    points.iter().map(|&p| haversine_km(origin, p)).collect()
}

/// Index and distance of the closest point to `origin`.
///
/// Points are consumed one at a time, nothing is collected. Ties resolve to
/// the lowest index. Returns `None` when `points` is empty.
#[must_use]
pub fn nearest(
    origin: Point<f64>,
    points: impl IntoIterator<Item = Point<f64>>,
) -> Option<(usize, f64)> {
    points
        .into_iter()
        .map(|p| haversine_km(origin, p))
        .enumerate()
        .fold(None, |best, (i, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((i, d)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn coincident_points_are_zero() {
        let p = point(37.6189, -122.375);
        assert!(haversine_km(p, p).abs() < EPS);
    }

    #[test]
    fn distance_is_symmetric() {
        let samples = [
            (point(0.0, 0.0), point(0.0, 1.0)),
            (point(33.9425, -118.408), point(40.6398, -73.7789)),
            (point(-33.9461, 151.177), point(51.47, -0.4543)),
            (point(89.9, 10.0), point(-89.9, -170.0)),
        ];
        for (a, b) in samples {
            assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < EPS);
        }
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = haversine_km(point(0.0, 0.0), point(0.0, 1.0));
        let expected = EARTH_RADIUS_KM * 1.0_f64.to_radians();
        assert!((d - expected).abs() < 1e-6);
        assert!(d > 110.0 && d < 112.0);
    }

    #[test]
    fn antipodal_points_do_not_nan() {
        let d = haversine_km(point(0.0, 0.0), point(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - EARTH_RADIUS_KM * std::f64::consts::PI).abs() < 1e-6);

        let poles = haversine_km(point(90.0, 0.0), point(-90.0, 0.0));
        assert!(poles.is_finite());
    }

    #[test]
    fn broadcast_preserves_order_and_length() {
        let origin = point(0.0, 0.0);
        let points = [point(0.0, 2.0), point(0.0, 0.0), point(0.0, 1.0)];
        let distances = haversine_km_many(origin, &points);

        assert_eq!(distances.len(), 3);
        assert!(distances[1].abs() < EPS);
        assert!(distances[2] < distances[0]);
        for (p, d) in points.iter().zip(&distances) {
            assert!((haversine_km(origin, *p) - d).abs() < EPS);
        }
    }

    #[test]
    fn nearest_over_columns_matches_broadcast_minimum() {
        let origin = point(10.0, 10.0);
        let lats = [10.0, 11.0, 12.0];
        let lons = [10.5, 9.0, 10.0];
        let points: Vec<_> = lats.iter().zip(&lons).map(|(&a, &o)| point(a, o)).collect();

        let (idx, d) = nearest(
            origin,
            lats.iter().zip(&lons).map(|(&a, &o)| point(a, o)),
        )
        .unwrap();

        let all = haversine_km_many(origin, &points);
        assert_eq!(idx, 0);
        assert!((d - all.iter().copied().fold(f64::INFINITY, f64::min)).abs() < EPS);
    }

    #[test]
    fn broadcast_against_empty_is_empty() {
        assert!(haversine_km_many(point(0.0, 0.0), &[]).is_empty());
    }

    #[test]
    fn nearest_picks_lowest_index_on_tie() {
        let origin = point(0.0, 0.0);
        let points = [point(0.0, 3.0), point(0.0, 1.0), point(0.0, -1.0)];
        let (idx, d) = nearest(origin, points).unwrap();
        assert_eq!(idx, 1);
        assert!((d - haversine_km(origin, points[1])).abs() < EPS);
    }

    #[test]
    fn nearest_of_empty_is_none() {
        assert!(nearest(point(0.0, 0.0), std::iter::empty()).is_none());
    }
}
