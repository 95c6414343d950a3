//! Synthetic road and event patterns with known ground truth.
//!
//! Used by the integration tests to exercise the full pipeline against
//! patterns whose clustering behavior is known in advance: a regular
//! pattern that must not trip the envelope and a packed cluster that must.

use geo::{Coord, LineString};

use crate::geometry::METERS_PER_DEG_LAT;

/// A straight east-west road of `length_m` meters starting at `origin`,
/// assuming the equator-anchored scale used by the tests.
pub fn straight_road(origin: Coord<f64>, length_m: f64) -> LineString<f64> {
    LineString::new(vec![
        origin,
        Coord {
            x: origin.x + length_m / METERS_PER_DEG_LAT,
            y: origin.y,
        },
    ])
}

/// The point at chainage `m` meters along a straight east-west road.
pub fn point_at_m(origin: Coord<f64>, m: f64) -> Coord<f64> {
    Coord {
        x: origin.x + m / METERS_PER_DEG_LAT,
        y: origin.y,
    }
}

/// `n` evenly spaced events along `[0, length_m]`, centered in their bins.
pub fn regular_events(origin: Coord<f64>, length_m: f64, n: usize) -> Vec<Coord<f64>> {
    let spacing = length_m / n as f64;
    (0..n)
        .map(|i| point_at_m(origin, spacing / 2.0 + i as f64 * spacing))
        .collect()
}

/// `n` events packed at fixed `step_m` spacing starting at chainage
/// `start_m`: a synthetic cluster of span `(n - 1) * step_m`.
pub fn packed_cluster(origin: Coord<f64>, start_m: f64, step_m: f64, n: usize) -> Vec<Coord<f64>> {
    (0..n)
        .map(|i| point_at_m(origin, start_m + i as f64 * step_m))
        .collect()
}
