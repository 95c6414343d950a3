//! Planar measures in locally-linearized degree space.
//!
//! All geometry downstream of ingestion is in lon/lat degrees. Meter
//! distances come from a single scale anchored at the mean event latitude:
//! one meters-per-degree factor for latitude and one for longitude. This is
//! a bounded-region approximation, not geodesy, and the whole pipeline
//! depends on using the same [`MeterScale`] everywhere.

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

/// Meters per degree of latitude in the local linearization.
pub const METERS_PER_DEG_LAT: f64 = 111_111.0;

/// Local degree to meter scale anchored at one latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeterScale {
    pub meters_per_deg_lat: f64,
    pub meters_per_deg_lon: f64,
}

impl MeterScale {
    /// Build the scale from the mean latitude of the event set.
    pub fn from_mean_latitude(lat0: f64) -> Self {
        Self {
            meters_per_deg_lat: METERS_PER_DEG_LAT,
            meters_per_deg_lon: METERS_PER_DEG_LAT * lat0.to_radians().cos().max(1e-8),
        }
    }

    /// Conservative meter to degree conversion: the smaller of the two
    /// per-axis equivalents. Used for simplification, segment spacing and
    /// hotspot sample spacing.
    pub fn to_deg_min(&self, meters: f64) -> f64 {
        (meters / self.meters_per_deg_lat).min(meters / self.meters_per_deg_lon)
    }

    /// Conservative meter to degree conversion: the larger of the two
    /// per-axis equivalents. Used for the snap tolerance.
    pub fn to_deg_max(&self, meters: f64) -> f64 {
        (meters / self.meters_per_deg_lat).max(meters / self.meters_per_deg_lon)
    }

    /// Meter distance between two degree coordinates.
    pub fn distance_m(&self, a: Coord<f64>, b: Coord<f64>) -> f64 {
        let dx = (a.x - b.x) * self.meters_per_deg_lon;
        let dy = (a.y - b.y) * self.meters_per_deg_lat;
        dx.hypot(dy)
    }

    /// Polyline length in meters: sum of vertex-to-vertex planar distances.
    pub fn line_length_m(&self, line: &LineString<f64>) -> f64 {
        line.0.windows(2).map(|w| self.distance_m(w[0], w[1])).sum()
    }
}

/// Planar distance between two degree coordinates, in degrees.
pub fn distance_deg(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Polyline length in planar degrees.
pub fn line_length_deg(line: &LineString<f64>) -> f64 {
    line.0.windows(2).map(|w| distance_deg(w[0], w[1])).sum()
}

/// Bearing of a line's first-to-last chord, folded into [0, 180).
pub fn line_bearing_deg(line: &LineString<f64>) -> f64 {
    let coords = &line.0;
    if coords.len() < 2 {
        return 0.0;
    }
    let first = coords[0];
    let last = coords[coords.len() - 1];
    ((last.y - first.y).atan2(last.x - first.x).to_degrees()).abs() % 180.0
}

/// Point on segment `a..b` nearest to `p`, with its distance.
pub fn project_onto_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> (Coord<f64>, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let q = Coord {
        x: a.x + t * dx,
        y: a.y + t * dy,
    };
    (q, distance_deg(p, q))
}

/// Nearest point on a polyline to `p`, with its degree distance.
pub fn nearest_point_on_line(p: Coord<f64>, line: &LineString<f64>) -> (Coord<f64>, f64) {
    let coords = &line.0;
    if coords.len() == 1 {
        return (coords[0], distance_deg(p, coords[0]));
    }
    let mut best = (coords[0], f64::INFINITY);
    for w in coords.windows(2) {
        let (q, d) = project_onto_segment(p, w[0], w[1]);
        if d < best.1 {
            best = (q, d);
        }
    }
    best
}

fn cross(o: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn segments_intersect(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>, d: Coord<f64>) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// Distance between two segments: zero if they cross, otherwise the
/// smallest endpoint-to-segment distance.
pub fn segment_distance(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>, d: Coord<f64>) -> f64 {
    if segments_intersect(a, b, c, d) {
        return 0.0;
    }
    let candidates = [
        project_onto_segment(a, c, d).1,
        project_onto_segment(b, c, d).1,
        project_onto_segment(c, a, b).1,
        project_onto_segment(d, a, b).1,
    ];
    candidates.into_iter().fold(f64::INFINITY, f64::min)
}

/// Minimum planar degree distance between two polylines.
pub fn line_distance(l1: &LineString<f64>, l2: &LineString<f64>) -> f64 {
    let c1 = &l1.0;
    let c2 = &l2.0;
    if c1.len() < 2 || c2.len() < 2 {
        return f64::INFINITY;
    }
    let mut best = f64::INFINITY;
    for w1 in c1.windows(2) {
        for w2 in c2.windows(2) {
            let d = segment_distance(w1[0], w1[1], w2[0], w2[1]);
            if d < best {
                best = d;
            }
            if best == 0.0 {
                return 0.0;
            }
        }
    }
    best
}

/// Coordinate at absolute degree distance `dist` along the polyline.
/// Clamps to the line's endpoints.
pub fn interpolate_at(line: &LineString<f64>, dist_deg: f64) -> Coord<f64> {
    let coords = &line.0;
    if dist_deg <= 0.0 {
        return coords[0];
    }
    let mut walked = 0.0;
    for w in coords.windows(2) {
        let edge = distance_deg(w[0], w[1]);
        if edge > 0.0 && walked + edge >= dist_deg {
            let t = (dist_deg - walked) / edge;
            return Coord {
                x: w[0].x + t * (w[1].x - w[0].x),
                y: w[0].y + t * (w[1].y - w[0].y),
            };
        }
        walked += edge;
    }
    coords[coords.len() - 1]
}

/// Coordinate at normalized position `frac` in [0, 1] along the polyline,
/// measured by the line's own planar degree length.
pub fn interpolate_normalized(line: &LineString<f64>, frac: f64) -> Coord<f64> {
    let total = line_length_deg(line);
    interpolate_at(line, frac.clamp(0.0, 1.0) * total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(coords: &[(f64, f64)]) -> LineString<f64> {
        LineString::new(coords.iter().map(|&(x, y)| Coord { x, y }).collect())
    }

    #[test]
    fn test_scale_at_equator() {
        let scale = MeterScale::from_mean_latitude(0.0);
        assert!((scale.meters_per_deg_lat - 111_111.0).abs() < 1e-9);
        assert!((scale.meters_per_deg_lon - 111_111.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_shrinks_longitude_with_latitude() {
        let scale = MeterScale::from_mean_latitude(60.0);
        assert!(scale.meters_per_deg_lon < scale.meters_per_deg_lat);
        // cos(60 deg) = 0.5
        assert!((scale.meters_per_deg_lon - 55_555.5).abs() < 0.1);
    }

    #[test]
    fn test_conservative_conversions() {
        let scale = MeterScale::from_mean_latitude(60.0);
        let min_deg = scale.to_deg_min(100.0);
        let max_deg = scale.to_deg_max(100.0);
        assert!(min_deg < max_deg);
        assert!((min_deg - 100.0 / 111_111.0).abs() < 1e-12);
    }

    #[test]
    fn test_bearing_folds_into_half_circle() {
        let east = line(&[(0.0, 0.0), (1.0, 0.0)]);
        let west = line(&[(1.0, 0.0), (0.0, 0.0)]);
        assert_eq!(line_bearing_deg(&east), 0.0);
        assert_eq!(line_bearing_deg(&west), 0.0);

        let north = line(&[(0.0, 0.0), (0.0, 1.0)]);
        assert!((line_bearing_deg(&north) - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_point_on_line() {
        let l = line(&[(0.0, 0.0), (10.0, 0.0)]);
        let (q, d) = nearest_point_on_line(Coord { x: 3.0, y: 4.0 }, &l);
        assert!((q.x - 3.0).abs() < 1e-12);
        assert!((q.y).abs() < 1e-12);
        assert!((d - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_line_distance_crossing_is_zero() {
        let l1 = line(&[(-1.0, 0.0), (1.0, 0.0)]);
        let l2 = line(&[(0.0, -1.0), (0.0, 1.0)]);
        assert_eq!(line_distance(&l1, &l2), 0.0);
    }

    #[test]
    fn test_line_distance_parallel() {
        let l1 = line(&[(0.0, 0.0), (10.0, 0.0)]);
        let l2 = line(&[(0.0, 2.0), (10.0, 2.0)]);
        assert!((line_distance(&l1, &l2) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_at_multivertex() {
        let l = line(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let p = interpolate_at(&l, 1.5);
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_normalized_endpoints() {
        let l = line(&[(0.0, 0.0), (2.0, 0.0)]);
        assert_eq!(interpolate_normalized(&l, 0.0), Coord { x: 0.0, y: 0.0 });
        assert_eq!(interpolate_normalized(&l, 1.0), Coord { x: 2.0, y: 0.0 });
        let mid = interpolate_normalized(&l, 0.5);
        assert!((mid.x - 1.0).abs() < 1e-12);
    }
}
