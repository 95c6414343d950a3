//! Dual-carriageway collapsing.
//!
//! Road datasets frequently digitize a divided road as two parallel lines,
//! one per carriageway. Counting both would double the local network length
//! and bias every downstream statistic, so near-duplicate parallels are
//! collapsed to a single centerline before segmentation. Everything that is
//! not a duplicate passes through with its geometry untouched.

use geo::LineString;
use log::info;
use rstar::{RTree, RTreeObject, AABB};

use crate::geometry;

/// Maximum bearing difference for two lines to count as parallel.
const BEARING_TOLERANCE_DEG: f64 = 8.0;
/// Minimum shorter/longer length ratio within a duplicate group.
const LENGTH_RATIO_MIN: f64 = 0.97;
/// Proximity tolerance as a multiple of the simplification distance.
const PROXIMITY_FACTOR: f64 = 20.0;

struct IndexedLine {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedLine {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn line_envelope(line: &LineString<f64>, pad: f64) -> AABB<[f64; 2]> {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for c in &line.0 {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }
    AABB::from_corners([min_x - pad, min_y - pad], [max_x + pad, max_y + pad])
}

/// Collapse duplicate parallel carriageways to one line per physical road.
///
/// Two lines belong to one duplicate group when their planar degree
/// distance is within `simplify_deg * 20`, their bearings differ by at most
/// 8 degrees, and their length ratio (shorter over longer) is at least
/// 0.97. Only the longest member of each group survives; on ties the
/// earliest by input order wins. Survivor geometry is returned unmodified,
/// and an empty input yields an empty output.
pub fn collapse_dual_carriageways(
    lines: &[LineString<f64>],
    simplify_deg: f64,
) -> Vec<LineString<f64>> {
    if lines.is_empty() {
        return Vec::new();
    }

    let tol = simplify_deg * PROXIMITY_FACTOR;
    let entries: Vec<IndexedLine> = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| IndexedLine {
            idx,
            envelope: line_envelope(line, 0.0),
        })
        .collect();
    let tree = RTree::bulk_load(entries);

    let mut claimed = vec![false; lines.len()];
    let mut kept = Vec::new();

    for i in 0..lines.len() {
        if claimed[i] {
            continue;
        }
        let line = &lines[i];
        let bearing_i = geometry::line_bearing_deg(line);
        let len_i = geometry::line_length_deg(line);

        let query = line_envelope(line, tol);
        let mut candidates: Vec<usize> = tree
            .locate_in_envelope_intersecting(&query)
            .map(|e| e.idx)
            .filter(|&j| j != i && !claimed[j])
            .collect();
        candidates.sort_unstable();

        let mut group = vec![i];
        for j in candidates {
            let other = &lines[j];
            if geometry::line_distance(line, other) > tol {
                continue;
            }
            if (bearing_i - geometry::line_bearing_deg(other)).abs() > BEARING_TOLERANCE_DEG {
                continue;
            }
            let len_j = geometry::line_length_deg(other);
            if len_i.min(len_j) / len_i.max(len_j) < LENGTH_RATIO_MIN {
                continue;
            }
            group.push(j);
        }

        if group.len() == 1 {
            kept.push(line.clone());
            claimed[i] = true;
            continue;
        }

        // First member attaining the maximum length wins the group.
        let mut winner = group[0];
        let mut winner_len = geometry::line_length_deg(&lines[winner]);
        for &k in &group[1..] {
            let len_k = geometry::line_length_deg(&lines[k]);
            if len_k > winner_len {
                winner = k;
                winner_len = len_k;
            }
        }
        kept.push(lines[winner].clone());
        for k in group {
            claimed[k] = true;
        }
    }

    info!(
        "collapsed {} input lines into {} centerlines",
        lines.len(),
        kept.len()
    );
    kept
}
