//! Uniform segmentation and linear referencing.
//!
//! Splits every collapsed line into pieces no longer than the segmentation
//! spacing and hands the result to [`Network::from_pieces`], which assigns
//! the cumulative offsets. Piece order follows input order, so the linear
//! address space is not spatially contiguous; only the total length is.

use geo::{Coord, LineString};
use log::warn;

use crate::geometry::{self, MeterScale};
use crate::network::Network;

/// Segment collapsed lines at `spacing_deg` and build the referenced network.
///
/// Lines no longer than the spacing are kept whole. A line that cannot be
/// split cleanly is kept unsplit as a logged, non-fatal degraded mode.
pub fn segment_network(
    lines: &[LineString<f64>],
    spacing_deg: f64,
    scale: &MeterScale,
) -> Network {
    let mut pieces: Vec<(usize, LineString<f64>)> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let len_deg = geometry::line_length_deg(line);
        if len_deg <= spacing_deg {
            pieces.push((idx, line.clone()));
            continue;
        }
        match split_at_spacing(line, spacing_deg, len_deg) {
            Some(parts) => pieces.extend(parts.into_iter().map(|p| (idx, p))),
            None => {
                warn!("line {idx} did not split cleanly, keeping it unsplit");
                pieces.push((idx, line.clone()));
            }
        }
    }
    Network::from_pieces(pieces, scale)
}

/// Cut a polyline at every multiple of `spacing_deg` along its degree
/// length. Returns `None` when no clean split is possible (degenerate
/// geometry or non-positive spacing); the caller falls back to the whole
/// line.
fn split_at_spacing(
    line: &LineString<f64>,
    spacing_deg: f64,
    total_deg: f64,
) -> Option<Vec<LineString<f64>>> {
    let coords = &line.0;
    if coords.len() < 2 || spacing_deg <= 0.0 || total_deg <= 0.0 {
        return None;
    }

    let n_cuts = (total_deg / spacing_deg).floor() as usize;
    let mut parts: Vec<LineString<f64>> = Vec::with_capacity(n_cuts + 1);
    let mut current: Vec<Coord<f64>> = vec![coords[0]];
    let mut walked = 0.0;
    let mut cut = 1usize;

    for w in coords.windows(2) {
        let (a, b) = (w[0], w[1]);
        let edge = geometry::distance_deg(a, b);
        if edge <= 0.0 {
            continue;
        }
        while cut <= n_cuts {
            let target = cut as f64 * spacing_deg;
            if target > walked + edge {
                break;
            }
            let t = (target - walked) / edge;
            let point = Coord {
                x: a.x + t * (b.x - a.x),
                y: a.y + t * (b.y - a.y),
            };
            current.push(point);
            parts.push(LineString::new(std::mem::replace(
                &mut current,
                vec![point],
            )));
            cut += 1;
        }
        current.push(b);
        walked += edge;
    }
    if current.len() >= 2 {
        parts.push(LineString::new(current));
    }

    // Cuts landing exactly on a vertex can produce zero-length leftovers.
    parts.retain(|p| geometry::line_length_deg(p) > 0.0);

    if parts.len() < 2 {
        return None;
    }
    Some(parts)
}
