//! Event-to-network snapping.
//!
//! Each valid event is projected onto the nearest network piece. The R-tree
//! gives coarse candidates within a bounding box around the snap disk; a
//! coarse candidate can still exceed the exact tolerance, so the final
//! nearest-point distance is re-checked before the event is accepted.

use geo::Coord;
use log::info;
use rstar::{RTree, RTreeObject, AABB};

use crate::geometry;
use crate::network::Network;

/// An event mapped onto the network, alongside its source position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnappedEvent {
    /// Original event position in degrees.
    pub source: Coord<f64>,
    /// Nearest point on the network.
    pub snapped: Coord<f64>,
    /// Index of the owning piece in the network.
    pub piece_idx: usize,
    /// Exact planar degree distance from source to snapped position.
    pub distance_deg: f64,
}

struct PieceEnvelope {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for PieceEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Snap events to the nearest network piece within `snap_deg`.
///
/// Events with no piece inside the tolerance are dropped, never moved.
pub fn snap_events(events: &[Coord<f64>], network: &Network, snap_deg: f64) -> Vec<SnappedEvent> {
    let entries: Vec<PieceEnvelope> = network
        .pieces()
        .iter()
        .enumerate()
        .map(|(idx, piece)| {
            let mut min_x = f64::INFINITY;
            let mut min_y = f64::INFINITY;
            let mut max_x = f64::NEG_INFINITY;
            let mut max_y = f64::NEG_INFINITY;
            for c in &piece.line.0 {
                min_x = min_x.min(c.x);
                min_y = min_y.min(c.y);
                max_x = max_x.max(c.x);
                max_y = max_y.max(c.y);
            }
            PieceEnvelope {
                idx,
                envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
            }
        })
        .collect();
    let tree = RTree::bulk_load(entries);

    let snapped: Vec<SnappedEvent> = events
        .iter()
        .filter_map(|&p| {
            let disk_bbox =
                AABB::from_corners([p.x - snap_deg, p.y - snap_deg], [p.x + snap_deg, p.y + snap_deg]);
            let mut best: Option<SnappedEvent> = None;
            for entry in tree.locate_in_envelope_intersecting(&disk_bbox) {
                let piece = &network.pieces()[entry.idx];
                let (point, dist) = geometry::nearest_point_on_line(p, &piece.line);
                if best.map_or(true, |b| dist < b.distance_deg) {
                    best = Some(SnappedEvent {
                        source: p,
                        snapped: point,
                        piece_idx: entry.idx,
                        distance_deg: dist,
                    });
                }
            }
            best.filter(|b| b.distance_deg <= snap_deg)
        })
        .collect();

    info!("snapped {} of {} events to the network", snapped.len(), events.len());
    snapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MeterScale;
    use geo::LineString;

    fn network() -> Network {
        // One east-west road of about 1111 m at the equator.
        let line = LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 0.01, y: 0.0 }]);
        Network::from_pieces(vec![(0, line)], &MeterScale::from_mean_latitude(0.0))
    }

    #[test]
    fn test_event_within_tolerance_is_snapped() {
        let net = network();
        let off_road = Coord { x: 0.005, y: 0.00002 };
        let snapped = snap_events(&[off_road], &net, 0.0001);
        assert_eq!(snapped.len(), 1);
        assert!((snapped[0].snapped.x - 0.005).abs() < 1e-9);
        assert!(snapped[0].snapped.y.abs() < 1e-12);
        assert!(snapped[0].distance_deg <= 0.0001);
    }

    #[test]
    fn test_event_beyond_tolerance_is_dropped() {
        let net = network();
        let far = Coord { x: 0.005, y: 0.001 };
        assert!(snap_events(&[far], &net, 0.0001).is_empty());
    }

    #[test]
    fn test_coarse_candidate_rechecked_exactly() {
        let net = network();
        // Inside the corner of the bbox query but outside the disk radius
        // from the road itself.
        let corner = Coord { x: 0.005, y: 0.00015 };
        assert!(snap_events(&[corner], &net, 0.0001).is_empty());
    }

    #[test]
    fn test_nearest_piece_wins() {
        let scale = MeterScale::from_mean_latitude(0.0);
        let near = LineString::new(vec![Coord { x: 0.0, y: 0.0001 }, Coord { x: 0.01, y: 0.0001 }]);
        let far = LineString::new(vec![Coord { x: 0.0, y: 0.0004 }, Coord { x: 0.01, y: 0.0004 }]);
        let net = Network::from_pieces(vec![(0, far), (1, near)], &scale);
        let event = Coord { x: 0.005, y: 0.0 };
        let snapped = snap_events(&[event], &net, 0.001);
        assert_eq!(snapped.len(), 1);
        assert!((snapped[0].snapped.y - 0.0001).abs() < 1e-12);
    }
}
