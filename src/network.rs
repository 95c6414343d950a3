//! The linear-referenced road network model.
//!
//! A [`Network`] is an ordered collection of [`RoadPiece`]s. Each piece
//! carries its meter length and a cumulative offset, so together they tile a
//! one-dimensional address space `[0, D)` spanning the whole network. The
//! offsets follow insertion order, which is not spatially contiguous; only
//! the total length is meaningful across pieces.
//!
//! The network-constrained null model lives here: uniform draws in address
//! space mapped back to 2D through the owning piece's parametric form.

use geo::{Coord, LineString};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::{self, MeterScale};

/// One piece of the collapsed, segmented road network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadPiece {
    /// Index of the source line this piece was cut from.
    pub source_id: usize,
    /// Polyline geometry in lon/lat degrees.
    pub line: LineString<f64>,
    /// Planar meter length under the run's [`MeterScale`].
    pub length_m: f64,
    /// Cumulative meter offset of the piece start in the linear address space.
    pub offset_m: f64,
}

impl RoadPiece {
    /// End of this piece in the linear address space.
    pub fn end_m(&self) -> f64 {
        self.offset_m + self.length_m
    }
}

/// Ordered, immutable collection of road pieces with linear referencing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pieces: Vec<RoadPiece>,
    total_length_m: f64,
}

impl Network {
    /// Build a network from `(source_id, geometry)` pieces in output order.
    ///
    /// Offsets are assigned by cumulative sum over that order. Pieces with
    /// zero planar length are dropped.
    pub fn from_pieces(pieces: Vec<(usize, LineString<f64>)>, scale: &MeterScale) -> Self {
        let mut out = Vec::with_capacity(pieces.len());
        let mut offset = 0.0;
        for (source_id, line) in pieces {
            let length_m = scale.line_length_m(&line);
            if length_m <= 0.0 {
                continue;
            }
            out.push(RoadPiece {
                source_id,
                line,
                length_m,
                offset_m: offset,
            });
            offset += length_m;
        }
        Self {
            pieces: out,
            total_length_m: offset,
        }
    }

    pub fn pieces(&self) -> &[RoadPiece] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Total network length D, the sum of all piece lengths.
    pub fn total_length_m(&self) -> f64 {
        self.total_length_m
    }

    /// Map a linear address `s` in `[0, D)` to a 2D degree coordinate.
    ///
    /// The owning piece is the first whose cumulative end exceeds `s`; the
    /// position within it is linear in meter fraction, interpolated along
    /// the piece's own degree length.
    pub fn locate(&self, s: f64) -> Coord<f64> {
        let idx = self
            .pieces
            .partition_point(|p| p.end_m() <= s)
            .min(self.pieces.len() - 1);
        let piece = &self.pieces[idx];
        let frac = if piece.length_m > 0.0 {
            (s - piece.offset_m) / piece.length_m
        } else {
            0.0
        };
        geometry::interpolate_normalized(&piece.line, frac)
    }

    /// Draw `n` points uniformly in linear-address space: the
    /// network-constrained null model shared by the K/L engine and the
    /// hotspot scanner. Uniform along the real network, not the plane.
    pub fn draw_uniform(&self, n: usize, rng: &mut StdRng) -> Vec<Coord<f64>> {
        (0..n)
            .map(|_| self.locate(rng.gen_range(0.0..self.total_length_m)))
            .collect()
    }
}
