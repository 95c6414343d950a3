//! Windowed hotspot scanner with Monte Carlo significance testing.
//!
//! Sample points are laid out along every network piece at a fixed spacing.
//! For each, the local intensity H is the event count strictly inside a
//! buffer circle of radius r*, normalized by the meters of road inside that
//! circle. Simulations redraw the events under the network-constrained null
//! model and recompute H for every sample point, yielding an
//! `n_sim x n_samples` matrix.
//!
//! Flagging is deliberately asymmetric: `HS = H_obs - mean(H_sim)` is
//! compared against the 97.5 percentile of the raw simulated H (not of HS),
//! and a sample point is reported only when `HS > UCL`. LCL is carried in
//! the output but never used for flagging.

use geo::Coord;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{self, MeterScale};
use crate::network::Network;
use crate::stats;

#[cfg(feature = "parallel")]
use crate::error::AnalysisError;

/// A sample-point buffer circle in degree space.
///
/// The radius comes from r* scaled by the latitude factor alone, matching
/// the rest of the pipeline's local linearization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferCircle {
    pub center: Coord<f64>,
    pub radius_deg: f64,
}

impl BufferCircle {
    /// Strict containment: points on the boundary are outside.
    pub fn contains(&self, p: Coord<f64>) -> bool {
        let dx = p.x - self.center.x;
        let dy = p.y - self.center.y;
        dx * dx + dy * dy < self.radius_deg * self.radius_deg
    }
}

/// A sample location with statistically elevated local intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotspotCandidate {
    pub latitude: f64,
    pub longitude: f64,
    /// Mean-adjusted statistic `H_obs - mean(H_sim)`.
    pub hs: f64,
    /// 97.5 percentile of simulated H at this location.
    pub ucl: f64,
    /// 2.5 percentile of simulated H at this location.
    pub lcl: f64,
}

struct IndexedPoint {
    x: f64,
    y: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

/// Sample locations along every piece at `spacing_deg`: always the piece
/// start, then every spacing multiple, with the last point capped at the
/// piece end.
pub fn sample_points(network: &Network, spacing_deg: f64) -> Vec<Coord<f64>> {
    let mut points = Vec::new();
    for piece in network.pieces() {
        let len_deg = geometry::line_length_deg(&piece.line);
        if len_deg <= spacing_deg || spacing_deg <= 0.0 {
            points.push(piece.line.0[0]);
            continue;
        }
        let n = (len_deg / spacing_deg).floor() as usize;
        for i in 0..=n {
            let dist = (i as f64 * spacing_deg).min(len_deg);
            points.push(geometry::interpolate_at(&piece.line, dist));
        }
    }
    points
}

/// Reproducible uniform down-sample to at most `max` points, re-sorted into
/// network order.
pub fn downsample(points: Vec<Coord<f64>>, max: usize, seed: u64) -> Vec<Coord<f64>> {
    if points.len() <= max {
        return points;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, points.len(), max).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| points[i]).collect()
}

/// Meters of network inside a circle: exact per-edge chord clipping in
/// degree space, measured with the anisotropic meter scale.
pub fn network_length_in_circle(
    network: &Network,
    circle: &BufferCircle,
    scale: &MeterScale,
) -> f64 {
    let r2 = circle.radius_deg * circle.radius_deg;
    let mut total = 0.0;
    for piece in network.pieces() {
        for w in piece.line.0.windows(2) {
            let (a, b) = (w[0], w[1]);
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let len2 = dx * dx + dy * dy;
            if len2 <= 0.0 {
                continue;
            }
            let fx = a.x - circle.center.x;
            let fy = a.y - circle.center.y;
            // |f + t d|^2 = r^2
            let bb = 2.0 * (fx * dx + fy * dy);
            let cc = fx * fx + fy * fy - r2;
            let disc = bb * bb - 4.0 * len2 * cc;
            if disc <= 0.0 {
                continue;
            }
            let sqrt_disc = disc.sqrt();
            let t0 = ((-bb - sqrt_disc) / (2.0 * len2)).max(0.0);
            let t1 = ((-bb + sqrt_disc) / (2.0 * len2)).min(1.0);
            if t1 > t0 {
                total += (t1 - t0) * scale.distance_m(a, b);
            }
        }
    }
    total
}

fn count_inside(tree: &RTree<IndexedPoint>, circle: &BufferCircle) -> usize {
    let r = circle.radius_deg;
    let bbox = AABB::from_corners(
        [circle.center.x - r, circle.center.y - r],
        [circle.center.x + r, circle.center.y + r],
    );
    tree.locate_in_envelope_intersecting(&bbox)
        .filter(|p| circle.contains(Coord { x: p.x, y: p.y }))
        .count()
}

fn build_point_tree(points: &[Coord<f64>]) -> RTree<IndexedPoint> {
    RTree::bulk_load(points.iter().map(|p| IndexedPoint { x: p.x, y: p.y }).collect())
}

/// H for one point set across all circles, using pre-computed in-circle
/// road lengths: `H = count * 2 r* / C`, zero where no road falls inside.
fn h_row(points: &[Coord<f64>], circles: &[BufferCircle], ci: &[f64], r_star_m: f64) -> Vec<f64> {
    let tree = build_point_tree(points);
    circles
        .iter()
        .zip(ci)
        .map(|(circle, &c)| {
            if c > 0.0 {
                count_inside(&tree, circle) as f64 * (2.0 * r_star_m / c)
            } else {
                0.0
            }
        })
        .collect()
}

/// Observed H at every sample circle.
pub fn observed_h(
    circles: &[BufferCircle],
    events: &[Coord<f64>],
    network: &Network,
    r_star_m: f64,
    scale: &MeterScale,
) -> Vec<f64> {
    let ci = in_circle_lengths(network, circles, scale);
    h_row(events, circles, &ci, r_star_m)
}

fn in_circle_lengths(network: &Network, circles: &[BufferCircle], scale: &MeterScale) -> Vec<f64> {
    circles
        .iter()
        .map(|c| network_length_in_circle(network, c, scale))
        .collect()
}

/// Serial simulation path: one freshly seeded generator drives all draws.
pub fn simulate_h(
    network: &Network,
    circles: &[BufferCircle],
    r_star_m: f64,
    scale: &MeterScale,
    n_events: usize,
    n_sim: usize,
    seed: u64,
) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let ci = in_circle_lengths(network, circles, scale);
    (0..n_sim)
        .map(|_| {
            let draw = network.draw_uniform(n_events, &mut rng);
            h_row(&draw, circles, &ci, r_star_m)
        })
        .collect()
}

/// Everything one simulation block needs, crossing the worker boundary as a
/// serialized copy: no shared mutable state.
#[cfg_attr(not(feature = "parallel"), allow(dead_code))]
#[derive(Debug, Serialize, Deserialize)]
struct SimBlock {
    start: usize,
    n_sims: usize,
    seed: u64,
    network: Network,
    circles: Vec<BufferCircle>,
    r_star_m: f64,
    scale: MeterScale,
    n_events: usize,
}

#[cfg(feature = "parallel")]
fn run_sim_block(bytes: &[u8]) -> Result<(usize, Vec<Vec<f64>>)> {
    let block: SimBlock = bincode::deserialize(bytes).map_err(|e| AnalysisError::Worker {
        message: e.to_string(),
    })?;
    let mut rng = StdRng::seed_from_u64(block.seed);
    let ci = in_circle_lengths(&block.network, &block.circles, &block.scale);
    let rows = (0..block.n_sims)
        .map(|_| {
            let draw = block.network.draw_uniform(block.n_events, &mut rng);
            h_row(&draw, &block.circles, &ci, block.r_star_m)
        })
        .collect();
    Ok((block.start, rows))
}

/// Parallel simulation path: contiguous blocks of simulations handed to
/// independent workers.
///
/// Each block's seed is `base_seed + block_start * 97 + 13`, so results are
/// reproducible for a fixed worker count, while a different worker count
/// shifts block boundaries and therefore the simulated values. A failed
/// worker aborts the whole stage.
#[cfg(feature = "parallel")]
#[allow(clippy::too_many_arguments)]
pub fn simulate_h_parallel(
    network: &Network,
    circles: &[BufferCircle],
    r_star_m: f64,
    scale: &MeterScale,
    n_events: usize,
    n_sim: usize,
    base_seed: u64,
    n_workers: usize,
) -> Result<Vec<Vec<f64>>> {
    use rayon::prelude::*;

    let workers = n_workers.max(2);
    let chunk = n_sim.div_ceil(workers).max(1);

    let mut payloads: Vec<Vec<u8>> = Vec::new();
    let mut start = 0;
    while start < n_sim {
        let n_sims = chunk.min(n_sim - start);
        let block = SimBlock {
            start,
            n_sims,
            seed: base_seed + start as u64 * 97 + 13,
            network: network.clone(),
            circles: circles.to_vec(),
            r_star_m,
            scale: *scale,
            n_events,
        };
        let bytes = bincode::serialize(&block).map_err(|e| AnalysisError::Worker {
            message: e.to_string(),
        })?;
        payloads.push(bytes);
        start += n_sims;
    }

    let blocks: Vec<(usize, Vec<Vec<f64>>)> = payloads
        .par_iter()
        .map(|bytes| run_sim_block(bytes))
        .collect::<Result<Vec<_>>>()?;

    let mut matrix: Vec<Vec<f64>> = vec![Vec::new(); n_sim];
    for (block_start, rows) in blocks {
        for (i, row) in rows.into_iter().enumerate() {
            matrix[block_start + i] = row;
        }
    }
    Ok(matrix)
}

/// Mean-adjusted statistic and the simulated-H quantile bounds.
///
/// UCL and LCL are quantiles of the raw simulated H, not of HS.
pub fn hs_ucl_lcl(h_obs: &[f64], h_sim: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mean = stats::column_means(h_sim);
    let hs: Vec<f64> = h_obs.iter().zip(&mean).map(|(h, m)| h - m).collect();
    let ucl = stats::column_quantiles(h_sim, 0.975);
    let lcl = stats::column_quantiles(h_sim, 0.025);
    (hs, ucl, lcl)
}

/// Keep exactly the sample points with `HS > UCL`.
pub fn flag_candidates(
    samples: &[Coord<f64>],
    hs: &[f64],
    ucl: &[f64],
    lcl: &[f64],
) -> Vec<HotspotCandidate> {
    samples
        .iter()
        .zip(hs.iter().zip(ucl.iter().zip(lcl)))
        .filter(|(_, (h, (u, _)))| h > u)
        .map(|(p, (&hs, (&ucl, &lcl)))| HotspotCandidate {
            latitude: p.y,
            longitude: p.x,
            hs,
            ucl,
            lcl,
        })
        .collect()
}

/// Full hotspot scan: sample, measure, simulate, flag.
#[allow(clippy::too_many_arguments)]
pub fn scan(
    network: &Network,
    events: &[Coord<f64>],
    r_star_m: f64,
    spacing_deg: f64,
    scale: &MeterScale,
    n_sim: usize,
    seed: u64,
    n_workers: usize,
    max_sample_points: Option<usize>,
) -> Result<Vec<HotspotCandidate>> {
    let radius_deg = r_star_m / scale.meters_per_deg_lat;

    let mut samples = sample_points(network, spacing_deg);
    if let Some(max) = max_sample_points {
        samples = downsample(samples, max, seed);
    }
    let circles: Vec<BufferCircle> = samples
        .iter()
        .map(|&center| BufferCircle { center, radius_deg })
        .collect();
    info!(
        "scanning {} sample points with r* = {r_star_m:.1} m over {n_sim} simulations",
        samples.len()
    );

    let h_obs = observed_h(&circles, events, network, r_star_m, scale);

    #[cfg(feature = "parallel")]
    let h_sim = if n_workers > 1 {
        simulate_h_parallel(
            network,
            &circles,
            r_star_m,
            scale,
            events.len(),
            n_sim,
            seed,
            n_workers,
        )?
    } else {
        simulate_h(network, &circles, r_star_m, scale, events.len(), n_sim, seed)
    };
    #[cfg(not(feature = "parallel"))]
    let h_sim = {
        let _ = n_workers;
        simulate_h(network, &circles, r_star_m, scale, events.len(), n_sim, seed)
    };

    let (hs, ucl, lcl) = hs_ucl_lcl(&h_obs, &h_sim);
    let candidates = flag_candidates(&samples, &hs, &ucl, &lcl);
    info!("flagged {} hotspot candidates", candidates.len());
    Ok(candidates)
}
