//! Thin sequencing over the pure analysis stages.
//!
//! ingest -> collapse -> segment/reference -> snap -> K/L -> hotspots ->
//! artifacts. Each stage is a free function over explicit inputs and
//! outputs; this module only wires them together, converts the meter
//! parameters into degree space once, and writes the artifacts. A run
//! either completes with all four artifacts or aborts before the hotspot
//! and metadata artifacts exist.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::geometry::MeterScale;
use crate::hotspot;
use crate::io::{self, RunMetadata};
use crate::ripley;
use crate::segment;
use crate::snap;
use crate::{collapse, plot};

/// Explicit run parameters. Nothing here is process-global; two runs with
/// different configs can execute back to back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Event table (CSV).
    pub events_path: PathBuf,
    /// Latitude column name in the event table.
    pub lat_field: String,
    /// Longitude column name in the event table.
    pub lon_field: String,
    /// Road network (GeoJSON lines, lon/lat degrees).
    pub roads_path: PathBuf,
    /// Output directory, created if missing.
    pub output_dir: PathBuf,
    /// Simplification distance in meters; the collapser's proximity
    /// tolerance is twenty times this.
    pub simplify_tolerance_m: f64,
    /// Coordinate precision scale. Accepted for compatibility with the
    /// original configuration surface; not applied to any computation.
    pub precision_scale: f64,
    /// Target segmentation spacing in meters.
    pub segment_spacing_m: f64,
    /// Snap tolerance in meters.
    pub snap_tolerance_m: f64,
    /// First radius of the K/L series, meters.
    pub r_start_m: f64,
    /// Radius step; falls back to the segmentation spacing when absent or
    /// non-positive.
    pub r_step_m: Option<f64>,
    /// Monte Carlo iterations for the K/L envelope.
    pub n_sim_ripley: usize,
    /// Monte Carlo iterations for the hotspot stage.
    pub n_sim_hotspot: usize,
    /// Run-level seed driving both stages.
    pub random_seed: u64,
    /// Hotspot sample spacing in meters.
    pub hotspot_spacing_m: f64,
    /// Worker count for the hotspot simulations; 1 means serial.
    pub n_workers: usize,
    /// Optional cap on hotspot sample points, applied as a seeded uniform
    /// down-sample.
    pub max_sample_points: Option<usize>,
    /// Write the L(r) diagnostic SVG.
    pub plot: bool,
    pub ripley_csv_name: String,
    pub hotspots_csv_name: String,
    pub collapsed_geojson_name: String,
}

impl RunConfig {
    /// Config with default analysis parameters for the given paths.
    pub fn new(events_path: &Path, roads_path: &Path, output_dir: &Path) -> Self {
        Self {
            events_path: events_path.to_path_buf(),
            lat_field: "latitude".to_string(),
            lon_field: "longitude".to_string(),
            roads_path: roads_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            simplify_tolerance_m: 5.0,
            precision_scale: 1e6,
            segment_spacing_m: 100.0,
            snap_tolerance_m: 50.0,
            r_start_m: 100.0,
            r_step_m: None,
            n_sim_ripley: 99,
            n_sim_hotspot: 99,
            random_seed: 42,
            hotspot_spacing_m: 100.0,
            n_workers: 1,
            max_sample_points: None,
            plot: false,
            ripley_csv_name: "ripley.csv".to_string(),
            hotspots_csv_name: "hotspots.csv".to_string(),
            collapsed_geojson_name: "collapsed_roads.geojson".to_string(),
        }
    }
}

/// What a completed run produced, for callers that persist run records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub n_events: usize,
    pub n_snapped: usize,
    pub lat0: f64,
    pub network_length_m: f64,
    pub r_star_m: Option<f64>,
    pub n_hotspots: usize,
}

/// Execute one batch analysis over a fixed event set and network snapshot.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    fs::create_dir_all(&config.output_dir)?;

    let events = io::read_events_csv(&config.events_path, &config.lat_field, &config.lon_field)?;
    if events.len() < 2 {
        return Err(AnalysisError::InsufficientEvents { found: events.len() });
    }
    let lat0 = events.iter().map(|e| e.y).sum::<f64>() / events.len() as f64;
    let scale = MeterScale::from_mean_latitude(lat0);

    let lines = io::read_roads_geojson(&config.roads_path)?;
    if lines.is_empty() {
        return Err(AnalysisError::EmptyNetwork);
    }

    let simplify_deg = scale.to_deg_min(config.simplify_tolerance_m);
    let segment_deg = scale.to_deg_min(config.segment_spacing_m);
    let snap_deg = scale.to_deg_max(config.snap_tolerance_m);
    let hotspot_deg = scale.to_deg_min(config.hotspot_spacing_m);

    let collapsed = collapse::collapse_dual_carriageways(&lines, simplify_deg);
    io::write_collapsed_geojson(
        &config.output_dir.join(&config.collapsed_geojson_name),
        &collapsed,
    )?;

    let network = segment::segment_network(&collapsed, segment_deg, &scale);
    let total_length_m = network.total_length_m();
    if total_length_m <= 0.0 {
        return Err(AnalysisError::ZeroNetworkLength);
    }
    info!(
        "network: {} pieces, {:.1} m total",
        network.len(),
        total_length_m
    );

    let snapped = snap::snap_events(&events, &network, snap_deg);
    if snapped.len() < 2 {
        return Err(AnalysisError::InsufficientSnapped { found: snapped.len() });
    }
    let snapped_coords: Vec<_> = snapped.iter().map(|s| s.snapped).collect();

    let r_step_m = config
        .r_step_m
        .filter(|&step| step > 0.0)
        .unwrap_or(config.segment_spacing_m);
    let radii = ripley::radius_series(config.r_start_m, r_step_m, total_length_m);

    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let analysis = ripley::analyze(
        &network,
        &snapped_coords,
        radii,
        &scale,
        config.n_sim_ripley.max(1),
        &mut rng,
    );
    io::write_ripley_csv(&config.output_dir.join(&config.ripley_csv_name), &analysis)?;
    if config.plot {
        plot::write_l_svg(&config.output_dir.join("l_function.svg"), &analysis)?;
    }

    let candidates = match analysis.r_star_m {
        Some(r_star_m) => hotspot::scan(
            &network,
            &snapped_coords,
            r_star_m,
            hotspot_deg,
            &scale,
            config.n_sim_hotspot.max(1),
            config.random_seed,
            config.n_workers,
            config.max_sample_points,
        )?,
        None => {
            info!("no significant clustering radius, writing header-only hotspot table");
            Vec::new()
        }
    };
    io::write_hotspots_csv(
        &config.output_dir.join(&config.hotspots_csv_name),
        &candidates,
    )?;

    io::write_metadata(
        &config.output_dir.join("metadata.json"),
        &RunMetadata {
            crs: "EPSG:4326".to_string(),
            lat0,
            network_length_m: total_length_m,
            r_star_m: analysis.r_star_m,
        },
    )?;

    Ok(RunSummary {
        n_events: events.len(),
        n_snapped: snapped.len(),
        lat0,
        network_length_m: total_length_m,
        r_star_m: analysis.r_star_m,
        n_hotspots: candidates.len(),
    })
}
