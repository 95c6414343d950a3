//! netspot CLI - run one batch clustering + hotspot analysis.
//!
//! Usage:
//!   netspot-cli --events events.csv --roads roads.geojson --output out/
//!
//! Writes the Ripley table, the hotspot table, the collapsed network and
//! run metadata into the output directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use netspot::RunConfig;

#[derive(Parser)]
#[command(name = "netspot-cli")]
#[command(about = "Road-network clustering and hotspot analysis", long_about = None)]
struct Cli {
    /// Event table (CSV with latitude/longitude columns)
    #[arg(long)]
    events: PathBuf,

    /// Latitude column name
    #[arg(long, default_value = "latitude")]
    lat_field: String,

    /// Longitude column name
    #[arg(long, default_value = "longitude")]
    lon_field: String,

    /// Road network (GeoJSON lines)
    #[arg(long)]
    roads: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,

    /// Simplification distance in meters (drives the collapse tolerance)
    #[arg(long, default_value_t = 5.0)]
    simplify_tolerance_m: f64,

    /// Coordinate precision scale (kept for config compatibility)
    #[arg(long, default_value_t = 1e6)]
    precision_scale: f64,

    /// Segmentation spacing in meters
    #[arg(long, default_value_t = 100.0)]
    segment_spacing_m: f64,

    /// Snap tolerance in meters
    #[arg(long, default_value_t = 50.0)]
    snap_tolerance_m: f64,

    /// First radius of the K/L series in meters
    #[arg(long, default_value_t = 100.0)]
    r_start_m: f64,

    /// Radius step in meters (defaults to the segmentation spacing)
    #[arg(long)]
    r_step_m: Option<f64>,

    /// Ripley Monte Carlo iterations
    #[arg(long, default_value_t = 99)]
    n_sim_ripley: usize,

    /// Hotspot Monte Carlo iterations
    #[arg(long, default_value_t = 99)]
    n_sim_hotspot: usize,

    /// Run-level random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Hotspot sample spacing in meters
    #[arg(long, default_value_t = 100.0)]
    hotspot_spacing_m: f64,

    /// Hotspot simulation workers (1 = serial)
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Cap on hotspot sample points (seeded uniform down-sample)
    #[arg(long)]
    max_sample_points: Option<usize>,

    /// Write an SVG plot of L(r) with its envelope
    #[arg(long)]
    plot: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = RunConfig::new(&cli.events, &cli.roads, &cli.output);
    config.lat_field = cli.lat_field;
    config.lon_field = cli.lon_field;
    config.simplify_tolerance_m = cli.simplify_tolerance_m;
    config.precision_scale = cli.precision_scale;
    config.segment_spacing_m = cli.segment_spacing_m;
    config.snap_tolerance_m = cli.snap_tolerance_m;
    config.r_start_m = cli.r_start_m;
    config.r_step_m = cli.r_step_m;
    config.n_sim_ripley = cli.n_sim_ripley;
    config.n_sim_hotspot = cli.n_sim_hotspot;
    config.random_seed = cli.seed;
    config.hotspot_spacing_m = cli.hotspot_spacing_m;
    config.n_workers = cli.workers;
    config.max_sample_points = cli.max_sample_points;
    config.plot = cli.plot;

    match netspot::run(&config) {
        Ok(summary) => {
            println!(
                "{} events ({} snapped), network {:.1} m",
                summary.n_events, summary.n_snapped, summary.network_length_m
            );
            match summary.r_star_m {
                Some(r) => println!("r* = {r:.1} m, {} hotspot candidates", summary.n_hotspots),
                None => println!("no significant clustering detected"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
