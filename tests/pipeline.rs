//! End-to-end tests for the run pipeline: fixtures on disk, artifacts out.

use std::fs;
use std::path::{Path, PathBuf};

use netspot::{AnalysisError, RunConfig};

const DEG_PER_M: f64 = 1.0 / 111_111.0;

fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("netspot-{}-{name}", std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Events as (chainage_m, offset_m) on an east-west road at the equator.
fn write_events_csv(path: &Path, events: &[(f64, f64)]) {
    let mut text = String::from("latitude,longitude\n");
    for &(chainage_m, offset_m) in events {
        let lat = offset_m * DEG_PER_M;
        let lon = chainage_m * DEG_PER_M;
        text.push_str(&format!("{lat},{lon}\n"));
    }
    fs::write(path, text).unwrap();
}

fn write_straight_road(path: &Path, length_m: f64) {
    let end = length_m * DEG_PER_M;
    let geojson = format!(
        r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{"name":"test road"}},"geometry":{{"type":"LineString","coordinates":[[0.0,0.0],[{end},0.0]]}}}}]}}"#
    );
    fs::write(path, geojson).unwrap();
}

fn write_empty_roads(path: &Path) {
    fs::write(path, r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
}

/// 40 spread events plus 20 packed within 50 m around chainage 2500.
fn clustered_events() -> Vec<(f64, f64)> {
    let mut events: Vec<(f64, f64)> = (0..40)
        .map(|i| (62.5 + 125.0 * i as f64, 0.0))
        .collect();
    events.extend((0..20).map(|i| (2475.0 + 2.5 * i as f64, 0.0)));
    events
}

fn clustered_config(dir: &Path) -> RunConfig {
    let events_path = dir.join("events.csv");
    let roads_path = dir.join("roads.geojson");
    write_events_csv(&events_path, &clustered_events());
    write_straight_road(&roads_path, 5000.0);

    let mut config = RunConfig::new(&events_path, &roads_path, &dir.join("out"));
    config.r_start_m = 10.0;
    config.r_step_m = Some(10.0);
    config.hotspot_spacing_m = 25.0;
    config.n_sim_ripley = 99;
    config.n_sim_hotspot = 49;
    config
}

#[test]
fn test_clustered_run_finds_r_star_and_hotspots() {
    let dir = fixture_dir("clustered");
    let config = clustered_config(&dir);
    let summary = netspot::run(&config).unwrap();

    assert_eq!(summary.n_events, 60);
    assert_eq!(summary.n_snapped, 60);
    let r_star = summary.r_star_m.expect("clustered pattern must yield r*");
    assert!(r_star <= 50.0, "r* = {r_star} m");
    assert!(summary.n_hotspots >= 1);

    // All four artifacts exist.
    for name in [
        "ripley.csv",
        "hotspots.csv",
        "collapsed_roads.geojson",
        "metadata.json",
    ] {
        assert!(config.output_dir.join(name).exists(), "{name} missing");
    }

    // At least one flagged point sits inside the cluster span.
    let hotspots = fs::read_to_string(config.output_dir.join("hotspots.csv")).unwrap();
    let mut lines = hotspots.lines();
    assert_eq!(lines.next().unwrap(), "Latitude,Longitude,HS,UCL,LCL");
    let mut inside_cluster = false;
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        let lon: f64 = fields[1].parse().unwrap();
        if (lon / DEG_PER_M - 2500.0).abs() <= 50.0 {
            inside_cluster = true;
        }
    }
    assert!(inside_cluster, "no flagged sample point inside the cluster");

    // Metadata records the run parameters' outcome.
    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.output_dir.join("metadata.json")).unwrap())
            .unwrap();
    assert_eq!(metadata["crs"], "EPSG:4326");
    assert!((metadata["r_star_m"].as_f64().unwrap() - r_star).abs() < 1e-12);
    assert!(metadata["network_length_m"].as_f64().unwrap() > 4999.0);
}

#[test]
fn test_regular_pattern_completes_with_null_r_star() {
    let dir = fixture_dir("regular");
    let events_path = dir.join("events.csv");
    let roads_path = dir.join("roads.geojson");
    let events: Vec<(f64, f64)> = (0..50).map(|i| (50.0 + 100.0 * i as f64, 0.0)).collect();
    write_events_csv(&events_path, &events);
    write_straight_road(&roads_path, 5000.0);

    let mut config = RunConfig::new(&events_path, &roads_path, &dir.join("out"));
    config.n_sim_ripley = 99;
    let summary = netspot::run(&config).unwrap();

    assert_eq!(summary.r_star_m, None);
    assert_eq!(summary.n_hotspots, 0);

    // Header-only hotspot table, null r* in metadata: a completed run, not
    // an error.
    let hotspots = fs::read_to_string(config.output_dir.join("hotspots.csv")).unwrap();
    assert_eq!(hotspots.trim_end(), "Latitude,Longitude,HS,UCL,LCL");
    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.output_dir.join("metadata.json")).unwrap())
            .unwrap();
    assert!(metadata["r_star_m"].is_null());
}

#[test]
fn test_same_seed_and_workers_reproduce_tables_exactly() {
    let dir = fixture_dir("determinism");
    let mut first = clustered_config(&dir);
    first.n_workers = 3;
    first.output_dir = dir.join("out-a");
    let mut second = first.clone();
    second.output_dir = dir.join("out-b");

    netspot::run(&first).unwrap();
    netspot::run(&second).unwrap();

    for name in ["ripley.csv", "hotspots.csv", "metadata.json"] {
        let a = fs::read_to_string(first.output_dir.join(name)).unwrap();
        let b = fs::read_to_string(second.output_dir.join(name)).unwrap();
        assert_eq!(a, b, "{name} differs between identical runs");
    }
}

#[test]
fn test_snapped_events_stay_within_tolerance() {
    let dir = fixture_dir("snap-tolerance");
    let events_path = dir.join("events.csv");
    let roads_path = dir.join("roads.geojson");
    // Events 20 m off the road, one beyond the 50 m tolerance.
    let mut events: Vec<(f64, f64)> = (0..10).map(|i| (200.0 + 400.0 * i as f64, 20.0)).collect();
    events.push((2100.0, 300.0));
    write_events_csv(&events_path, &events);
    write_straight_road(&roads_path, 5000.0);

    let mut config = RunConfig::new(&events_path, &roads_path, &dir.join("out"));
    config.n_sim_ripley = 9;
    config.n_sim_hotspot = 9;
    let summary = netspot::run(&config).unwrap();
    assert_eq!(summary.n_events, 11);
    assert_eq!(summary.n_snapped, 10);
}

#[test]
fn test_plot_artifact_written_when_enabled() {
    let dir = fixture_dir("plot");
    let mut config = clustered_config(&dir);
    config.plot = true;
    config.n_sim_ripley = 19;
    config.n_sim_hotspot = 19;
    netspot::run(&config).unwrap();
    let svg = fs::read_to_string(config.output_dir.join("l_function.svg")).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("polyline"));
}

#[test]
fn test_single_event_aborts_before_any_hotspot_artifact() {
    let dir = fixture_dir("one-event");
    let events_path = dir.join("events.csv");
    let roads_path = dir.join("roads.geojson");
    write_events_csv(&events_path, &[(100.0, 0.0)]);
    write_straight_road(&roads_path, 1000.0);

    let config = RunConfig::new(&events_path, &roads_path, &dir.join("out"));
    let err = netspot::run(&config).unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientEvents { found: 1 }));
    assert!(!config.output_dir.join("hotspots.csv").exists());
    assert!(!config.output_dir.join("metadata.json").exists());
}

#[test]
fn test_empty_road_source_is_fatal() {
    let dir = fixture_dir("empty-roads");
    let events_path = dir.join("events.csv");
    let roads_path = dir.join("roads.geojson");
    write_events_csv(&events_path, &[(100.0, 0.0), (200.0, 0.0)]);
    write_empty_roads(&roads_path);

    let config = RunConfig::new(&events_path, &roads_path, &dir.join("out"));
    let err = netspot::run(&config).unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyNetwork));
}

#[test]
fn test_all_events_beyond_snap_tolerance_is_fatal() {
    let dir = fixture_dir("unsnappable");
    let events_path = dir.join("events.csv");
    let roads_path = dir.join("roads.geojson");
    // 300 m off a road with a 50 m snap tolerance.
    write_events_csv(&events_path, &[(100.0, 300.0), (900.0, 300.0)]);
    write_straight_road(&roads_path, 1000.0);

    let config = RunConfig::new(&events_path, &roads_path, &dir.join("out"));
    let err = netspot::run(&config).unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientSnapped { found: 0 }));
}

#[test]
fn test_missing_coordinate_column_is_fatal() {
    let dir = fixture_dir("bad-columns");
    let events_path = dir.join("events.csv");
    let roads_path = dir.join("roads.geojson");
    fs::write(&events_path, "y,x\n0.001,0.002\n").unwrap();
    write_straight_road(&roads_path, 1000.0);

    let config = RunConfig::new(&events_path, &roads_path, &dir.join("out"));
    let err = netspot::run(&config).unwrap_err();
    assert!(matches!(err, AnalysisError::MissingColumn { .. }));
}

#[test]
fn test_invalid_event_rows_are_dropped_not_fatal() {
    let dir = fixture_dir("dirty-rows");
    let events_path = dir.join("events.csv");
    let roads_path = dir.join("roads.geojson");
    let lat = 0.0;
    let lon_a = 100.0 * DEG_PER_M;
    let lon_b = 400.0 * DEG_PER_M;
    fs::write(
        &events_path,
        format!("latitude,longitude\n{lat},{lon_a}\nnot-a-number,{lon_b}\n,\n{lat},{lon_b}\n999.0,{lon_b}\n"),
    )
    .unwrap();
    write_straight_road(&roads_path, 1000.0);

    let mut config = RunConfig::new(&events_path, &roads_path, &dir.join("out"));
    config.n_sim_ripley = 9;
    config.n_sim_hotspot = 9;
    let summary = netspot::run(&config).unwrap();
    assert_eq!(summary.n_events, 2);
}
