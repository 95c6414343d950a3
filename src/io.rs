//! Ingestion and export of run artifacts.
//!
//! Events arrive as a CSV table with configurable latitude/longitude
//! columns; roads arrive as GeoJSON lines in lon/lat degrees. Outputs are
//! the Ripley table, the hotspot table, the collapsed network and a small
//! metadata document. Rows that fail to parse are dropped, not fatal; a
//! missing column is fatal.

use std::fs;
use std::path::Path;

use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue};
use log::{info, warn};
use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::geometry;
use crate::hotspot::HotspotCandidate;
use crate::ripley::RipleyAnalysis;

/// Read event coordinates from a CSV table.
///
/// Rows with unparseable or out-of-range coordinates are skipped.
pub fn read_events_csv(path: &Path, lat_field: &str, lon_field: &str) -> Result<Vec<Coord<f64>>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let lat_idx = headers
        .iter()
        .position(|h| h == lat_field)
        .ok_or_else(|| AnalysisError::MissingColumn {
            name: lat_field.to_string(),
        })?;
    let lon_idx = headers
        .iter()
        .position(|h| h == lon_field)
        .ok_or_else(|| AnalysisError::MissingColumn {
            name: lon_field.to_string(),
        })?;

    let mut events = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        let lat = record.get(lat_idx).and_then(|v| v.trim().parse::<f64>().ok());
        let lon = record.get(lon_idx).and_then(|v| v.trim().parse::<f64>().ok());
        match (lat, lon) {
            (Some(lat), Some(lon)) if is_valid_coordinate(lat, lon) => {
                events.push(Coord { x: lon, y: lat });
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("skipped {skipped} event rows with invalid coordinates");
    }
    info!("loaded {} events from {}", events.len(), path.display());
    Ok(events)
}

fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Read road polylines from a GeoJSON file, exploding multi-geometries and
/// dropping degenerate parts.
pub fn read_roads_geojson(path: &Path) -> Result<Vec<LineString<f64>>> {
    let text = fs::read_to_string(path)?;
    let geojson: GeoJson = text.parse()?;

    let mut lines = Vec::new();
    match &geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(geometry) = &feature.geometry {
                    collect_lines(&geometry.value, &mut lines);
                }
            }
        }
        GeoJson::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                collect_lines(&geometry.value, &mut lines);
            }
        }
        GeoJson::Geometry(geometry) => collect_lines(&geometry.value, &mut lines),
    }
    info!("loaded {} road lines from {}", lines.len(), path.display());
    Ok(lines)
}

fn collect_lines(value: &geojson::Value, out: &mut Vec<LineString<f64>>) {
    match value {
        geojson::Value::LineString(positions) => push_line(positions, out),
        geojson::Value::MultiLineString(parts) => {
            for positions in parts {
                push_line(positions, out);
            }
        }
        geojson::Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_lines(&geometry.value, out);
            }
        }
        _ => {}
    }
}

fn push_line(positions: &[Vec<f64>], out: &mut Vec<LineString<f64>>) {
    let coords: Vec<Coord<f64>> = positions
        .iter()
        .filter(|p| p.len() >= 2 && p[0].is_finite() && p[1].is_finite())
        .map(|p| Coord { x: p[0], y: p[1] })
        .collect();
    if coords.len() < 2 {
        return;
    }
    let line = LineString::new(coords);
    if geometry::line_length_deg(&line) > 0.0 {
        out.push(line);
    }
}

/// Write the Ripley table: one row per radius with K, L and both envelopes.
pub fn write_ripley_csv(path: &Path, analysis: &RipleyAnalysis) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "r_m",
        "K_obs",
        "K_env_lo",
        "K_env_hi",
        "L_obs",
        "L_env_lo",
        "L_env_hi",
    ])?;
    for i in 0..analysis.radii_m.len() {
        writer.write_record([
            analysis.radii_m[i].to_string(),
            analysis.k_obs[i].to_string(),
            analysis.k_env_lo[i].to_string(),
            analysis.k_env_hi[i].to_string(),
            analysis.l_obs[i].to_string(),
            analysis.l_env_lo[i].to_string(),
            analysis.l_env_hi[i].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the hotspot table. Header-only when no candidate exists, which is
/// the documented shape of a run without significant clustering.
pub fn write_hotspots_csv(path: &Path, candidates: &[HotspotCandidate]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Latitude", "Longitude", "HS", "UCL", "LCL"])?;
    for c in candidates {
        writer.write_record([
            c.latitude.to_string(),
            c.longitude.to_string(),
            c.hs.to_string(),
            c.ucl.to_string(),
            c.lcl.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the collapsed network as a GeoJSON feature collection of
/// `{id, geometry}` features.
pub fn write_collapsed_geojson(path: &Path, lines: &[LineString<f64>]) -> Result<()> {
    let features: Vec<Feature> = lines
        .iter()
        .enumerate()
        .map(|(id, line)| {
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), JsonValue::from(id));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(line))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let file = fs::File::create(path)?;
    serde_json::to_writer(file, &collection)?;
    Ok(())
}

/// Run-level metadata persisted next to the tables.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    /// Reference system shared by every artifact.
    pub crs: String,
    /// Mean event latitude anchoring the meter conversion.
    pub lat0: f64,
    /// Total network length D in meters.
    pub network_length_m: f64,
    /// Smallest significant clustering radius, if any.
    pub r_star_m: Option<f64>,
}

pub fn write_metadata(path: &Path, metadata: &RunMetadata) -> Result<()> {
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, metadata)?;
    Ok(())
}
