//! Diagnostic SVG plot of the L function and its simulation envelope.
//!
//! A minimal hand-built SVG: observed L, both envelope bounds and the zero
//! line over the radius axis. Good enough to eyeball where the observed
//! statistic escapes the band; real cartography stays out of scope.

use std::fs;
use std::path::Path;

use log::warn;

use crate::error::Result;
use crate::ripley::RipleyAnalysis;

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 520.0;
const MARGIN: f64 = 50.0;

fn polyline(radii: &[f64], values: &[f64], x: &Mapper, y: &Mapper, color: &str) -> String {
    let points: Vec<String> = radii
        .iter()
        .zip(values)
        .filter(|(_, v)| v.is_finite())
        .map(|(&r, &v)| format!("{:.2},{:.2}", x.map(r), y.map(v)))
        .collect();
    format!(
        "  <polyline fill=\"none\" stroke=\"{color}\" stroke-width=\"1.5\" points=\"{}\"/>\n",
        points.join(" ")
    )
}

struct Mapper {
    lo: f64,
    hi: f64,
    out_lo: f64,
    out_hi: f64,
}

impl Mapper {
    fn map(&self, v: f64) -> f64 {
        if self.hi <= self.lo {
            return self.out_lo;
        }
        self.out_lo + (v - self.lo) / (self.hi - self.lo) * (self.out_hi - self.out_lo)
    }
}

/// Write the L(r) diagnostic plot. Logs and skips when the radius series
/// is empty.
pub fn write_l_svg(path: &Path, analysis: &RipleyAnalysis) -> Result<()> {
    if analysis.radii_m.is_empty() {
        warn!("empty radius series, skipping L plot");
        return Ok(());
    }

    let mut y_lo = 0.0f64;
    let mut y_hi = 0.0f64;
    for series in [&analysis.l_obs, &analysis.l_env_lo, &analysis.l_env_hi] {
        for &v in series.iter().filter(|v| v.is_finite()) {
            y_lo = y_lo.min(v);
            y_hi = y_hi.max(v);
        }
    }
    let pad = (y_hi - y_lo).max(1e-9) * 0.05;

    let x = Mapper {
        lo: analysis.radii_m[0],
        hi: *analysis.radii_m.last().unwrap_or(&1.0),
        out_lo: MARGIN,
        out_hi: WIDTH - MARGIN,
    };
    let y = Mapper {
        lo: y_lo - pad,
        hi: y_hi + pad,
        out_lo: HEIGHT - MARGIN,
        out_hi: MARGIN,
    };

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" \
         viewBox=\"0 0 {WIDTH} {HEIGHT}\">\n"
    ));
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    // Zero reference line
    let zero_y = y.map(0.0);
    svg.push_str(&format!(
        "  <line x1=\"{MARGIN}\" y1=\"{zero_y:.2}\" x2=\"{:.2}\" y2=\"{zero_y:.2}\" \
         stroke=\"#999999\" stroke-dasharray=\"4 3\"/>\n",
        WIDTH - MARGIN
    ));
    svg.push_str(&polyline(&analysis.radii_m, &analysis.l_env_hi, &x, &y, "#d62728"));
    svg.push_str(&polyline(&analysis.radii_m, &analysis.l_env_lo, &x, &y, "#2ca02c"));
    svg.push_str(&polyline(&analysis.radii_m, &analysis.l_obs, &x, &y, "#1f77b4"));
    svg.push_str(&format!(
        "  <text x=\"{MARGIN}\" y=\"{:.2}\" font-family=\"sans-serif\" font-size=\"14\">\
         L(r) with 2.5/97.5% envelope</text>\n",
        MARGIN - 14.0
    ));
    svg.push_str("</svg>\n");

    fs::write(path, svg)?;
    Ok(())
}
