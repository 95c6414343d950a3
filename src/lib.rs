//! # netspot
//!
//! Network-constrained clustering statistics for point events on road
//! networks (wildlife-vehicle collisions and the like).
//!
//! This library answers two questions about a fixed event set and network
//! snapshot:
//! - do the events cluster more than chance along the network (Ripley's
//!   K/L against a network-constrained null model)?
//! - and if so, where (windowed hotspot scan with Monte Carlo significance
//!   testing, optionally parallelized)?
//!
//! The stages are pure functions wired together by [`pipeline::run`]:
//! ingestion, dual-carriageway collapsing, uniform segmentation with
//! linear referencing, event snapping, the K/L engine and the hotspot
//! scanner. All planar distances use one local degree-to-meter scale
//! anchored at the mean event latitude; the null model is uniform along
//! the real network, not the plane.
//!
//! ## Features
//!
//! - **`parallel`** (default) - rayon worker pool for the hotspot
//!   simulation stage
//!
//! ## Quick start
//!
//! ```no_run
//! use std::path::Path;
//! use netspot::RunConfig;
//!
//! let config = RunConfig::new(
//!     Path::new("events.csv"),
//!     Path::new("roads.geojson"),
//!     Path::new("out"),
//! );
//! let summary = netspot::run(&config)?;
//! println!("r* = {:?}, {} hotspots", summary.r_star_m, summary.n_hotspots);
//! # Ok::<(), netspot::AnalysisError>(())
//! ```

// Unified error handling
pub mod error;
pub use error::{AnalysisError, Result};

// Local degree/meter scale and planar measures
pub mod geometry;
pub use geometry::MeterScale;

// Shared numeric routines
pub mod stats;

// Linear-referenced network model and null-model draws
pub mod network;
pub use network::{Network, RoadPiece};

// Dual-carriageway collapsing
pub mod collapse;
pub use collapse::collapse_dual_carriageways;

// Uniform segmentation and linear referencing
pub mod segment;
pub use segment::segment_network;

// Event snapping
pub mod snap;
pub use snap::{snap_events, SnappedEvent};

// Ripley K/L clustering engine
pub mod ripley;
pub use ripley::RipleyAnalysis;

// Hotspot scanner
pub mod hotspot;
pub use hotspot::{BufferCircle, HotspotCandidate};

// Ingestion and artifact export
pub mod io;
pub use io::RunMetadata;

// L(r) diagnostic plot
pub mod plot;

// Synthetic patterns with known ground truth
pub mod synthetic;

// Run sequencing
pub mod pipeline;
pub use pipeline::{run, RunConfig, RunSummary};
