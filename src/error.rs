//! Unified error handling for the analysis pipeline.
//!
//! Fatal input conditions abort a run before the hotspot and metadata
//! artifacts are written. Locally recoverable geometry problems (a line
//! that will not split cleanly) are logged and degraded, never raised.

use thiserror::Error;

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that abort an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Fewer than two valid events in the input table.
    #[error("at least two valid events are required, found {found}")]
    InsufficientEvents { found: usize },

    /// The road source produced no usable line geometry.
    #[error("road source contains no usable line geometry")]
    EmptyNetwork,

    /// The segmented network has zero total length.
    #[error("total network length is zero")]
    ZeroNetworkLength,

    /// Fewer than two events survived snapping to the network.
    #[error("fewer than two events within snap tolerance, found {found}")]
    InsufficientSnapped { found: usize },

    /// A requested column is missing from the event table.
    #[error("column {name:?} not found in event table")]
    MissingColumn { name: String },

    /// A parallel hotspot simulation block failed.
    #[error("hotspot simulation worker failed: {message}")]
    Worker { message: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("geojson error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
