//! Error types for the tiling crate.

use tasker_common::GeoError;
use thiserror::Error;

/// Errors raised while computing zoom ranges, overlaps or tile batches.
#[derive(Error, Debug)]
pub enum TilingError {
    #[error("Invalid resolution {0}: must be a positive finite number")]
    InvalidResolution(f64),

    #[error("Invalid zoom group '{group}': {reason}")]
    InvalidZoomGroup { group: String, reason: String },

    #[error("{count} overlapping layers exceed the limit of {limit}")]
    TooManyLayers { count: usize, limit: usize },

    #[error("Layer '{0}' has an empty footprint")]
    EmptyFootprint(String),

    #[error("Geometry operation failed for layers {layers:?}: {message}")]
    Geometry { message: String, layers: Vec<String> },

    #[error("Tile batch size must be greater than zero")]
    InvalidBatchSize,

    #[error(transparent)]
    Geo(#[from] GeoError),
}

/// Result type for tiling operations.
pub type Result<T> = std::result::Result<T, TilingError>;
