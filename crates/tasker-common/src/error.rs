//! Error types for geographic primitives.

use thiserror::Error;

/// Result type alias using GeoError.
pub type GeoResult<T> = Result<T, GeoError>;

/// Errors raised while building or validating geographic values.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Invalid footprint: {0}")]
    InvalidFootprint(String),

    #[error("Zoom level {zoom} exceeds the maximum of {max}")]
    ZoomOutOfRange { zoom: u32, max: u32 },

    #[error("Invalid zoom range: min {min} > max {max}")]
    InvalidZoomRange { min: u32, max: u32 },
}
