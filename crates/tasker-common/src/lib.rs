//! Common geographic types shared across the raster tasker crates.

pub mod bbox;
pub mod error;
pub mod footprint;
pub mod layer;
pub mod tile;

pub use bbox::BoundingBox;
pub use error::{GeoError, GeoResult};
pub use footprint::Footprint;
pub use layer::LayerSource;
pub use tile::{TileCoord, TileRange, ZoomRange, MAX_ZOOM};
