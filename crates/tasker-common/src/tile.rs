//! WorldCRS84Quad tile grid.
//!
//! The grid has a lower-left origin at (-180, -90). Zoom level `z` has
//! `2^(z+1)` columns and `2^z` rows of square tiles `180 / 2^z` degrees wide,
//! so zoom 0 is two tiles splitting the world at the prime meridian.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{GeoError, GeoResult};

/// Deepest zoom level supported by the grid.
pub const MAX_ZOOM: u32 = 22;

/// Size of one tile edge in degrees at `zoom`.
pub fn tile_size_degrees(zoom: u32) -> f64 {
    180.0 / 2f64.powi(zoom as i32)
}

/// Number of tile columns at `zoom`.
pub fn matrix_width(zoom: u32) -> u32 {
    1u32 << (zoom + 1)
}

/// Number of tile rows at `zoom`.
pub fn matrix_height(zoom: u32) -> u32 {
    1u32 << zoom
}

/// Reject zoom levels deeper than the grid supports.
pub fn check_zoom(zoom: u32) -> GeoResult<()> {
    if zoom > MAX_ZOOM {
        return Err(GeoError::ZoomOutOfRange {
            zoom,
            max: MAX_ZOOM,
        });
    }
    Ok(())
}

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y), counted from the south
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Geographic bounds of this tile.
    pub fn bbox(&self) -> BoundingBox {
        let size = tile_size_degrees(self.z);
        let min_x = -180.0 + self.x as f64 * size;
        let min_y = -90.0 + self.y as f64 * size;
        BoundingBox::new(min_x, min_y, min_x + size, min_y + size)
    }
}

/// An inclusive range of zoom levels processed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomRange {
    pub min_zoom: u32,
    pub max_zoom: u32,
}

impl ZoomRange {
    pub fn new(min_zoom: u32, max_zoom: u32) -> GeoResult<Self> {
        if min_zoom > max_zoom {
            return Err(GeoError::InvalidZoomRange {
                min: min_zoom,
                max: max_zoom,
            });
        }
        Ok(Self { min_zoom, max_zoom })
    }

    /// Single-level range.
    pub fn single(zoom: u32) -> Self {
        Self {
            min_zoom: zoom,
            max_zoom: zoom,
        }
    }
}

/// A rectangular run of tiles at one zoom level.
///
/// `max_x` and `max_y` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRange {
    pub zoom: u32,
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl TileRange {
    pub fn new(zoom: u32, min_x: u32, max_x: u32, min_y: u32, max_y: u32) -> Self {
        Self {
            zoom,
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }

    pub fn tile_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.tile_count() == 0
    }

    /// Geographic bounds covered by the whole range.
    pub fn bbox(&self) -> BoundingBox {
        let size = tile_size_degrees(self.zoom);
        BoundingBox::new(
            -180.0 + self.min_x as f64 * size,
            -90.0 + self.min_y as f64 * size,
            -180.0 + self.max_x as f64 * size,
            -90.0 + self.max_y as f64 * size,
        )
    }

    /// Iterate the tiles row by row, south to north.
    pub fn tiles(self) -> impl Iterator<Item = TileCoord> {
        let TileRange {
            zoom,
            min_x,
            max_x,
            min_y,
            max_y,
        } = self;
        (min_y..max_y).flat_map(move |y| (min_x..max_x).map(move |x| TileCoord::new(zoom, x, y)))
    }
}
