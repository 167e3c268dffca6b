//! Tile task generation for raster layer ingestion.
//!
//! Pure, synchronous building blocks that decide which tiles must be
//! (re)generated and from which layers:
//!
//! - [`zoom`]: resolution to zoom level conversion and zoom grouping
//! - [`grid`]: snapping to the WorldCRS84Quad grid, polygon to tile ranges,
//!   tile batching
//! - [`overlap`]: decomposition of overlapping footprints into disjoint
//!   regions attributed to their covering layers
//! - [`single_layer`]: task generation for brand-new layers
//! - [`merge`]: per-zoom merge task generation for layer updates
//!
//! Every generator is a lazy iterator of `Result` items that ends after the
//! first error.

pub mod error;
pub mod grid;
pub mod merge;
pub mod overlap;
pub mod single_layer;
pub mod zoom;

pub use error::{Result, TilingError};
pub use grid::{batch_tile_ranges, footprint_to_tile_ranges, snap_to_zoom_grid, GridSnapper};
pub use merge::{MergeBatchGenerator, TaskBatch, TaskSource};
pub use overlap::{LayerFootprint, OverlapDecomposer, OverlapRegion, DEFAULT_MAX_OVERLAP_LAYERS};
pub use single_layer::{NewLayerSource, SingleLayerTiler, TaskParameters};
pub use zoom::{zoom_for_resolution, ZoomRangeCalculator};

/// Pass items through up to and including the first error, without pulling
/// anything from `iter` afterwards.
pub(crate) fn until_error<T, I>(iter: I) -> UntilError<I>
where
    I: Iterator<Item = Result<T>>,
{
    UntilError { iter, failed: false }
}

pub(crate) struct UntilError<I> {
    iter: I,
    failed: bool,
}

impl<T, I> Iterator for UntilError<I>
where
    I: Iterator<Item = Result<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.iter.next()?;
        self.failed = item.is_err();
        Some(item)
    }
}
