//! Task generation for brand-new layers.
//!
//! A new layer has nothing to merge with, so its footprint is tiled directly:
//! each zoom range becomes one task per tile of a representative zoom level,
//! and the downstream tiler renders every level of the range inside that
//! tile's bbox.

use serde::{Deserialize, Serialize};
use tasker_common::{BoundingBox, Footprint, ZoomRange};
use tracing::debug;

use crate::error::Result;
use crate::grid::footprint_to_tile_ranges;
use crate::until_error;

/// The layer being created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLayerSource {
    pub discrete_id: String,
    pub version: String,
    pub origin_directory: String,
    pub layer_relative_path: String,
    pub footprint: Footprint,
}

/// Work instructions for one new-layer tiling task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskParameters {
    pub discrete_id: String,
    pub version: String,
    pub origin_directory: String,
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub layer_relative_path: String,
    /// `[minX, minY, maxX, maxY]`
    pub bbox: [f64; 4],
}

/// Zoom levels to step back from a range's max zoom so that one task bbox
/// holds at most `max_tiles_per_bbox` tiles at that max zoom.
pub fn zoom_bias(max_tiles_per_bbox: u64) -> u32 {
    if max_tiles_per_bbox <= 1 {
        return 0;
    }
    (max_tiles_per_bbox as f64).sqrt().log2().floor().max(0.0) as u32
}

#[derive(Debug, Clone, Copy)]
pub struct SingleLayerTiler {
    zoom_bias: u32,
}

impl SingleLayerTiler {
    pub fn new(max_tiles_per_bbox: u64) -> Self {
        Self {
            zoom_bias: zoom_bias(max_tiles_per_bbox),
        }
    }

    pub fn zoom_bias(&self) -> u32 {
        self.zoom_bias
    }

    /// Zoom level whose tiles become task bboxes for `range`.
    pub fn representative_zoom(&self, range: &ZoomRange) -> u32 {
        range.max_zoom.saturating_sub(self.zoom_bias)
    }

    /// Lazily yield the tasks for `layer` over `ranges`.
    ///
    /// Each call walks the ranges from the start again.
    pub fn tasks<'a>(
        &'a self,
        layer: &'a NewLayerSource,
        ranges: &'a [ZoomRange],
    ) -> impl Iterator<Item = Result<TaskParameters>> + 'a {
        let footprint_bbox = layer.footprint.bbox();

        let tasks = ranges.iter().flat_map(move |range| {
            let zoom = self.representative_zoom(range);
            let tiles: Box<dyn Iterator<Item = Result<TaskParameters>> + 'a> =
                match footprint_to_tile_ranges(layer.footprint.as_multi_polygon(), zoom) {
                    Ok(tile_ranges) => {
                        debug!(
                            min_zoom = range.min_zoom,
                            max_zoom = range.max_zoom,
                            representative_zoom = zoom,
                            ranges = tile_ranges.len(),
                            "Tiling new layer footprint"
                        );
                        let range = *range;
                        Box::new(
                            tile_ranges
                                .into_iter()
                                .flat_map(|r| r.tiles())
                                .map(move |tile| {
                                    let tile_bbox = tile.bbox();
                                    let bbox = footprint_bbox
                                        .and_then(|fp| tile_bbox.intersection(&fp))
                                        .unwrap_or(tile_bbox);
                                    Ok(task_parameters(layer, &range, &bbox))
                                }),
                        )
                    }
                    Err(e) => Box::new(std::iter::once(Err(e))),
                };
            tiles
        });

        until_error(tasks)
    }
}

fn task_parameters(layer: &NewLayerSource, range: &ZoomRange, bbox: &BoundingBox) -> TaskParameters {
    TaskParameters {
        discrete_id: layer.discrete_id.clone(),
        version: layer.version.clone(),
        origin_directory: layer.origin_directory.clone(),
        min_zoom: range.min_zoom,
        max_zoom: range.max_zoom,
        layer_relative_path: layer.layer_relative_path.clone(),
        bbox: bbox.to_array(),
    }
}
