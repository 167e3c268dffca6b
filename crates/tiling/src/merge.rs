//! Task generation for layer updates.
//!
//! When a layer is merged into existing tiles, every tile touched by any
//! contributing layer has to be rebuilt from exactly the layers that cover
//! it. Each zoom level is handled on its own grid, from `max_zoom` down to 0:
//! layer bboxes are snapped to the grid, decomposed into disjoint overlap
//! regions, and each region's tiles are emitted in bounded batches together
//! with the list of sources to merge.

use std::iter;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use tasker_common::tile::check_zoom;
use tasker_common::{BoundingBox, LayerSource, TileRange};
use tracing::debug;

use crate::error::{Result, TilingError};
use crate::grid::{snap_to_zoom_grid, GridSnapper};
use crate::overlap::{LayerFootprint, OverlapDecomposer, OverlapRegion, DEFAULT_MAX_OVERLAP_LAYERS};
use crate::until_error;

/// Where a merge task reads or writes tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSource {
    /// Tile storage provider, e.g. `FS` or `S3`
    #[serde(rename = "type")]
    pub source_type: String,
    pub path: String,
}

/// One merge task: tile ranges plus the sources that contribute to them.
///
/// `sources[0]` is always the destination layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBatch {
    pub sources: Vec<TaskSource>,
    pub batches: Vec<TileRange>,
}

type BatchIter<'s> = Box<dyn Iterator<Item = Result<TaskBatch>> + 's>;

#[derive(Debug, Clone)]
pub struct MergeBatchGenerator<'a> {
    layers: &'a [LayerSource],
    bboxes: Vec<BoundingBox>,
    dest_path: String,
    storage_provider: String,
    max_zoom: u32,
    snapper: GridSnapper,
    max_overlap_layers: usize,
}

impl<'a> MergeBatchGenerator<'a> {
    pub fn new(
        layers: &'a [LayerSource],
        dest_path: impl Into<String>,
        max_zoom: u32,
        tile_batch_size: u64,
        storage_provider: impl Into<String>,
    ) -> Result<Self> {
        check_zoom(max_zoom)?;
        let bboxes = layers
            .iter()
            .map(|layer| {
                layer
                    .footprint
                    .bbox()
                    .ok_or_else(|| TilingError::EmptyFootprint(layer.id.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            layers,
            bboxes,
            dest_path: dest_path.into(),
            storage_provider: storage_provider.into(),
            max_zoom,
            snapper: GridSnapper::new(tile_batch_size)?,
            max_overlap_layers: DEFAULT_MAX_OVERLAP_LAYERS,
        })
    }

    pub fn with_max_overlap_layers(mut self, max_overlap_layers: usize) -> Self {
        self.max_overlap_layers = max_overlap_layers;
        self
    }

    /// Lazily yield every merge task, deepest zoom first.
    ///
    /// Each call starts over from `max_zoom`. Stops after the first error.
    pub fn batches(&self) -> impl Iterator<Item = Result<TaskBatch>> + '_ {
        until_error(
            (0..=self.max_zoom)
                .rev()
                .flat_map(move |zoom| self.zoom_batches(zoom)),
        )
    }

    fn snapped_footprints(&self, zoom: u32) -> Result<Vec<LayerFootprint<'a>>> {
        self.layers
            .iter()
            .zip(&self.bboxes)
            .map(|(layer, bbox)| {
                let snapped = snap_to_zoom_grid(bbox, zoom)?;
                Ok(LayerFootprint::new(
                    layer,
                    MultiPolygon::new(vec![snapped.to_rect().to_polygon()]),
                ))
            })
            .collect()
    }

    fn zoom_batches(&self, zoom: u32) -> BatchIter<'_> {
        let decomposer = self
            .snapped_footprints(zoom)
            .and_then(|footprints| OverlapDecomposer::new(footprints, self.max_overlap_layers));

        match decomposer {
            Ok(decomposer) => {
                debug!(zoom = zoom, layers = self.layers.len(), "Decomposing layer overlaps");
                Box::new(decomposer.flat_map(move |region| {
                    match region.and_then(|region| self.region_batches(region, zoom)) {
                        Ok(batches) => batches,
                        Err(e) => Box::new(iter::once(Err(e))) as BatchIter<'_>,
                    }
                }))
            }
            Err(e) => Box::new(iter::once(Err(e))),
        }
    }

    fn sources_for(&self, region: &OverlapRegion<'_>) -> Vec<TaskSource> {
        iter::once(self.dest_path.as_str())
            .chain(region.layers.iter().map(|layer| layer.tiles_path.as_str()))
            .map(|path| TaskSource {
                source_type: self.storage_provider.clone(),
                path: path.to_string(),
            })
            .collect()
    }

    fn region_batches(&self, region: OverlapRegion<'_>, zoom: u32) -> Result<BatchIter<'_>> {
        let sources = self.sources_for(&region);
        let batches = self.snapper.tile_batches(&region.intersection, zoom)?;
        debug!(
            zoom = zoom,
            layers = ?region.layer_ids(),
            "Emitting merge batches for region"
        );
        Ok(Box::new(batches.map(move |batch| {
            Ok(TaskBatch {
                sources: sources.clone(),
                batches: batch,
            })
        })))
    }
}
