//! Snapping geometry onto the tile grid.
//!
//! Converts bounding boxes and polygons into tile-index ranges of the
//! WorldCRS84Quad grid and groups those ranges into size-bounded batches.

use std::collections::BTreeMap;

use geo::{BoundingRect, Coord, MultiPolygon};
use tasker_common::tile::{check_zoom, matrix_height, matrix_width, tile_size_degrees};
use tasker_common::{BoundingBox, TileRange};

use crate::error::{Result, TilingError};

/// Absorbs float noise when a coordinate sits on a tile boundary.
const GRID_TOLERANCE: f64 = 1e-9;

const ORIGIN_X: f64 = -180.0;
const ORIGIN_Y: f64 = -90.0;

fn grid_position(value: f64, origin: f64, size: f64) -> f64 {
    let position = (value - origin) / size;
    let rounded = position.round();
    if (position - rounded).abs() < GRID_TOLERANCE {
        rounded
    } else {
        position
    }
}

fn floor_index(value: f64, origin: f64, size: f64, limit: u32) -> u32 {
    grid_position(value, origin, size)
        .floor()
        .clamp(0.0, limit as f64) as u32
}

fn ceil_index(value: f64, origin: f64, size: f64, limit: u32) -> u32 {
    grid_position(value, origin, size)
        .ceil()
        .clamp(0.0, limit as f64) as u32
}

/// Expand `bbox` outward to the enclosing tile boundaries at `zoom`.
///
/// The result never shrinks the input and is clamped to the world extent.
pub fn snap_to_zoom_grid(bbox: &BoundingBox, zoom: u32) -> Result<BoundingBox> {
    check_zoom(zoom)?;
    let size = tile_size_degrees(zoom);
    let (cols, rows) = (matrix_width(zoom), matrix_height(zoom));
    let bbox = bbox.clamp_to_world();

    Ok(BoundingBox::new(
        ORIGIN_X + floor_index(bbox.min_x, ORIGIN_X, size, cols) as f64 * size,
        ORIGIN_Y + floor_index(bbox.min_y, ORIGIN_Y, size, rows) as f64 * size,
        ORIGIN_X + ceil_index(bbox.max_x, ORIGIN_X, size, cols) as f64 * size,
        ORIGIN_Y + ceil_index(bbox.max_y, ORIGIN_Y, size, rows) as f64 * size,
    ))
}

/// The tile range covering `bbox` at `zoom`.
pub fn bbox_to_tile_range(bbox: &BoundingBox, zoom: u32) -> Result<TileRange> {
    check_zoom(zoom)?;
    let size = tile_size_degrees(zoom);
    let (cols, rows) = (matrix_width(zoom), matrix_height(zoom));
    Ok(TileRange::new(
        zoom,
        floor_index(bbox.min_x, ORIGIN_X, size, cols),
        ceil_index(bbox.max_x, ORIGIN_X, size, cols),
        floor_index(bbox.min_y, ORIGIN_Y, size, rows),
        ceil_index(bbox.max_y, ORIGIN_Y, size, rows),
    ))
}

/// A non-vertical polygon edge with `start.x < end.x`.
struct Edge {
    start: Coord<f64>,
    end: Coord<f64>,
}

impl Edge {
    fn new(a: Coord<f64>, b: Coord<f64>) -> Self {
        if a.x <= b.x {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    fn spans(&self, x: f64) -> bool {
        self.start.x < x && x < self.end.x
    }

    fn y_at(&self, x: f64) -> f64 {
        let t = (x - self.start.x) / (self.end.x - self.start.x);
        self.start.y + t * (self.end.y - self.start.y)
    }
}

fn merge_spans(mut spans: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    spans.sort_unstable();
    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Row spans covered by the region in each tile column.
fn column_spans(geometry: &MultiPolygon<f64>, zoom: u32) -> BTreeMap<u32, Vec<(u32, u32)>> {
    let size = tile_size_degrees(zoom);
    let (cols, rows) = (matrix_width(zoom), matrix_height(zoom));

    let mut edges = Vec::new();
    let mut xs = Vec::new();
    for polygon in geometry {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            for line in ring.lines() {
                xs.push(line.start.x);
                if (line.start.x - line.end.x).abs() > GRID_TOLERANCE {
                    edges.push(Edge::new(line.start, line.end));
                }
            }
        }
    }
    xs.sort_by(f64::total_cmp);
    xs.dedup_by(|a, b| (*a - *b).abs() <= GRID_TOLERANCE);

    let mut columns: BTreeMap<u32, Vec<(u32, u32)>> = BTreeMap::new();
    for strip in xs.windows(2) {
        let (left, right) = (strip[0], strip[1]);
        let mid = (left + right) / 2.0;

        // no vertex lies strictly inside a strip, so edges crossing its
        // middle span it entirely and never cross each other within it
        let mut crossings: Vec<(f64, &Edge)> = edges
            .iter()
            .filter(|edge| edge.spans(mid))
            .map(|edge| (edge.y_at(mid), edge))
            .collect();
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let first_col = floor_index(left, ORIGIN_X, size, cols);
        let end_col = ceil_index(right, ORIGIN_X, size, cols);

        for pair in crossings.chunks_exact(2) {
            let (lower, upper) = (pair[0].1, pair[1].1);
            for col in first_col..end_col {
                let x0 = left.max(ORIGIN_X + col as f64 * size);
                let x1 = right.min(ORIGIN_X + (col + 1) as f64 * size);
                if x1 - x0 <= GRID_TOLERANCE {
                    continue;
                }
                let y_low = lower.y_at(x0).min(lower.y_at(x1));
                let y_high = upper.y_at(x0).max(upper.y_at(x1));
                let row_start = floor_index(y_low, ORIGIN_Y, size, rows);
                let row_end = ceil_index(y_high, ORIGIN_Y, size, rows);
                if row_end > row_start {
                    columns.entry(col).or_default().push((row_start, row_end));
                }
            }
        }
    }

    columns
        .into_iter()
        .map(|(col, spans)| (col, merge_spans(spans)))
        .collect()
}

/// The extent of `geometry` when it is exactly one axis-aligned rectangle
/// with a non-zero area.
fn as_rectangle(geometry: &MultiPolygon<f64>) -> Option<BoundingBox> {
    let [polygon] = geometry.0.as_slice() else {
        return None;
    };
    let ring = &polygon.exterior().0;
    if !polygon.interiors().is_empty() || ring.len() != 5 || ring[0] != ring[4] {
        return None;
    }

    let bbox = BoundingBox::from(polygon.bounding_rect()?);
    if bbox.min_x >= bbox.max_x || bbox.min_y >= bbox.max_y {
        return None;
    }
    let corners = &ring[..4];
    let on_corners = corners.iter().all(|c| {
        (c.x == bbox.min_x || c.x == bbox.max_x) && (c.y == bbox.min_y || c.y == bbox.max_y)
    });
    let distinct = (0..4).all(|i| (i + 1..4).all(|j| corners[i] != corners[j]));
    let axis_aligned = ring.windows(2).all(|w| w[0].x == w[1].x || w[0].y == w[1].y);

    (on_corners && distinct && axis_aligned).then_some(bbox)
}

/// Every tile at `zoom` whose interior meets the interior of `geometry`,
/// as disjoint rectangular ranges ordered by column then row.
///
/// Exact for grid-aligned rectilinear regions and a conservative cover for
/// arbitrary polygons.
pub fn footprint_to_tile_ranges(geometry: &MultiPolygon<f64>, zoom: u32) -> Result<Vec<TileRange>> {
    check_zoom(zoom)?;

    // the column sweep is linear in the number of columns crossed
    if let Some(bbox) = as_rectangle(geometry) {
        let range = bbox_to_tile_range(&bbox.clamp_to_world(), zoom)?;
        return Ok(if range.is_empty() { Vec::new() } else { vec![range] });
    }

    let mut ranges = Vec::new();
    // (first column, row span) of rectangles still growing eastward
    let mut open: Vec<(u32, (u32, u32))> = Vec::new();
    let mut previous_col: Option<u32> = None;

    for (col, spans) in column_spans(geometry, zoom) {
        let contiguous = previous_col.map_or(false, |prev| prev + 1 == col);
        let mut still_open = Vec::with_capacity(spans.len());

        for (start_col, span) in open.drain(..) {
            if contiguous && spans.contains(&span) {
                still_open.push((start_col, span));
            } else if let Some(prev) = previous_col {
                ranges.push(TileRange::new(zoom, start_col, prev + 1, span.0, span.1));
            }
        }
        for span in spans {
            if !still_open.iter().any(|(_, open_span)| *open_span == span) {
                still_open.push((col, span));
            }
        }

        open = still_open;
        previous_col = Some(col);
    }

    if let Some(prev) = previous_col {
        for (start_col, span) in open {
            ranges.push(TileRange::new(zoom, start_col, prev + 1, span.0, span.1));
        }
    }

    ranges.sort_by_key(|r| (r.min_x, r.min_y));
    Ok(ranges)
}

/// Lazily groups tile ranges into batches of at most `max_tiles` tiles.
///
/// Ranges that do not fit are split into whole rows where possible and
/// into partial rows otherwise.
pub fn batch_tile_ranges<I>(ranges: I, max_tiles: u64) -> Result<TileBatches<I::IntoIter>>
where
    I: IntoIterator<Item = TileRange>,
{
    if max_tiles == 0 {
        return Err(TilingError::InvalidBatchSize);
    }
    Ok(TileBatches {
        ranges: ranges.into_iter(),
        max_tiles,
        pending: None,
    })
}

/// Position inside a range that has been partly assigned to a batch.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    range: TileRange,
    x: u32,
    y: u32,
}

/// Iterator returned by [`batch_tile_ranges`].
#[derive(Debug)]
pub struct TileBatches<I> {
    ranges: I,
    max_tiles: u64,
    pending: Option<Cursor>,
}

impl<I: Iterator<Item = TileRange>> TileBatches<I> {
    fn next_cursor(&mut self) -> Option<Cursor> {
        if let Some(cursor) = self.pending.take() {
            return Some(cursor);
        }
        self.ranges.by_ref().find(|r| !r.is_empty()).map(|range| Cursor {
            range,
            x: range.min_x,
            y: range.min_y,
        })
    }
}

impl<I: Iterator<Item = TileRange>> Iterator for TileBatches<I> {
    type Item = Vec<TileRange>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::new();
        let mut remaining = self.max_tiles;

        while remaining > 0 {
            let Some(mut cursor) = self.next_cursor() else {
                break;
            };
            let range = cursor.range;
            let width = range.width() as u64;

            if cursor.x == range.min_x && remaining >= width {
                let rows = (remaining / width).min((range.max_y - cursor.y) as u64) as u32;
                batch.push(TileRange::new(
                    range.zoom,
                    range.min_x,
                    range.max_x,
                    cursor.y,
                    cursor.y + rows,
                ));
                remaining -= rows as u64 * width;
                cursor.y += rows;
            } else {
                let take = remaining.min((range.max_x - cursor.x) as u64) as u32;
                batch.push(TileRange::new(
                    range.zoom,
                    cursor.x,
                    cursor.x + take,
                    cursor.y,
                    cursor.y + 1,
                ));
                remaining -= take as u64;
                cursor.x += take;
                if cursor.x == range.max_x {
                    cursor.x = range.min_x;
                    cursor.y += 1;
                }
            }

            if cursor.y < range.max_y {
                self.pending = Some(cursor);
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

/// Grid snapping with a fixed tile budget per emitted batch.
#[derive(Debug, Clone, Copy)]
pub struct GridSnapper {
    max_tiles_per_batch: u64,
}

impl GridSnapper {
    pub fn new(max_tiles_per_batch: u64) -> Result<Self> {
        if max_tiles_per_batch == 0 {
            return Err(TilingError::InvalidBatchSize);
        }
        Ok(Self {
            max_tiles_per_batch,
        })
    }

    pub fn max_tiles_per_batch(&self) -> u64 {
        self.max_tiles_per_batch
    }

    /// Tile batches covering `geometry` at `zoom`.
    pub fn tile_batches(
        &self,
        geometry: &MultiPolygon<f64>,
        zoom: u32,
    ) -> Result<TileBatches<std::vec::IntoIter<TileRange>>> {
        let ranges = footprint_to_tile_ranges(geometry, zoom)?;
        batch_tile_ranges(ranges, self.max_tiles_per_batch)
    }
}
