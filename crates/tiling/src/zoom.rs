//! Resolution to zoom-level conversion and zoom grouping.

use std::str::FromStr;

use tasker_common::{tile::check_zoom, ZoomRange, MAX_ZOOM};
use tracing::warn;

use crate::error::{Result, TilingError};

/// Ground resolution of zoom level 0 in degrees per pixel (180° over 256 px).
pub const ZOOM_0_RESOLUTION: f64 = 0.703125;

/// Relative slack when comparing a requested resolution with the pyramid.
const RESOLUTION_TOLERANCE: f64 = 1e-9;

/// Resolution of every zoom level, coarsest first.
pub fn resolution_table() -> Vec<f64> {
    (0..=MAX_ZOOM)
        .map(|zoom| ZOOM_0_RESOLUTION / 2f64.powi(zoom as i32))
        .collect()
}

/// Deepest zoom level needed to represent `resolution` degrees per pixel.
///
/// Picks the first level whose resolution is at least as fine as the request.
/// Requests finer than the deepest level clamp to [`MAX_ZOOM`].
pub fn zoom_for_resolution(resolution: f64) -> Result<u32> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(TilingError::InvalidResolution(resolution));
    }

    let threshold = resolution * (1.0 + RESOLUTION_TOLERANCE);
    let table = resolution_table();
    let zoom = table.partition_point(|&level_res| level_res > threshold) as u32;

    if zoom > MAX_ZOOM {
        warn!(
            resolution = resolution,
            max_zoom = MAX_ZOOM,
            "Resolution finer than the deepest zoom level, clamping"
        );
        return Ok(MAX_ZOOM);
    }
    Ok(zoom)
}

fn parse_zoom(group: &str, value: &str) -> Result<u32> {
    let zoom: u32 = value.trim().parse().map_err(|_| TilingError::InvalidZoomGroup {
        group: group.to_string(),
        reason: format!("'{}' is not a zoom level", value.trim()),
    })?;
    check_zoom(zoom).map_err(|e| TilingError::InvalidZoomGroup {
        group: group.to_string(),
        reason: e.to_string(),
    })?;
    Ok(zoom)
}

fn parse_group(group: &str) -> Result<ZoomRange> {
    let parts: Vec<&str> = group.split('-').collect();
    match parts.as_slice() {
        [single] => Ok(ZoomRange::single(parse_zoom(group, single)?)),
        [min, max] => ZoomRange::new(parse_zoom(group, min)?, parse_zoom(group, max)?).map_err(
            |e| TilingError::InvalidZoomGroup {
                group: group.to_string(),
                reason: e.to_string(),
            },
        ),
        _ => Err(TilingError::InvalidZoomGroup {
            group: group.to_string(),
            reason: "expected 'a' or 'a-b'".to_string(),
        }),
    }
}

/// Splits the zoom pyramid into the configured groups, each processed as one
/// unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomRangeCalculator {
    groups: Vec<ZoomRange>,
}

impl ZoomRangeCalculator {
    pub fn new(groups: Vec<ZoomRange>) -> Self {
        Self { groups }
    }

    /// Configured groups in configuration order.
    pub fn groups(&self) -> &[ZoomRange] {
        &self.groups
    }

    /// Groups clipped to `max_zoom`; groups starting above it are dropped.
    pub fn ranges_up_to(&self, max_zoom: u32) -> Vec<ZoomRange> {
        self.groups
            .iter()
            .filter(|group| group.min_zoom <= max_zoom)
            .map(|group| ZoomRange {
                min_zoom: group.min_zoom,
                max_zoom: group.max_zoom.min(max_zoom),
            })
            .collect()
    }

    /// Groups needed to ingest a layer at `resolution` degrees per pixel.
    pub fn zoom_ranges(&self, resolution: f64) -> Result<Vec<ZoomRange>> {
        let max_zoom = zoom_for_resolution(resolution)?;
        Ok(self.ranges_up_to(max_zoom))
    }
}

impl FromStr for ZoomRangeCalculator {
    type Err = TilingError;

    /// Parse a comma separated table such as `"0-10,11,12-14"`.
    fn from_str(s: &str) -> Result<Self> {
        let groups = s
            .split(',')
            .map(str::trim)
            .map(|group| {
                if group.is_empty() {
                    Err(TilingError::InvalidZoomGroup {
                        group: s.to_string(),
                        reason: "empty group".to_string(),
                    })
                } else {
                    parse_group(group)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }
}
