//! Overlap decomposition of layer footprints.
//!
//! Splits a set of possibly overlapping footprints into disjoint regions,
//! each attributed to the exact set of layers covering it. Subgroups of
//! layers are visited from the full set down to singletons, and every
//! region claimed by a larger subgroup is subtracted before a smaller one is
//! considered, so each point ends up with the largest covering subgroup.
//! Within one subgroup size, combinations are visited in lexicographic
//! order of input position; that order breaks ties.
//!
//! Enumeration visits up to `2^N - 1` subgroups, so the number of layers is
//! capped at construction.

use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{Area, BooleanOps, MultiPolygon};
use tasker_common::{BoundingBox, LayerSource};
use tracing::{debug, error};

use crate::error::{Result, TilingError};

/// Default cap on layers entering a single decomposition.
pub const DEFAULT_MAX_OVERLAP_LAYERS: usize = 16;

/// Polygons smaller than this (square degrees) are boolean-op slivers.
/// A zoom 22 tile is ~1.8e-9 square degrees.
const AREA_TOLERANCE: f64 = 1e-12;

/// A layer paired with the footprint used for one decomposition pass.
#[derive(Debug, Clone)]
pub struct LayerFootprint<'a> {
    pub layer: &'a LayerSource,
    pub footprint: MultiPolygon<f64>,
}

impl<'a> LayerFootprint<'a> {
    pub fn new(layer: &'a LayerSource, footprint: MultiPolygon<f64>) -> Self {
        Self { layer, footprint }
    }
}

/// A disjoint region and the layers covering it, in input order.
#[derive(Debug, Clone)]
pub struct OverlapRegion<'a> {
    pub intersection: MultiPolygon<f64>,
    pub layers: Vec<&'a LayerSource>,
}

impl OverlapRegion<'_> {
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.id.as_str()).collect()
    }
}

/// Drop sliver polygons left behind by boolean operations.
fn without_slivers(geometry: MultiPolygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(
        geometry
            .into_iter()
            .filter(|polygon| polygon.unsigned_area() > AREA_TOLERANCE)
            .collect(),
    )
}

fn is_finite(geometry: &MultiPolygon<f64>) -> bool {
    geometry
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .flat_map(|ring| ring.coords())
        .all(|c| c.x.is_finite() && c.y.is_finite())
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "geometry operation panicked".to_string()
    }
}

/// Next lexicographic `k`-combination of `0..n`, or the first combination of
/// size `k - 1` once size `k` is exhausted.
fn next_subgroup(current: &[usize], n: usize) -> Option<Vec<usize>> {
    let k = current.len();
    let mut next = current.to_vec();
    for i in (0..k).rev() {
        if next[i] < n - k + i {
            next[i] += 1;
            for j in i + 1..k {
                next[j] = next[j - 1] + 1;
            }
            return Some(next);
        }
    }
    if k > 1 {
        Some((0..k - 1).collect())
    } else {
        None
    }
}

/// Lazy iterator over the disjoint overlap regions of a set of footprints.
///
/// Yields at most one error, after which it is exhausted.
pub struct OverlapDecomposer<'a> {
    footprints: Vec<LayerFootprint<'a>>,
    bboxes: Vec<Option<BoundingBox>>,
    subgroup: Option<Vec<usize>>,
    covered: Option<MultiPolygon<f64>>,
    failed: bool,
}

impl<'a> OverlapDecomposer<'a> {
    pub fn new(footprints: Vec<LayerFootprint<'a>>, max_layers: usize) -> Result<Self> {
        if footprints.len() > max_layers {
            return Err(TilingError::TooManyLayers {
                count: footprints.len(),
                limit: max_layers,
            });
        }

        let bboxes = footprints
            .iter()
            .map(|f| geo::BoundingRect::bounding_rect(&f.footprint).map(BoundingBox::from))
            .collect();
        let subgroup = (!footprints.is_empty()).then(|| (0..footprints.len()).collect());

        Ok(Self {
            footprints,
            bboxes,
            subgroup,
            covered: None,
            failed: false,
        })
    }

    fn layer_ids(&self, subgroup: &[usize]) -> Vec<String> {
        subgroup
            .iter()
            .map(|&i| self.footprints[i].layer.id.clone())
            .collect()
    }

    /// Run a boolean operation, turning panics and non-finite output into a
    /// geometry error that names the subgroup.
    fn guarded<F>(&self, subgroup: &[usize], operation: &str, op: F) -> Result<MultiPolygon<f64>>
    where
        F: FnOnce() -> MultiPolygon<f64>,
    {
        let message = match catch_unwind(AssertUnwindSafe(op)) {
            Ok(result) if is_finite(&result) => return Ok(without_slivers(result)),
            Ok(_) => format!("{} produced non-finite coordinates", operation),
            Err(payload) => format!("{} failed: {}", operation, panic_message(payload)),
        };

        let layers = self.layer_ids(subgroup);
        let footprints: Vec<&MultiPolygon<f64>> =
            subgroup.iter().map(|&i| &self.footprints[i].footprint).collect();
        error!(
            layers = ?layers,
            footprints = ?footprints,
            covered = ?self.covered,
            error = %message,
            "Overlap decomposition failed"
        );
        Err(TilingError::Geometry { message, layers })
    }

    fn visit(&mut self, subgroup: &[usize]) -> Result<Option<OverlapRegion<'a>>> {
        let bbox_overlap = subgroup
            .iter()
            .map(|&i| self.bboxes[i])
            .try_fold(BoundingBox::WORLD, |acc, bbox| bbox.and_then(|b| acc.intersection(&b)));
        if bbox_overlap.is_none() {
            return Ok(None);
        }

        let Some((first, rest)) = subgroup.split_first() else {
            return Ok(None);
        };
        let mut intersection = self.footprints[*first].footprint.clone();
        for &i in rest {
            let other = &self.footprints[i].footprint;
            intersection = self.guarded(subgroup, "intersection", || intersection.intersection(other))?;
            if intersection.0.is_empty() {
                return Ok(None);
            }
        }

        let remainder = match &self.covered {
            Some(covered) => self.guarded(subgroup, "difference", || intersection.difference(covered))?,
            None => without_slivers(intersection),
        };
        if remainder.0.is_empty() {
            return Ok(None);
        }

        let covered = match &self.covered {
            Some(covered) => self.guarded(subgroup, "union", || covered.union(&remainder))?,
            None => remainder.clone(),
        };
        self.covered = Some(covered);

        let layers: Vec<&'a LayerSource> = subgroup.iter().map(|&i| self.footprints[i].layer).collect();
        debug!(
            layers = ?layers.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(),
            area = remainder.unsigned_area(),
            "Overlap region"
        );
        Ok(Some(OverlapRegion {
            intersection: remainder,
            layers,
        }))
    }
}

impl<'a> Iterator for OverlapDecomposer<'a> {
    type Item = Result<OverlapRegion<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed {
            let subgroup = self.subgroup.take()?;
            self.subgroup = next_subgroup(&subgroup, self.footprints.len());

            match self.visit(&subgroup) {
                Ok(Some(region)) => return Some(Ok(region)),
                Ok(None) => continue,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subgroup_order() {
        let mut order = Vec::new();
        let mut current = Some(vec![0, 1, 2]);
        while let Some(subgroup) = current {
            current = next_subgroup(&subgroup, 3);
            order.push(subgroup);
        }
        assert_eq!(
            order,
            vec![
                vec![0, 1, 2],
                vec![0, 1],
                vec![0, 2],
                vec![1, 2],
                vec![0],
                vec![1],
                vec![2],
            ]
        );
    }

    #[test]
    fn test_subgroup_count_is_exponential() {
        let mut count = 0;
        let mut current = Some((0..5).collect::<Vec<_>>());
        while let Some(subgroup) = current {
            current = next_subgroup(&subgroup, 5);
            count += 1;
        }
        assert_eq!(count, 31);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload), "bang");
    }
}
