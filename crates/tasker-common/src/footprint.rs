//! Layer footprints.
//!
//! A footprint is the polygon or multi-polygon a raster layer covers, in
//! WGS84 degrees. It is held internally as a `geo::MultiPolygon` and
//! serialized as a GeoJSON geometry object.

use geo::{Area, BoundingRect, Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::GeoError;

type Ring = Vec<[f64; 2]>;

/// GeoJSON geometry shapes accepted as footprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum GeoJsonGeometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

/// Geographic coverage of a raster layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoJsonGeometry", into = "GeoJsonGeometry")]
pub struct Footprint {
    geometry: MultiPolygon<f64>,
}

impl Footprint {
    /// Wrap an existing multi-polygon after validating its coordinates.
    pub fn new(geometry: MultiPolygon<f64>) -> Result<Self, GeoError> {
        if geometry.0.is_empty() {
            return Err(GeoError::InvalidFootprint("no polygons".to_string()));
        }
        let non_finite = geometry
            .0
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
            .flat_map(|ring| ring.coords())
            .any(|c| !c.x.is_finite() || !c.y.is_finite());
        if non_finite {
            return Err(GeoError::InvalidFootprint(
                "non-finite coordinate".to_string(),
            ));
        }
        Ok(Self { geometry })
    }

    /// A rectangular footprint covering `bbox`.
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        Self {
            geometry: MultiPolygon::new(vec![bbox.to_rect().to_polygon()]),
        }
    }

    /// Bounding box of the footprint, `None` when it has no coordinates.
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.geometry.bounding_rect().map(BoundingBox::from)
    }

    /// Planar area in square degrees.
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    pub fn as_multi_polygon(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }
}

fn ring_from_coords(ring: Ring) -> Result<LineString<f64>, GeoError> {
    if ring.len() < 4 {
        return Err(GeoError::InvalidFootprint(format!(
            "ring has {} positions, need at least 4",
            ring.len()
        )));
    }
    Ok(LineString::from(ring))
}

fn polygon_from_rings(rings: Vec<Ring>) -> Result<Polygon<f64>, GeoError> {
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| GeoError::InvalidFootprint("polygon without rings".to_string()))?;
    let interiors = rings.map(ring_from_coords).collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(ring_from_coords(exterior)?, interiors))
}

fn rings_from_polygon(polygon: &Polygon<f64>) -> Vec<Ring> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c: &Coord<f64>| [c.x, c.y]).collect())
        .collect()
}

impl TryFrom<GeoJsonGeometry> for Footprint {
    type Error = GeoError;

    fn try_from(value: GeoJsonGeometry) -> Result<Self, Self::Error> {
        let polygons = match value {
            GeoJsonGeometry::Polygon(rings) => vec![polygon_from_rings(rings)?],
            GeoJsonGeometry::MultiPolygon(polygons) => polygons
                .into_iter()
                .map(polygon_from_rings)
                .collect::<Result<Vec<_>, _>>()?,
        };
        Footprint::new(MultiPolygon::new(polygons))
    }
}

impl From<Footprint> for GeoJsonGeometry {
    fn from(footprint: Footprint) -> Self {
        let mut polygons: Vec<Vec<Ring>> =
            footprint.geometry.0.iter().map(rings_from_polygon).collect();
        if polygons.len() == 1 {
            GeoJsonGeometry::Polygon(polygons.remove(0))
        } else {
            GeoJsonGeometry::MultiPolygon(polygons)
        }
    }
}
