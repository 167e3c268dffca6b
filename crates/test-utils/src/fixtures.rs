//! Common test fixtures for raster tasker tests.
//!
//! Footprints are given as `(min_x, min_y, max_x, max_y)` in degrees.

use geo::{LineString, MultiPolygon, Polygon};
use tasker_common::{BoundingBox, Footprint, LayerSource};

/// Common footprint extents.
pub mod bbox {
    /// Western hemisphere
    pub const WEST: (f64, f64, f64, f64) = (-180.0, -90.0, 0.0, 90.0);

    /// Southern band reaching into the eastern hemisphere
    pub const SOUTH_WEST_AND_CENTER: (f64, f64, f64, f64) = (-180.0, -90.0, 90.0, 0.0);

    /// Small area around Tel Aviv
    pub const CITY: (f64, f64, f64, f64) = (34.75, 32.0, 34.85, 32.1);
}

/// Rectangular footprint from a fixture tuple.
pub fn rect_footprint(extent: (f64, f64, f64, f64)) -> Footprint {
    let (min_x, min_y, max_x, max_y) = extent;
    Footprint::from_bbox(&BoundingBox::new(min_x, min_y, max_x, max_y))
}

/// Layer named `id` with tiles under `tiles/<id>` and a rectangular footprint.
pub fn rect_layer(id: &str, extent: (f64, f64, f64, f64)) -> LayerSource {
    LayerSource::new(id, format!("tiles/{id}"), rect_footprint(extent))
}

/// The two-layer scenario: a western layer and a southern layer
/// overlapping on the south-west quarter.
pub fn two_overlapping_layers() -> Vec<LayerSource> {
    vec![
        rect_layer("layer1", bbox::WEST),
        rect_layer("layer2", bbox::SOUTH_WEST_AND_CENTER),
    ]
}

/// Three layers with every pairwise and the triple overlap present.
pub fn three_overlapping_layers() -> Vec<LayerSource> {
    vec![
        rect_layer("a", (0.0, 0.0, 2.0, 2.0)),
        rect_layer("b", (1.0, 0.0, 3.0, 2.0)),
        rect_layer("c", (0.5, 1.0, 2.5, 3.0)),
    ]
}

/// A quadrilateral with one NaN vertex, which boolean operations cannot
/// process. `Footprint` rejects it, so it is only usable as raw geometry.
pub fn nan_vertex_geometry() -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(
        LineString::from(vec![
            (0.5, 0.5),
            (f64::NAN, 0.5),
            (1.5, 1.5),
            (0.5, 1.5),
            (0.5, 0.5),
        ]),
        vec![],
    )])
}

/// L-shaped footprint made of two rectangles, in GeoJSON.
pub const L_SHAPE_GEOJSON: &str = r#"{
    "type": "Polygon",
    "coordinates": [[[-180, -90], [0, -90], [0, 0], [-90, 0], [-90, 90], [-180, 90], [-180, -90]]]
}"#;
