//! Overlap decomposition over real footprints.

use geo::{point, Area, BooleanOps, Contains, MultiPolygon};
use tasker_common::LayerSource;
use test_utils::{assert_approx_eq, bbox, nan_vertex_geometry, rect_layer, three_overlapping_layers};
use tiling::{LayerFootprint, OverlapDecomposer, OverlapRegion, TilingError};

fn footprints(layers: &[LayerSource]) -> Vec<LayerFootprint<'_>> {
    layers
        .iter()
        .map(|layer| LayerFootprint::new(layer, layer.footprint.as_multi_polygon().clone()))
        .collect()
}

fn decompose(layers: &[LayerSource]) -> Vec<OverlapRegion<'_>> {
    OverlapDecomposer::new(footprints(layers), 16)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn union_of(layers: &[LayerSource]) -> MultiPolygon<f64> {
    layers
        .iter()
        .map(|l| l.footprint.as_multi_polygon().clone())
        .reduce(|acc, next| acc.union(&next))
        .unwrap()
}

#[test]
fn test_regions_are_pairwise_disjoint() {
    let layers = three_overlapping_layers();
    let regions = decompose(&layers);

    for (i, a) in regions.iter().enumerate() {
        for b in &regions[i + 1..] {
            let shared = a.intersection.intersection(&b.intersection).unsigned_area();
            assert!(
                shared < 1e-9,
                "regions {:?} and {:?} share {}",
                a.layer_ids(),
                b.layer_ids(),
                shared
            );
        }
    }
}

#[test]
fn test_regions_cover_the_input_union() {
    let layers = three_overlapping_layers();
    let regions = decompose(&layers);

    let total: f64 = regions.iter().map(|r| r.intersection.unsigned_area()).sum();
    assert_approx_eq!(total, union_of(&layers).unsigned_area(), 1e-9);
}

#[test]
fn test_points_attributed_to_maximal_subgroup() {
    let layers = three_overlapping_layers();
    let regions = decompose(&layers);

    let cases = [
        (point!(x: 1.5, y: 1.5), vec!["a", "b", "c"]),
        (point!(x: 1.5, y: 0.5), vec!["a", "b"]),
        (point!(x: 0.75, y: 1.5), vec!["a", "c"]),
        (point!(x: 2.25, y: 1.5), vec!["b", "c"]),
        (point!(x: 0.25, y: 0.5), vec!["a"]),
        (point!(x: 2.75, y: 0.5), vec!["b"]),
        (point!(x: 1.5, y: 2.5), vec!["c"]),
    ];
    for (p, expected) in cases {
        let owners: Vec<_> = regions
            .iter()
            .filter(|r| r.intersection.contains(&p))
            .collect();
        assert_eq!(owners.len(), 1, "point {:?} owned by {} regions", p, owners.len());
        assert_eq!(owners[0].layer_ids(), expected);
    }
}

#[test]
fn test_larger_subgroups_come_first() {
    let layers = three_overlapping_layers();
    let sizes: Vec<usize> = decompose(&layers).iter().map(|r| r.layers.len()).collect();
    assert_eq!(sizes, vec![3, 2, 2, 2, 1, 1, 1]);
}

#[test]
fn test_identical_footprints_stay_together() {
    let layers = vec![rect_layer("first", bbox::CITY), rect_layer("second", bbox::CITY)];
    let regions = decompose(&layers);

    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].layer_ids(), vec!["first", "second"]);
    assert_approx_eq!(regions[0].intersection.unsigned_area(), 0.01, 1e-9);
}

#[test]
fn test_disjoint_layers_are_singletons() {
    let layers = vec![
        rect_layer("west", (-10.0, -10.0, -5.0, -5.0)),
        rect_layer("east", (5.0, 5.0, 10.0, 10.0)),
    ];
    let ids: Vec<_> = decompose(&layers)
        .iter()
        .map(|r| r.layer_ids().join(","))
        .collect();
    assert_eq!(ids, vec!["west", "east"]);
}

#[test]
fn test_touching_layers_do_not_overlap() {
    let layers = vec![
        rect_layer("left", (0.0, 0.0, 1.0, 1.0)),
        rect_layer("right", (1.0, 0.0, 2.0, 1.0)),
    ];
    let regions = decompose(&layers);
    assert!(regions.iter().all(|r| r.layers.len() == 1));
    assert_eq!(regions.len(), 2);
}

#[test]
fn test_no_layers_no_regions() {
    let mut decomposer = OverlapDecomposer::new(Vec::new(), 16).unwrap();
    assert!(decomposer.next().is_none());
}

#[test]
fn test_too_many_layers_rejected() {
    let layers = three_overlapping_layers();
    let result = OverlapDecomposer::new(footprints(&layers), 2);
    assert!(matches!(
        result,
        Err(TilingError::TooManyLayers { count: 3, limit: 2 })
    ));
}

#[test]
fn test_geometry_failure_is_fatal() {
    let a = rect_layer("a", (0.0, 0.0, 2.0, 2.0));
    let b = rect_layer("b", (1.0, 0.0, 3.0, 2.0));
    let footprints = vec![
        LayerFootprint::new(&a, a.footprint.as_multi_polygon().clone()),
        LayerFootprint::new(&b, nan_vertex_geometry()),
    ];
    let mut decomposer = OverlapDecomposer::new(footprints, 16).unwrap();

    match decomposer.next() {
        Some(Err(TilingError::Geometry { layers, message })) => {
            assert_eq!(layers, vec!["a", "b"]);
            assert!(message.starts_with("intersection"), "unexpected message: {}", message);
        }
        other => panic!(
            "expected a geometry error, got {:?}",
            other.map(|r| r.map(|r| r.layer_ids().join(",")))
        ),
    }
    // singleton subgroups would still succeed, but the decomposer stops
    assert!(decomposer.next().is_none());
    assert!(decomposer.next().is_none());
}
