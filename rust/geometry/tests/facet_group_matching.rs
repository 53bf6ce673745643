// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Facet group matching against known transforms.

use approx::assert_relative_eq;
use nalgebra::{Matrix4, Rotation3, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use reveal_lite_core::{Contour, FacetGroup, Polygon, Transform};
use reveal_lite_geometry::{
    calculate_key, match_all, match_facet_groups, transform_position, MatchResult,
    MatchStatistics,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Quad faces of a hexahedron given by its 8 corners (bottom 0..4, top 4..8)
const HEXAHEDRON_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

fn hexahedron(corners: &[Vector3<f32>; 8]) -> FacetGroup {
    let polygons = HEXAHEDRON_FACES
        .iter()
        .map(|face| {
            let [a, b, c, _] = face.map(|i| corners[i]);
            let normal = (b - a).cross(&(c - a)).normalize();
            Polygon::new(vec![Contour::new(
                face.iter().map(|&i| (corners[i], normal)).collect(),
            )])
        })
        .collect();
    FacetGroup::new(polygons)
}

/// Square frustum: bottom `[-1, 1]²` at z=0, top `[-taper, taper]²` at z=1.
/// Different tapers are never affine images of each other.
fn frustum(taper: f32) -> FacetGroup {
    let b = 1.0;
    let t = taper;
    hexahedron(&[
        Vector3::new(-b, -b, 0.0),
        Vector3::new(b, -b, 0.0),
        Vector3::new(b, b, 0.0),
        Vector3::new(-b, b, 0.0),
        Vector3::new(-t, -t, 1.0),
        Vector3::new(t, -t, 1.0),
        Vector3::new(t, t, 1.0),
        Vector3::new(-t, t, 1.0),
    ])
}

fn cuboid() -> FacetGroup {
    let corners = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 2.0, 0.0],
        [0.0, 2.0, 0.0],
        [0.0, 0.0, 3.0],
        [1.0, 0.0, 3.0],
        [1.0, 2.0, 3.0],
        [0.0, 2.0, 3.0],
    ]
    .map(|[x, y, z]| Vector3::new(x, y, z));
    hexahedron(&corners)
}

fn compose(euler: (f32, f32, f32), scale: Vector3<f32>, translation: Vector3<f32>) -> Transform {
    let rotation = Rotation3::from_euler_angles(euler.0, euler.1, euler.2).to_homogeneous();
    Matrix4::new_translation(&translation) * rotation * Matrix4::new_nonuniform_scaling(&scale)
}

fn assert_maps_onto(a: &FacetGroup, b: &FacetGroup, transform: &Transform) {
    for (pa, pb) in a.positions().zip(b.positions()) {
        let mapped = transform_position(transform, pa);
        assert_relative_eq!(mapped, *pb, epsilon = 1e-3);
    }
}

#[test]
fn test_group_matches_itself_with_identity() {
    let group = cuboid();
    let transform = match_facet_groups(&group, &group).expect("self match");
    assert_relative_eq!(transform, Transform::identity(), epsilon = 1e-5);
}

#[test]
fn test_random_transforms_are_recovered() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let template = cuboid();

    for iteration in 0..1000 {
        let euler = (
            rng.gen_range(0.0..std::f32::consts::TAU),
            rng.gen_range(0.0..std::f32::consts::TAU),
            rng.gen_range(0.0..std::f32::consts::TAU),
        );
        let scale = Vector3::new(
            rng.gen_range(0.1..5.0),
            rng.gen_range(0.1..5.0),
            rng.gen_range(0.1..5.0),
        );
        let translation = Vector3::new(
            rng.gen_range(-100.0..100.0),
            rng.gen_range(-100.0..100.0),
            rng.gen_range(-100.0..100.0),
        );
        let expected = compose(euler, scale, translation);
        let instance = template.transformed(&expected);

        let transform = match_facet_groups(&template, &instance)
            .unwrap_or_else(|| panic!("iteration {iteration}: no match for {euler:?} {scale:?}"));
        assert_maps_onto(&template, &instance, &transform);
        assert_relative_eq!(transform, expected, epsilon = 1e-2);
    }
}

#[test]
fn test_regression_rotation_and_scale() {
    let expected = compose(
        (3.044467, 2.8217556, 1.6506897),
        Vector3::new(2.1362286, 4.620028, 3.2072587),
        Vector3::new(12.0, -3.5, 40.25),
    );
    let template = cuboid();
    let instance = template.transformed(&expected);

    let transform = match_facet_groups(&template, &instance).expect("match");
    assert_maps_onto(&template, &instance, &transform);
}

#[test]
fn test_box_does_not_match_frustum() {
    assert!(match_facet_groups(&frustum(1.0), &frustum(0.5)).is_none());
    assert!(match_facet_groups(&frustum(0.5), &frustum(0.25)).is_none());
}

#[test]
fn test_flat_group_never_matches() {
    let quad = Contour::new(
        [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
            .iter()
            .map(|[x, y]| (Vector3::new(*x, *y, 0.0), Vector3::z()))
            .collect(),
    );
    let group = FacetGroup::new(vec![Polygon::new(vec![quad])]);
    assert!(match_facet_groups(&group, &group).is_none());
}

#[test]
fn test_non_finite_vertices_never_match() {
    let mut group = cuboid();
    group.polygons[2].contours[0].vertices[1].0.x = f32::NAN;
    assert!(match_facet_groups(&group, &group).is_none());
    assert!(match_facet_groups(&cuboid(), &group).is_none());
}

#[test]
fn test_key_separates_structures() {
    let mut smaller = cuboid();
    smaller.polygons.pop();
    let mut fewer_vertices = cuboid();
    fewer_vertices.polygons[0].contours[0].vertices.pop();

    let key = calculate_key(&cuboid());
    assert_eq!(key, calculate_key(&frustum(0.5)));
    assert_ne!(key, calculate_key(&smaller));
    assert_ne!(key, calculate_key(&fewer_vertices));
    assert_ne!(calculate_key(&smaller), calculate_key(&fewer_vertices));

    let pairs = [(cuboid(), smaller.clone()), (cuboid(), fewer_vertices.clone()), (smaller, fewer_vertices)];
    for (a, b) in &pairs {
        assert!(match_facet_groups(a, b).is_none());
        assert!(match_facet_groups(b, a).is_none());
    }
}

#[test]
#[ignore = "polygons are compared positionally"]
fn test_reordered_polygons_match() {
    let group = cuboid();
    let mut reordered = group.clone();
    reordered.polygons.reverse();
    assert!(match_facet_groups(&group, &reordered).is_some());
}

/// 10 pipes and 5 hinges, interleaved, each under its own transform
fn pipes_and_hinges() -> (Vec<Arc<FacetGroup>>, Arc<FacetGroup>) {
    let mut rng = StdRng::seed_from_u64(42);
    let pipe = frustum(0.5);
    let hinge = frustum(0.25);

    let mut random_transform = || {
        compose(
            (rng.gen_range(0.0..3.0), rng.gen_range(0.0..3.0), rng.gen_range(0.0..3.0)),
            Vector3::new(rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0)),
            Vector3::new(rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0), 0.0),
        )
    };

    let mut groups = Vec::new();
    let mut first_pipe = None;
    for i in 0..15 {
        let shape = if is_hinge(i) { &hinge } else { &pipe };
        let group = Arc::new(shape.transformed(&random_transform()));
        if i == 0 {
            first_pipe = Some(Arc::clone(&group));
        }
        groups.push(group);
    }
    (groups, first_pipe.expect("first pipe"))
}

fn is_hinge(index: usize) -> bool {
    index % 3 == 2
}

/// Repeat count of each group's shape keyed by address, as a format
/// provider would report it
fn repeat_counts(groups: &[Arc<FacetGroup>]) -> HashMap<usize, usize> {
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| (Arc::as_ptr(group) as usize, if is_hinge(i) { 5 } else { 10 }))
        .collect()
}

#[test]
fn test_match_all_filters_templates_by_repeat_count() {
    let (groups, first_pipe) = pipes_and_hinges();
    let counts = repeat_counts(&groups);

    let results = match_all(
        &groups,
        |group: &FacetGroup| counts[&(group as *const FacetGroup as usize)] >= 10,
        1000,
    );

    assert_eq!(results.len(), 15);
    let stats = MatchStatistics::from_results(&results);
    assert_eq!(stats.template_count, 1);
    assert_eq!(stats.instanced_count, 10);
    assert_eq!(stats.not_instanced_count, 5);

    // Same bucket: results follow input order and the first pipe is the template
    for (i, (input, result)) in groups.iter().zip(&results).enumerate() {
        assert!(Arc::ptr_eq(input, result.fragment()));
        assert_eq!(result.is_instanced(), !is_hinge(i));
    }
    assert!(matches!(&results[0], MatchResult::Template { fragment } if Arc::ptr_eq(fragment, &first_pipe)));
    for result in &results {
        if let MatchResult::Instanced { fragment, template, transform } = result {
            assert!(Arc::ptr_eq(template, &first_pipe));
            assert_maps_onto(template, fragment, transform);
        }
    }
}

#[test]
fn test_match_all_is_deterministic() {
    let (groups, _) = pipes_and_hinges();
    let summary = |results: &[MatchResult<FacetGroup>]| {
        results
            .iter()
            .map(|r| (Arc::as_ptr(r.fragment()), r.template().map(Arc::as_ptr)))
            .collect::<Vec<_>>()
    };

    let first = match_all(&groups, |_: &FacetGroup| true, 1000);
    let second = match_all(&groups, |_: &FacetGroup| true, 1000);
    assert_eq!(summary(&first), summary(&second));
}

#[test]
fn test_template_count_limit() {
    let shapes = [frustum(1.0), frustum(0.5), frustum(0.25)];
    let groups: Vec<Arc<FacetGroup>> = shapes
        .iter()
        .flat_map(|shape| {
            [
                Arc::new(shape.clone()),
                Arc::new(shape.transformed(&Transform::new_translation(&Vector3::new(5.0, 0.0, 0.0)))),
            ]
        })
        .collect();

    let limited = MatchStatistics::from_results(&match_all(&groups, |_: &FacetGroup| true, 1));
    assert_eq!(limited.template_count, 1);
    assert_eq!(limited.instanced_count, 2);
    assert_eq!(limited.not_instanced_count, 4);

    let unlimited = MatchStatistics::from_results(&match_all(&groups, |_: &FacetGroup| true, 100));
    assert_eq!(unlimited.template_count, 3);
    assert_eq!(unlimited.instanced_count, 6);
    assert_eq!(unlimited.not_instanced_count, 0);
}

#[test]
fn test_rejected_group_does_not_take_template_slot() {
    let hinge = Arc::new(frustum(0.25));
    let pipe = Arc::new(frustum(0.5));
    let moved_pipe = Arc::new(pipe.transformed(&Transform::new_translation(&Vector3::new(5.0, 0.0, 0.0))));
    let groups = vec![Arc::clone(&hinge), Arc::clone(&pipe), Arc::clone(&moved_pipe)];

    // Only one template allowed and the hinge comes first, but it is not wanted
    let results = match_all(&groups, |group: &FacetGroup| !std::ptr::eq(group, &*hinge), 1);

    assert!(matches!(&results[0], MatchResult::NotInstanced { fragment } if Arc::ptr_eq(fragment, &hinge)));
    assert!(matches!(&results[1], MatchResult::Template { fragment } if Arc::ptr_eq(fragment, &pipe)));
    match &results[2] {
        MatchResult::Instanced { fragment, template, transform } => {
            assert!(Arc::ptr_eq(template, &pipe));
            assert_maps_onto(template, fragment, transform);
        }
        other => panic!("expected the moved pipe to be instanced, got {other:?}"),
    }

    let stats = MatchStatistics::from_results(&results);
    assert_eq!(stats.template_count, 1);
    assert_eq!(stats.instanced_count, 2);
    assert_eq!(stats.not_instanced_count, 1);
}

#[test]
fn test_rejected_group_can_still_be_instanced() {
    let pipe = Arc::new(frustum(0.5));
    let moved_pipe = Arc::new(pipe.transformed(&Transform::new_translation(&Vector3::new(0.0, 3.0, 0.0))));
    let groups = vec![Arc::clone(&pipe), Arc::clone(&moved_pipe)];

    // The predicate only gates new templates
    let results = match_all(&groups, |group: &FacetGroup| std::ptr::eq(group, &*pipe), 1000);

    assert!(matches!(results[0], MatchResult::Template { .. }));
    assert!(matches!(results[1], MatchResult::Instanced { .. }));
}

#[test]
fn test_repeated_object_is_not_its_own_instance() {
    let group = Arc::new(cuboid());
    let groups = vec![Arc::clone(&group), Arc::clone(&group)];

    // The second occurrence skips itself and opens its own template
    let results = match_all(&groups, |_: &FacetGroup| true, 1000);
    assert!(matches!(results[0], MatchResult::Template { .. }));
    assert!(matches!(results[1], MatchResult::Template { .. }));
    assert_eq!(MatchStatistics::from_results(&results).template_count, 2);

    // Without a free slot it stays unique geometry
    let results = match_all(&groups, |_: &FacetGroup| true, 1);
    assert!(matches!(results[0], MatchResult::Template { .. }));
    assert!(matches!(results[1], MatchResult::NotInstanced { .. }));
}

#[test]
fn test_match_all_empty_input() {
    let groups: Vec<Arc<FacetGroup>> = Vec::new();
    assert!(match_all(&groups, |_: &FacetGroup| true, 1000).is_empty());
}
