// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instancing pass: proto primitives from a format provider in, exportable
//! primitives and shared template meshes out.
//!
//! Facet groups and pyramids are matched in their local space. Accepted
//! clusters are exported as one template mesh plus an [`Primitive::InstancedMesh`]
//! per member, everything else keeps its own world-space geometry.

use crate::config::InstancingConfig;
use crate::error::Result;
use crate::ids::IdGenerator;
use reveal_lite_core::{
    BoundingBox, Color, Contour, FacetGroup, Mesh, Polygon, Primitive, Pyramid, Transform, Vector3,
};
use reveal_lite_geometry::{
    calculate_key, match_all, process_pyramids, tessellate, MatchResult, MatchStatistics,
    ProtoPyramid,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Instant;

/// Facet group in local space with its world placement
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoFacetGroup {
    pub facet_group: FacetGroup,
    pub tree_index: u64,
    pub color: Color,
    /// Local → world placement
    pub matrix: Transform,
}

impl ProtoFacetGroup {
    /// World-space bounds, `None` for an empty group
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.facet_group.bounds().map(|b| b.transformed(&self.matrix))
    }
}

impl AsRef<FacetGroup> for ProtoFacetGroup {
    fn as_ref(&self) -> &FacetGroup {
        &self.facet_group
    }
}

/// Input of the instancing pass
#[derive(Debug, Clone, PartialEq)]
pub enum ProtoPrimitive {
    FacetGroup(ProtoFacetGroup),
    Pyramid(ProtoPyramid),
    /// Already final, passed through untouched
    Primitive(Primitive),
}

/// Shared mesh referenced by [`Primitive::InstancedMesh::mesh_id`]
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMesh {
    pub id: u64,
    /// Template-local geometry
    pub mesh: Mesh,
}

/// Match counts per fragment kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstancingStatistics {
    pub facet_groups: MatchStatistics,
    pub pyramids: MatchStatistics,
}

#[derive(Debug, Clone, Default)]
pub struct InstancingOutput {
    /// One primitive per input, in input order
    pub primitives: Vec<Primitive>,
    pub templates: Vec<TemplateMesh>,
    pub stats: InstancingStatistics,
}

/// The six quads of a pyramid in its local space
fn pyramid_facets(pyramid: &Pyramid) -> FacetGroup {
    let half = pyramid.height * 0.5;
    let (bx, by) = (pyramid.bottom_x, pyramid.bottom_y);
    let (tx, ty) = (pyramid.top_x, pyramid.top_y);
    let (ox, oy) = (pyramid.offset_x, pyramid.offset_y);

    let corners = [
        Vector3::new(-bx, -by, -half),
        Vector3::new(bx, -by, -half),
        Vector3::new(bx, by, -half),
        Vector3::new(-bx, by, -half),
        Vector3::new(ox - tx, oy - ty, half),
        Vector3::new(ox + tx, oy - ty, half),
        Vector3::new(ox + tx, oy + ty, half),
        Vector3::new(ox - tx, oy + ty, half),
    ];
    let faces: [[usize; 4]; 6] = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ];

    let polygons = faces
        .iter()
        .map(|face| {
            let [a, b, c, d] = face.map(|i| corners[i]);
            // Diagonal cross product is robust for tapered faces
            let normal = (c - a).cross(&(d - b)).try_normalize(1e-12).unwrap_or_else(Vector3::z);
            Polygon::new(vec![Contour::new(
                face.iter().map(|&i| (corners[i], normal)).collect(),
            )])
        })
        .collect();

    FacetGroup::new(polygons)
}

/// World-space triangle mesh primitive for unique geometry
fn triangle_mesh(tree_index: u64, color: Color, mesh: Mesh, fallback: BoundingBox) -> Primitive {
    let bounds = mesh.bounds().unwrap_or(fallback);
    Primitive::TriangleMesh {
        tree_index,
        color,
        mesh,
        bounds,
    }
}

/// Template ids in order of appearance, keyed by the template's address
fn assign_template_ids<T>(
    results: &[MatchResult<T>],
    ids: &IdGenerator,
) -> (FxHashMap<*const T, u64>, Vec<Arc<T>>) {
    let mut template_ids = FxHashMap::default();
    let mut templates = Vec::new();
    for result in results {
        if let MatchResult::Template { fragment } = result {
            template_ids.insert(Arc::as_ptr(fragment), ids.next_id());
            templates.push(Arc::clone(fragment));
        }
    }
    (template_ids, templates)
}

/// Tessellate a facet group, falling back to an empty mesh.
///
/// One broken fragment must not fail the whole pass.
fn tessellate_or_empty(group: &FacetGroup, tree_index: u64) -> Mesh {
    match tessellate(group) {
        Ok(mesh) => mesh,
        Err(e) => {
            tracing::warn!(tree_index, error = %e, "Tessellation failed, exporting an empty mesh");
            Mesh::new()
        }
    }
}

/// Tessellate every template, in parallel, keeping the id order
fn build_templates<T, F>(
    templates: &[Arc<T>],
    template_ids: &FxHashMap<*const T, u64>,
    to_facets: F,
) -> Vec<TemplateMesh>
where
    T: Send + Sync,
    F: Fn(&T) -> (&FacetGroup, u64),
    F: Sync,
{
    #[cfg(not(target_arch = "wasm32"))]
    use rayon::prelude::*;

    // Raw pointers are not Send, so the ids are resolved up front
    let jobs: Vec<(u64, &Arc<T>)> = templates
        .iter()
        .filter_map(|t| template_ids.get(&Arc::as_ptr(t)).map(|id| (*id, t)))
        .collect();

    #[cfg(not(target_arch = "wasm32"))]
    let iter = jobs.par_iter();
    #[cfg(target_arch = "wasm32")]
    let iter = jobs.iter();

    iter.map(|(id, template)| {
        let template: &T = template;
        let (facets, tree_index) = to_facets(template);
        TemplateMesh {
            id: *id,
            mesh: tessellate_or_empty(facets, tree_index),
        }
    })
    .collect()
}

/// Demote clusters with fewer than `min_count` members, template included.
///
/// Clusters are identified by the template's address, which is unique here
/// because every proto primitive gets its own `Arc`.
fn reject_small_clusters<T>(results: Vec<MatchResult<T>>, min_count: usize) -> Vec<MatchResult<T>> {
    let mut cluster_sizes: FxHashMap<*const T, usize> = FxHashMap::default();
    for template in results.iter().filter_map(MatchResult::template) {
        *cluster_sizes.entry(Arc::as_ptr(template)).or_default() += 1;
    }

    results
        .into_iter()
        .map(|result| {
            let size = result
                .template()
                .and_then(|template| cluster_sizes.get(&Arc::as_ptr(template)))
                .copied()
                .unwrap_or(0);
            if size >= min_count {
                result
            } else {
                MatchResult::NotInstanced {
                    fragment: Arc::clone(result.fragment()),
                }
            }
        })
        .collect()
}

/// Facet group matching with a repeat-count threshold.
///
/// A group may only open a template when its key bucket holds at least
/// `min_instance_count` groups, so unique shapes in sparse buckets leave the
/// template cap alone. Clusters that still end up below the threshold are
/// demoted afterwards.
fn run_facet_group_matching(
    groups: &[Arc<ProtoFacetGroup>],
    config: &InstancingConfig,
) -> Vec<MatchResult<ProtoFacetGroup>> {
    let min_count = config.min_instance_count;

    let mut bucket_sizes: FxHashMap<i64, usize> = FxHashMap::default();
    for group in groups {
        *bucket_sizes.entry(calculate_key(&group.facet_group)).or_default() += 1;
    }
    let worth_a_template = |group: &ProtoFacetGroup| {
        bucket_sizes
            .get(&calculate_key(&group.facet_group))
            .copied()
            .unwrap_or(0)
            >= min_count
    };
    let matching = || {
        let results = match_all(groups, worth_a_template, config.template_count_limit);
        reject_small_clusters(results, min_count)
    };

    if config.parallel {
        return matching();
    }

    match rayon::ThreadPoolBuilder::new().num_threads(1).build() {
        Ok(pool) => pool.install(matching),
        Err(e) => {
            tracing::warn!(error = %e, "Could not build single-threaded pool, matching on the global pool");
            matching()
        }
    }
}

/// Run facet group and pyramid instancing over a provider's output.
///
/// Templates and instances become [`Primitive::InstancedMesh`] referencing a
/// [`TemplateMesh`]; rejected or unmatched facet groups become world-space
/// [`Primitive::TriangleMesh`]es, rejected pyramids stay [`Primitive::Pyramid`].
pub fn run_instancing(
    protos: Vec<ProtoPrimitive>,
    config: &InstancingConfig,
    ids: &IdGenerator,
) -> Result<InstancingOutput> {
    config.validate()?;
    let start = Instant::now();

    enum Slot {
        FacetGroup(Arc<ProtoFacetGroup>),
        Pyramid(Arc<ProtoPyramid>),
        Primitive(Primitive),
    }

    let mut facet_groups = Vec::new();
    let mut pyramids = Vec::new();
    let slots: Vec<Slot> = protos
        .into_iter()
        .map(|proto| match proto {
            ProtoPrimitive::FacetGroup(group) => {
                let group = Arc::new(group);
                facet_groups.push(Arc::clone(&group));
                Slot::FacetGroup(group)
            }
            ProtoPrimitive::Pyramid(pyramid) => {
                let pyramid = Arc::new(pyramid);
                pyramids.push(Arc::clone(&pyramid));
                Slot::Pyramid(pyramid)
            }
            ProtoPrimitive::Primitive(primitive) => Slot::Primitive(primitive),
        })
        .collect();

    let group_results = run_facet_group_matching(&facet_groups, config);
    let min_pyramids = config.min_pyramid_instance_count;
    let pyramid_results = process_pyramids(&pyramids, |members| members.len() >= min_pyramids);

    let (group_template_ids, group_templates) = assign_template_ids(&group_results, ids);
    let (pyramid_template_ids, pyramid_templates) = assign_template_ids(&pyramid_results, ids);

    let mut templates = build_templates(&group_templates, &group_template_ids, |g| {
        (&g.facet_group, g.tree_index)
    });
    for template in &pyramid_templates {
        if let Some(&id) = pyramid_template_ids.get(&Arc::as_ptr(template)) {
            let mesh = tessellate_or_empty(&pyramid_facets(&template.pyramid), template.tree_index);
            templates.push(TemplateMesh { id, mesh });
        }
    }

    let triangle_count_of: FxHashMap<u64, usize> = templates
        .iter()
        .map(|t| (t.id, t.mesh.triangle_count()))
        .collect();

    let group_result_of: FxHashMap<*const ProtoFacetGroup, &MatchResult<ProtoFacetGroup>> =
        group_results.iter().map(|r| (Arc::as_ptr(r.fragment()), r)).collect();
    let pyramid_result_of: FxHashMap<*const ProtoPyramid, &MatchResult<ProtoPyramid>> =
        pyramid_results.iter().map(|r| (Arc::as_ptr(r.fragment()), r)).collect();

    let mut primitives = Vec::with_capacity(slots.len());
    for slot in slots {
        let primitive = match slot {
            Slot::Primitive(primitive) => primitive,
            Slot::FacetGroup(group) => {
                let bounds = group
                    .bounds()
                    .unwrap_or_else(|| BoundingBox::new(Vector3::zeros(), Vector3::zeros()));
                let instance = group_result_of.get(&Arc::as_ptr(&group)).and_then(|result| {
                    let template = result.template()?;
                    let mesh_id = *group_template_ids.get(&Arc::as_ptr(template))?;
                    Some((mesh_id, result.transform()?))
                });
                match instance {
                    Some((mesh_id, transform)) => Primitive::InstancedMesh {
                        tree_index: group.tree_index,
                        color: group.color,
                        mesh_id,
                        triangle_count: triangle_count_of.get(&mesh_id).copied().unwrap_or(0),
                        instance_matrix: group.matrix * transform,
                        bounds,
                    },
                    None => {
                        let mesh = tessellate_or_empty(&group.facet_group, group.tree_index)
                            .transformed(&group.matrix);
                        triangle_mesh(group.tree_index, group.color, mesh, bounds)
                    }
                }
            }
            Slot::Pyramid(proto) => {
                let instance = pyramid_result_of.get(&Arc::as_ptr(&proto)).and_then(|result| {
                    let template = result.template()?;
                    let mesh_id = *pyramid_template_ids.get(&Arc::as_ptr(template))?;
                    Some((mesh_id, result.transform()?))
                });
                match instance {
                    Some((mesh_id, transform)) => Primitive::InstancedMesh {
                        tree_index: proto.tree_index,
                        color: proto.color,
                        mesh_id,
                        triangle_count: triangle_count_of.get(&mesh_id).copied().unwrap_or(0),
                        instance_matrix: proto.pyramid.matrix * transform,
                        bounds: proto.pyramid.bounds(),
                    },
                    None => Primitive::Pyramid {
                        tree_index: proto.tree_index,
                        color: proto.color,
                        pyramid: proto.pyramid.clone(),
                    },
                }
            }
        };
        primitives.push(primitive);
    }

    let stats = InstancingStatistics {
        facet_groups: MatchStatistics::from_results(&group_results),
        pyramids: MatchStatistics::from_results(&pyramid_results),
    };

    tracing::info!(
        primitive_count = primitives.len(),
        template_count = templates.len(),
        facet_group_instanced = stats.facet_groups.instanced_count,
        facet_group_not_instanced = stats.facet_groups.not_instanced_count,
        pyramid_instanced = stats.pyramids.instanced_count,
        pyramid_not_instanced = stats.pyramids.not_instanced_count,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Instancing complete"
    );

    Ok(InstancingOutput {
        primitives,
        templates,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pyramid_facets_match_bounds() {
        let pyramid = Pyramid::new(2.0, 1.0, 1.0, 0.5, 0.5, 0.0, 3.0, Transform::identity());
        let facets = pyramid_facets(&pyramid);
        assert_eq!(facets.polygon_count(), 6);
        assert_eq!(facets.vertex_count(), 24);

        let bounds = facets.bounds().unwrap();
        assert_relative_eq!(bounds.min, pyramid.bounding_box.min);
        assert_relative_eq!(bounds.max, pyramid.bounding_box.max);
    }

    #[test]
    fn test_pyramid_facet_normals_point_outwards() {
        let pyramid = Pyramid::new(1.0, 1.0, 0.5, 0.5, 0.0, 0.0, 2.0, Transform::identity());
        for polygon in &pyramid_facets(&pyramid).polygons {
            let contour = &polygon.contours[0];
            let center = contour.positions().sum::<Vector3<f32>>() / contour.len() as f32;
            let normal = contour.vertices[0].1;
            assert!(center.dot(&normal) > 0.0);
        }
    }

    #[test]
    fn test_pass_through_primitives_are_kept() {
        let primitive = Primitive::Circle {
            tree_index: 9,
            color: Color::default(),
            center: Vector3::zeros(),
            normal: Vector3::z(),
            radius: 1.0,
            bounds: BoundingBox::new(Vector3::repeat(-1.0), Vector3::repeat(1.0)),
        };

        let output = run_instancing(
            vec![ProtoPrimitive::Primitive(primitive.clone())],
            &InstancingConfig::default(),
            &IdGenerator::new(),
        )
        .unwrap();

        assert_eq!(output.primitives, vec![primitive]);
        assert!(output.templates.is_empty());
    }

    #[test]
    fn test_small_clusters_are_demoted() {
        let big = Arc::new(1u32);
        let small = Arc::new(2u32);
        let instance = |template: &Arc<u32>| MatchResult::Instanced {
            fragment: Arc::new(**template),
            template: Arc::clone(template),
            transform: Transform::identity(),
        };
        let results = vec![
            MatchResult::Template { fragment: Arc::clone(&big) },
            MatchResult::Template { fragment: Arc::clone(&small) },
            instance(&big),
            instance(&small),
            instance(&big),
            MatchResult::NotInstanced { fragment: Arc::new(3u32) },
        ];

        let results = reject_small_clusters(results, 3);
        let instanced: Vec<bool> = results.iter().map(MatchResult::is_instanced).collect();
        assert_eq!(instanced, vec![true, false, true, false, true, false]);
        assert!(Arc::ptr_eq(results[1].fragment(), &small));
    }

    #[test]
    fn test_failed_tessellation_gives_empty_mesh() {
        let mut group = pyramid_facets(&Pyramid::new(1.0, 1.0, 0.5, 0.5, 0.0, 0.0, 2.0, Transform::identity()));
        group.polygons[0].contours[0].vertices[0].0.x = f32::INFINITY;

        assert!(tessellate(&group).is_err());
        assert!(tessellate_or_empty(&group, 7).is_empty());
    }
}
