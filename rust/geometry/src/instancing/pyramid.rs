// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pyramid matching by shape parameters.
//!
//! A pyramid is fully described by seven scalars, so two pyramids are the
//! same shape when one parameter set is a positive uniform multiple of the
//! other. No vertex comparison is needed.

use super::{resolve_clusters, Cluster, MatchResult, MatchStatistics};
use reveal_lite_core::{Color, Pyramid, Transform, DEFAULT_TOLERANCE};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Pyramid as handed over by the RVM provider, before instancing
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoPyramid {
    pub pyramid: Pyramid,
    pub tree_index: u64,
    pub color: Color,
}

impl AsRef<Pyramid> for ProtoPyramid {
    fn as_ref(&self) -> &Pyramid {
        &self.pyramid
    }
}

#[inline]
fn approx_equal(a: f32, b: f32) -> bool {
    (a - b).abs() <= DEFAULT_TOLERANCE * 1f32.max(a.abs()).max(b.abs())
}

/// Uniform scale `s > 0` with `b == s * a` for every shape parameter.
///
/// The placement matrices are ignored. Returns the scale matrix mapping the
/// local geometry of `a` onto the local geometry of `b`.
pub fn match_pyramids(a: &Pyramid, b: &Pyramid) -> Option<Transform> {
    let pa = a.shape_parameters();
    let pb = b.shape_parameters();
    if pa.iter().chain(&pb).any(|p| !p.is_finite()) {
        return None;
    }

    // Largest parameter of `a` gives the best-conditioned ratio
    let (reference, _) = pa
        .iter()
        .enumerate()
        .max_by(|(_, x), (_, y)| x.abs().total_cmp(&y.abs()))?;
    if pa[reference].abs() <= f32::EPSILON {
        return None;
    }

    let scale = pb[reference] / pa[reference];
    if !(scale.is_finite() && scale > 0.0) {
        return None;
    }

    pa.iter()
        .zip(&pb)
        .all(|(x, y)| approx_equal(x * scale, *y))
        .then(|| Transform::new_scaling(scale))
}

/// Exact shape identity used to skip matching for repeated parameter sets
fn shape_key(pyramid: &Pyramid) -> [u32; Pyramid::SHAPE_PARAMETER_COUNT] {
    pyramid.shape_parameters().map(|p| (p + 0.0).to_bits())
}

/// Instance pyramids with the same greedy clustering as facet groups.
///
/// The same object passed more than once is counted once and gets a single
/// result. Pyramids with identical parameters share a cluster without being
/// compared again. `predicate` sees each finished cluster, template first.
pub fn process_pyramids<T, P>(pyramids: &[Arc<T>], predicate: P) -> Vec<MatchResult<T>>
where
    T: AsRef<Pyramid>,
    P: Fn(&[Arc<T>]) -> bool,
{
    let mut seen: FxHashSet<*const T> = FxHashSet::default();
    let unique: Vec<Arc<T>> = pyramids
        .iter()
        .filter(|p| seen.insert(Arc::as_ptr(p)))
        .cloned()
        .collect();

    let mut clusters: Vec<Cluster> = Vec::new();
    let mut assignment: Vec<Option<usize>> = vec![None; unique.len()];
    let mut cluster_of_shape: FxHashMap<[u32; Pyramid::SHAPE_PARAMETER_COUNT], (usize, Transform)> =
        FxHashMap::default();

    for (index, fragment) in unique.iter().enumerate() {
        let pyramid = (**fragment).as_ref();
        if !pyramid.is_finite() {
            continue;
        }

        let key = shape_key(pyramid);
        let found = cluster_of_shape.get(&key).copied().or_else(|| {
            clusters.iter().enumerate().find_map(|(c, cluster)| {
                let template = (*unique[cluster.template_index()]).as_ref();
                match_pyramids(template, pyramid).map(|transform| (c, transform))
            })
        });

        let (c, transform) = match found {
            Some(hit) => {
                clusters[hit.0].members.push((index, hit.1));
                hit
            }
            None => {
                clusters.push(Cluster::new(index));
                (clusters.len() - 1, Transform::identity())
            }
        };
        assignment[index] = Some(c);
        cluster_of_shape.entry(key).or_insert((c, transform));
    }

    let results = resolve_clusters(&unique, &clusters, &assignment, &predicate);

    let stats = MatchStatistics::from_results(&results);
    tracing::info!(
        pyramid_count = pyramids.len(),
        unique_count = unique.len(),
        template_count = stats.template_count,
        instanced_count = stats.instanced_count,
        not_instanced_count = stats.not_instanced_count,
        "Pyramid instancing complete"
    );

    results
}
