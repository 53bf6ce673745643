// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Facet group matching.
//!
//! Polygons and contours are compared positionally. Two facet groups that
//! describe the same surface with a different polygon order do not match.

use super::{MatchResult, MatchStatistics};
use crate::transform::{
    are_affinely_independent, are_non_collinear, transform_position, try_calculate_transform,
};
use nalgebra::Vector3;
use reveal_lite_core::{FacetGroup, Transform, DEFAULT_TOLERANCE};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Coarse structural fingerprint used to bucket facet groups.
///
/// Groups with different keys have different polygon, contour or vertex
/// counts and can never match.
pub fn calculate_key(group: &FacetGroup) -> i64 {
    group.polygon_count() as i64 * 1_000_000_000
        + group.contour_count() as i64 * 1_000_000
        + group.vertex_count() as i64
}

/// Same polygon count, and per position the same contour and vertex counts
fn structure_matches(a: &FacetGroup, b: &FacetGroup) -> bool {
    a.polygons.len() == b.polygons.len()
        && a.polygons.iter().zip(&b.polygons).all(|(pa, pb)| {
            pa.contours.len() == pb.contours.len()
                && pa
                    .contours
                    .iter()
                    .zip(&pb.contours)
                    .all(|(ca, cb)| ca.len() == cb.len())
        })
}

#[inline]
fn approx_equal(a: &Vector3<f32>, b: &Vector3<f32>) -> bool {
    (a - b).iter().all(|d| d.abs() <= DEFAULT_TOLERANCE)
}

/// Pick four corresponding, affinely independent points and solve for the
/// transform. `None` when the source vertices are coplanar.
fn find_candidate_transform(a: &FacetGroup, b: &FacetGroup) -> Option<Transform> {
    let mut chosen: SmallVec<[(Vector3<f32>, Vector3<f32>); 4]> = SmallVec::new();

    for (pa, pb) in a.positions().zip(b.positions()) {
        if chosen.iter().any(|(ca, _)| approx_equal(ca, pa)) {
            continue;
        }

        match chosen.len() {
            0 | 1 => chosen.push((*pa, *pb)),
            2 => {
                if are_non_collinear(&chosen[0].0, &chosen[1].0, pa) {
                    chosen.push((*pa, *pb));
                }
            }
            _ => {
                let source = [chosen[0].0, chosen[1].0, chosen[2].0, *pa];
                if !are_affinely_independent(&source) {
                    continue;
                }
                let target = [chosen[0].1, chosen[1].1, chosen[2].1, *pb];
                return try_calculate_transform(&source, &target);
            }
        }
    }

    None
}

/// Every vertex of `a` must land on the vertex of `b` at the same position
fn verify_transform(a: &FacetGroup, b: &FacetGroup, transform: &Transform) -> bool {
    a.positions()
        .zip(b.positions())
        .all(|(pa, pb)| approx_equal(&transform_position(transform, pa), pb))
}

/// Transform mapping `a` onto `b`, or `None` when they are not the same shape.
///
/// Non-finite vertex data never matches.
pub fn match_facet_groups(a: &FacetGroup, b: &FacetGroup) -> Option<Transform> {
    if !structure_matches(a, b) || !a.is_finite() || !b.is_finite() {
        return None;
    }

    let transform = find_candidate_transform(a, b)?;
    verify_transform(a, b, &transform).then_some(transform)
}

#[inline]
fn facet_group<T: AsRef<FacetGroup>>(fragment: &Arc<T>) -> &FacetGroup {
    (**fragment).as_ref()
}

/// Greedy clustering of one key bucket, strictly sequential.
///
/// A fragment is compared against the templates opened so far, in
/// registration order. One that matches nothing becomes a template only if it
/// is finite, the bucket is below `template_count_limit` and `predicate`
/// accepts it.
fn match_bucket<T, P>(bucket: &[Arc<T>], predicate: &P, template_count_limit: u32) -> Vec<MatchResult<T>>
where
    T: AsRef<FacetGroup>,
    P: Fn(&T) -> bool,
{
    let mut templates: Vec<&Arc<T>> = Vec::new();
    let mut results = Vec::with_capacity(bucket.len());

    for fragment in bucket {
        let found = templates.iter().find_map(|&template| {
            // An object is never an instance of itself
            if Arc::ptr_eq(template, fragment) {
                return None;
            }
            match_facet_groups(facet_group(template), facet_group(fragment))
                .map(|transform| (template, transform))
        });

        let result = match found {
            Some((template, transform)) => MatchResult::Instanced {
                fragment: Arc::clone(fragment),
                template: Arc::clone(template),
                transform,
            },
            None => {
                let opens_template = facet_group(fragment).is_finite()
                    && (templates.len() as u64) < u64::from(template_count_limit)
                    && predicate(&**fragment);
                if opens_template {
                    templates.push(fragment);
                    MatchResult::Template {
                        fragment: Arc::clone(fragment),
                    }
                } else {
                    MatchResult::NotInstanced {
                        fragment: Arc::clone(fragment),
                    }
                }
            }
        };
        results.push(result);
    }

    tracing::debug!(
        fragments = bucket.len(),
        templates = templates.len(),
        "Matched facet group bucket"
    );

    results
}

/// Instance all facet groups.
///
/// Groups are bucketed by [`calculate_key`]; buckets are independent and run
/// in parallel, each one sequentially. `predicate` decides whether an
/// unmatched group may become a template; at most `template_count_limit`
/// templates are opened per bucket. A group that matches an existing template
/// is instanced regardless of `predicate`.
///
/// Results are ordered by bucket (in order of first appearance) and then by
/// input order, regardless of thread scheduling.
pub fn match_all<T, P>(groups: &[Arc<T>], predicate: P, template_count_limit: u32) -> Vec<MatchResult<T>>
where
    T: AsRef<FacetGroup> + Send + Sync,
    P: Fn(&T) -> bool + Sync,
{
    #[cfg(not(target_arch = "wasm32"))]
    use rayon::prelude::*;

    let mut bucket_of_key: FxHashMap<i64, usize> = FxHashMap::default();
    let mut buckets: Vec<Vec<Arc<T>>> = Vec::new();
    for group in groups {
        let key = calculate_key(facet_group(group));
        let bucket = *bucket_of_key.entry(key).or_insert_with(|| {
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[bucket].push(Arc::clone(group));
    }

    #[cfg(not(target_arch = "wasm32"))]
    let per_bucket: Vec<Vec<MatchResult<T>>> = buckets
        .par_iter()
        .map(|bucket| match_bucket(bucket, &predicate, template_count_limit))
        .collect();

    #[cfg(target_arch = "wasm32")]
    let per_bucket: Vec<Vec<MatchResult<T>>> = buckets
        .iter()
        .map(|bucket| match_bucket(bucket, &predicate, template_count_limit))
        .collect();

    let results: Vec<MatchResult<T>> = per_bucket.into_iter().flatten().collect();

    let stats = MatchStatistics::from_results(&results);
    tracing::info!(
        fragment_count = groups.len(),
        bucket_count = buckets.len(),
        template_count = stats.template_count,
        instanced_count = stats.instanced_count,
        not_instanced_count = stats.not_instanced_count,
        "Facet group matching complete"
    );

    results
}
