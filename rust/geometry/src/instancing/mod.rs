// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry instancing: template/instance detection for repeated fragments.
//!
//! Both matchers run the same greedy online clustering. Fragments are visited
//! in input order and compared against the templates registered so far, in
//! registration order. The first match wins. A fragment that matches nothing
//! may open a new cluster and become its template.
//!
//! The caller's predicate is applied at different points. Facet groups are
//! gated one fragment at a time, before a template is registered, so a
//! rejected fragment never takes a slot under the template cap. Pyramids are
//! cheap to compare and uncapped, so their predicate sees each finished
//! cluster. Rejected fragments are reported as [`MatchResult::NotInstanced`].
//!
//! Output is a pure function of input order: the first accepted occurrence
//! of a shape is always its template.

mod facet_group;
mod pyramid;

pub use facet_group::{calculate_key, match_all, match_facet_groups};
pub use pyramid::{match_pyramids, process_pyramids, ProtoPyramid};

use reveal_lite_core::Transform;
use std::sync::Arc;

/// Instancing outcome for one input fragment
#[derive(Debug, Clone)]
pub enum MatchResult<T> {
    /// First fragment of a cluster; its own geometry is the template
    Template { fragment: Arc<T> },
    /// `transform` maps the template geometry onto this fragment
    Instanced {
        fragment: Arc<T>,
        template: Arc<T>,
        transform: Transform,
    },
    /// Unique geometry, exported as-is
    NotInstanced { fragment: Arc<T> },
}

impl<T> MatchResult<T> {
    pub fn fragment(&self) -> &Arc<T> {
        match self {
            MatchResult::Template { fragment }
            | MatchResult::Instanced { fragment, .. }
            | MatchResult::NotInstanced { fragment } => fragment,
        }
    }

    /// Template this fragment is drawn from, itself for a template
    pub fn template(&self) -> Option<&Arc<T>> {
        match self {
            MatchResult::Template { fragment } => Some(fragment),
            MatchResult::Instanced { template, .. } => Some(template),
            MatchResult::NotInstanced { .. } => None,
        }
    }

    /// Template → fragment transform, identity for a template
    pub fn transform(&self) -> Option<Transform> {
        match self {
            MatchResult::Template { .. } => Some(Transform::identity()),
            MatchResult::Instanced { transform, .. } => Some(*transform),
            MatchResult::NotInstanced { .. } => None,
        }
    }

    /// True for templates and instances, both render through a shared mesh
    #[inline]
    pub fn is_instanced(&self) -> bool {
        !matches!(self, MatchResult::NotInstanced { .. })
    }
}

/// Outcome counts of an instancing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStatistics {
    pub template_count: usize,
    /// Templates plus instances
    pub instanced_count: usize,
    pub not_instanced_count: usize,
}

impl MatchStatistics {
    pub fn from_results<T>(results: &[MatchResult<T>]) -> Self {
        results.iter().fold(Self::default(), |mut stats, result| {
            match result {
                MatchResult::Template { .. } => {
                    stats.template_count += 1;
                    stats.instanced_count += 1;
                }
                MatchResult::Instanced { .. } => stats.instanced_count += 1,
                MatchResult::NotInstanced { .. } => stats.not_instanced_count += 1,
            }
            stats
        })
    }

    pub fn total(&self) -> usize {
        self.instanced_count + self.not_instanced_count
    }
}

/// Members of one cluster during a scan: indices into the scanned slice and
/// the template → member transform. The first member is the template.
#[derive(Debug)]
struct Cluster {
    members: Vec<(usize, Transform)>,
}

impl Cluster {
    fn new(template_index: usize) -> Self {
        Self {
            members: vec![(template_index, Transform::identity())],
        }
    }

    #[inline]
    fn template_index(&self) -> usize {
        self.members[0].0
    }
}

/// Turn clusters into one result per fragment, in fragment order.
///
/// Fragments that never joined a cluster (left `None` in `assignment`) are
/// reported as not instanced.
fn resolve_clusters<T, P>(
    fragments: &[Arc<T>],
    clusters: &[Cluster],
    assignment: &[Option<usize>],
    predicate: &P,
) -> Vec<MatchResult<T>>
where
    P: Fn(&[Arc<T>]) -> bool,
{
    let accepted: Vec<bool> = clusters
        .iter()
        .map(|cluster| {
            let members: Vec<Arc<T>> = cluster
                .members
                .iter()
                .map(|(index, _)| Arc::clone(&fragments[*index]))
                .collect();
            predicate(&members)
        })
        .collect();

    let mut transforms: Vec<Option<Transform>> = vec![None; fragments.len()];
    for cluster in clusters {
        for (index, transform) in &cluster.members {
            transforms[*index] = Some(*transform);
        }
    }

    fragments
        .iter()
        .enumerate()
        .map(|(index, fragment)| {
            let fragment = Arc::clone(fragment);
            match assignment[index] {
                Some(c) if accepted[c] => {
                    let template_index = clusters[c].template_index();
                    if template_index == index {
                        MatchResult::Template { fragment }
                    } else {
                        MatchResult::Instanced {
                            fragment,
                            template: Arc::clone(&fragments[template_index]),
                            transform: transforms[index].unwrap_or_else(Transform::identity),
                        }
                    }
                }
                _ => MatchResult::NotInstanced { fragment },
            }
        })
        .collect()
}
