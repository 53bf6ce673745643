// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sector tree construction and cost analysis over flat sector lists.
//!
//! The tree borrows the sectors; it is rebuilt whenever it is needed and
//! never stored.

use reveal_lite_core::{Scene, Sector};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Node of a sector tree, borrowing its sector
#[derive(Debug, Clone)]
pub struct SectorTreeNode<'a> {
    pub sector: &'a Sector,
    pub children: Vec<SectorTreeNode<'a>>,
}

impl<'a> SectorTreeNode<'a> {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Leaf descendants in depth-first order (the node itself if it is a leaf)
    pub fn find_leafs(&self) -> Leafs<'_, 'a> {
        Leafs {
            nodes: self.depth_first(),
        }
    }

    /// Every node of the subtree, pre-order
    pub fn depth_first(&self) -> DepthFirst<'_, 'a> {
        DepthFirst { stack: vec![self] }
    }

    /// Number of nodes below this one
    pub fn descendant_count(&self) -> usize {
        self.depth_first().count() - 1
    }
}

/// Pre-order traversal with an explicit stack
#[derive(Debug)]
pub struct DepthFirst<'n, 'a> {
    stack: Vec<&'n SectorTreeNode<'a>>,
}

impl<'n, 'a> Iterator for DepthFirst<'n, 'a> {
    type Item = &'n SectorTreeNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Lazy leaf sequence; consumed once, recreate it from the tree to restart
#[derive(Debug)]
pub struct Leafs<'n, 'a> {
    nodes: DepthFirst<'n, 'a>,
}

impl<'n, 'a> Iterator for Leafs<'n, 'a> {
    type Item = &'n SectorTreeNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.nodes.by_ref().find(|node| node.is_leaf())
    }
}

fn build_node<'a>(
    index: usize,
    sectors: &'a [Sector],
    children_of: &FxHashMap<u32, Vec<usize>>,
    placed: &mut [bool],
) -> SectorTreeNode<'a> {
    placed[index] = true;
    let sector = &sectors[index];

    let mut children = Vec::new();
    for &child in children_of.get(&sector.id).map(Vec::as_slice).unwrap_or_default() {
        // Duplicate ids could otherwise loop back into an ancestor
        if !placed[child] {
            children.push(build_node(child, sectors, children_of, placed));
        }
    }

    SectorTreeNode { sector, children }
}

/// Build the sector forest: one tree per sector without a parent.
///
/// Children keep the order of the input list. Sectors whose parent is
/// missing are unreachable and left out.
pub fn generate_sector_tree(sectors: &[Sector]) -> Vec<SectorTreeNode<'_>> {
    let mut children_of: FxHashMap<u32, Vec<usize>> = FxHashMap::default();
    for (index, sector) in sectors.iter().enumerate() {
        if let Some(parent_id) = sector.parent_id {
            children_of.entry(parent_id).or_default().push(index);
        }
    }

    let mut placed = vec![false; sectors.len()];
    let roots: Vec<SectorTreeNode<'_>> = (0..sectors.len())
        .filter(|&index| sectors[index].is_root())
        .map(|index| build_node(index, sectors, &children_of, &mut placed))
        .collect();

    let orphans = placed.iter().filter(|p| !**p).count();
    if orphans > 0 {
        tracing::warn!(orphans, "Sectors unreachable from any root");
    }

    roots
}

/// Aggregate statistics over a scene's sectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorAnalysisResult {
    pub sector_count: usize,
    pub max_sector_depth: u32,
    pub average_estimated_triangle_count: f64,
    pub average_estimated_drawcall_count: f64,
}

/// Summarize a scene. An empty scene yields all zeros.
pub fn analyze_sectors_in_scene(scene: &Scene) -> SectorAnalysisResult {
    let sectors = &scene.sectors;
    if sectors.is_empty() {
        return SectorAnalysisResult::default();
    }

    let count = sectors.len() as f64;
    let triangles: u64 = sectors.iter().map(|s| s.estimated_triangle_count).sum();
    let draw_calls: u64 = sectors.iter().map(|s| s.estimated_draw_call_count).sum();

    SectorAnalysisResult {
        sector_count: sectors.len(),
        max_sector_depth: sectors.iter().map(|s| s.depth).max().unwrap_or(0),
        average_estimated_triangle_count: triangles as f64 / count,
        average_estimated_drawcall_count: draw_calls as f64 / count,
    }
}

/// Cost of showing one leaf: every sector from the root down must be loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafCost {
    pub leaf_id: u32,
    /// Sector ids from the root down to the leaf
    pub path: Vec<u32>,
    pub estimated_triangle_count: u64,
    pub estimated_draw_call_count: u64,
}

/// Root-to-leaf path and summed cost for every leaf of the sector forest.
///
/// Parents are resolved through an id lookup; a parent chain that revisits a
/// sector stops there.
pub fn calculate_minimum_cost_for_leafs(sectors: &[Sector]) -> Vec<LeafCost> {
    let by_id: FxHashMap<u32, &Sector> = sectors.iter().map(|s| (s.id, s)).collect();
    let roots = generate_sector_tree(sectors);

    roots
        .iter()
        .flat_map(SectorTreeNode::find_leafs)
        .map(|leaf| {
            let mut path = Vec::new();
            let mut visited = FxHashSet::default();
            let mut triangles = 0u64;
            let mut draw_calls = 0u64;

            let mut current = Some(leaf.sector);
            while let Some(sector) = current {
                if !visited.insert(sector.id) {
                    break;
                }
                path.push(sector.id);
                triangles += sector.estimated_triangle_count;
                draw_calls += sector.estimated_draw_call_count;
                current = sector.parent_id.and_then(|id| by_id.get(&id).copied());
            }
            path.reverse();

            LeafCost {
                leaf_id: leaf.sector.id,
                path,
                estimated_triangle_count: triangles,
                estimated_draw_call_count: draw_calls,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector(id: u32, parent_id: Option<u32>, depth: u32, triangles: u64) -> Sector {
        let mut sector = Sector::new(id, parent_id, depth);
        sector.estimated_triangle_count = triangles;
        sector.estimated_draw_call_count = 1;
        sector
    }

    ///   0         5
    ///  / \
    /// 1   2
    ///    / \
    ///   3   4
    fn forest() -> Vec<Sector> {
        vec![
            sector(0, None, 0, 10),
            sector(1, Some(0), 1, 20),
            sector(2, Some(0), 1, 30),
            sector(3, Some(2), 2, 40),
            sector(4, Some(2), 2, 50),
            sector(5, None, 0, 60),
        ]
    }

    #[test]
    fn test_roots_and_children() {
        let sectors = forest();
        let roots = generate_sector_tree(&sectors);

        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].sector.id, 0);
        assert_eq!(roots[1].sector.id, 5);
        assert!(roots[1].is_leaf());
        assert_eq!(roots[0].descendant_count(), 4);

        let ids: Vec<u32> = roots[0].depth_first().map(|n| n.sector.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_every_sector_appears_once() {
        let sectors = forest();
        let roots = generate_sector_tree(&sectors);

        let mut ids: Vec<u32> = roots
            .iter()
            .flat_map(SectorTreeNode::depth_first)
            .map(|n| n.sector.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);

        for node in roots.iter().flat_map(SectorTreeNode::depth_first) {
            assert_eq!(node.is_leaf(), node.children.is_empty());
        }
    }

    #[test]
    fn test_find_leafs_is_depth_first() {
        let sectors = forest();
        let roots = generate_sector_tree(&sectors);

        let leafs: Vec<u32> = roots[0].find_leafs().map(|n| n.sector.id).collect();
        assert_eq!(leafs, vec![1, 3, 4]);
        // A fresh sequence starts over
        assert_eq!(roots[0].find_leafs().count(), 3);
    }

    #[test]
    fn test_orphans_are_ignored() {
        let mut sectors = forest();
        sectors.push(sector(9, Some(42), 3, 0));
        let roots = generate_sector_tree(&sectors);
        let total: usize = roots.iter().map(|r| r.descendant_count() + 1).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_self_parent_does_not_loop() {
        let sectors = vec![sector(0, None, 0, 1), sector(0, Some(0), 1, 1)];
        let roots = generate_sector_tree(&sectors);
        assert_eq!(roots[0].descendant_count(), 1);
    }

    #[test]
    fn test_analyze_scene() {
        let result = analyze_sectors_in_scene(&Scene::new(forest()));
        assert_eq!(result.sector_count, 6);
        assert_eq!(result.max_sector_depth, 2);
        assert_eq!(result.average_estimated_triangle_count, 35.0);
        assert_eq!(result.average_estimated_drawcall_count, 1.0);

        assert_eq!(
            analyze_sectors_in_scene(&Scene::default()),
            SectorAnalysisResult::default()
        );
    }

    #[test]
    fn test_leaf_costs_follow_parent_chain() {
        let costs = calculate_minimum_cost_for_leafs(&forest());

        let leaf_ids: Vec<u32> = costs.iter().map(|c| c.leaf_id).collect();
        assert_eq!(leaf_ids, vec![1, 3, 4, 5]);

        let deepest = &costs[1];
        assert_eq!(deepest.path, vec![0, 2, 3]);
        assert_eq!(deepest.estimated_triangle_count, 10 + 30 + 40);
        assert_eq!(deepest.estimated_draw_call_count, 3);

        assert_eq!(costs[3].path, vec![5]);
    }
}
