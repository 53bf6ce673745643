// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh connectivity: splitting a mesh into disjoint pieces.
//!
//! Two triangles are adjacent when they share at least one vertex position.
//! Vertices are compared by exact position, so duplicated vertices along
//! hard edges (same position, different normals) still connect their faces.
//! Pieces touching in a single point are therefore one piece.

use reveal_lite_core::Mesh;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Exact position identity; `-0.0` and `0.0` compare equal
type PositionKey = [u32; 3];

#[inline]
fn position_key(mesh: &Mesh, vertex: u32) -> PositionKey {
    let base = vertex as usize * 3;
    [
        (mesh.positions[base] + 0.0).to_bits(),
        (mesh.positions[base + 1] + 0.0).to_bits(),
        (mesh.positions[base + 2] + 0.0).to_bits(),
    ]
}

/// Face adjacency graph of a triangle mesh
#[derive(Debug, Clone)]
pub struct FaceAdjacency {
    /// Neighbors of each face, sorted, without the face itself
    neighbors: Vec<SmallVec<[u32; 12]>>,
}

impl FaceAdjacency {
    /// Build the graph through a position → incident faces map
    pub fn build(mesh: &Mesh) -> Self {
        let face_count = mesh.triangle_count();

        let mut faces_at: FxHashMap<PositionKey, SmallVec<[u32; 8]>> = FxHashMap::default();
        for (face, triangle) in mesh.triangles().enumerate() {
            for vertex in triangle {
                let incident = faces_at.entry(position_key(mesh, vertex)).or_default();
                // Degenerate triangles may repeat a vertex
                if incident.last() != Some(&(face as u32)) {
                    incident.push(face as u32);
                }
            }
        }

        let neighbors = mesh
            .triangles()
            .enumerate()
            .map(|(face, triangle)| {
                let mut adjacent: SmallVec<[u32; 12]> = triangle
                    .iter()
                    .flat_map(|&vertex| faces_at[&position_key(mesh, vertex)].iter().copied())
                    .filter(|&other| other as usize != face)
                    .collect();
                adjacent.sort_unstable();
                adjacent.dedup();
                adjacent
            })
            .collect::<Vec<_>>();

        debug_assert_eq!(neighbors.len(), face_count);
        Self { neighbors }
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.neighbors.len()
    }

    #[inline]
    pub fn neighbors(&self, face: usize) -> &[u32] {
        &self.neighbors[face]
    }

    /// Connected components as sorted face index lists, ordered by their
    /// lowest face index.
    ///
    /// Traversal uses an explicit stack so large meshes cannot overflow the
    /// call stack.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let mut visited = vec![false; self.face_count()];
        let mut components = Vec::new();
        let mut stack: Vec<usize> = Vec::new();

        for seed in 0..self.face_count() {
            if visited[seed] {
                continue;
            }

            let mut component = Vec::new();
            visited[seed] = true;
            stack.push(seed);

            while let Some(face) = stack.pop() {
                component.push(face);
                for &next in self.neighbors(face) {
                    let next = next as usize;
                    if !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }

            component.sort_unstable();
            components.push(component);
        }

        components
    }
}

/// Rebuild a compact mesh from a subset of faces.
///
/// Vertices that are exactly equal (position and normal) are merged; the
/// rest keep their relative order.
fn extract_faces(mesh: &Mesh, faces: &[usize]) -> Mesh {
    let mut remap: FxHashMap<[u32; 6], u32> = FxHashMap::default();
    let mut piece = Mesh::with_capacity(faces.len() * 3, faces.len() * 3);
    piece.error = mesh.error;

    for &face in faces {
        for corner in 0..3 {
            let vertex = mesh.indices[face * 3 + corner] as usize;
            let position = mesh.position(vertex);
            let normal = mesh.normal(vertex);
            let key = [
                (position.x + 0.0).to_bits(),
                (position.y + 0.0).to_bits(),
                (position.z + 0.0).to_bits(),
                (normal.x + 0.0).to_bits(),
                (normal.y + 0.0).to_bits(),
                (normal.z + 0.0).to_bits(),
            ];
            let next_index = piece.vertex_count() as u32;
            let index = *remap.entry(key).or_insert_with(|| {
                piece.add_vertex(position, normal);
                next_index
            });
            piece.indices.push(index);
        }
    }

    piece
}

/// Split a mesh into its connected pieces.
///
/// A fully connected mesh comes back unchanged as a single piece; a mesh
/// without triangles has no pieces.
pub fn split_disjoint_pieces(mesh: &Mesh) -> Vec<Mesh> {
    let adjacency = FaceAdjacency::build(mesh);
    let components = adjacency.connected_components();

    match components.len() {
        0 => Vec::new(),
        1 => vec![mesh.clone()],
        count => {
            tracing::debug!(
                triangle_count = mesh.triangle_count(),
                piece_count = count,
                "Split mesh into disjoint pieces"
            );
            components
                .iter()
                .map(|faces| extract_faces(mesh, faces))
                .collect()
        }
    }
}
