// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::bounds::BoundingBox;
use crate::error::{Error, Result};
use crate::Transform;
use nalgebra::{Matrix3, Point3, Vector3};
use std::hash::{Hash, Hasher};

/// Per-component tolerance used by [`Mesh`] equality and geometry matching
pub const DEFAULT_TOLERANCE: f32 = 0.001;

/// Triangle mesh
///
/// Invariants: `positions.len() == normals.len()`, both are multiples of 3,
/// `indices.len()` is a multiple of 3 and every index addresses a vertex.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
    /// Simplification error introduced when this mesh was produced
    pub error: f32,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            error: 0.0,
        }
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
            error: 0.0,
        }
    }

    /// Build a mesh from raw buffers, validating every invariant.
    pub fn try_from_buffers(
        positions: Vec<f32>,
        normals: Vec<f32>,
        indices: Vec<u32>,
        error: f32,
    ) -> Result<Self> {
        if positions.len() != normals.len() {
            return Err(Error::VertexNormalMismatch {
                positions: positions.len(),
                normals: normals.len(),
            });
        }
        if positions.len() % 3 != 0 {
            return Err(Error::RaggedVertexBuffer(positions.len()));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::RaggedIndexBuffer(indices.len()));
        }
        let vertex_count = positions.len() / 3;
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        Ok(Self {
            positions,
            normals,
            indices,
            error,
        })
    }

    /// Build a mesh from raw buffers.
    ///
    /// # Panics
    /// Panics when the buffers violate the mesh invariants. Mismatched buffers
    /// are a bug in the producer, use [`Mesh::try_from_buffers`] for untrusted data.
    pub fn from_buffers(positions: Vec<f32>, normals: Vec<f32>, indices: Vec<u32>, error: f32) -> Self {
        match Self::try_from_buffers(positions, normals, indices, error) {
            Ok(mesh) => mesh,
            Err(e) => panic!("invalid mesh buffers: {e}"),
        }
    }

    /// Add a vertex with normal
    #[inline]
    pub fn add_vertex(&mut self, position: Vector3<f32>, normal: Vector3<f32>) {
        self.positions.extend_from_slice(&[position.x, position.y, position.z]);
        self.normals.extend_from_slice(&[normal.x, normal.y, normal.z]);
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Position of vertex `index`
    #[inline]
    pub fn position(&self, index: usize) -> Vector3<f32> {
        Vector3::new(
            self.positions[index * 3],
            self.positions[index * 3 + 1],
            self.positions[index * 3 + 2],
        )
    }

    /// Normal of vertex `index`
    #[inline]
    pub fn normal(&self, index: usize) -> Vector3<f32> {
        Vector3::new(
            self.normals[index * 3],
            self.normals[index * 3 + 1],
            self.normals[index * 3 + 2],
        )
    }

    /// Triangles as index triplets
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Merge another mesh into this one, rebasing its indices.
    ///
    /// Fails without touching `self` when the combined vertex count does not
    /// fit 32-bit indices.
    pub fn try_merge(&mut self, other: &Mesh) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }

        let vertex_offset = merged_vertex_offset(self.vertex_count(), other.vertex_count())?;

        self.positions.reserve(other.positions.len());
        self.normals.reserve(other.normals.len());
        self.indices.reserve(other.indices.len());

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
        self.error = self.error.max(other.error);
        Ok(())
    }

    /// Merge another mesh into this one
    ///
    /// # Panics
    /// Panics when the combined mesh has more than `u32::MAX` vertices, use
    /// [`Mesh::try_merge`] when that can happen.
    #[inline]
    pub fn merge(&mut self, other: &Mesh) {
        if let Err(e) = self.try_merge(other) {
            panic!("cannot merge meshes: {e}");
        }
    }

    /// Combine two meshes into a new one, rebasing the second mesh's indices
    pub fn merged(&self, other: &Mesh) -> Mesh {
        let mut combined = Mesh::with_capacity(
            self.vertex_count() + other.vertex_count(),
            self.indices.len() + other.indices.len(),
        );
        combined.merge(self);
        combined.merge(other);
        combined.error = self.error.max(other.error);
        combined
    }

    /// Apply a transform in place.
    ///
    /// Positions are multiplied by `transform`, normals by the inverse-transpose
    /// of its linear part and re-normalized. Zero-length normals are left as-is.
    pub fn apply(&mut self, transform: &Transform) {
        for chunk in self.positions.chunks_exact_mut(3) {
            let p = transform.transform_point(&Point3::new(chunk[0], chunk[1], chunk[2]));
            chunk.copy_from_slice(&[p.x, p.y, p.z]);
        }

        let Some(normal_matrix) = normal_matrix(transform) else {
            return;
        };
        for chunk in self.normals.chunks_exact_mut(3) {
            let n = normal_matrix * Vector3::new(chunk[0], chunk[1], chunk[2]);
            if let Some(n) = n.try_normalize(f32::EPSILON) {
                chunk.copy_from_slice(&[n.x, n.y, n.z]);
            }
        }
    }

    /// Transformed copy of this mesh
    pub fn transformed(&self, transform: &Transform) -> Mesh {
        let mut copy = self.clone();
        copy.apply(transform);
        copy
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Axis-aligned bounds of all vertices, `None` for an empty mesh
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points((0..self.vertex_count()).map(|i| self.position(i)))
    }

    /// Tolerance comparison: positions and normals per component within
    /// `tolerance`, indices and error compared exactly.
    pub fn equals_within(&self, other: &Mesh, tolerance: f32) -> bool {
        fn close(a: &[f32], b: &[f32], tolerance: f32) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance)
        }

        self.indices == other.indices
            && self.error == other.error
            && close(&self.positions, &other.positions, tolerance)
            && close(&self.normals, &other.normals, tolerance)
    }

    /// Clear the mesh
    #[inline]
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.indices.clear();
        self.error = 0.0;
    }
}

/// Index offset for appending `added` vertices after `current` ones.
///
/// The merged vertex count must fit `u32`.
fn merged_vertex_offset(current: usize, added: usize) -> Result<u32> {
    let vertex_count = current.checked_add(added).unwrap_or(usize::MAX);
    if vertex_count > u32::MAX as usize {
        return Err(Error::IndexOverflow { vertex_count });
    }
    // Bounded by the check above
    Ok(current as u32)
}

/// Inverse-transpose of the linear part, `None` when the transform is singular
pub fn normal_matrix(transform: &Transform) -> Option<Matrix3<f32>> {
    let linear: Matrix3<f32> = transform.fixed_view::<3, 3>(0, 0).into_owned();
    linear.try_inverse().map(|inverse| inverse.transpose())
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Mesh {
    fn eq(&self, other: &Self) -> bool {
        self.equals_within(other, DEFAULT_TOLERANCE)
    }
}

// Only the exactly-compared parts are hashed so that meshes equal within
// tolerance always hash alike.
impl Hash for Mesh {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vertex_count().hash(state);
        self.indices.hash(state);
        (self.error + 0.0).to_bits().hash(state);
    }
}
