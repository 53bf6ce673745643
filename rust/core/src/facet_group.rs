// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Facet groups: the polygon soup produced by RVM tessellation.
//!
//! A facet group is an ordered list of polygons, a polygon is an ordered list
//! of contours (the first one is the outer boundary, the rest are holes) and a
//! contour is an ordered list of vertex/normal pairs. Facet groups are read-only
//! input to instancing; transforming one produces a new value.

use crate::bounds::BoundingBox;
use crate::mesh::normal_matrix;
use crate::Transform;
use nalgebra::{Point3, Vector3};

/// Closed loop of vertex/normal pairs
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contour {
    pub vertices: Vec<(Vector3<f32>, Vector3<f32>)>,
}

impl Contour {
    pub fn new(vertices: Vec<(Vector3<f32>, Vector3<f32>)>) -> Self {
        Self { vertices }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Vector3<f32>> + '_ {
        self.vertices.iter().map(|(v, _)| v)
    }
}

/// Planar polygon with an outer contour and optional holes
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    pub contours: Vec<Contour>,
}

impl Polygon {
    pub fn new(contours: Vec<Contour>) -> Self {
        Self { contours }
    }

    pub fn vertex_count(&self) -> usize {
        self.contours.iter().map(Contour::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacetGroup {
    pub polygons: Vec<Polygon>,
}

impl FacetGroup {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    #[inline]
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Total contours across all polygons
    pub fn contour_count(&self) -> usize {
        self.polygons.iter().map(|p| p.contours.len()).sum()
    }

    /// Total vertices across all contours
    pub fn vertex_count(&self) -> usize {
        self.polygons.iter().map(Polygon::vertex_count).sum()
    }

    /// Vertex positions flattened in polygon → contour → vertex order
    pub fn positions(&self) -> impl Iterator<Item = &Vector3<f32>> + '_ {
        self.polygons
            .iter()
            .flat_map(|p| p.contours.iter())
            .flat_map(Contour::positions)
    }

    /// True when every position and normal is finite
    pub fn is_finite(&self) -> bool {
        self.polygons
            .iter()
            .flat_map(|p| p.contours.iter())
            .flat_map(|c| c.vertices.iter())
            .all(|(v, n)| v.iter().chain(n.iter()).all(|c| c.is_finite()))
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions().copied())
    }

    /// New facet group with positions mapped by `transform` and normals by
    /// its inverse-transpose. Singular transforms keep the source normals.
    pub fn transformed(&self, transform: &Transform) -> FacetGroup {
        let normals = normal_matrix(transform);
        let map_vertex = |(v, n): &(Vector3<f32>, Vector3<f32>)| {
            let position = transform.transform_point(&Point3::from(*v)).coords;
            let normal = normals
                .and_then(|m| (m * n).try_normalize(f32::EPSILON))
                .unwrap_or(*n);
            (position, normal)
        };

        FacetGroup {
            polygons: self
                .polygons
                .iter()
                .map(|polygon| Polygon {
                    contours: polygon
                        .contours
                        .iter()
                        .map(|contour| Contour::new(contour.vertices.iter().map(&map_vertex).collect()))
                        .collect(),
                })
                .collect(),
        }
    }
}

impl AsRef<FacetGroup> for FacetGroup {
    fn as_ref(&self) -> &FacetGroup {
        self
    }
}
