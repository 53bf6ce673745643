// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exported primitive types and their attribute registry.
//!
//! Writers need to know which attributes each primitive kind exports and in
//! which order. Every kind has a static attribute list (see
//! [`PrimitiveKind::attribute_kinds`]) and [`Primitive::attribute`] resolves a
//! single attribute by matching on the variant.

use crate::bounds::BoundingBox;
use crate::mesh::Mesh;
use crate::pyramid::Pyramid;
use crate::Transform;
use nalgebra::Vector3;

/// RGBA color, 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Attribute columns a primitive can export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeKind {
    TreeIndex,
    Color,
    Center,
    Normal,
    Radius,
    Height,
    InstanceMatrix,
    MeshId,
    TriangleCount,
    Diagonal,
}

/// Value of a single exported attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    U64(u64),
    Float(f32),
    Vector(Vector3<f32>),
    Color(Color),
    Matrix(Transform),
}

/// Discriminant of [`Primitive`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveKind {
    Box,
    Cylinder,
    Circle,
    Pyramid,
    InstancedMesh,
    TriangleMesh,
}

const BOX_ATTRIBUTES: &[AttributeKind] = &[
    AttributeKind::TreeIndex,
    AttributeKind::Color,
    AttributeKind::Center,
    AttributeKind::Diagonal,
    AttributeKind::InstanceMatrix,
];
const CYLINDER_ATTRIBUTES: &[AttributeKind] = &[
    AttributeKind::TreeIndex,
    AttributeKind::Color,
    AttributeKind::Center,
    AttributeKind::Normal,
    AttributeKind::Height,
    AttributeKind::Radius,
];
const CIRCLE_ATTRIBUTES: &[AttributeKind] = &[
    AttributeKind::TreeIndex,
    AttributeKind::Color,
    AttributeKind::Center,
    AttributeKind::Normal,
    AttributeKind::Radius,
];
const PYRAMID_ATTRIBUTES: &[AttributeKind] = &[
    AttributeKind::TreeIndex,
    AttributeKind::Color,
    AttributeKind::Center,
    AttributeKind::Height,
    AttributeKind::InstanceMatrix,
];
const INSTANCED_MESH_ATTRIBUTES: &[AttributeKind] = &[
    AttributeKind::TreeIndex,
    AttributeKind::Color,
    AttributeKind::MeshId,
    AttributeKind::TriangleCount,
    AttributeKind::InstanceMatrix,
];
const TRIANGLE_MESH_ATTRIBUTES: &[AttributeKind] = &[
    AttributeKind::TreeIndex,
    AttributeKind::Color,
    AttributeKind::TriangleCount,
    AttributeKind::Diagonal,
];

impl PrimitiveKind {
    /// Ordered attributes exported for this kind
    pub fn attribute_kinds(self) -> &'static [AttributeKind] {
        match self {
            PrimitiveKind::Box => BOX_ATTRIBUTES,
            PrimitiveKind::Cylinder => CYLINDER_ATTRIBUTES,
            PrimitiveKind::Circle => CIRCLE_ATTRIBUTES,
            PrimitiveKind::Pyramid => PYRAMID_ATTRIBUTES,
            PrimitiveKind::InstancedMesh => INSTANCED_MESH_ATTRIBUTES,
            PrimitiveKind::TriangleMesh => TRIANGLE_MESH_ATTRIBUTES,
        }
    }
}

/// A primitive ready for sector packing
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Primitive {
    /// Unit box placed by `instance_matrix`
    Box {
        tree_index: u64,
        color: Color,
        instance_matrix: Transform,
        bounds: BoundingBox,
    },
    Cylinder {
        tree_index: u64,
        color: Color,
        center_a: Vector3<f32>,
        center_b: Vector3<f32>,
        radius: f32,
        bounds: BoundingBox,
    },
    Circle {
        tree_index: u64,
        color: Color,
        center: Vector3<f32>,
        normal: Vector3<f32>,
        radius: f32,
        bounds: BoundingBox,
    },
    Pyramid {
        tree_index: u64,
        color: Color,
        pyramid: Pyramid,
    },
    /// Reference to a shared template mesh
    InstancedMesh {
        tree_index: u64,
        color: Color,
        mesh_id: u64,
        triangle_count: usize,
        instance_matrix: Transform,
        bounds: BoundingBox,
    },
    /// Unique world-space geometry
    TriangleMesh {
        tree_index: u64,
        color: Color,
        mesh: Mesh,
        bounds: BoundingBox,
    },
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Box { .. } => PrimitiveKind::Box,
            Primitive::Cylinder { .. } => PrimitiveKind::Cylinder,
            Primitive::Circle { .. } => PrimitiveKind::Circle,
            Primitive::Pyramid { .. } => PrimitiveKind::Pyramid,
            Primitive::InstancedMesh { .. } => PrimitiveKind::InstancedMesh,
            Primitive::TriangleMesh { .. } => PrimitiveKind::TriangleMesh,
        }
    }

    pub fn tree_index(&self) -> u64 {
        match self {
            Primitive::Box { tree_index, .. }
            | Primitive::Cylinder { tree_index, .. }
            | Primitive::Circle { tree_index, .. }
            | Primitive::Pyramid { tree_index, .. }
            | Primitive::InstancedMesh { tree_index, .. }
            | Primitive::TriangleMesh { tree_index, .. } => *tree_index,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Primitive::Box { color, .. }
            | Primitive::Cylinder { color, .. }
            | Primitive::Circle { color, .. }
            | Primitive::Pyramid { color, .. }
            | Primitive::InstancedMesh { color, .. }
            | Primitive::TriangleMesh { color, .. } => *color,
        }
    }

    /// World-space bounds
    pub fn bounds(&self) -> BoundingBox {
        match self {
            Primitive::Box { bounds, .. }
            | Primitive::Cylinder { bounds, .. }
            | Primitive::Circle { bounds, .. }
            | Primitive::InstancedMesh { bounds, .. }
            | Primitive::TriangleMesh { bounds, .. } => *bounds,
            Primitive::Pyramid { pyramid, .. } => pyramid.bounds(),
        }
    }

    /// Triangles this primitive costs when rendered
    pub fn estimated_triangle_count(&self) -> usize {
        match self {
            Primitive::Box { .. } => 12,
            Primitive::Cylinder { .. } => 64,
            Primitive::Circle { .. } => 32,
            Primitive::Pyramid { .. } => 12,
            Primitive::InstancedMesh { triangle_count, .. } => *triangle_count,
            Primitive::TriangleMesh { mesh, .. } => mesh.triangle_count(),
        }
    }

    /// Resolve one attribute, `None` when this kind does not export it
    pub fn attribute(&self, kind: AttributeKind) -> Option<AttributeValue> {
        use AttributeKind as K;
        use AttributeValue as V;

        let value = match (kind, self) {
            (K::TreeIndex, _) => V::U64(self.tree_index()),
            (K::Color, _) => V::Color(self.color()),
            (K::Diagonal, Primitive::Box { .. } | Primitive::TriangleMesh { .. }) => {
                V::Float(self.bounds().diagonal())
            }
            (K::Center, Primitive::Box { bounds, .. }) => V::Vector(bounds.center()),
            (K::Center, Primitive::Cylinder { center_a, center_b, .. }) => {
                V::Vector((center_a + center_b) * 0.5)
            }
            (K::Center, Primitive::Circle { center, .. }) => V::Vector(*center),
            (K::Center, Primitive::Pyramid { pyramid, .. }) => V::Vector(pyramid.bounds().center()),
            (K::Normal, Primitive::Cylinder { center_a, center_b, .. }) => {
                V::Vector((center_b - center_a).try_normalize(f32::EPSILON)?)
            }
            (K::Normal, Primitive::Circle { normal, .. }) => V::Vector(*normal),
            (K::Radius, Primitive::Cylinder { radius, .. } | Primitive::Circle { radius, .. }) => {
                V::Float(*radius)
            }
            (K::Height, Primitive::Cylinder { center_a, center_b, .. }) => {
                V::Float((center_b - center_a).norm())
            }
            (K::Height, Primitive::Pyramid { pyramid, .. }) => V::Float(pyramid.height),
            (K::InstanceMatrix, Primitive::Box { instance_matrix, .. })
            | (K::InstanceMatrix, Primitive::InstancedMesh { instance_matrix, .. }) => {
                V::Matrix(*instance_matrix)
            }
            (K::InstanceMatrix, Primitive::Pyramid { pyramid, .. }) => V::Matrix(pyramid.matrix),
            (K::MeshId, Primitive::InstancedMesh { mesh_id, .. }) => V::U64(*mesh_id),
            (K::TriangleCount, Primitive::InstancedMesh { .. } | Primitive::TriangleMesh { .. }) => {
                V::U64(self.estimated_triangle_count() as u64)
            }
            _ => return None,
        };
        Some(value)
    }

    /// All exported attributes in registry order
    pub fn attributes(&self) -> Vec<(AttributeKind, AttributeValue)> {
        self.kind()
            .attribute_kinds()
            .iter()
            .filter_map(|&kind| self.attribute(kind).map(|value| (kind, value)))
            .collect()
    }
}
