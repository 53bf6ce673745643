// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Reveal-Lite Core
//!
//! Value types shared by the Reveal-Lite conversion pipeline.
//!
//! ## Overview
//!
//! Format providers (RVM, OBJ, FBX) tessellate CAD nodes into the types defined
//! here, the geometry crate deduplicates them into templates and instances, and
//! the processing crate packs the result into sectors:
//!
//! - **Mesh**: flat vertex/normal/index buffers with tolerance-based equality
//! - **BoundingBox**: axis-aligned min/max pair
//! - **FacetGroup**: polygon soup (polygons → contours → vertex/normal pairs)
//! - **Pyramid**: parametric frustum described by seven scalars
//! - **Primitive**: the exported primitive sum type and its attribute registry
//! - **Sector / Scene**: flat sector records produced by sector splitting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reveal_lite_core::{Mesh, Vector3};
//!
//! let mut mesh = Mesh::with_capacity(3, 3);
//! mesh.add_vertex(Vector3::new(0.0, 0.0, 0.0), Vector3::z());
//! mesh.add_vertex(Vector3::new(1.0, 0.0, 0.0), Vector3::z());
//! mesh.add_vertex(Vector3::new(0.0, 1.0, 0.0), Vector3::z());
//! mesh.add_triangle(0, 1, 2);
//! assert_eq!(mesh.triangle_count(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for all value types

pub mod bounds;
pub mod error;
pub mod facet_group;
pub mod mesh;
pub mod primitive;
pub mod pyramid;
pub mod sector;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Vector3, Vector4};

pub use bounds::BoundingBox;
pub use error::{Error, Result};
pub use facet_group::{Contour, FacetGroup, Polygon};
pub use mesh::{Mesh, DEFAULT_TOLERANCE};
pub use primitive::{AttributeKind, AttributeValue, Color, Primitive, PrimitiveKind};
pub use pyramid::Pyramid;
pub use sector::{Scene, Sector};

/// Transform matrix type used throughout the pipeline (column vectors, `M * p`).
pub type Transform = Matrix4<f32>;
