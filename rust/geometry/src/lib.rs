// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reveal-Lite Geometry
//!
//! Geometry instancing for CAD fragments: affine transform solving between
//! point sets, facet group and pyramid template matching, facet group
//! tessellation with earcutr, and mesh connectivity splitting.

pub mod connectivity;
pub mod error;
pub mod instancing;
pub mod tessellation;
pub mod transform;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use connectivity::{split_disjoint_pieces, FaceAdjacency};
pub use error::{Error, Result};
pub use instancing::{
    calculate_key, match_all, match_facet_groups, match_pyramids, process_pyramids, MatchResult,
    MatchStatistics, ProtoPyramid,
};
pub use tessellation::tessellate;
pub use transform::{transform_position, try_calculate_transform};
