// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parametric pyramid (rectangular frustum) primitive

use crate::bounds::BoundingBox;
use crate::Transform;
use nalgebra::Vector3;

/// Rectangular frustum in local space.
///
/// The bottom rectangle is centered at `(0, 0, -height / 2)`, the top
/// rectangle at `(offset_x, offset_y, height / 2)`. Extents are half-sizes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pyramid {
    pub bottom_x: f32,
    pub bottom_y: f32,
    pub top_x: f32,
    pub top_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub height: f32,
    /// Local → world placement
    pub matrix: Transform,
    /// Local-space bounds derived from the shape parameters
    pub bounding_box: BoundingBox,
}

impl Pyramid {
    /// Number of scalars describing the shape
    pub const SHAPE_PARAMETER_COUNT: usize = 7;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bottom_x: f32,
        bottom_y: f32,
        top_x: f32,
        top_y: f32,
        offset_x: f32,
        offset_y: f32,
        height: f32,
        matrix: Transform,
    ) -> Self {
        let half_height = height * 0.5;
        let bounding_box = BoundingBox::new(
            Vector3::new(
                (-bottom_x).min(offset_x - top_x),
                (-bottom_y).min(offset_y - top_y),
                -half_height.abs(),
            ),
            Vector3::new(
                bottom_x.max(offset_x + top_x),
                bottom_y.max(offset_y + top_y),
                half_height.abs(),
            ),
        );

        Self {
            bottom_x,
            bottom_y,
            top_x,
            top_y,
            offset_x,
            offset_y,
            height,
            matrix,
            bounding_box,
        }
    }

    /// Shape parameters in a fixed order: bottom x/y, top x/y, offset x/y, height
    #[inline]
    pub fn shape_parameters(&self) -> [f32; Self::SHAPE_PARAMETER_COUNT] {
        [
            self.bottom_x,
            self.bottom_y,
            self.top_x,
            self.top_y,
            self.offset_x,
            self.offset_y,
            self.height,
        ]
    }

    /// True when every shape parameter and matrix entry is finite
    pub fn is_finite(&self) -> bool {
        self.shape_parameters().iter().all(|p| p.is_finite())
            && self.matrix.iter().all(|m| m.is_finite())
    }

    /// World-space bounds
    pub fn bounds(&self) -> BoundingBox {
        self.bounding_box.transformed(&self.matrix)
    }

    /// The same shape with every parameter scaled by `factor`
    pub fn scaled(&self, factor: f32) -> Pyramid {
        Pyramid::new(
            self.bottom_x * factor,
            self.bottom_y * factor,
            self.top_x * factor,
            self.top_y * factor,
            self.offset_x * factor,
            self.offset_y * factor,
            self.height * factor,
            self.matrix,
        )
    }
}

impl AsRef<Pyramid> for Pyramid {
    fn as_ref(&self) -> &Pyramid {
        self
    }
}
