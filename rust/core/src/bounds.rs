// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes

use crate::Transform;
use nalgebra::{Point3, Vector3};

/// Axis-aligned bounding box (min/max corner pair).
///
/// Always derived from geometry, never edited on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl BoundingBox {
    #[inline]
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` for an empty iterator
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vector3<f32>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |bounds, p| bounds.encapsulate(&p)))
    }

    /// `max - min`
    #[inline]
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn diagonal(&self) -> f32 {
        self.size().norm()
    }

    /// Box grown to include `point`
    #[inline]
    pub fn encapsulate(&self, point: &Vector3<f32>) -> Self {
        Self::new(self.min.inf(point), self.max.sup(point))
    }

    /// Smallest box containing both boxes
    #[inline]
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    #[inline]
    pub fn contains(&self, point: &Vector3<f32>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Bounds of the eight transformed corners
    pub fn transformed(&self, transform: &Transform) -> Self {
        let corners = (0..8).map(|i| {
            let corner = Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            transform.transform_point(&corner).coords
        });
        // Eight corners, never empty
        Self::from_points(corners).unwrap_or(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());

        let bounds = BoundingBox::from_points([
            Vector3::new(1.0, -2.0, 0.5),
            Vector3::new(-1.0, 4.0, 0.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, Vector3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vector3::new(1.0, 4.0, 0.5));
        assert_eq!(bounds.size(), Vector3::new(2.0, 6.0, 0.5));
        assert_eq!(bounds.center(), Vector3::new(0.0, 1.0, 0.25));
    }

    #[test]
    fn test_union_and_contains() {
        let a = BoundingBox::new(Vector3::zeros(), Vector3::repeat(1.0));
        let b = BoundingBox::new(Vector3::repeat(2.0), Vector3::repeat(3.0));
        let u = a.union(&b);
        assert_eq!(u.min, Vector3::zeros());
        assert_eq!(u.max, Vector3::repeat(3.0));
        assert!(u.contains(&Vector3::repeat(1.5)));
        assert!(!a.contains(&Vector3::repeat(1.5)));
    }

    #[test]
    fn test_transformed_translation() {
        let a = BoundingBox::new(Vector3::zeros(), Vector3::repeat(1.0));
        let t = Transform::new_translation(&Vector3::new(5.0, 0.0, 0.0));
        let moved = a.transformed(&t);
        assert_eq!(moved.min, Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(moved.max, Vector3::new(6.0, 1.0, 1.0));
    }
}
