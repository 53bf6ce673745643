// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Affine transform solving from point correspondences.
//!
//! Four affinely independent source points and their images fix a unique
//! affine transform. Building the homogeneous point matrices `A` and `B`
//! (one point per column) gives `M * A = B`, so `M = B * A⁻¹`. The solve runs
//! in f64 and the result is narrowed to f32.

use nalgebra::{Matrix4, Point3, Vector3};
use reveal_lite_core::Transform;

/// Relative determinant threshold below which four points count as coplanar.
///
/// The determinant of the three difference vectors is compared against the
/// product of their lengths, which makes the test independent of scale.
pub const DETERMINANT_TOLERANCE: f64 = 1e-5;

/// Relative cross-product threshold below which three points count as collinear
pub const COLLINEAR_TOLERANCE: f64 = 1e-5;

#[inline]
fn to_f64(v: &Vector3<f32>) -> Vector3<f64> {
    v.cast::<f64>()
}

/// True when `p2` does not lie on the line through `p0` and `p1`
pub fn are_non_collinear(p0: &Vector3<f32>, p1: &Vector3<f32>, p2: &Vector3<f32>) -> bool {
    let d1 = to_f64(p1) - to_f64(p0);
    let d2 = to_f64(p2) - to_f64(p0);
    let scale = d1.norm() * d2.norm();
    scale > 0.0 && d1.cross(&d2).norm() > COLLINEAR_TOLERANCE * scale
}

/// True when the four points span 3D space (non-zero tetrahedron volume)
pub fn are_affinely_independent(points: &[Vector3<f32>; 4]) -> bool {
    let origin = to_f64(&points[0]);
    let d1 = to_f64(&points[1]) - origin;
    let d2 = to_f64(&points[2]) - origin;
    let d3 = to_f64(&points[3]) - origin;
    let scale = d1.norm() * d2.norm() * d3.norm();
    let determinant = d1.cross(&d2).dot(&d3);
    scale > 0.0 && determinant.is_finite() && determinant.abs() > DETERMINANT_TOLERANCE * scale
}

/// Homogeneous matrix with one point per column
fn homogeneous_columns(points: &[Vector3<f32>; 4]) -> Matrix4<f64> {
    Matrix4::from_fn(|row, col| if row == 3 { 1.0 } else { points[col][row] as f64 })
}

/// Compute the affine transform `M` with `M * source[i] == target[i]`.
///
/// Returns `None` when the source points are degenerate (coplanar, collinear
/// or coincident) because no unique transform exists.
pub fn try_calculate_transform(
    source: &[Vector3<f32>; 4],
    target: &[Vector3<f32>; 4],
) -> Option<Transform> {
    if !are_affinely_independent(source) {
        return None;
    }

    let source_inverse = homogeneous_columns(source).try_inverse()?;
    let solved = homogeneous_columns(target) * source_inverse;
    let transform: Transform = solved.cast::<f32>();

    transform.iter().all(|v| v.is_finite()).then_some(transform)
}

/// Apply `transform` to a position
#[inline]
pub fn transform_position(transform: &Transform, position: &Vector3<f32>) -> Vector3<f32> {
    transform.transform_point(&Point3::from(*position)).coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Translation3};

    fn tetrahedron() -> [Vector3<f32>; 4] {
        [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_identity_for_same_points() {
        let points = tetrahedron();
        let transform = try_calculate_transform(&points, &points).unwrap();
        assert_relative_eq!(transform, Transform::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_recovers_known_affine_transform() {
        let expected = Translation3::new(3.0, -2.0, 10.0).to_homogeneous()
            * Rotation3::from_euler_angles(0.3, 1.1, -0.7).to_homogeneous()
            * Transform::new_nonuniform_scaling(&Vector3::new(2.0, 0.5, 3.0));

        let source = tetrahedron();
        let target = source.map(|p| transform_position(&expected, &p));
        let transform = try_calculate_transform(&source, &target).unwrap();

        assert_relative_eq!(transform, expected, epsilon = 1e-4);
    }

    #[test]
    fn test_coplanar_source_has_no_transform() {
        let source = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ];
        assert!(try_calculate_transform(&source, &tetrahedron()).is_none());
    }

    #[test]
    fn test_collinear_detection() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(1.0, 1.0, 1.0);
        assert!(!are_non_collinear(&a, &b, &Vector3::new(2.0, 2.0, 2.0)));
        assert!(!are_non_collinear(&a, &a, &b));
        assert!(are_non_collinear(&a, &b, &Vector3::new(2.0, 2.0, 2.5)));
    }

    #[test]
    fn test_scale_independent_degeneracy() {
        // Tiny but well-shaped tetrahedron is still independent
        let tiny = tetrahedron().map(|p| p * 1e-3);
        assert!(are_affinely_independent(&tiny));
    }

    #[test]
    fn test_non_finite_points_rejected() {
        let mut source = tetrahedron();
        source[3].z = f32::NAN;
        assert!(try_calculate_transform(&source, &tetrahedron()).is_none());
    }
}
