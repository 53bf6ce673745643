// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Facet group tessellation
//!
//! Each polygon is projected onto its own plane and triangulated with
//! earcutr. The first contour of a polygon is its outer boundary, any further
//! contours are holes.

use crate::{Error, Point2, Point3, Result, Vector3};
use reveal_lite_core::{FacetGroup, Mesh, Polygon};

/// Check if a polygon is convex (all cross products have same sign)
#[inline]
fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() > 1e-10 {
            let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false;
            }
        }
    }

    true
}

/// Triangulate a simple polygon (no holes).
/// Returns triangle indices into the input points.
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();

    if n < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }

    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }

    // Convex outlines fan out from the first vertex
    if n <= 8 && is_convex(points) {
        return Ok((1..n - 1).flat_map(|i| [0, i, i + 1]).collect());
    }

    let vertices: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    earcutr::earcut(&vertices, &[], 2).map_err(|e| Error::TriangulationError(format!("{:?}", e)))
}

/// Triangulate a polygon with holes.
/// Returns triangle indices into the combined vertex array (outer + all holes).
pub fn triangulate_polygon_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    if outer.len() < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points in outer boundary".to_string(),
        ));
    }

    if holes.is_empty() {
        return triangulate_polygon(outer);
    }

    let total_points = outer.len() + holes.iter().map(Vec::len).sum::<usize>();
    let mut vertices = Vec::with_capacity(total_points * 2);
    vertices.extend(outer.iter().flat_map(|p| [p.x, p.y]));

    let mut hole_indices = Vec::with_capacity(holes.len());
    for hole in holes {
        hole_indices.push(vertices.len() / 2);
        vertices.extend(hole.iter().flat_map(|p| [p.x, p.y]));
    }

    earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))
}

/// Orthonormal in-plane basis `(u, v)` with `u × v == normal`
fn plane_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    // Axis least parallel to the normal keeps the cross product stable
    let reference = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
        Vector3::x()
    } else if normal.y.abs() <= normal.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };

    let u_axis = normal.cross(&reference).normalize();
    let v_axis = normal.cross(&u_axis).normalize();
    (u_axis, v_axis)
}

/// Project 3D points onto the plane through `origin` spanned by `u`, `v`
#[inline]
pub fn project_to_2d(
    points_3d: &[Point3<f64>],
    u_axis: &Vector3<f64>,
    v_axis: &Vector3<f64>,
    origin: &Point3<f64>,
) -> Vec<Point2<f64>> {
    points_3d
        .iter()
        .map(|p| {
            let v = p - origin;
            Point2::new(v.dot(u_axis), v.dot(v_axis))
        })
        .collect()
}

/// Polygon normal by Newell's method, `None` for degenerate outlines
pub fn calculate_polygon_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let mut normal = Vector3::<f64>::zeros();
    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal.try_normalize(1e-12)
}

/// Append one polygon to `mesh`. Degenerate polygons are skipped.
fn tessellate_polygon(polygon: &Polygon, mesh: &mut Mesh) -> Result<()> {
    let Some(outer) = polygon.contours.first() else {
        return Ok(());
    };

    let to_point = |(p, _): &(Vector3<f32>, Vector3<f32>)| {
        Point3::new(f64::from(p.x), f64::from(p.y), f64::from(p.z))
    };
    let outer_3d: Vec<Point3<f64>> = outer.vertices.iter().map(to_point).collect();

    let Some(normal) = calculate_polygon_normal(&outer_3d) else {
        tracing::debug!(vertex_count = outer_3d.len(), "Skipping degenerate polygon");
        return Ok(());
    };

    let (u_axis, v_axis) = plane_basis(&normal);
    let origin = outer_3d[0];
    let outer_2d = project_to_2d(&outer_3d, &u_axis, &v_axis, &origin);

    let holes_2d: Vec<Vec<Point2<f64>>> = polygon.contours[1..]
        .iter()
        .filter(|hole| hole.len() >= 3)
        .map(|hole| {
            let hole_3d: Vec<Point3<f64>> = hole.vertices.iter().map(to_point).collect();
            project_to_2d(&hole_3d, &u_axis, &v_axis, &origin)
        })
        .collect();

    let indices = triangulate_polygon_with_holes(&outer_2d, &holes_2d)?;

    // Combined vertex order matches the earcut input: outer, then kept holes
    let base = mesh.vertex_count() as u32;
    let points_2d: Vec<Point2<f64>> = outer_2d
        .iter()
        .chain(holes_2d.iter().flatten())
        .copied()
        .collect();
    for contour in std::iter::once(outer).chain(polygon.contours[1..].iter().filter(|h| h.len() >= 3)) {
        for (position, vertex_normal) in &contour.vertices {
            mesh.add_vertex(*position, *vertex_normal);
        }
    }

    for triangle in indices.chunks_exact(3) {
        let (a, b, c) = (triangle[0], triangle[1], triangle[2]);
        let (pa, pb, pc) = (&points_2d[a], &points_2d[b], &points_2d[c]);
        let area = (pb.x - pa.x) * (pc.y - pa.y) - (pb.y - pa.y) * (pc.x - pa.x);

        // Counter-clockwise in the (u, v) plane faces along the polygon normal
        if area >= 0.0 {
            mesh.add_triangle(base + a as u32, base + b as u32, base + c as u32);
        } else {
            mesh.add_triangle(base + a as u32, base + c as u32, base + b as u32);
        }
    }

    Ok(())
}

/// Triangulate every polygon of a facet group into one mesh.
///
/// Vertex normals are taken from the contours; triangles are wound
/// counter-clockwise around the polygon's Newell normal. Non-finite vertex
/// data is an error.
pub fn tessellate(group: &FacetGroup) -> Result<Mesh> {
    if !group.is_finite() {
        return Err(Error::TriangulationError(
            "Facet group has non-finite vertex data".to_string(),
        ));
    }

    let vertex_count = group.vertex_count();
    let mut mesh = Mesh::with_capacity(vertex_count, vertex_count * 3);

    for polygon in &group.polygons {
        tessellate_polygon(polygon, &mut mesh)?;
    }

    Ok(mesh)
}
