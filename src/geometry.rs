//! Procedural mesh generation.
//!
//! Generators build [`MeshData`] on the CPU — pure vertex/index math with no
//! GPU involvement — and the matching `*_mesh` helpers upload the result via
//! [`Mesh::from_data`]. The split keeps generation unit-testable and keeps
//! all GPU buffer creation inside scene construction.
//!
//! The unit sphere (radius 1) doubles as the point-light volume: scaled by a
//! light's falloff range it bounds exactly the region where attenuation is
//! non-zero. The cube doubles as the directional-light volume when scaled
//! past the scene bounds.

use crate::gpu::GpuContext;
use crate::mesh::{Mesh, MeshData};
use std::rc::Rc;

/// Generates an axis-aligned cube spanning ±`half_extent` on each axis.
///
/// Each face has its own four vertices for flat normals, 24 vertices and 12
/// triangles total.
pub fn cube(half_extent: f32) -> MeshData {
    let h = half_extent;

    #[rustfmt::skip]
    let positions = vec![
        // Front face (Z+)
        [-h, -h,  h], [ h, -h,  h], [ h,  h,  h], [-h,  h,  h],
        // Back face (Z-)
        [ h, -h, -h], [-h, -h, -h], [-h,  h, -h], [ h,  h, -h],
        // Top face (Y+)
        [-h,  h,  h], [ h,  h,  h], [ h,  h, -h], [-h,  h, -h],
        // Bottom face (Y-)
        [-h, -h, -h], [ h, -h, -h], [ h, -h,  h], [-h, -h,  h],
        // Right face (X+)
        [ h, -h,  h], [ h, -h, -h], [ h,  h, -h], [ h,  h,  h],
        // Left face (X-)
        [-h, -h, -h], [-h, -h,  h], [-h,  h,  h], [-h,  h, -h],
    ];

    #[rustfmt::skip]
    let face_normals: [[f32; 3]; 6] = [
        [ 0.0,  0.0,  1.0],
        [ 0.0,  0.0, -1.0],
        [ 0.0,  1.0,  0.0],
        [ 0.0, -1.0,  0.0],
        [ 1.0,  0.0,  0.0],
        [-1.0,  0.0,  0.0],
    ];

    let mut normals = Vec::with_capacity(24);
    let mut tex_coords = Vec::with_capacity(24);
    for normal in face_normals {
        for uv in [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]] {
            normals.push(normal);
            tex_coords.push(uv);
        }
    }

    let mut indices = Vec::with_capacity(36);
    for face in 0..6u32 {
        let base = face * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    MeshData {
        positions,
        normals: Some(normals),
        colors: None,
        tex_coords: Some(tex_coords),
        indices,
    }
}

/// Generates a UV sphere of radius 1 centered at the origin.
///
/// `segments` divides the equator, `rings` divides pole to pole. Vertex
/// count is `(segments + 1) × (rings + 1)`.
pub fn sphere(segments: u32, rings: u32) -> MeshData {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut tex_coords = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let phi = std::f32::consts::PI * ring as f32 / rings as f32;
        let y = phi.cos();
        let ring_radius = phi.sin();

        for seg in 0..=segments {
            let theta = 2.0 * std::f32::consts::PI * seg as f32 / segments as f32;
            let x = ring_radius * theta.cos();
            let z = ring_radius * theta.sin();

            positions.push([x, y, z]);
            normals.push([x, y, z]);
            tex_coords.push([seg as f32 / segments as f32, ring as f32 / rings as f32]);
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let current = ring * (segments + 1) + seg;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }

    MeshData {
        positions,
        normals: Some(normals),
        colors: None,
        tex_coords: Some(tex_coords),
        indices,
    }
}

/// Generates a flat quad in the XY plane at z = 0 with the given edges.
///
/// Carries positions and UVs only (no normals); UV (0,0) maps to the
/// top-left corner so sampled images appear upright.
pub fn quad(left: f32, right: f32, bottom: f32, top: f32) -> MeshData {
    let positions = vec![
        [left, bottom, 0.0],
        [right, bottom, 0.0],
        [right, top, 0.0],
        [left, top, 0.0],
    ];

    let tex_coords = vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    MeshData {
        positions,
        normals: None,
        colors: None,
        tex_coords: Some(tex_coords),
        indices: vec![0, 1, 2, 2, 3, 0],
    }
}

/// Generates a four-sided pyramid: square base spanning ±`half_extent` at
/// y = 0, apex at `(0, height, 0)`. Flat side normals, downward base normal.
pub fn pyramid(half_extent: f32, height: f32) -> MeshData {
    let h = half_extent;
    let apex = [0.0f32, height, 0.0];
    let base = [[-h, 0.0, h], [h, 0.0, h], [h, 0.0, -h], [-h, 0.0, -h]];

    let mut positions = Vec::with_capacity(20);
    let mut normals = Vec::with_capacity(20);
    let mut tex_coords = Vec::with_capacity(20);
    let mut indices = Vec::with_capacity(18);

    // Four triangular sides, one normal each.
    for side in 0..4 {
        let a = base[side];
        let b = base[(side + 1) % 4];
        let edge1 = glam::Vec3::from(b) - glam::Vec3::from(a);
        let edge2 = glam::Vec3::from(apex) - glam::Vec3::from(a);
        let normal = edge1.cross(edge2).normalize().to_array();

        let index_base = positions.len() as u32;
        positions.extend_from_slice(&[a, b, apex]);
        normals.extend_from_slice(&[normal, normal, normal]);
        tex_coords.extend_from_slice(&[[0.0, 1.0], [1.0, 1.0], [0.5, 0.0]]);
        indices.extend_from_slice(&[index_base, index_base + 1, index_base + 2]);
    }

    // Base, facing -Y. Wound clockwise from above so it is CCW from below.
    let index_base = positions.len() as u32;
    positions.extend_from_slice(&[base[0], base[3], base[2], base[1]]);
    for uv in [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]] {
        normals.push([0.0, -1.0, 0.0]);
        tex_coords.push(uv);
    }
    indices.extend_from_slice(&[
        index_base,
        index_base + 1,
        index_base + 2,
        index_base + 2,
        index_base + 3,
        index_base,
    ]);

    MeshData {
        positions,
        normals: Some(normals),
        colors: None,
        tex_coords: Some(tex_coords),
        indices,
    }
}

/// Uploads a cube mesh.
pub fn cube_mesh(gpu: &GpuContext, half_extent: f32) -> Rc<Mesh> {
    Mesh::from_data(gpu, &cube(half_extent), "Cube")
}

/// Uploads a unit-sphere mesh.
pub fn sphere_mesh(gpu: &GpuContext, segments: u32, rings: u32) -> Rc<Mesh> {
    Mesh::from_data(gpu, &sphere(segments, rings), "Sphere")
}

/// Uploads a quad mesh.
pub fn quad_mesh(gpu: &GpuContext, left: f32, right: f32, bottom: f32, top: f32) -> Rc<Mesh> {
    Mesh::from_data(gpu, &quad(left, right, bottom, top), "Quad")
}

/// Uploads a pyramid mesh.
pub fn pyramid_mesh(gpu: &GpuContext, half_extent: f32, height: f32) -> Rc<Mesh> {
    Mesh::from_data(gpu, &pyramid(half_extent, height), "Pyramid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn assert_indices_in_range(data: &MeshData) {
        let count = data.vertex_count() as u32;
        assert!(data.indices.iter().all(|&i| i < count));
    }

    fn assert_unit_normals(data: &MeshData) {
        let normals = data.normals.as_ref().expect("geometry should carry normals");
        for n in normals {
            assert_relative_eq!(Vec3::from(*n).length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn cube_has_flat_shaded_faces() {
        let data = cube(0.5);
        assert_eq!(data.vertex_count(), 24);
        assert_eq!(data.indices.len(), 36);
        assert_indices_in_range(&data);
        assert_unit_normals(&data);

        for p in &data.positions {
            for c in p {
                assert_relative_eq!(c.abs(), 0.5);
            }
        }
    }

    #[test]
    fn cube_respects_half_extent() {
        let data = cube(2.0);
        let max = data
            .positions
            .iter()
            .flat_map(|p| p.iter())
            .fold(0.0f32, |acc, &c| acc.max(c.abs()));
        assert_relative_eq!(max, 2.0);
    }

    #[test]
    fn sphere_is_unit_radius() {
        let data = sphere(16, 8);
        assert_eq!(data.vertex_count(), 17 * 9);
        assert_indices_in_range(&data);
        assert_unit_normals(&data);

        for p in &data.positions {
            assert_relative_eq!(Vec3::from(*p).length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn quad_spans_requested_edges() {
        let data = quad(-1.0, 1.0, -0.25, 0.25);
        assert_eq!(data.vertex_count(), 4);
        assert_eq!(data.indices.len(), 6);
        assert!(data.normals.is_none());

        let uvs = data.tex_coords.as_ref().unwrap();
        // Top-left vertex carries UV (0, 0) so images sample upright.
        assert_eq!(data.positions[3], [-1.0, 0.25, 0.0]);
        assert_eq!(uvs[3], [0.0, 0.0]);
    }

    #[test]
    fn pyramid_apex_and_base() {
        let data = pyramid(0.5, 2.0);
        assert_indices_in_range(&data);
        assert_unit_normals(&data);

        let apex_count = data
            .positions
            .iter()
            .filter(|p| **p == [0.0, 2.0, 0.0])
            .count();
        assert_eq!(apex_count, 4);

        // Side normals point away from the axis and upward-free of the base.
        let normals = data.normals.as_ref().unwrap();
        for n in &normals[0..12] {
            assert!(Vec3::from(*n).y >= 0.0);
        }
        for n in &normals[12..16] {
            assert_eq!(*n, [0.0, -1.0, 0.0]);
        }
    }
}
