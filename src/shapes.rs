//! Procedural meshes.
//!
//! Every shape winds its triangles counter-clockwise when seen from outside,
//! and carries normals, texture coordinates and tangents.

use std::f32::consts::PI;

use crate::data_structures::{mesh::MeshData, vertex::ModelVertex};

/// UV sphere centred on the origin.
///
/// `rings` counts latitude bands (at least 2) and `segments` longitude bands
/// (at least 3). The seam and pole vertices are duplicated so every vertex has
/// a unique texture coordinate, and the triangles touching a pole are emitted
/// once instead of as degenerate quads.
pub fn sphere(radius: f32, rings: u32, segments: u32) -> MeshData {
    let rings = rings.max(2);
    let segments = segments.max(3);

    let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    for r in 0..=rings {
        let phi = PI * r as f32 / rings as f32;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for s in 0..=segments {
            let theta = 2.0 * PI * s as f32 / segments as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            let normal = [sin_phi * cos_theta, cos_phi, sin_phi * sin_theta];
            vertices.push(ModelVertex::new(
                normal.map(|n| n * radius),
                normal,
                [s as f32 / segments as f32, r as f32 / rings as f32],
            ));
        }
    }

    let index = |r: u32, s: u32| r * (segments + 1) + s;
    let mut indices = Vec::with_capacity((6 * segments * (rings - 1)) as usize);
    for r in 0..rings {
        for s in 0..segments {
            let (a, b, c, d) = (index(r, s), index(r + 1, s), index(r + 1, s + 1), index(r, s + 1));
            if r != 0 {
                indices.extend_from_slice(&[a, d, b]);
            }
            if r != rings - 1 {
                indices.extend_from_slice(&[d, c, b]);
            }
        }
    }

    finish(vertices, indices)
}

/// Axis aligned cube with edge length `size`; four vertices per face.
pub fn cube(size: f32) -> MeshData {
    // Outward normal plus the face's right and up axes, with right x up = normal.
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    const CORNERS: [(f32, f32, [f32; 2]); 4] = [
        (-1.0, -1.0, [0.0, 1.0]),
        (1.0, -1.0, [1.0, 1.0]),
        (1.0, 1.0, [1.0, 0.0]),
        (-1.0, 1.0, [0.0, 0.0]),
    ];

    let h = size * 0.5;
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in FACES {
        let base = vertices.len() as u32;
        for (su, sv, uv) in CORNERS {
            let position = [0, 1, 2].map(|k| (n[k] + su * u[k] + sv * v[k]) * h);
            vertices.push(ModelVertex::new(position, n, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    finish(vertices, indices)
}

/// Flat grid in the XZ plane facing +Y, centred on the origin.
pub fn plane(width: f32, depth: f32, cols: u32, rows: u32) -> MeshData {
    let cols = cols.max(1);
    let rows = rows.max(1);
    let mut vertices = Vec::with_capacity(((cols + 1) * (rows + 1)) as usize);
    for j in 0..=rows {
        let fz = j as f32 / rows as f32;
        for i in 0..=cols {
            let fx = i as f32 / cols as f32;
            vertices.push(ModelVertex::new(
                [-width * 0.5 + width * fx, 0.0, -depth * 0.5 + depth * fz],
                [0.0, 1.0, 0.0],
                [fx, fz],
            ));
        }
    }
    finish(vertices, grid_indices(cols, rows))
}

/// Rectangle in the XY plane facing +Z, centred on the origin.
pub fn quad(width: f32, height: f32) -> MeshData {
    let (w, h) = (width * 0.5, height * 0.5);
    let n = [0.0, 0.0, 1.0];
    let vertices = vec![
        ModelVertex::new([-w, -h, 0.0], n, [0.0, 1.0]),
        ModelVertex::new([w, -h, 0.0], n, [1.0, 1.0]),
        ModelVertex::new([w, h, 0.0], n, [1.0, 0.0]),
        ModelVertex::new([-w, h, 0.0], n, [0.0, 0.0]),
    ];
    finish(vertices, vec![0, 1, 2, 0, 2, 3])
}

/// Triangle indices of a `cols` x `rows` cell grid whose vertices are laid out
/// row by row (`index = row * (cols + 1) + col`), facing +Y when rows grow
/// along +Z and columns along +X.
pub fn grid_indices(cols: u32, rows: u32) -> Vec<u32> {
    let stride = cols + 1;
    let mut indices = Vec::with_capacity((6 * cols * rows) as usize);
    for j in 0..rows {
        for i in 0..cols {
            let a = j * stride + i;
            let b = a + 1;
            let d = a + stride;
            let c = d + 1;
            indices.extend_from_slice(&[a, d, b, b, d, c]);
        }
    }
    indices
}

fn finish(vertices: Vec<ModelVertex>, indices: Vec<u32>) -> MeshData {
    let mut mesh = MeshData::new(vertices, indices);
    mesh.compute_tangents();
    mesh
}
