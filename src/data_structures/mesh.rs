//! CPU side triangle meshes.
//!
//! Procedural shapes, MD2 frames and landscapes all produce a [`MeshData`],
//! which can be uploaded with `resources::upload_mesh` or turned into a
//! triangle soup for the collision system.

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, Point3, SquareMatrix, Transform, Vector2, Vector3};

use crate::{collision::Aabb, data_structures::vertex::ModelVertex, geometry::Triangle};

/// Indexed triangle list. Every three indices form one counter-clockwise triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<ModelVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Checks that the index list is made of whole triangles that only refer
    /// to existing vertices.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.indices.len() % 3 == 0,
            "index count {} is not a multiple of 3",
            self.indices.len()
        );
        if let Some(bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            anyhow::bail!(
                "index {} out of range for {} vertices",
                bad,
                self.vertices.len()
            );
        }
        Ok(())
    }

    fn position(&self, index: u32) -> Point3<f32> {
        self.vertices[index as usize].position.into()
    }

    /// One triangle per index triple, in index order.
    pub fn triangles(&self) -> Vec<Triangle> {
        self.indices
            .chunks_exact(3)
            .map(|c| Triangle::new(self.position(c[0]), self.position(c[1]), self.position(c[2])))
            .collect()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        let points: Vec<Point3<f32>> = self.vertices.iter().map(|v| v.position.into()).collect();
        Aabb::from_points(&points)
    }

    /// Smooth, area weighted vertex normals. Vertices that no triangle uses
    /// get a zero normal.
    pub fn compute_normals(&mut self) {
        let mut sums = vec![Vector3::new(0.0_f32, 0.0, 0.0); self.vertices.len()];
        for c in self.indices.chunks_exact(3) {
            // The unnormalised cross product is proportional to the area.
            let n = Triangle::new(self.position(c[0]), self.position(c[1]), self.position(c[2])).cross();
            for &i in c {
                sums[i as usize] += n;
            }
        }
        for (v, n) in self.vertices.iter_mut().zip(sums) {
            v.normal = if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0; 3]
            };
        }
    }

    /// Per-vertex tangents and bitangents for normal mapping.
    ///
    /// Each triangle solves
    ///     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
    ///     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
    /// and the results are averaged over the triangles sharing a vertex.
    /// Triangles without a usable UV mapping contribute nothing.
    pub fn compute_tangents(&mut self) {
        let zero = Vector3::new(0.0_f32, 0.0, 0.0);
        let mut tangents = vec![zero; self.vertices.len()];
        let mut bitangents = vec![zero; self.vertices.len()];
        let mut triangles_included = vec![0_u32; self.vertices.len()];

        for c in self.indices.chunks_exact(3) {
            let [v0, v1, v2] = [0, 1, 2].map(|k| self.vertices[c[k] as usize]);

            let pos0: Vector3<f32> = v0.position.into();
            let pos1: Vector3<f32> = v1.position.into();
            let pos2: Vector3<f32> = v2.position.into();
            let uv0: Vector2<f32> = v0.tex_coords.into();
            let uv1: Vector2<f32> = v1.tex_coords.into();
            let uv2: Vector2<f32> = v2.tex_coords.into();

            let delta_pos1 = pos1 - pos0;
            let delta_pos2 = pos2 - pos0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // Flipped to match wgpu's texture coordinate system, where v grows downwards.
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for &i in c {
                tangents[i as usize] += tangent;
                bitangents[i as usize] += bitangent;
                triangles_included[i as usize] += 1;
            }
        }

        for (i, v) in self.vertices.iter_mut().enumerate() {
            let n = triangles_included[i];
            if n == 0 {
                v.tangent = [0.0; 3];
                v.bitangent = [0.0; 3];
                continue;
            }
            let denom = 1.0 / n as f32;
            v.tangent = (tangents[i] * denom).into();
            v.bitangent = (bitangents[i] * denom).into();
        }
    }

    /// Copy of the mesh with `matrix` applied to positions and directions.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> MeshData {
        let linear = Matrix3::from_cols(matrix.x.truncate(), matrix.y.truncate(), matrix.z.truncate());
        let normal_matrix = linear
            .invert()
            .map(|m| m.transpose())
            .unwrap_or(linear);
        let direction = |m: &Matrix3<f32>, v: [f32; 3]| -> [f32; 3] {
            let d = m * Vector3::from(v);
            if d.magnitude2() > 0.0 {
                d.normalize().into()
            } else {
                [0.0; 3]
            }
        };
        let vertices = self
            .vertices
            .iter()
            .map(|v| ModelVertex {
                position: matrix.transform_point(v.position.into()).into(),
                tex_coords: v.tex_coords,
                normal: direction(&normal_matrix, v.normal),
                tangent: direction(&linear, v.tangent),
                bitangent: direction(&linear, v.bitangent),
            })
            .collect();
        MeshData {
            vertices,
            indices: self.indices.clone(),
        }
    }

    /// Appends `other`, offsetting its indices.
    pub fn append(&mut self, other: &MeshData) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}
