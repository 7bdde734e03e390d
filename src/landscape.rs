//! Heightmaps and the terrain meshes built from them.

use image::DynamicImage;

use crate::{
    data_structures::{mesh::MeshData, vertex::ModelVertex},
    shapes::grid_indices,
    sim::XorShift,
};

/// Largest `detail` accepted by [`Heightmap::generate`] (4097 x 4097 samples).
pub const MAX_DETAIL: u32 = 12;

/// Row-major grid of heights in `0..=1`; `heights[z * width + x]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Heightmap {
    pub width: usize,
    pub depth: usize,
    pub heights: Vec<f32>,
}

impl Heightmap {
    pub fn new(width: usize, depth: usize, heights: Vec<f32>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            width >= 2 && depth >= 2,
            "heightmap needs at least 2x2 samples, got {}x{}",
            width,
            depth
        );
        anyhow::ensure!(
            heights.len() == width * depth,
            "heightmap of {}x{} needs {} samples, got {}",
            width,
            depth,
            width * depth,
            heights.len()
        );
        Ok(Self { width, depth, heights })
    }

    /// Luminance of every pixel, scaled to `0..=1`.
    pub fn from_image(img: &DynamicImage) -> anyhow::Result<Self> {
        let luma = img.to_luma8();
        let (w, h) = luma.dimensions();
        let heights = luma.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Self::new(w as usize, h as usize, heights)
    }

    /// Diamond-square terrain on a `(2^detail + 1)` square grid.
    ///
    /// `roughness` scales the random displacement of each finer level; values
    /// around 0.5 give rolling hills, values near 1 jagged peaks. The result is
    /// normalised to `0..=1` and depends only on the arguments.
    pub fn generate(detail: u32, roughness: f32, seed: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(
            (1..=MAX_DETAIL).contains(&detail),
            "detail must be within 1..={}, got {}",
            MAX_DETAIL,
            detail
        );
        let size = (1usize << detail) + 1;
        let mut rng = XorShift::new(seed);
        let mut h = vec![0.0f32; size * size];
        let at = |x: usize, z: usize| z * size + x;

        for (x, z) in [(0, 0), (size - 1, 0), (0, size - 1), (size - 1, size - 1)] {
            h[at(x, z)] = rng.range(-1.0, 1.0);
        }

        let mut step = size - 1;
        let mut scale = 1.0f32;
        while step > 1 {
            let half = step / 2;

            // Diamond: centre of each square.
            for z in (half..size).step_by(step) {
                for x in (half..size).step_by(step) {
                    let avg = (h[at(x - half, z - half)]
                        + h[at(x + half, z - half)]
                        + h[at(x - half, z + half)]
                        + h[at(x + half, z + half)])
                        * 0.25;
                    h[at(x, z)] = avg + rng.range(-scale, scale);
                }
            }

            // Square: edge midpoints, averaging the neighbours that exist.
            for z in (0..size).step_by(half) {
                let start = if (z / half) % 2 == 0 { half } else { 0 };
                for x in (start..size).step_by(step) {
                    let mut sum = 0.0;
                    let mut n = 0.0;
                    if x >= half {
                        sum += h[at(x - half, z)];
                        n += 1.0;
                    }
                    if x + half < size {
                        sum += h[at(x + half, z)];
                        n += 1.0;
                    }
                    if z >= half {
                        sum += h[at(x, z - half)];
                        n += 1.0;
                    }
                    if z + half < size {
                        sum += h[at(x, z + half)];
                        n += 1.0;
                    }
                    h[at(x, z)] = sum / n + rng.range(-scale, scale);
                }
            }

            step = half;
            scale *= roughness;
        }

        normalise(&mut h);
        Self::new(size, size, h)
    }

    /// Nearest sample; coordinates outside the grid are clamped.
    pub fn sample(&self, x: f32, z: f32) -> f32 {
        let xi = (x.round().max(0.0) as usize).min(self.width - 1);
        let zi = (z.round().max(0.0) as usize).min(self.depth - 1);
        self.heights[zi * self.width + xi]
    }

    /// Bilinear interpolation in grid coordinates, clamped to the grid.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let x = x.clamp(0.0, (self.width - 1) as f32);
        let z = z.clamp(0.0, (self.depth - 1) as f32);
        let x0 = (x.floor() as usize).min(self.width - 2);
        let z0 = (z.floor() as usize).min(self.depth - 2);
        let (fx, fz) = (x - x0 as f32, z - z0 as f32);
        let h = |x: usize, z: usize| self.heights[z * self.width + x];
        let top = h(x0, z0) * (1.0 - fx) + h(x0 + 1, z0) * fx;
        let bottom = h(x0, z0 + 1) * (1.0 - fx) + h(x0 + 1, z0 + 1) * fx;
        top * (1.0 - fz) + bottom * fz
    }

    /// Extent of the mesh produced by [`Self::to_mesh`] along x and z.
    pub fn world_size(&self, cell_size: f32) -> (f32, f32) {
        (
            (self.width - 1) as f32 * cell_size,
            (self.depth - 1) as f32 * cell_size,
        )
    }

    /// Terrain height under a world position of a mesh built with the same
    /// `cell_size` and `height_scale`.
    pub fn height_at_world(&self, x: f32, z: f32, cell_size: f32, height_scale: f32) -> f32 {
        let (w, d) = self.world_size(cell_size);
        self.height_at((x + w * 0.5) / cell_size, (z + d * 0.5) / cell_size) * height_scale
    }

    /// Grid mesh centred on the origin in the XZ plane, one vertex per sample.
    pub fn to_mesh(&self, cell_size: f32, height_scale: f32) -> MeshData {
        let (w, d) = self.world_size(cell_size);
        let mut vertices = Vec::with_capacity(self.heights.len());
        for z in 0..self.depth {
            for x in 0..self.width {
                let u = x as f32 / (self.width - 1) as f32;
                let v = z as f32 / (self.depth - 1) as f32;
                vertices.push(ModelVertex::new(
                    [
                        -w * 0.5 + x as f32 * cell_size,
                        self.heights[z * self.width + x] * height_scale,
                        -d * 0.5 + z as f32 * cell_size,
                    ],
                    [0.0, 1.0, 0.0],
                    [u, v],
                ));
            }
        }
        let indices = grid_indices((self.width - 1) as u32, (self.depth - 1) as u32);
        let mut mesh = MeshData::new(vertices, indices);
        mesh.compute_normals();
        mesh.compute_tangents();
        mesh
    }
}

fn normalise(heights: &mut [f32]) {
    let (min, max) = heights
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)));
    let range = max - min;
    if range <= f32::EPSILON {
        heights.iter_mut().for_each(|h| *h = 0.0);
    } else {
        heights.iter_mut().for_each(|h| *h = (*h - min) / range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_maps_normalise_to_zero() {
        let mut h = vec![0.3; 9];
        normalise(&mut h);
        assert!(h.iter().all(|&v| v == 0.0));
    }
}
