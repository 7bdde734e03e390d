use image::{Rgba, RgbaImage};

use crate::landscape::Heightmap;

/// Tangent space normal map of a heightmap, one texel per sample.
///
/// Slopes come from a Sobel filter (edges are clamped) scaled by `strength`;
/// the normal is packed as `(n * 0.5 + 0.5) * 255` with `z` pointing out of
/// the surface, so a flat map is `(128, 128, 255)`. The `y` channel follows
/// texture space, where `v` grows downwards.
pub fn normal_map_from_heights(heights: &Heightmap, strength: f32) -> RgbaImage {
    let (w, d) = (heights.width, heights.depth);
    let at = |x: isize, z: isize| {
        let x = x.clamp(0, w as isize - 1) as usize;
        let z = z.clamp(0, d as isize - 1) as usize;
        heights.heights[z * w + x]
    };

    RgbaImage::from_fn(w as u32, d as u32, |x, z| {
        let (x, z) = (x as isize, z as isize);
        let dx = (at(x + 1, z - 1) + 2.0 * at(x + 1, z) + at(x + 1, z + 1))
            - (at(x - 1, z - 1) + 2.0 * at(x - 1, z) + at(x - 1, z + 1));
        let dy = (at(x - 1, z + 1) + 2.0 * at(x, z + 1) + at(x + 1, z + 1))
            - (at(x - 1, z - 1) + 2.0 * at(x, z - 1) + at(x + 1, z - 1));
        let n = [-dx * strength, dy * strength, 1.0];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        let [r, g, b] = n.map(|c| ((c / len * 0.5 + 0.5) * 255.0).round() as u8);
        Rgba([r, g, b, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_heights_point_straight_up() {
        let flat = Heightmap::new(3, 3, vec![0.5; 9]).unwrap();
        let img = normal_map_from_heights(&flat, 4.0);
        assert!(img.pixels().all(|p| p.0 == [128, 128, 255, 255]));
    }

    #[test]
    fn rising_x_tilts_towards_negative_x() {
        let ramp = Heightmap::new(3, 3, vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0, 0.0, 0.5, 1.0]).unwrap();
        let img = normal_map_from_heights(&ramp, 1.0);
        let centre = img.get_pixel(1, 1).0;
        assert!(centre[0] < 128);
        assert_eq!(centre[1], 128);
    }
}
