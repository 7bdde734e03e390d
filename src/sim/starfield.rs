//! Stars flying towards the viewer.

use cgmath::{Vector2, Vector3};

use crate::sim::XorShift;

/// Stars closer than this are respawned at the far end.
pub const NEAR: f32 = 0.1;
pub const MIN_SPEED: f32 = 2.0;
pub const MAX_SPEED: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Star {
    pub position: Vector3<f32>,
    pub speed: f32,
}

/// A star on screen: `position` in clip space, `brightness` in `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarPoint {
    pub position: Vector2<f32>,
    pub brightness: f32,
}

#[derive(Clone, Debug)]
pub struct Starfield {
    stars: Vec<Star>,
    spread: f32,
    depth: f32,
    rng: XorShift,
}

impl Starfield {
    /// `count` stars in `x, y ∈ [-spread, spread]` and `z ∈ [-depth, -NEAR]`.
    pub fn new(count: usize, spread: f32, depth: f32, seed: u64) -> Self {
        let mut field = Self {
            stars: Vec::with_capacity(count),
            spread: spread.abs(),
            depth: depth.max(NEAR * 2.0),
            rng: XorShift::new(seed),
        };
        for _ in 0..count {
            let z = field.rng.range(-field.depth, -NEAR);
            let star = field.spawn(z);
            field.stars.push(star);
        }
        field
    }

    fn spawn(&mut self, z: f32) -> Star {
        Star {
            position: Vector3::new(
                self.rng.range(-self.spread, self.spread),
                self.rng.range(-self.spread, self.spread),
                z,
            ),
            speed: self.rng.range(MIN_SPEED, MAX_SPEED),
        }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn update(&mut self, dt: f32) {
        for i in 0..self.stars.len() {
            let star = &mut self.stars[i];
            star.position.z += star.speed * dt;
            if star.position.z > -NEAR {
                let depth = self.depth;
                self.stars[i] = self.spawn(-depth);
            }
        }
    }

    /// Perspective projection of every star; `aspect` is width / height.
    pub fn project(&self, aspect: f32) -> Vec<StarPoint> {
        let aspect = if aspect > 0.0 { aspect } else { 1.0 };
        self.stars
            .iter()
            .map(|s| {
                let w = -s.position.z;
                StarPoint {
                    position: Vector2::new(s.position.x / w / aspect, s.position.y / w),
                    brightness: (1.0 - w / self.depth).clamp(0.0, 1.0),
                }
            })
            .collect()
    }
}
