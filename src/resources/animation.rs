use crate::models::AnimationRange;

/// Loops an MD2 animation range at a fixed frame rate.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyframeAnimation {
    pub range: AnimationRange,
    pub fps: f32,
    /// Seconds since the start of the current loop.
    pub time: f32,
}

impl KeyframeAnimation {
    pub fn new(range: AnimationRange, fps: f32) -> Self {
        Self {
            range,
            fps: fps.max(f32::EPSILON),
            time: 0.0,
        }
    }

    fn duration(&self) -> f32 {
        self.range.frame_count() as f32 / self.fps
    }

    pub fn advance(&mut self, dt: f32) {
        let duration = self.duration();
        if duration > 0.0 {
            self.time = (self.time + dt.max(0.0)).rem_euclid(duration);
        }
    }

    /// The two frames to blend and the blend factor; the last frame blends
    /// back into the first.
    pub fn sample(&self) -> (usize, usize, f32) {
        let count = self.range.frame_count();
        if count <= 1 {
            return (self.range.start, self.range.start, 0.0);
        }
        let position = self.time * self.fps;
        let offset = (position.floor() as usize).min(count - 1);
        let t = (position - offset as f32).clamp(0.0, 1.0);
        let a = self.range.start + offset;
        let b = self.range.start + (offset + 1) % count;
        (a, b, t)
    }
}
