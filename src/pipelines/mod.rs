//! Render pipelines.
//!
//! - `basic` draws lit, textured and normal mapped instanced models
//! - `flat` draws coloured 2D geometry in clip space
//! - `plasma` is the full screen plasma effect used through `Render::Custom`
//! - `light` holds the point light uniform shared by the basic pipeline

pub mod basic;
pub mod flat;
pub mod light;
pub mod plasma;

/// Pipelines owned by the context and used by the render loop.
#[derive(Debug)]
pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
    pub flat: wgpu::RenderPipeline,
}
