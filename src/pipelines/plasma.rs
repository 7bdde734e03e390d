//! Full screen plasma effect, drawn through `Render::Custom`.

use wgpu::util::DeviceExt;

use crate::{
    context::InitContext,
    pipelines::basic::{DepthTest, mk_render_pipeline},
    shader,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PlasmaUniform {
    pub time: f32,
    pub aspect: f32,
    /// Number of plasma "cells" across the screen height.
    pub scale: f32,
    _padding: f32,
}

impl PlasmaUniform {
    pub fn new(aspect: f32, scale: f32) -> Self {
        Self {
            time: 0.0,
            aspect,
            scale,
            _padding: 0.0,
        }
    }
}

pub struct PlasmaPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform: PlasmaUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl PlasmaPipeline {
    pub async fn new(ctx: &InitContext, scale: f32) -> anyhow::Result<Self> {
        let device = &ctx.device;
        let uniform = PlasmaUniform::new(ctx.aspect(), scale);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Plasma Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("plasma_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("plasma_bind_group"),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Plasma Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });
        let shader = shader::compile(device, "Plasma Shader", shader::PLASMA).await?;
        let pipeline = mk_render_pipeline(
            device,
            "Plasma Pipeline",
            &layout,
            ctx.format,
            None,
            DepthTest::Overlay,
            None,
            &[],
            &shader,
        );
        Ok(Self {
            pipeline,
            uniform,
            buffer,
            bind_group,
        })
    }

    /// Advance the animation and upload the uniform.
    pub fn update(&mut self, queue: &wgpu::Queue, dt: f32, aspect: f32) {
        self.uniform.time += dt;
        self.uniform.aspect = aspect;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}
