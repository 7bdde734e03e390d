//! Unlit 2D geometry in clip space (x and y in -1..1).
//!
//! Vertices use the [`FLAT_FORMAT`] layout built with a
//! [`VertexBufferBuilder`]. The flat pipeline draws on top of everything
//! rendered before it in the same pass.

use cgmath::Vector2;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::vertex::{VertexBufferBuilder, VertexFormat, VertexInput},
    geometry::Rect,
    pipelines::basic::{DepthTest, mk_render_pipeline},
    shader,
};

pub const FLAT_FORMAT: VertexFormat = VertexFormat::POSITION.union(VertexFormat::COLOR);

pub async fn mk_flat_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> anyhow::Result<wgpu::RenderPipeline> {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Flat Pipeline Layout"),
        bind_group_layouts: &[],
        immediate_size: 0,
    });
    let shader = shader::compile(device, "Flat Shader", shader::FLAT).await?;
    let attributes = FLAT_FORMAT.attributes(0);
    let layout_desc = wgpu::VertexBufferLayout {
        array_stride: FLAT_FORMAT.stride(),
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &attributes,
    };
    Ok(mk_render_pipeline(
        device,
        "Flat Pipeline",
        &layout,
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        DepthTest::Overlay,
        None,
        &[layout_desc],
        &shader,
    ))
}

/// Collects coloured rectangles and points into one indexed triangle list.
#[derive(Clone, Debug)]
pub struct FlatBatch {
    vertices: VertexBufferBuilder,
    indices: Vec<u32>,
}

impl FlatBatch {
    pub fn new() -> Self {
        Self {
            vertices: VertexBufferBuilder::with_format(FLAT_FORMAT),
            indices: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// `rect` in clip space.
    pub fn rect(&mut self, rect: &Rect, color: [f32; 4]) {
        let base = self.vertices.vertex_count() as u32;
        for (x, y) in [
            (rect.min.x, rect.min.y),
            (rect.max.x, rect.min.y),
            (rect.max.x, rect.max.y),
            (rect.min.x, rect.max.y),
        ] {
            self.vertices.push(&VertexInput {
                position: [x, y, 0.0],
                color,
                ..Default::default()
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Square of side `size` centred on `center`, in clip space.
    pub fn point(&mut self, center: Vector2<f32>, size: f32, color: [f32; 4]) {
        self.rect(&Rect::from_center(center, Vector2::new(size, size)), color);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.vertex_count()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        self.vertices.as_bytes()
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

impl Default for FlatBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU buffers for a [`FlatBatch`] whose size never exceeds `capacity` rectangles.
#[derive(Debug)]
pub struct FlatBuffers {
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub amount: u32,
    capacity: usize,
}

impl FlatBuffers {
    pub fn new(device: &wgpu::Device, capacity: usize) -> Self {
        let vertex = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Flat Vertex Buffer"),
            size: (capacity * 4) as wgpu::BufferAddress * FLAT_FORMAT.stride(),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Flat Index Buffer"),
            contents: bytemuck::cast_slice(&vec![0u32; capacity * 6]),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            vertex,
            index,
            amount: 0,
            capacity,
        }
    }

    /// Upload `batch`; rectangles beyond the capacity are dropped with a warning.
    pub fn write(&mut self, queue: &wgpu::Queue, batch: &FlatBatch) {
        let rects = batch.vertex_count() / 4;
        if rects > self.capacity {
            log::warn!(
                "flat batch holds {rects} rectangles but the buffers fit {}",
                self.capacity
            );
        }
        let rects = rects.min(self.capacity);
        let stride = FLAT_FORMAT.stride() as usize;
        queue.write_buffer(&self.vertex, 0, &batch.vertex_bytes()[..rects * 4 * stride]);
        queue.write_buffer(&self.index, 0, &batch.index_bytes()[..rects * 6 * 4]);
        self.amount = (rects * 6) as u32;
    }
}
