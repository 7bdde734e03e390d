//! Vertex formats and interleaved vertex buffers.
//!
//! [`ModelVertex`] is the fixed layout consumed by the basic pipeline. Custom
//! pipelines describe their input with a [`VertexFormat`] and fill a
//! [`VertexBufferBuilder`], which interleaves only the requested attributes.

use wgpu::util::DeviceExt;

use crate::data_structures::mesh::MeshData;

/// Describes the GPU layout of a vertex type.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl ModelVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x3,
        3 => Float32x3,
        4 => Float32x3,
    ];

    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            tex_coords,
            normal,
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
        }
    }
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

bitflags::bitflags! {
    /// Attributes present in an interleaved vertex.
    ///
    /// Attributes are always laid out in declaration order: position, normal,
    /// texture coordinates, colour, tangent.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct VertexFormat: u32 {
        const POSITION = 1 << 0;
        const NORMAL = 1 << 1;
        const TEXCOORD = 1 << 2;
        const COLOR = 1 << 3;
        const TANGENT = 1 << 4;
    }
}

impl VertexFormat {
    const LAYOUT: [(VertexFormat, usize, wgpu::VertexFormat); 5] = [
        (VertexFormat::POSITION, 3, wgpu::VertexFormat::Float32x3),
        (VertexFormat::NORMAL, 3, wgpu::VertexFormat::Float32x3),
        (VertexFormat::TEXCOORD, 2, wgpu::VertexFormat::Float32x2),
        (VertexFormat::COLOR, 4, wgpu::VertexFormat::Float32x4),
        (VertexFormat::TANGENT, 3, wgpu::VertexFormat::Float32x3),
    ];

    /// Number of floats per vertex.
    pub fn components(self) -> usize {
        Self::LAYOUT
            .iter()
            .filter(|(flag, _, _)| self.contains(*flag))
            .map(|(_, n, _)| n)
            .sum()
    }

    /// Size of one vertex in bytes.
    pub fn stride(self) -> wgpu::BufferAddress {
        (self.components() * std::mem::size_of::<f32>()) as wgpu::BufferAddress
    }

    /// Shader inputs for this format, starting at `first_location`.
    pub fn attributes(self, first_location: u32) -> Vec<wgpu::VertexAttribute> {
        let mut offset = 0;
        let mut location = first_location;
        let mut out = Vec::new();
        for (flag, components, format) in Self::LAYOUT {
            if !self.contains(flag) {
                continue;
            }
            out.push(wgpu::VertexAttribute {
                format,
                offset,
                shader_location: location,
            });
            offset += (components * std::mem::size_of::<f32>()) as wgpu::BufferAddress;
            location += 1;
        }
        out
    }
}

/// Every attribute a vertex may carry; the builder picks what its format needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexInput {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
    pub tangent: [f32; 3],
}

impl Default for VertexInput {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0; 3],
            tex_coords: [0.0; 2],
            color: [1.0; 4],
            tangent: [0.0; 3],
        }
    }
}

impl From<&ModelVertex> for VertexInput {
    fn from(v: &ModelVertex) -> Self {
        Self {
            position: v.position,
            normal: v.normal,
            tex_coords: v.tex_coords,
            tangent: v.tangent,
            ..Default::default()
        }
    }
}

/// CPU side interleaved vertex data for an arbitrary [`VertexFormat`].
#[derive(Clone, Debug)]
pub struct VertexBufferBuilder {
    format: VertexFormat,
    attributes: Vec<wgpu::VertexAttribute>,
    data: Vec<f32>,
    count: usize,
}

impl VertexBufferBuilder {
    pub fn new(format: VertexFormat) -> anyhow::Result<Self> {
        anyhow::ensure!(!format.is_empty(), "vertex format has no attributes");
        Ok(Self::with_format(format))
    }

    /// `format` must hold at least one attribute.
    pub(crate) fn with_format(format: VertexFormat) -> Self {
        Self {
            format,
            attributes: format.attributes(0),
            data: Vec::new(),
            count: 0,
        }
    }

    /// Interleave every vertex of `mesh`, painting it with `color`.
    pub fn from_mesh(format: VertexFormat, mesh: &MeshData, color: [f32; 4]) -> anyhow::Result<Self> {
        let mut builder = Self::new(format)?;
        builder.data.reserve(mesh.vertices.len() * format.components());
        for v in &mesh.vertices {
            builder.push(&VertexInput {
                color,
                ..v.into()
            });
        }
        Ok(builder)
    }

    pub fn push(&mut self, v: &VertexInput) {
        let f = self.format;
        if f.contains(VertexFormat::POSITION) {
            self.data.extend_from_slice(&v.position);
        }
        if f.contains(VertexFormat::NORMAL) {
            self.data.extend_from_slice(&v.normal);
        }
        if f.contains(VertexFormat::TEXCOORD) {
            self.data.extend_from_slice(&v.tex_coords);
        }
        if f.contains(VertexFormat::COLOR) {
            self.data.extend_from_slice(&v.color);
        }
        if f.contains(VertexFormat::TANGENT) {
            self.data.extend_from_slice(&v.tangent);
        }
        self.count += 1;
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.count = 0;
    }

    pub fn format(&self) -> VertexFormat {
        self.format
    }

    pub fn vertex_count(&self) -> usize {
        self.count
    }

    pub fn floats(&self) -> &[f32] {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.format.stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }

    pub fn create_buffer(&self, device: &wgpu::Device, label: &str) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: self.as_bytes(),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        })
    }
}
