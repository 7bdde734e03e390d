//! Per-instance transforms.
//!
//! Every instanced draw reads its model matrix from an instance buffer of
//! [`InstanceRaw`]. The picker uses the same [`Instance`] values to move the
//! pick ray into each instance's local space.

use std::ops::Mul;

use cgmath::{Matrix4, One, Quaternion, Rotation3, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::vertex::Vertex;

/// Position, rotation and (possibly non-uniform) scale of one instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Instance {
    /// Identity transform.
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vector3::new(scale, scale, scale);
        self
    }

    pub fn with_rotation<A: Into<cgmath::Rad<f32>>>(mut self, axis: Vector3<f32>, angle: A) -> Self {
        self.rotation = Quaternion::from_axis_angle(axis, angle);
        self
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// World to local transform; `None` when a scale component is zero.
    pub fn inverse_matrix(&self) -> Option<Matrix4<f32>> {
        self.to_matrix().invert()
    }

    pub fn to_raw(&self) -> InstanceRaw {
        let normal = Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(
                1.0 / self.scale.x,
                1.0 / self.scale.y,
                1.0 / self.scale.z,
            );
        InstanceRaw {
            model: self.to_matrix().into(),
            normal: [
                normal.x.truncate().into(),
                normal.y.truncate().into(),
                normal.z.truncate().into(),
            ],
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vector3<f32>> for Instance {
    fn from(position: Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

/// Composition: `parent * child` places `child` in the space of `parent`.
impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let scaled_rhs_pos = Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        Instance {
            position: self.position + self.rotation * scaled_rhs_pos,
            rotation: self.rotation * rhs.rotation,
            scale: Vector3::new(
                self.scale.x * rhs.scale.x,
                self.scale.y * rhs.scale.y,
                self.scale.z * rhs.scale.z,
            ),
        }
    }
}

/// The instance data as stored on the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

impl InstanceRaw {
    // A mat4 takes four vertex slots and a mat3 three; locations 0-4 belong to the vertex.
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x3,
        10 => Float32x3,
        11 => Float32x3,
    ];
}

impl Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Advance once per instance rather than once per vertex.
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub fn mk_instance_buffer(device: &wgpu::Device, instances: &[Instance]) -> wgpu::Buffer {
    let raw: Vec<InstanceRaw> = instances.iter().map(Instance::to_raw).collect();
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Instance Buffer"),
        contents: bytemuck::cast_slice(&raw),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

/// Overwrite the start of `buffer`; the buffer must hold at least `instances.len()` entries.
pub fn write_instances(queue: &wgpu::Queue, buffer: &wgpu::Buffer, instances: &[Instance]) {
    let raw: Vec<InstanceRaw> = instances.iter().map(Instance::to_raw).collect();
    queue.write_buffer(buffer, 0, bytemuck::cast_slice(&raw));
}
