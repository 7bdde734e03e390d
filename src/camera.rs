//! Camera, projection and the orbit controller.
//!
//! The camera is stored as a position plus yaw/pitch angles. The orbit
//! controller drives it around a target point: right-drag rotates, the mouse
//! wheel zooms. [`Camera::cast_ray_from_mouse`] turns a pointer position into
//! a world space [`Ray`] for picking.

use std::f32::consts::FRAC_PI_2;

use cgmath::{
    Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective,
};
use instant::Duration;
use winit::{
    dpi::PhysicalPosition,
    event::{MouseScrollDelta, WindowEvent},
};

use crate::geometry::Ray;

/// Maps OpenGL clip space depth (-1..1) to the wgpu range (0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    /// Camera at `position` facing `target`.
    pub fn looking_at(position: Point3<f32>, target: Point3<f32>) -> Self {
        let dir = target - position;
        let (yaw, pitch) = if dir.magnitude2() > 0.0 {
            let dir = dir.normalize();
            (Rad(dir.z.atan2(dir.x)), Rad(dir.y.clamp(-1.0, 1.0).asin()))
        } else {
            (Rad(-FRAC_PI_2), Rad(0.0))
        };
        Self {
            position,
            yaw,
            pitch,
        }
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }

    /// World space ray through the pixel at `coords`.
    pub fn cast_ray_from_mouse(
        &self,
        coords: PhysicalPosition<f64>,
        width: u32,
        height: u32,
        projection: &Projection,
    ) -> Ray {
        let view_proj = projection.calc_matrix() * self.calc_matrix();
        match view_proj.invert() {
            Some(inverse) => Ray::from_screen(
                coords.x as f32,
                coords.y as f32,
                width as f32,
                height as f32,
                &inverse,
            ),
            None => Ray::new(self.position, self.forward()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.view_proj.into()
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Orbits the camera around `target`.
///
/// Rotation and zoom are accumulated from input events and applied in
/// [`update`](Self::update), scaled by the frame time.
#[derive(Debug, Clone)]
pub struct CameraController {
    pub target: Point3<f32>,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
    /// Input is ignored while disabled; flat demos turn the orbit off.
    pub enabled: bool,
    rotate_speed: f32,
    zoom_speed: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    scroll: f32,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            target: Point3::origin(),
            distance: 10.0,
            min_distance: 1.0,
            max_distance: 200.0,
            yaw: Rad::from(Deg(90.0)),
            pitch: Rad::from(Deg(20.0)),
            enabled: true,
            rotate_speed,
            zoom_speed,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            scroll: 0.0,
        }
    }

    /// Place the orbit so that it reproduces the given camera.
    pub fn orbit_camera(&mut self, camera: &Camera, target: Point3<f32>) {
        let offset = camera.position - target;
        self.target = target;
        self.distance = offset
            .magnitude()
            .clamp(self.min_distance, self.max_distance);
        if offset.magnitude2() > 0.0 {
            let dir = offset.normalize();
            self.yaw = Rad(dir.z.atan2(dir.x));
            self.pitch = Rad(dir.y.clamp(-1.0, 1.0).asin());
        }
    }

    pub fn handle_mouse(&mut self, mouse_dx: f64, mouse_dy: f64) {
        if !self.enabled {
            return;
        }
        self.rotate_horizontal += mouse_dx as f32;
        self.rotate_vertical += mouse_dy as f32;
    }

    pub fn handle_scroll(&mut self, delta: &MouseScrollDelta) {
        if !self.enabled {
            return;
        }
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, scroll) => *scroll,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32 / 20.0,
        };
    }

    /// Returns whether the event was used by the controller.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseWheel { delta, .. } => {
                self.handle_scroll(delta);
                self.enabled
            }
            _ => false,
        }
    }

    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        if !self.enabled {
            return;
        }
        let dt = dt.as_secs_f32();
        self.yaw += Rad(self.rotate_horizontal * self.rotate_speed * dt);
        self.pitch += Rad(self.rotate_vertical * self.rotate_speed * dt);
        self.pitch = Rad(self.pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
        self.distance = (self.distance * (1.0 - self.scroll * self.zoom_speed * dt).max(0.1))
            .clamp(self.min_distance, self.max_distance);
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;
        self.scroll = 0.0;

        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        let offset = Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw) * self.distance;
        *camera = Camera::looking_at(self.target + offset, self.target);
    }
}

/// Everything the pipelines need to know about the camera.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    /// Recompute the uniform and upload it.
    pub fn write(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    })
}
