//! GPU context and runtime settings.
//!
//! [`Context`] owns the window surface, device and queue together with the
//! resources every demo shares (camera, light, depth buffer and the built-in
//! pipelines). Flows receive an [`InitContext`] while they are constructed and
//! the full `Context` in their hooks.

use std::sync::Arc;

use anyhow::Context as _;
use cgmath::Point3;
use winit::{dpi::PhysicalPosition, window::Window};

use crate::{
    camera::{self, Camera, CameraController, CameraResources, CameraUniform, Projection},
    data_structures::texture,
    pipelines::{
        Pipelines,
        basic::{diffuse_normal_layout, mk_basic_pipeline},
        flat::mk_flat_pipeline,
        light::{LightResources, LightUniform},
    },
};

/// Window and loop settings handed to [`crate::flow::run_with`].
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_colour: wgpu::Color,
    /// Interval between two `on_tick` calls.
    pub tick_duration_millis: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: "mini-api".to_string(),
            width: 1024,
            height: 768,
            clear_colour: wgpu::Color::BLACK,
            tick_duration_millis: 500,
        }
    }
}

impl Settings {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseButtonState {
    Left,
    Right,
    #[default]
    None,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseState {
    /// Last cursor position in physical pixels.
    pub coords: PhysicalPosition<f64>,
    pub pressed: MouseButtonState,
    /// Id of the object picked last, cleared by picking it again.
    pub selected: Option<u32>,
}

impl Default for MouseState {
    fn default() -> Self {
        Self {
            coords: PhysicalPosition::new(0.0, 0.0),
            pressed: MouseButtonState::None,
            selected: None,
        }
    }
}

impl MouseState {
    pub fn toggle(&mut self, id: u32) {
        self.selected = match self.selected {
            Some(current) if current == id => None,
            _ => Some(id),
        };
    }
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    /// Layout of the material bind group (diffuse and normal map).
    pub texture_layout: wgpu::BindGroupLayout,
    pub clear_colour: wgpu::Color,
    pub tick_duration_millis: u64,
    pub mouse: MouseState,
}

impl Context {
    pub async fn new(window: Arc<Window>, settings: &Settings) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("wgpu setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        log::info!("adapter: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create device and queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders output linear colour and rely on an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface supports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = Camera::looking_at(Point3::new(0.0, 2.0, 6.0), Point3::new(0.0, 0.0, 0.0));
        let projection = Projection::new(config.width, config.height, cgmath::Deg(45.0), 0.1, 500.0);
        let mut controller = CameraController::new(0.4, 1.0);
        controller.orbit_camera(&camera, Point3::new(0.0, 0.0, 0.0));

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = wgpu::util::DeviceExt::create_buffer_init(
            &device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Camera Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );
        let camera_bind_group_layout = camera::mk_bind_group_layout(&device);
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        let camera = CameraResources {
            camera,
            controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let depth_texture =
            texture::Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        let light = LightResources::new(LightUniform::new([4.0, 8.0, 6.0], [1.0, 1.0, 1.0]), &device);

        let texture_layout = diffuse_normal_layout(&device);
        let pipelines = Pipelines {
            basic: mk_basic_pipeline(
                &device,
                &config,
                &texture_layout,
                &camera.bind_group_layout,
                &light.bind_group_layout,
            )
            .await?,
            flat: mk_flat_pipeline(&device, &config).await?,
        };

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            texture_layout,
            clear_colour: settings.clear_colour,
            tick_duration_millis: settings.tick_duration_millis,
            mouse: MouseState::default(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }
}

/// The part of the context a flow needs while it is being constructed.
///
/// Device and queue are reference counted by wgpu, so cloning them is cheap.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
    pub texture_layout: wgpu::BindGroupLayout,
}

impl InitContext {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            format: ctx.config.format,
            width: ctx.config.width,
            height: ctx.config.height,
            texture_layout: ctx.texture_layout.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_the_same_id_deselects() {
        let mut mouse = MouseState::default();
        mouse.toggle(3);
        assert_eq!(mouse.selected, Some(3));
        mouse.toggle(4);
        assert_eq!(mouse.selected, Some(4));
        mouse.toggle(4);
        assert_eq!(mouse.selected, None);
    }
}
