//! Flow control and application event loop.
//!
//! A "flow" is one demo (or one layer of a demo): it handles input, advances
//! its simulation and describes what to draw each frame. The runtime owns the
//! window and the GPU [`Context`], drives every registered flow through the
//! hooks of [`GraphicsFlow`] and composes their renders into one pass.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S, E>`] is the trait every demo implements
//! - [`Out<S, E>`] is the output of a hook: async events, async state
//!   mutations or a context reconfiguration
//! - [`TouchEvent`] unifies mouse and touch input
//!
//! # Lifecycle
//!
//! Each frame the loop:
//! 1. distributes window/device events (`on_window_events`, `on_device_events`,
//!    `on_touch` and, on a touch that lands on a collider, `on_click`)
//! 2. advances flows with `on_update`, and `on_tick` every tick interval
//! 3. updates the camera uniform from the orbit controller
//! 4. collects `on_render` from all flows and draws them batched per pipeline
//! 5. presents the frame
//!
//! `on_final` runs once when the loop exits.

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition},
    event::{DeviceEvent, DeviceId, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    context::{Context, InitContext, MouseButtonState, Settings},
    data_structures::{model::DrawModel, texture::Texture},
    pick::{Pick, pick_flows},
    render::Batches,
};

/// Output of every lifecycle hook.
///
/// `Out::FutEvent` resolves futures of events which are then delivered to
/// `on_custom_events`. Events have no side effects unless a flow handles them.
///
/// `Out::FutFn` resolves futures of state mutations, which the event loop
/// applies right after the hook that returned them.
///
/// `Out::Configure` modifies the [`Context`] at runtime, for instance to move
/// the camera, change the tick speed or the clear colour.
///
/// `Empty` is the default when nothing needs to be handled.
pub enum Out<S, E> {
    FutEvent(Vec<Box<dyn Future<Output = E>>>),
    FutFn(Vec<Box<dyn Future<Output = Box<dyn FnOnce(&mut S)>>>>),
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl<S, E> Default for Out<S, E> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<S, E> Out<S, E> {
    pub fn configure(f: impl FnOnce(&mut Context) + 'static) -> Self {
        Self::Configure(Box::new(f))
    }
}

#[cfg(feature = "integration-tests")]
pub enum ImageTestResult {
    Passed,
    Waiting,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Began,
    Moved,
    Ended,
}

/// A finger or the left mouse button.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    /// Physical pixels, origin in the top-left corner.
    pub position: PhysicalPosition<f64>,
    /// Touch id; the mouse is always 0.
    pub id: u64,
}

impl TouchEvent {
    /// Convert a winit touch. Cancelled touches end like lifted ones.
    pub fn from_winit(touch: &winit::event::Touch) -> Self {
        let phase = match touch.phase {
            winit::event::TouchPhase::Started => TouchPhase::Began,
            winit::event::TouchPhase::Moved => TouchPhase::Moved,
            winit::event::TouchPhase::Ended | winit::event::TouchPhase::Cancelled => TouchPhase::Ended,
        };
        Self {
            phase,
            position: touch.location,
            id: touch.id,
        }
    }
}

/// A renderable, interactive demo.
///
/// Only `on_init`, `on_update` and `on_render` are required; every other
/// hook defaults to doing nothing.
pub trait GraphicsFlow<S, E> {
    /// Called once after construction. This is the place to set up the camera,
    /// the light and the clear colour.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<S, E>;

    /// The surface changed size; `ctx.config` already holds the new size.
    fn on_resize(&mut self, _ctx: &Context, _state: &mut S, _width: u32, _height: u32) -> Out<S, E> {
        Out::Empty
    }

    /// Called every frame with the time since the previous frame.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<S, E>;

    /// Called every `tick_duration_millis`.
    fn on_tick(&mut self, _ctx: &Context, _state: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_touch(&mut self, _ctx: &Context, _state: &mut S, _touch: &TouchEvent) -> Out<S, E> {
        Out::Empty
    }

    /// A touch began on a collider this flow rendered with `pick.id`.
    ///
    /// Only `Instanced` renders carrying a `Collider` can be picked.
    fn on_click(&mut self, _ctx: &Context, _state: &mut S, _pick: &Pick) -> Out<S, E> {
        Out::Empty
    }

    fn on_device_events(&mut self, _ctx: &Context, _state: &mut S, _event: &DeviceEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_window_events(&mut self, _ctx: &Context, _state: &mut S, _event: &WindowEvent) -> Out<S, E> {
        Out::Empty
    }

    /// Returns the event if it was not consumed, passing it on to the next
    /// flow. Returning `None` consumes it.
    fn on_custom_events(&mut self, _ctx: &Context, _state: &mut S, event: E) -> Option<E> {
        Some(event)
    }

    /// What to draw this frame.
    fn on_render<'pass>(&self) -> crate::render::Render<'_, 'pass>;

    /// Called once when the event loop exits.
    fn on_final(&mut self, _ctx: &Context, _state: &mut S) {}

    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        _ctx: &Context,
        _state: &mut S,
        _texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        Ok(ImageTestResult::Passed)
    }
}

impl<State, Event> Debug for dyn GraphicsFlow<State, Event> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Builds a flow asynchronously from an [`InitContext`], so flows can load
/// their assets while the others are constructed.
pub type FlowConstructor<S, E> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S, E>>>>>>;

/// Wrap an async constructor function into a [`FlowConstructor`].
pub fn constructor<S, E, F, Fut>(f: F) -> FlowConstructor<S, E>
where
    F: FnOnce(InitContext) -> Fut + 'static,
    Fut: Future<Output = Box<dyn GraphicsFlow<S, E>>> + 'static,
{
    Box::new(move |ctx| Box::pin(f(ctx)))
}

/// GPU context, app state and surface status.
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
    is_surface_configured: bool,
}

impl<State: Default> AppState<State> {
    async fn new(window: Arc<Window>, settings: &Settings) -> anyhow::Result<Self> {
        let ctx = Context::new(window, settings).await?;
        Ok(Self {
            ctx,
            state: State::default(),
            is_surface_configured: false,
        })
    }
}

impl<State> AppState<State> {
    fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.ctx.config.width = width;
        self.ctx.config.height = height;
        self.is_surface_configured = true;
        self.ctx.projection.resize(width, height);
        self.ctx.surface.configure(&self.ctx.device, &self.ctx.config);
        self.ctx.depth_texture = Texture::create_depth_texture(
            &self.ctx.device,
            [self.ctx.config.width, self.ctx.config.height],
            "depth_texture",
        );
        log::debug!("surface resized to {width}x{height}");
        true
    }

    #[cfg(feature = "integration-tests")]
    fn get_test_texture(&self, extent3d: wgpu::Extent3d, format: wgpu::TextureFormat, label: &str) -> wgpu::Texture {
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent3d,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    /// Read back rows must be a multiple of 256 bytes.
    #[cfg(feature = "integration-tests")]
    fn get_padded_size(&self) -> (u32, u32) {
        let pad = |v: u32| v.div_ceil(256) * 256;
        (pad(self.ctx.config.width), pad(self.ctx.config.height))
    }

    fn render<Event>(
        &mut self,
        graphics_flows: &mut [Box<dyn GraphicsFlow<State, Event>>],
        #[cfg(feature = "integration-tests")] async_runtime: &Runtime,
        #[cfg(feature = "integration-tests")] event_loop: &EventLoopProxy<FlowEvent<State, Event>>,
    ) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        #[cfg(not(feature = "integration-tests"))]
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        #[cfg(not(feature = "integration-tests"))]
        let depth_view = &self.ctx.depth_texture.view;

        #[cfg(feature = "integration-tests")]
        let (tex, extent3d) = {
            let (width, height) = self.get_padded_size();
            let extent3d = wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            };
            (
                self.get_test_texture(extent3d, self.ctx.config.format, "Golden Image Test Output Texture"),
                extent3d,
            )
        };
        #[cfg(feature = "integration-tests")]
        let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
        #[cfg(feature = "integration-tests")]
        let depth = self.get_test_texture(extent3d, Texture::DEPTH_FORMAT, "Golden Image Test Depth Texture");
        #[cfg(feature = "integration-tests")]
        let depth_view = &depth.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            // Custom closures draw while the batches are collected.
            let mut batches = Batches::default();
            graphics_flows.iter().for_each(|flow| {
                flow.on_render()
                    .set_pipelines(&self.ctx, &mut render_pass, &mut batches);
            });

            render_pass.set_pipeline(&self.ctx.pipelines.basic);
            for instanced in batches.basics {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    log::warn!("skipping render id {} with zero instances", instanced.id);
                    continue;
                }
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_model_instanced(
                    instanced.model,
                    0..instanced.amount as u32,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }

            render_pass.set_pipeline(&self.ctx.pipelines.flat);
            for flat in batches.flats {
                if flat.amount == 0 {
                    continue;
                }
                render_pass.set_vertex_buffer(0, flat.vertex.slice(..));
                render_pass.set_index_buffer(flat.index.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..flat.amount, 0, 0..1);
            }
        }

        #[cfg(feature = "integration-tests")]
        let output_buffer = {
            let u32_size = std::mem::size_of::<u32>() as u32;
            let (width, height) = self.get_padded_size();
            let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                size: (u32_size * width * height) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: None,
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &tex,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(u32_size * width),
                        rows_per_image: Some(height),
                    },
                },
                extent3d,
            );
            output_buffer
        };

        self.ctx.queue.submit(iter::once(encoder.finish()));

        #[cfg(feature = "integration-tests")]
        {
            use std::convert::identity;

            let fut_img = async {
                let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
                let buffer_slice = output_buffer.slice(..);
                buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                    tx.send(result).unwrap();
                });
                self.ctx
                    .device
                    .poll(wgpu::PollType::Wait {
                        submission_index: None,
                        timeout: Some(Duration::from_secs(3)),
                    })
                    .unwrap();
                rx.receive().await.unwrap().unwrap();
                let data = buffer_slice.get_mapped_range();
                let (width, height) = self.get_padded_size();
                image::ImageBuffer::<image::Rgba<u8>, _>::from_raw(width, height, data).unwrap()
            };
            let mut img: image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView> =
                async_runtime.block_on(fut_img);
            let state = &mut self.state;
            let all_passed = graphics_flows
                .iter_mut()
                .map(|flow| flow.render_to_texture(&self.ctx, state, &mut img))
                .map(|res| match res {
                    Err(e) => panic!("{}", e),
                    Ok(ImageTestResult::Passed) => true,
                    Ok(ImageTestResult::Failed) => panic!("Assertion failed"),
                    Ok(ImageTestResult::Waiting) => false,
                })
                .all(identity);
            if all_passed {
                event_loop
                    .send_event(FlowEvent::Exit)
                    .expect("All assertions passed but the winit event-loop could not safely exit")
            }
        }

        output.present();
        Ok(())
    }
}

pub(crate) enum FlowEvent<State: 'static, Event: 'static> {
    Custom(Event),
    Mut(Box<dyn FnOnce(&mut State)>),
    #[allow(dead_code)]
    Exit,
}

impl<State, Event> Debug for FlowEvent<State, Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(E)"),
            Self::Mut(_) => f.write_str("Mut(|&mut State| -> {...})"),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct App<State: 'static, Event: 'static> {
    async_runtime: Runtime,
    proxy: EventLoopProxy<FlowEvent<State, Event>>,
    settings: Settings,
    state: Option<AppState<State>>,
    graphics_flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    // Taken on the first `resumed`.
    constructors: Option<Vec<FlowConstructor<State, Event>>>,
    last_time: Instant,
    time_since_tick: Duration,
}

impl<State, Event> App<State, Event>
where
    State: 'static,
    Event: 'static,
{
    fn new(
        event_loop: &EventLoop<FlowEvent<State, Event>>,
        settings: Settings,
        constructors: Vec<FlowConstructor<State, Event>>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: Runtime::new()?,
            proxy: event_loop.create_proxy(),
            settings,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
            time_since_tick: Duration::from_millis(0),
        })
    }
}

/// Run `hook` on every flow and handle what it returns.
fn dispatch<State, Event>(
    async_runtime: &Runtime,
    proxy: &EventLoopProxy<FlowEvent<State, Event>>,
    flows: &mut [Box<dyn GraphicsFlow<State, Event>>],
    app_state: &mut AppState<State>,
    mut hook: impl FnMut(&mut Box<dyn GraphicsFlow<State, Event>>, &Context, &mut State) -> Out<State, Event>,
) {
    for flow in flows.iter_mut() {
        let out = hook(flow, &app_state.ctx, &mut app_state.state);
        handle_flow_output(async_runtime, &mut app_state.ctx, proxy, out);
    }
}

impl<State, Event> App<State, Event> {
    fn touch(&mut self, touch: TouchEvent) {
        let Some(app_state) = &mut self.state else {
            return;
        };
        dispatch(
            &self.async_runtime,
            &self.proxy,
            &mut self.graphics_flows,
            app_state,
            |flow, ctx, state| flow.on_touch(ctx, state, &touch),
        );
        if touch.phase != TouchPhase::Began {
            return;
        }

        let ctx = &app_state.ctx;
        let ray = ctx.camera.camera.cast_ray_from_mouse(
            touch.position,
            ctx.config.width,
            ctx.config.height,
            &ctx.projection,
        );
        let Some((pick, flow_ids)) = pick_flows(&self.graphics_flows, &ray) else {
            return;
        };
        app_state.ctx.mouse.toggle(pick.id);
        if flow_ids.len() > 1 {
            log::warn!(
                "multiple flows (indices {:?}) react to render id {}",
                flow_ids,
                pick.id
            );
        }
        for (flow_id, flow) in self.graphics_flows.iter_mut().enumerate() {
            if !flow_ids.contains(&flow_id) {
                continue;
            }
            let out = flow.on_click(&app_state.ctx, &mut app_state.state, &pick);
            handle_flow_output(
                &self.async_runtime,
                &mut app_state.ctx,
                &self.proxy,
                out,
            );
        }
    }

    fn frame(&mut self, dt: Duration) {
        let Some(app_state) = &mut self.state else {
            return;
        };
        dispatch(
            &self.async_runtime,
            &self.proxy,
            &mut self.graphics_flows,
            app_state,
            |flow, ctx, state| flow.on_update(ctx, state, dt),
        );

        self.time_since_tick += dt;
        if self.time_since_tick >= Duration::from_millis(app_state.ctx.tick_duration_millis) {
            dispatch(
                &self.async_runtime,
                &self.proxy,
                &mut self.graphics_flows,
                app_state,
                |flow, ctx, state| flow.on_tick(ctx, state),
            );
            self.time_since_tick = Duration::from_millis(0);
        }

        let ctx = &mut app_state.ctx;
        ctx.camera.controller.update(&mut ctx.camera.camera, dt);
        ctx.camera.write(&ctx.queue, &ctx.projection);
    }
}

impl<State: 'static + Default, Event: 'static> ApplicationHandler<FlowEvent<State, Event>>
    for App<State, Event>
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        let window_attributes = Window::default_attributes()
            .with_title(self.settings.title.clone())
            .with_inner_size(LogicalSize::new(self.settings.width, self.settings.height));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("cannot create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let settings = self.settings.clone();
        let init_future = async move {
            let app_state = AppState::new(window, &settings).await?;
            let flow_futures: Vec<_> = constructors
                .into_iter()
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        let (mut app_state, flows) = match self.async_runtime.block_on(init_future) {
            Ok(init) => init,
            Err(e) => {
                log::error!("cannot create the main context: {e:#}");
                event_loop.exit();
                return;
            }
        };
        log::info!("{} flows constructed", flows.len());

        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        self.graphics_flows = flows;
        for flow in self.graphics_flows.iter_mut() {
            let out = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            handle_flow_output(
                &self.async_runtime,
                &mut app_state.ctx,
                &self.proxy,
                out,
            );
        }
        app_state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.state = Some(app_state);
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<State, Event>) {
        match event {
            FlowEvent::Custom(custom_event) => {
                if let Some(state) = &mut self.state {
                    let result = self
                        .graphics_flows
                        .iter_mut()
                        .fold(Some(custom_event), |event, flow| {
                            flow.on_custom_events(&state.ctx, &mut state.state, event?)
                        });
                    if result.is_some() {
                        log::warn!("custom event was not consumed this cycle");
                    }
                }
            }
            FlowEvent::Mut(fn_once) => {
                if let Some(state) = &mut self.state {
                    fn_once(&mut state.state);
                }
            }
            FlowEvent::Exit => event_loop.exit(),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if let MouseButtonState::Right = state.ctx.mouse.pressed {
                state.ctx.camera.controller.handle_mouse(dx, dy);
            }
        }
        dispatch(
            &self.async_runtime,
            &self.proxy,
            &mut self.graphics_flows,
            state,
            |flow, ctx, s| flow.on_device_events(ctx, s, &event),
        );
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        state.ctx.camera.controller.handle_window_events(&event);
        dispatch(
            &self.async_runtime,
            &self.proxy,
            &mut self.graphics_flows,
            state,
            |flow, ctx, s| flow.on_window_events(ctx, s, &event),
        );

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if state.resize(size.width, size.height) {
                    dispatch(
                        &self.async_runtime,
                        &self.proxy,
                        &mut self.graphics_flows,
                        state,
                        |flow, ctx, s| flow.on_resize(ctx, s, size.width, size.height),
                    );
                }
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                self.frame(dt);

                let Some(state) = &mut self.state else {
                    return;
                };
                match state.render(
                    &mut self.graphics_flows,
                    #[cfg(feature = "integration-tests")]
                    &self.async_runtime,
                    #[cfg(feature = "integration-tests")]
                    &self.proxy,
                ) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("out of memory, exiting");
                        event_loop.exit();
                    }
                    Err(e) => log::error!("unable to render: {e}"),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.ctx.mouse.coords = position;
                if state.ctx.mouse.pressed == MouseButtonState::Left {
                    self.touch(TouchEvent {
                        phase: TouchPhase::Moved,
                        position,
                        id: 0,
                    });
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                let position = state.ctx.mouse.coords;
                match (button, button_state.is_pressed()) {
                    (MouseButton::Left, true) => {
                        state.ctx.mouse.pressed = MouseButtonState::Left;
                        self.touch(TouchEvent {
                            phase: TouchPhase::Began,
                            position,
                            id: 0,
                        });
                    }
                    (MouseButton::Left, false) => {
                        state.ctx.mouse.pressed = MouseButtonState::None;
                        self.touch(TouchEvent {
                            phase: TouchPhase::Ended,
                            position,
                            id: 0,
                        });
                    }
                    (MouseButton::Right, true) => state.ctx.mouse.pressed = MouseButtonState::Right,
                    (MouseButton::Right, false) => state.ctx.mouse.pressed = MouseButtonState::None,
                    _ => (),
                }
            }
            WindowEvent::Touch(touch) => {
                state.ctx.mouse.coords = touch.location;
                self.touch(TouchEvent::from_winit(&touch));
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        let Some(state) = &mut self.state else {
            return;
        };
        for flow in self.graphics_flows.iter_mut() {
            flow.on_final(&state.ctx, &mut state.state);
        }
        log::info!("event loop exited");
    }
}

fn handle_flow_output<State, Event>(
    async_runtime: &Runtime,
    ctx: &mut Context,
    proxy: &EventLoopProxy<FlowEvent<State, Event>>,
    out: Out<State, Event>,
) {
    match out {
        // Resolved events go through the winit queue to `on_custom_events`.
        Out::FutEvent(futures) => {
            let fut = async move { futures::future::join_all(futures.into_iter().map(Pin::from)).await };
            let resolved = async_runtime.block_on(fut);
            for event in resolved {
                if let Err(err) = proxy.send_event(FlowEvent::Custom(event)) {
                    log::error!("event loop closed before all events were delivered: {err}");
                    return;
                }
            }
        }
        // Mutations are applied by the loop once the current hook returned.
        Out::FutFn(futures) => {
            let fut = async move { futures::future::join_all(futures.into_iter().map(Pin::from)).await };
            let resolved: Vec<Box<dyn FnOnce(&mut State)>> = async_runtime.block_on(fut);
            for mutation in resolved {
                if let Err(err) = proxy.send_event(FlowEvent::Mut(mutation)) {
                    log::error!("event loop closed before all mutations were applied: {err}");
                    return;
                }
            }
        }
        Out::Configure(f) => f(ctx),
        Out::Empty => (),
    }
}

/// Run the flows with default [`Settings`].
pub fn run<State: 'static + Default, Event: 'static>(
    constructors: Vec<FlowConstructor<State, Event>>,
) -> anyhow::Result<()> {
    run_with(Settings::default(), constructors)
}

pub fn run_with<State: 'static + Default, Event: 'static>(
    settings: Settings,
    constructors: Vec<FlowConstructor<State, Event>>,
) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        eprintln!("Warning: Could not initialize logger: {}", e);
    }

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent<State, Event>> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent<State, Event>> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(not(feature = "integration-tests"))]
    let event_loop: EventLoop<FlowEvent<State, Event>> = EventLoop::with_user_event().build()?;

    let mut app: App<State, Event> = App::new(&event_loop, settings, constructors)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
