#[cfg(feature = "integration-tests")]
use mini_api::{
    context::Context,
    flow::{GraphicsFlow, ImageTestResult, Out},
    render::Render,
};

/// Counts lifecycle hook invocations of the flows under test.
#[derive(Default)]
pub(crate) struct State {
    frame_counter: u32,
    init_invocations: u32,
    resize_invocations: u32,
    update_invocations: u32,
    pub dummy_state: String,
}

impl State {
    pub fn frame(&mut self) {
        self.frame_counter += 1;
    }

    pub fn init(&mut self) {
        self.init_invocations += 1;
    }

    pub fn resize(&mut self) {
        self.resize_invocations += 1;
    }

    pub fn update(&mut self) {
        self.update_invocations += 1;
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    pub fn init_invocations(&self) -> u32 {
        self.init_invocations
    }

    pub fn resize_invocations(&self) -> u32 {
        self.resize_invocations
    }

    pub fn update_invocations(&self) -> u32 {
        self.update_invocations
    }
}

#[derive(Default)]
pub(crate) struct FrameCounter(pub(crate) u32);

impl FrameCounter {
    pub(crate) fn frame(&self) -> u32 {
        self.0
    }

    pub(crate) fn progress(&mut self) {
        self.0 += 1;
    }
}

/// One frame of an [`Md2Builder`] model: quantised positions are decoded as
/// `byte * scale + translate`.
pub(crate) struct FixtureFrame {
    pub name: &'static str,
    pub scale: [f32; 3],
    pub translate: [f32; 3],
    pub vertices: Vec<[u8; 3]>,
}

/// Writes MD2 files in memory. Sections are laid out in header order and the
/// header fields can be tampered with after [`build`](Md2Builder::build).
pub(crate) struct Md2Builder {
    pub skin_size: (i32, i32),
    pub skins: Vec<&'static str>,
    pub texcoords: Vec<[i16; 2]>,
    /// Vertex and texcoord indices per corner, clockwise as stored on disk.
    pub triangles: Vec<([u16; 3], [u16; 3])>,
    pub frames: Vec<FixtureFrame>,
}

pub(crate) const HEADER_SIZE: usize = 68;

impl Md2Builder {
    /// A unit quad (two triangles) facing up once loaded, with the animations
    /// `stand` (2 frames) and `run` (3 frames). Frame `i` lifts every vertex
    /// by `i` units.
    pub fn quad() -> Self {
        let frame = |name, i: u8| FixtureFrame {
            name,
            scale: [1.0; 3],
            translate: [0.0; 3],
            vertices: vec![[0, 0, i], [1, 0, i], [1, 1, i], [0, 1, i]],
        };
        Self {
            skin_size: (64, 64),
            skins: vec!["skins/rover.pcx"],
            texcoords: vec![[0, 64], [64, 64], [64, 0], [0, 0]],
            triangles: vec![([0, 2, 1], [0, 2, 1]), ([0, 3, 2], [0, 3, 2])],
            frames: vec![
                frame("stand1", 0),
                frame("stand2", 1),
                frame("run1", 2),
                frame("run2", 3),
                frame("run3", 4),
            ],
        }
    }

    pub fn frame_size(&self) -> usize {
        40 + 4 * self.vertex_count()
    }

    fn vertex_count(&self) -> usize {
        self.frames.first().map_or(0, |f| f.vertices.len())
    }

    pub fn build(&self) -> Vec<u8> {
        let ofs_skins = HEADER_SIZE;
        let ofs_st = ofs_skins + 64 * self.skins.len();
        let ofs_tris = ofs_st + 4 * self.texcoords.len();
        let ofs_frames = ofs_tris + 12 * self.triangles.len();
        let ofs_end = ofs_frames + self.frame_size() * self.frames.len();

        let mut out = Vec::with_capacity(ofs_end);
        out.extend_from_slice(b"IDP2");
        for field in [
            8,
            self.skin_size.0,
            self.skin_size.1,
            self.frame_size() as i32,
            self.skins.len() as i32,
            self.vertex_count() as i32,
            self.texcoords.len() as i32,
            self.triangles.len() as i32,
            0,
            self.frames.len() as i32,
            ofs_skins as i32,
            ofs_st as i32,
            ofs_tris as i32,
            ofs_frames as i32,
            ofs_end as i32,
            ofs_end as i32,
        ] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        for skin in &self.skins {
            out.extend_from_slice(&fixed_string::<64>(skin));
        }
        for st in &self.texcoords {
            out.extend_from_slice(&st[0].to_le_bytes());
            out.extend_from_slice(&st[1].to_le_bytes());
        }
        for (vertices, texcoords) in &self.triangles {
            for i in vertices.iter().chain(texcoords) {
                out.extend_from_slice(&i.to_le_bytes());
            }
        }
        for frame in &self.frames {
            for f in frame.scale.iter().chain(&frame.translate) {
                out.extend_from_slice(&f.to_le_bytes());
            }
            out.extend_from_slice(&fixed_string::<16>(frame.name));
            for v in &frame.vertices {
                out.extend_from_slice(v);
                // Normal index, unused.
                out.push(0);
            }
        }
        out
    }
}

/// Overwrite the `index`th header field of an MD2 file.
pub(crate) fn patch_header(data: &mut [u8], index: usize, value: i32) {
    data[index * 4..index * 4 + 4].copy_from_slice(&value.to_le_bytes());
}

fn fixed_string<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [0; N];
    let len = s.len().min(N - 1);
    out[..len].copy_from_slice(&s.as_bytes()[..len]);
    out
}

#[cfg(feature = "integration-tests")]
pub(crate) type Validate = Box<
    dyn Fn(
        &Context,
        &mut FrameCounter,
        &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error>,
>;

/// Renders nothing but the clear colour and hands each frame to `validate`.
#[cfg(feature = "integration-tests")]
pub(crate) struct TestRender {
    pub(crate) setup: Box<dyn FnMut(&mut Context)>,
    pub(crate) validate: Validate,
}

#[cfg(feature = "integration-tests")]
impl GraphicsFlow<FrameCounter, ()> for TestRender {
    fn on_init(&mut self, ctx: &mut Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        (self.setup)(ctx);
        Out::Empty
    }

    fn on_update(
        &mut self,
        _: &Context,
        state: &mut FrameCounter,
        _: std::time::Duration,
    ) -> Out<FrameCounter, ()> {
        state.progress();
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::None
    }

    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut FrameCounter,
        texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        (self.validate)(ctx, state, texture)
    }
}

#[macro_export]
macro_rules! golden_image_test {
    ($graphics_elem:expr) => {{
        use mini_api::context::Settings;
        use mini_api::flow::{FlowConstructor, GraphicsFlow, constructor, run_with};
        use $crate::common::test_utils::FrameCounter;

        let flow: FlowConstructor<FrameCounter, ()> = constructor(|_| async move {
            Box::new($graphics_elem) as Box<dyn GraphicsFlow<FrameCounter, ()>>
        });
        run_with(Settings::titled("golden image test"), vec![flow])
            .expect("Failed to run flow for integration test.");
    }};
}
