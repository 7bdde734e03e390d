use mini_api::{
    context::{Context, InitContext, Settings},
    flow::{GraphicsFlow, Out, constructor, run_with},
    pipelines::flat::{FlatBatch, FlatBuffers},
    render::Render,
    sim::starfield::Starfield,
};

const STARS: usize = 800;

struct Stars {
    field: Starfield,
    batch: FlatBatch,
    buffers: FlatBuffers,
}

impl Stars {
    fn new(ctx: &InitContext) -> Self {
        Self {
            field: Starfield::new(STARS, 1.0, 12.0, 0x5EED),
            batch: FlatBatch::new(),
            buffers: FlatBuffers::new(&ctx.device, STARS),
        }
    }
}

impl GraphicsFlow<(), ()> for Stars {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.camera.controller.enabled = false;
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: std::time::Duration) -> Out<(), ()> {
        self.field.update(dt.as_secs_f32());
        self.batch.clear();
        for star in self.field.project(ctx.aspect()) {
            let b = star.brightness;
            self.batch.point(star.position, 0.003 + 0.009 * b, [b, b, b, 1.0]);
        }
        self.buffers.write(&ctx.queue, &self.batch);
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Flat((&self.buffers).into())
    }
}

fn main() -> anyhow::Result<()> {
    run_with(
        Settings::titled("starfield"),
        vec![constructor(|ctx: InitContext| async move {
            Box::new(Stars::new(&ctx)) as Box<dyn GraphicsFlow<(), ()>>
        })],
    )
}
