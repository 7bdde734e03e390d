use mini_api::{
    context::{Context, InitContext, Settings},
    flow::{GraphicsFlow, Out, TouchEvent, TouchPhase, constructor, run_with},
    pipelines::plasma::PlasmaPipeline,
    render::Render,
};

/// Cells across the screen height; a touch cycles through them.
const SCALES: [f32; 3] = [3.0, 6.0, 12.0];

struct Plasma {
    pipeline: Option<PlasmaPipeline>,
    scale: usize,
}

impl GraphicsFlow<(), ()> for Plasma {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.camera.controller.enabled = false;
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: std::time::Duration) -> Out<(), ()> {
        if let Some(pipeline) = &mut self.pipeline {
            pipeline.update(&ctx.queue, dt.as_secs_f32(), ctx.aspect());
        }
        Out::Empty
    }

    fn on_touch(&mut self, _: &Context, _: &mut (), touch: &TouchEvent) -> Out<(), ()> {
        if touch.phase == TouchPhase::Began {
            self.scale = (self.scale + 1) % SCALES.len();
            if let Some(pipeline) = &mut self.pipeline {
                pipeline.uniform.scale = SCALES[self.scale];
            }
        }
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        match &self.pipeline {
            Some(pipeline) => Render::Custom(Box::new(move |_, pass| pipeline.draw(pass))),
            None => Render::None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    run_with(
        Settings::titled("plasma"),
        vec![constructor(|ctx: InitContext| async move {
            let pipeline = match PlasmaPipeline::new(&ctx, SCALES[0]).await {
                Ok(pipeline) => Some(pipeline),
                Err(e) => {
                    log::error!("plasma pipeline unavailable: {e:#}");
                    None
                }
            };
            Box::new(Plasma { pipeline, scale: 0 }) as Box<dyn GraphicsFlow<(), ()>>
        })],
    )
}
