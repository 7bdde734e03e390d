use mini_api::{
    ElementState, KeyCode, KeyEvent, PhysicalKey, Vector2, WindowEvent,
    context::{Context, InitContext, Settings},
    flow::{GraphicsFlow, Out, TouchEvent, TouchPhase, constructor, run_with},
    geometry::Rect,
    pipelines::flat::{FlatBatch, FlatBuffers},
    render::Render,
    sim::breakout::{Breakout, BreakoutConfig, Phase},
};

const ROW_COLOURS: [[f32; 4]; 5] = [
    [0.9, 0.2, 0.2, 1.0],
    [0.9, 0.5, 0.1, 1.0],
    [0.9, 0.8, 0.1, 1.0],
    [0.2, 0.8, 0.3, 1.0],
    [0.2, 0.5, 0.9, 1.0],
];

struct Game {
    game: Breakout,
    left: bool,
    right: bool,
    /// Arena x the paddle follows while a touch is held.
    touch_target: Option<f32>,
    shown: (u32, u32, Phase),
    batch: FlatBatch,
    buffers: FlatBuffers,
}

impl Game {
    fn new(ctx: &InitContext) -> Self {
        let game = Breakout::new(BreakoutConfig::default());
        let capacity = game.bricks.len() + 2;
        Self {
            shown: (game.score, game.lives, game.phase),
            game,
            left: false,
            right: false,
            touch_target: None,
            batch: FlatBatch::new(),
            buffers: FlatBuffers::new(&ctx.device, capacity),
        }
    }

    fn to_arena_x(&self, ctx: &Context, pixel_x: f64) -> f32 {
        let (width, _) = ctx.size();
        pixel_x as f32 / width.max(1) as f32 * self.game.config.width
    }

    fn direction(&self) -> f32 {
        if let Some(target) = self.touch_target {
            let dx = target - self.game.paddle.center().x;
            return (dx / 0.2).clamp(-1.0, 1.0);
        }
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    fn fill_batch(&mut self) {
        let game = &self.game;
        let batch = &mut self.batch;
        batch.clear();
        let cols = game.config.brick_cols.max(1);
        for (i, brick) in game.bricks.iter().enumerate() {
            if brick.alive {
                let colour = ROW_COLOURS[(i / cols) % ROW_COLOURS.len()];
                batch.rect(&to_clip(&game.config, &brick.rect), colour);
            }
        }
        batch.rect(&to_clip(&game.config, &game.paddle), [0.9, 0.9, 0.9, 1.0]);
        let r = Vector2::new(game.ball.radius, game.ball.radius);
        let ball = Rect::new(game.ball.position - r, game.ball.position + r);
        batch.rect(&to_clip(&game.config, &ball), [1.0, 1.0, 1.0, 1.0]);
    }
}

/// Arena coordinates to clip space.
fn to_clip(config: &BreakoutConfig, rect: &Rect) -> Rect {
    let map = |p: Vector2<f32>| {
        Vector2::new(p.x / config.width * 2.0 - 1.0, p.y / config.height * 2.0 - 1.0)
    };
    Rect::new(map(rect.min), map(rect.max))
}

impl GraphicsFlow<(), ()> for Game {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.camera.controller.enabled = false;
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: std::time::Duration) -> Out<(), ()> {
        self.game.step(dt.as_secs_f32(), self.direction());
        self.fill_batch();
        self.buffers.write(&ctx.queue, &self.batch);
        Out::Empty
    }

    fn on_tick(&mut self, _: &Context, _: &mut ()) -> Out<(), ()> {
        let now = (self.game.score, self.game.lives, self.game.phase);
        if now == self.shown {
            return Out::Empty;
        }
        self.shown = now;
        let (score, lives, phase) = now;
        log::info!("score {score}, lives {lives}, {phase:?}");
        Out::configure(move |ctx| {
            ctx.window()
                .set_title(&format!("breakout | score {score} | lives {lives} | {phase:?}"));
        })
    }

    fn on_touch(&mut self, ctx: &Context, _: &mut (), touch: &TouchEvent) -> Out<(), ()> {
        match touch.phase {
            TouchPhase::Began => {
                self.game.launch();
                self.touch_target = Some(self.to_arena_x(ctx, touch.position.x));
            }
            TouchPhase::Moved => self.touch_target = Some(self.to_arena_x(ctx, touch.position.x)),
            TouchPhase::Ended => self.touch_target = None,
        }
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut (), event: &WindowEvent) -> Out<(), ()> {
        if let WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(code),
                    state,
                    ..
                },
            ..
        } = event
        {
            let pressed = *state == ElementState::Pressed;
            match code {
                KeyCode::ArrowLeft | KeyCode::KeyA => self.left = pressed,
                KeyCode::ArrowRight | KeyCode::KeyD => self.right = pressed,
                KeyCode::Space if pressed => self.game.launch(),
                KeyCode::KeyR if pressed && matches!(self.game.phase, Phase::Won | Phase::Lost) => {
                    self.game = Breakout::new(self.game.config.clone());
                }
                _ => (),
            }
        }
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Flat((&self.buffers).into())
    }
}

fn main() -> anyhow::Result<()> {
    let settings = Settings {
        width: 600,
        height: 840,
        ..Settings::titled("breakout")
    };
    run_with(
        settings,
        vec![constructor(|ctx: InitContext| async move {
            Box::new(Game::new(&ctx)) as Box<dyn GraphicsFlow<(), ()>>
        })],
    )
}
