use mini_api::{
    Point3, Rad, Vector3,
    camera::Camera,
    context::{Context, InitContext, Settings},
    data_structures::{
        instance::{Instance, mk_instance_buffer},
        model::Model,
        texture::Texture,
    },
    flow::{GraphicsFlow, Out, TouchEvent, TouchPhase, constructor, run_with},
    models::{AnimationRange, Md2Model},
    render::{Instanced, Render},
    resources::{KeyframeAnimation, load_model_md2, load_texture, model_from_mesh, write_mesh},
    wgpu,
};

const FPS: f32 = 9.0;
/// MD2 units are roughly inches.
const SCALE: f32 = 0.05;

struct Loaded {
    md2: Md2Model,
    animations: Vec<AnimationRange>,
    current: usize,
    animation: KeyframeAnimation,
    model: Model,
    instance_buffer: wgpu::Buffer,
}

struct Rover {
    loaded: Option<Loaded>,
}

impl Loaded {
    async fn load(ctx: &InitContext) -> anyhow::Result<Self> {
        let (md2, animations) = load_model_md2("rover.md2").await?;
        let first = animations
            .first()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("rover.md2 has no frames"))?;
        let mesh = md2.mesh(first.start, first.start, 0.0)?;
        let diffuse = match load_texture("rover.png", false, &ctx.device, &ctx.queue, None).await {
            Ok(texture) => texture,
            Err(e) => {
                log::warn!("no rover skin ({e:#}), painting it grey");
                Texture::solid(&ctx.device, &ctx.queue, [160, 160, 160, 255], "rover skin", false)
            }
        };
        let normal = Texture::create_default_normal_map(&ctx.device, &ctx.queue);
        let model = model_from_mesh(&ctx.device, &mesh, "rover", diffuse, normal, &ctx.texture_layout);

        let center = md2.frames[first.start].center();
        let mut instance = Instance::new()
            .with_scale(SCALE)
            .with_rotation(Vector3::unit_y(), Rad(-std::f32::consts::FRAC_PI_2));
        instance.position = instance.rotation * Vector3::new(center.x, center.y, center.z) * -SCALE;

        Ok(Self {
            animation: KeyframeAnimation::new(first, FPS),
            instance_buffer: mk_instance_buffer(&ctx.device, &[instance]),
            md2,
            animations,
            current: 0,
            model,
        })
    }

    fn next_animation(&mut self) {
        self.current = (self.current + 1) % self.animations.len();
        let range = self.animations[self.current].clone();
        log::info!("playing {} ({} frames)", range.name, range.frame_count());
        self.animation = KeyframeAnimation::new(range, FPS);
    }

    fn animate(&mut self, queue: &wgpu::Queue, dt: f32) -> anyhow::Result<()> {
        self.animation.advance(dt);
        let (a, b, t) = self.animation.sample();
        let mesh = self.md2.mesh(a, b, t)?;
        write_mesh(queue, &self.model.meshes[0], &mesh)
    }
}

impl GraphicsFlow<(), ()> for Rover {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        let camera = Camera::looking_at(Point3::new(0.0, 1.0, 4.0), Point3::new(0.0, 0.0, 0.0));
        ctx.camera.camera = camera;
        ctx.camera.controller.orbit_camera(&camera, Point3::new(0.0, 0.0, 0.0));
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: std::time::Duration) -> Out<(), ()> {
        if let Some(loaded) = &mut self.loaded {
            if let Err(e) = loaded.animate(&ctx.queue, dt.as_secs_f32()) {
                log::error!("animation stopped: {e:#}");
                self.loaded = None;
            }
        }
        Out::Empty
    }

    fn on_touch(&mut self, _: &Context, _: &mut (), touch: &TouchEvent) -> Out<(), ()> {
        if touch.phase == TouchPhase::Began {
            if let Some(loaded) = &mut self.loaded {
                loaded.next_animation();
            }
        }
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        match &self.loaded {
            Some(loaded) => Render::Default(Instanced {
                instance: &loaded.instance_buffer,
                model: &loaded.model,
                amount: 1,
                id: 1,
                collider: None,
            }),
            None => Render::None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    run_with(
        Settings::titled("rover"),
        vec![constructor(|ctx: InitContext| async move {
            let loaded = match Loaded::load(&ctx).await {
                Ok(loaded) => Some(loaded),
                Err(e) => {
                    log::error!("rover unavailable: {e:#}");
                    None
                }
            };
            Box::new(Rover { loaded }) as Box<dyn GraphicsFlow<(), ()>>
        })],
    )
}
