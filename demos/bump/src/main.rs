use mini_api::{
    Point3, Rad, Vector3,
    camera::Camera,
    context::{Context, InitContext, Settings},
    data_structures::{
        instance::{Instance, mk_instance_buffer, write_instances},
        model::Model,
        texture::Texture,
    },
    flow::{GraphicsFlow, Out, constructor, run_with},
    landscape::Heightmap,
    render::{Instanced, Render},
    resources::{model_from_mesh, normal_map_from_heights},
    shapes, wgpu,
};

/// Radians per second around the y axis.
const SPIN: f32 = 0.4;
const LIGHT_RADIUS: f32 = 4.0;

struct Bump {
    model: Model,
    instance: Instance,
    instance_buffer: wgpu::Buffer,
    angle: f32,
    light_angle: f32,
}

impl Bump {
    fn new(ctx: &InitContext, normal: Texture) -> Self {
        let mesh = shapes::sphere(1.5, 32, 48);
        let diffuse = Texture::solid(&ctx.device, &ctx.queue, [200, 170, 140, 255], "bump diffuse", false);
        let model = model_from_mesh(&ctx.device, &mesh, "bumpy sphere", diffuse, normal, &ctx.texture_layout);
        let instance = Instance::new();
        Self {
            instance_buffer: mk_instance_buffer(&ctx.device, &[instance]),
            model,
            instance,
            angle: 0.0,
            light_angle: 0.0,
        }
    }
}

impl GraphicsFlow<(), ()> for Bump {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.camera.camera = Camera::looking_at(Point3::new(0.0, 1.0, 5.0), Point3::new(0.0, 0.0, 0.0));
        let camera = ctx.camera.camera;
        ctx.camera.controller.orbit_camera(&camera, Point3::new(0.0, 0.0, 0.0));
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: std::time::Duration) -> Out<(), ()> {
        let dt = dt.as_secs_f32();
        self.angle = (self.angle + SPIN * dt) % std::f32::consts::TAU;
        self.instance = self.instance.with_rotation(Vector3::unit_y(), Rad(self.angle));
        write_instances(&ctx.queue, &self.instance_buffer, &[self.instance]);

        self.light_angle = (self.light_angle + dt) % std::f32::consts::TAU;
        let (sin, cos) = self.light_angle.sin_cos();
        let position = [LIGHT_RADIUS * cos, 2.0, LIGHT_RADIUS * sin];
        Out::configure(move |ctx| ctx.light.set(&ctx.queue, position, [1.0, 1.0, 1.0]))
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Default(Instanced {
            instance: &self.instance_buffer,
            model: &self.model,
            amount: 1,
            id: 1,
            collider: None,
        })
    }
}

fn main() -> anyhow::Result<()> {
    run_with(
        Settings::titled("bump"),
        vec![constructor(|ctx: InitContext| async move {
            let normal = match Heightmap::generate(7, 0.6, 0xB0B) {
                Ok(heights) => {
                    let img = normal_map_from_heights(&heights, 4.0);
                    Texture::from_rgba(&ctx.device, &ctx.queue, &img, Some("bump normal map"), true)
                }
                Err(e) => {
                    log::error!("heightmap generation failed: {e:#}");
                    Texture::create_default_normal_map(&ctx.device, &ctx.queue)
                }
            };
            Box::new(Bump::new(&ctx, normal)) as Box<dyn GraphicsFlow<(), ()>>
        })],
    )
}
