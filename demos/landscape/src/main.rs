use mini_api::{
    InnerSpace, Point3, Vector3,
    camera::Camera,
    collision::{AabbTree, TreeConfig},
    context::{Context, InitContext, Settings},
    data_structures::{
        instance::{Instance, mk_instance_buffer, write_instances},
        model::Model,
    },
    flow::{GraphicsFlow, Out, constructor, run_with},
    landscape::Heightmap,
    pick::Pick,
    render::{Collider, Instanced, Render},
    resources::{load_heightmap, solid_model},
    shapes, wgpu,
};

const CELL: f32 = 0.5;
const HEIGHT: f32 = 12.0;
const TERRAIN: u32 = 1;
const MARKER: u32 = 2;
/// World units per second.
const MARKER_SPEED: f32 = 6.0;
const MARKER_RADIUS: f32 = 0.4;

struct Landscape {
    heights: Heightmap,
    terrain: Model,
    tree: AabbTree,
    terrain_instances: [Instance; 1],
    terrain_buffer: wgpu::Buffer,
    marker: Model,
    marker_instance: Instance,
    marker_buffer: wgpu::Buffer,
    target: Option<Vector3<f32>>,
}

impl Landscape {
    fn new(ctx: &InitContext, heights: Heightmap) -> Self {
        let mesh = heights.to_mesh(CELL, HEIGHT);
        let tree = AabbTree::from_mesh(&mesh, TreeConfig::default());
        log::info!("terrain tree: {:?}", tree.stats());
        let terrain = solid_model(&ctx.device, &ctx.queue, &mesh, "terrain", [90, 140, 70, 255], &ctx.texture_layout);
        let marker = solid_model(
            &ctx.device,
            &ctx.queue,
            &shapes::sphere(MARKER_RADIUS, 12, 16),
            "marker",
            [230, 60, 40, 255],
            &ctx.texture_layout,
        );
        let terrain_instances = [Instance::new()];
        let mut marker_instance = Instance::new();
        marker_instance.position.y = heights.height_at_world(0.0, 0.0, CELL, HEIGHT) + MARKER_RADIUS;
        Self {
            terrain_buffer: mk_instance_buffer(&ctx.device, &terrain_instances),
            marker_buffer: mk_instance_buffer(&ctx.device, &[marker_instance]),
            heights,
            terrain,
            tree,
            terrain_instances,
            marker,
            marker_instance,
            target: None,
        }
    }
}

impl GraphicsFlow<(), ()> for Landscape {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        ctx.clear_colour = wgpu::Color {
            r: 0.55,
            g: 0.7,
            b: 0.9,
            a: 1.0,
        };
        let (w, _) = self.heights.world_size(CELL);
        let camera = Camera::looking_at(Point3::new(0.0, HEIGHT, w * 0.8), Point3::new(0.0, 0.0, 0.0));
        ctx.camera.camera = camera;
        ctx.camera.controller.max_distance = w * 2.0;
        ctx.camera.controller.orbit_camera(&camera, Point3::new(0.0, 0.0, 0.0));
        ctx.light.set(&ctx.queue, [0.0, HEIGHT * 3.0, 0.0], [1.0, 0.95, 0.85]);
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: std::time::Duration) -> Out<(), ()> {
        let Some(target) = self.target else {
            return Out::Empty;
        };
        let position = &mut self.marker_instance.position;
        let mut flat = target - *position;
        flat.y = 0.0;
        let step = MARKER_SPEED * dt.as_secs_f32();
        if flat.magnitude() <= step {
            position.x = target.x;
            position.z = target.z;
            self.target = None;
        } else {
            *position += flat.normalize() * step;
        }
        position.y = self.heights.height_at_world(position.x, position.z, CELL, HEIGHT) + MARKER_RADIUS;
        write_instances(&ctx.queue, &self.marker_buffer, &[self.marker_instance]);
        Out::Empty
    }

    fn on_click(&mut self, _: &Context, _: &mut (), pick: &Pick) -> Out<(), ()> {
        if pick.id == TERRAIN {
            log::debug!("walking to {:?}", pick.point);
            self.target = Some(Vector3::new(pick.point.x, pick.point.y, pick.point.z));
        }
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::Defaults(vec![
            Instanced {
                instance: &self.terrain_buffer,
                model: &self.terrain,
                amount: 1,
                id: TERRAIN,
                collider: Some(Collider {
                    tree: &self.tree,
                    instances: &self.terrain_instances,
                }),
            },
            Instanced {
                instance: &self.marker_buffer,
                model: &self.marker,
                amount: 1,
                id: MARKER,
                collider: None,
            },
        ])
    }
}

async fn heightmap() -> anyhow::Result<Heightmap> {
    match load_heightmap("terrain.png").await {
        Ok(heights) => Ok(heights),
        Err(e) => {
            log::info!("no terrain image ({e:#}), generating one");
            Heightmap::generate(6, 0.55, 0x7E44A1)
        }
    }
}

fn main() -> anyhow::Result<()> {
    run_with(
        Settings::titled("landscape"),
        vec![constructor(|ctx: InitContext| async move {
            match heightmap().await {
                Ok(heights) => Box::new(Landscape::new(&ctx, heights)) as Box<dyn GraphicsFlow<(), ()>>,
                Err(e) => {
                    log::error!("no terrain: {e:#}");
                    Box::new(Nothing) as Box<dyn GraphicsFlow<(), ()>>
                }
            }
        })],
    )
}

/// Stand-in when no terrain could be built.
struct Nothing;

impl GraphicsFlow<(), ()> for Nothing {
    fn on_init(&mut self, _: &mut Context, _: &mut ()) -> Out<(), ()> {
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut (), _: std::time::Duration) -> Out<(), ()> {
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::None
    }
}
