use mini_api::{
    Deg, Point3, Transform, Vector3,
    camera::Camera,
    collision::{AabbTree, TreeConfig},
    context::{Context, InitContext, Settings},
    data_structures::{
        instance::{Instance, mk_instance_buffer},
        mesh::MeshData,
        model::Model,
        vertex::ModelVertex,
    },
    flow::{GraphicsFlow, Out, TouchEvent, TouchPhase, constructor, run_with},
    geometry::Triangle,
    pick::Pick,
    render::{Collider, Instanced, Render},
    resources::{solid_model, write_mesh},
    shapes, wgpu,
};

const SPHERES: u32 = 1;
const MARKER: u32 = 2;
/// Lift of the marker above the picked face, against z-fighting.
const LIFT: f32 = 0.01;

struct Picking {
    sphere: Model,
    tree: AabbTree,
    instances: [Instance; 3],
    instance_buffer: wgpu::Buffer,
    marker: Model,
    marker_buffer: wgpu::Buffer,
    marker_visible: bool,
}

fn marker_mesh(triangle: &Triangle) -> MeshData {
    let normal = triangle.normal();
    let vertices = [triangle.a, triangle.b, triangle.c]
        .iter()
        .map(|p| {
            let p = *p + normal * LIFT;
            ModelVertex::new([p.x, p.y, p.z], normal.into(), [0.0, 0.0])
        })
        .collect();
    MeshData::new(vertices, vec![0, 1, 2])
}

impl Picking {
    fn new(ctx: &InitContext) -> Self {
        let mesh = shapes::sphere(1.5, 16, 24);
        let tree = AabbTree::from_mesh(&mesh, TreeConfig::default());
        log::info!("sphere tree: {:?}", tree.stats());
        let grey = [200, 200, 210, 255];
        let sphere = solid_model(&ctx.device, &ctx.queue, &mesh, "sphere", grey, &ctx.texture_layout);

        let instances = [
            Instance::from(Vector3::new(-4.0, 0.0, 0.0)),
            Instance::from(Vector3::new(0.0, 0.0, 0.0)).with_scale(0.8),
            Instance::from(Vector3::new(4.0, 0.0, 0.0)).with_rotation(Vector3::unit_z(), Deg(30.0)),
        ];

        let origin = Point3::new(0.0, 0.0, 0.0);
        let placeholder = Triangle::new(origin, origin, origin);
        let marker = solid_model(
            &ctx.device,
            &ctx.queue,
            &marker_mesh(&placeholder),
            "pick marker",
            [230, 30, 30, 255],
            &ctx.texture_layout,
        );

        Self {
            sphere,
            tree,
            instance_buffer: mk_instance_buffer(&ctx.device, &instances),
            instances,
            marker,
            marker_buffer: mk_instance_buffer(&ctx.device, &[Instance::new()]),
            marker_visible: false,
        }
    }
}

impl GraphicsFlow<(), ()> for Picking {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), ()> {
        let camera = Camera::looking_at(Point3::new(0.0, 3.0, 10.0), Point3::new(0.0, 0.0, 0.0));
        ctx.camera.camera = camera;
        ctx.camera.controller.orbit_camera(&camera, Point3::new(0.0, 0.0, 0.0));
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), _: std::time::Duration) -> Out<(), ()> {
        if ctx.mouse.selected.is_none() {
            self.marker_visible = false;
        }
        Out::Empty
    }

    fn on_touch(&mut self, ctx: &Context, _: &mut (), touch: &TouchEvent) -> Out<(), ()> {
        if touch.phase != TouchPhase::Began {
            return Out::Empty;
        }
        let (width, height) = ctx.size();
        let ray = ctx
            .camera
            .camera
            .cast_ray_from_mouse(touch.position, width, height, &ctx.projection);
        for (i, instance) in self.instances.iter().enumerate() {
            if let Some(inverse) = instance.inverse_matrix() {
                let candidates = self.tree.candidates(&ray.transform(&inverse));
                log::debug!("instance {i}: {} candidate triangles", candidates.len());
            }
        }
        Out::Empty
    }

    fn on_click(&mut self, ctx: &Context, _: &mut (), pick: &Pick) -> Out<(), ()> {
        if pick.id != SPHERES || ctx.mouse.selected.is_none() {
            return Out::Empty;
        }
        let local = self.tree.triangle(pick.triangle);
        let (Some(local), Some(instance)) = (local, self.instances.get(pick.instance)) else {
            return Out::Empty;
        };
        let matrix = instance.to_matrix();
        let world = Triangle::new(
            matrix.transform_point(local.a),
            matrix.transform_point(local.b),
            matrix.transform_point(local.c),
        );
        log::info!("picked sphere {} triangle {} at {:?}", pick.instance, pick.triangle, pick.point);
        match write_mesh(&ctx.queue, &self.marker.meshes[0], &marker_mesh(&world)) {
            Ok(()) => self.marker_visible = true,
            Err(e) => log::error!("marker update failed: {e:#}"),
        }
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        let spheres = Instanced {
            instance: &self.instance_buffer,
            model: &self.sphere,
            amount: self.instances.len(),
            id: SPHERES,
            collider: Some(Collider {
                tree: &self.tree,
                instances: &self.instances,
            }),
        };
        if !self.marker_visible {
            return Render::Default(spheres);
        }
        Render::Defaults(vec![
            spheres,
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

fn main() -> anyhow::Result<()> {
    run_with(
        Settings::titled("picking"),
        vec![constructor(|ctx: InitContext| async move {
            Box::new(Picking::new(&ctx)) as Box<dyn GraphicsFlow<(), ()>>
        })],
    )
}
