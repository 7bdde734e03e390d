use cgmath::{Deg, InnerSpace, Point3, Vector3};
use instant::Duration;
use mini_api::{
    PhysicalPosition,
    camera::{Camera, CameraController, Projection},
    collision::{AabbTree, PickOptions, TreeConfig},
    data_structures::instance::Instance,
    geometry::Ray,
    pick::pick_nearest,
    render::Collider,
    shapes,
};

fn cube_tree() -> AabbTree {
    AabbTree::from_mesh(&shapes::cube(2.0), TreeConfig::default())
}

fn down_z() -> Ray {
    Ray::new(Point3::new(0.1, 0.2, 10.0), Vector3::new(0.0, 0.0, -1.0))
}

fn assert_near(a: Point3<f32>, b: Point3<f32>) {
    assert!((a - b).magnitude() < 1e-3, "{:?} != {:?}", a, b);
}

#[test]
fn should_pick_nearest_instance() {
    let tree = cube_tree();
    let instances = [
        Instance::new(),
        Instance::from(Vector3::new(0.0, 0.0, 3.0)).with_scale(0.5),
    ];
    let colliders = [(4, Collider { tree: &tree, instances: &instances })];

    let pick = pick_nearest(&down_z(), &colliders).expect("both cubes lie on the ray");
    assert_eq!((pick.id, pick.instance), (4, 1));
    assert!((pick.t - 6.5).abs() < 1e-4);
    assert_near(pick.point, Point3::new(0.1, 0.2, 3.5));
}

#[test]
fn should_pick_across_colliders() {
    let tree = cube_tree();
    let far = [Instance::new()];
    let near = [Instance::from(Vector3::new(0.0, 0.0, 4.0))];
    for colliders in [
        [(1, Collider { tree: &tree, instances: &far }), (2, Collider { tree: &tree, instances: &near })],
        [(2, Collider { tree: &tree, instances: &near }), (1, Collider { tree: &tree, instances: &far })],
    ] {
        let pick = pick_nearest(&down_z(), &colliders).unwrap();
        assert_eq!(pick.id, 2);
        assert_near(pick.point, Point3::new(0.1, 0.2, 5.0));
    }
}

#[test]
fn should_prefer_earlier_colliders_on_ties() {
    let tree = cube_tree();
    let instances = [Instance::new()];
    let colliders = [
        (7, Collider { tree: &tree, instances: &instances }),
        (8, Collider { tree: &tree, instances: &instances }),
    ];
    assert_eq!(pick_nearest(&down_z(), &colliders).unwrap().id, 7);
}

#[test]
fn should_skip_degenerate_instances() {
    let tree = cube_tree();
    let instances = [
        Instance::from(Vector3::new(0.0, 0.0, 5.0)).with_scale(0.0),
        Instance::new(),
    ];
    let colliders = [(1, Collider { tree: &tree, instances: &instances })];
    let pick = pick_nearest(&down_z(), &colliders).unwrap();
    assert_eq!(pick.instance, 1);
    assert!((pick.t - 9.0).abs() < 1e-4);

    let miss = Ray::new(Point3::new(3.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
    assert!(pick_nearest(&miss, &colliders).is_none());
    assert!(pick_nearest(&down_z(), &[]).is_none());
}

#[test]
fn should_pick_rotated_instances() {
    let tree = cube_tree();
    // Rotated by 45 degrees, a vertical edge sits at z = sqrt(2) and the
    // faces recede from it at 45 degrees on both sides.
    let instances = [Instance::new().with_rotation(Vector3::unit_y(), Deg(45.0))];
    let colliders = [(1, Collider { tree: &tree, instances: &instances })];
    let pick = pick_nearest(&down_z(), &colliders).unwrap();
    assert!((pick.t - (10.0 - 2f32.sqrt() + 0.1)).abs() < 1e-3, "{}", pick.t);
}

#[test]
fn should_cast_rays_through_the_screen() {
    let camera = Camera::looking_at(Point3::new(0.0, 0.0, 5.0), Point3::new(0.0, 0.0, 0.0));
    let projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
    assert!((camera.forward() - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-5);

    let center = camera.cast_ray_from_mouse(PhysicalPosition::new(400.0, 300.0), 800, 600, &projection);
    assert!((center.direction - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-4);
    assert_near(center.origin, Point3::new(0.0, 0.0, 4.9));

    let top_left = camera.cast_ray_from_mouse(PhysicalPosition::new(0.0, 0.0), 800, 600, &projection);
    assert!(top_left.direction.x < 0.0 && top_left.direction.y > 0.0);

    let hit = cube_tree().pick(&center, PickOptions { cull_back_faces: true }).unwrap();
    assert!((hit.t - 3.9).abs() < 1e-3, "{}", hit.t);
}

#[test]
fn should_orbit_without_jumping() {
    let mut camera = Camera::looking_at(Point3::new(0.0, 2.0, 6.0), Point3::new(0.0, 0.0, 0.0));
    let mut controller = CameraController::new(0.4, 1.0);
    controller.orbit_camera(&camera, Point3::new(0.0, 0.0, 0.0));
    controller.update(&mut camera, Duration::from_millis(16));
    assert_near(camera.position, Point3::new(0.0, 2.0, 6.0));

    controller.enabled = false;
    controller.handle_mouse(100.0, 0.0);
    controller.enabled = true;
    controller.update(&mut camera, Duration::from_millis(16));
    assert_near(camera.position, Point3::new(0.0, 2.0, 6.0));

    controller.handle_mouse(100.0, 0.0);
    controller.update(&mut camera, Duration::from_millis(16));
    assert!((camera.position - Point3::new(0.0, 2.0, 6.0)).magnitude() > 0.1);
    assert!(((camera.position - Point3::new(0.0, 0.0, 0.0)).magnitude() - 40f32.sqrt()).abs() < 1e-3);
}
