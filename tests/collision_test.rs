use cgmath::{InnerSpace, Point3, Vector3};
use mini_api::{
    collision::{Aabb, AabbTree, PickOptions, TreeConfig, TreeStats},
    geometry::{Ray, Triangle},
    shapes,
    sim::XorShift,
};

fn sphere_tree(config: TreeConfig) -> (Vec<Triangle>, AabbTree) {
    let mesh = shapes::sphere(1.0, 8, 12);
    (mesh.triangles(), AabbTree::from_mesh(&mesh, config))
}

/// Rays from a shell of radius 5 aimed at points close to the origin.
fn rays(count: usize, seed: u64) -> Vec<Ray> {
    let mut rng = XorShift::new(seed);
    (0..count)
        .map(|_| {
            let dir = Vector3::new(rng.range(-1.0, 1.0), rng.range(-1.0, 1.0), rng.range(-1.0, 1.0));
            let dir = if dir.magnitude2() < 1e-4 { Vector3::unit_z() } else { dir.normalize() };
            let origin = Point3::new(0.0, 0.0, 0.0) + dir * 5.0;
            let target = Point3::new(rng.range(-0.4, 0.4), rng.range(-0.4, 0.4), rng.range(-0.4, 0.4));
            Ray::new(origin, (target - origin).normalize())
        })
        .collect()
}

fn brute_force(triangles: &[Triangle], ray: &Ray, cull: bool) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, tri) in triangles.iter().enumerate() {
        if let Some(hit) = tri.intersect(ray, cull) {
            if best.is_none_or(|(_, t)| hit.t < t) {
                best = Some((i, hit.t));
            }
        }
    }
    best
}

#[test]
fn should_keep_mesh_triangle_order() {
    let mesh = shapes::cube(2.0);
    let tree = AabbTree::from_mesh(&mesh, TreeConfig::default());
    assert_eq!(tree.len(), 12);
    for (i, tri) in mesh.triangles().iter().enumerate() {
        assert_eq!(tree.triangle(i), Some(tri));
    }
}

#[test]
fn should_pick_like_brute_force() {
    let (triangles, tree) = sphere_tree(TreeConfig::default());
    for cull in [true, false] {
        let options = PickOptions { cull_back_faces: cull };
        for ray in rays(200, 42) {
            let expected = brute_force(&triangles, &ray, cull).expect("ray aims at the sphere");
            let hit = tree.pick(&ray, options).expect("tree agrees on the hit");
            assert!((hit.t - expected.1).abs() < 1e-4, "{:?} vs {:?}", hit, expected);
            assert!((hit.point - ray.at(hit.t)).magnitude() < 1e-5);
            assert!(tree.candidates(&ray).contains(&hit.triangle));
        }
    }
}

#[test]
fn should_cull_back_faces_from_inside() {
    let (_, tree) = sphere_tree(TreeConfig::default());
    let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.3, 0.2, 1.0).normalize());
    assert!(tree.pick(&ray, PickOptions { cull_back_faces: true }).is_none());

    let hit = tree
        .pick(&ray, PickOptions { cull_back_faces: false })
        .expect("inner faces are hit without culling");
    assert!(hit.t > 0.9 && hit.t <= 1.0 + 1e-5, "{}", hit.t);
}

#[test]
fn should_miss_rays_passing_by() {
    let (_, tree) = sphere_tree(TreeConfig::default());
    let ray = Ray::new(Point3::new(3.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
    assert!(tree.pick(&ray, PickOptions::default()).is_none());
    assert!(tree.candidates(&ray).is_empty());

    let away = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 1.0));
    assert!(tree.pick(&away, PickOptions::default()).is_none());
}

#[test]
fn should_query_boxes_like_brute_force() {
    let (triangles, tree) = sphere_tree(TreeConfig::default());
    let areas = [
        Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)),
        Aabb::new(Point3::new(-0.2, 0.9, -0.2), Point3::new(0.2, 1.1, 0.2)),
        Aabb::new(Point3::new(2.0, 2.0, 2.0), Point3::new(3.0, 3.0, 3.0)),
    ];
    for area in &areas {
        let expected: Vec<usize> = (0..triangles.len())
            .filter(|&i| Aabb::from_triangle(&triangles[i]).intersects(area))
            .collect();
        assert_eq!(tree.query_aabb(area), expected);
    }
    assert!(tree.query_aabb(&areas[2]).is_empty());
}

#[test]
fn should_handle_empty_soup() {
    let tree = AabbTree::build(Vec::new(), TreeConfig::default());
    let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
    assert!(tree.is_empty());
    assert!(tree.bounds().is_none());
    assert!(tree.pick(&ray, PickOptions::default()).is_none());
    assert!(tree.candidates(&ray).is_empty());
    assert!(tree.query_aabb(&Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0))).is_empty());
    assert_eq!(tree.stats(), TreeStats::default());
}

#[test]
fn should_report_tree_shape() {
    let (triangles, tree) = sphere_tree(TreeConfig::default());
    let stats = tree.stats();
    assert_eq!(stats.nodes, 2 * stats.leaves - 1);
    assert!(stats.leaves >= triangles.len() / 4);
    assert!(stats.depth > 1 && stats.depth <= 32);

    let bounds = tree.bounds().unwrap();
    assert!(bounds.contains(Point3::new(0.0, 1.0, 0.0)));
    assert!(!bounds.contains(Point3::new(0.0, 1.5, 0.0)));

    let single = AabbTree::build(
        triangles.clone(),
        TreeConfig {
            max_leaf_triangles: triangles.len(),
            max_depth: 32,
        },
    );
    assert_eq!(single.stats(), TreeStats { nodes: 1, leaves: 1, depth: 1 });

    let flat = AabbTree::build(
        triangles,
        TreeConfig {
            max_leaf_triangles: 1,
            max_depth: 0,
        },
    );
    assert_eq!(flat.stats().depth, 1);
}

/// Right triangle with legs of 2 in the plane `z`, facing +z, lower-left corner at (x, y).
fn slab(x: f32, y: f32, z: f32) -> Triangle {
    Triangle::new(
        Point3::new(x, y, z),
        Point3::new(x + 2.0, y, z),
        Point3::new(x, y + 2.0, z),
    )
}

const ONE_PER_LEAF: TreeConfig = TreeConfig {
    max_leaf_triangles: 1,
    max_depth: 32,
};

#[test]
fn should_list_candidates_nearest_first() {
    let depths: [f32; 8] = [5.0, 2.0, 8.0, 1.0, 7.0, 3.0, 6.0, 4.0];
    let soup = depths.iter().map(|d| slab(-1.0, -1.0, -d)).collect();
    let tree = AabbTree::build(soup, ONE_PER_LEAF);
    assert_eq!(tree.stats().leaves, depths.len());

    let ray = Ray::new(Point3::new(-0.25, -0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
    assert_eq!(tree.candidates(&ray), vec![3, 1, 5, 7, 0, 6, 4, 2]);

    let hit = tree.pick(&ray, PickOptions::default()).unwrap();
    assert_eq!(hit.triangle, 3);
    assert_eq!(hit.t, 2.0);
}

#[test]
fn should_pick_lower_index_on_equal_distance() {
    // Far slabs first, then two coplanar slabs that both cover the ray. The
    // one with the higher index sits further left and is visited first.
    let mut soup: Vec<Triangle> = (0..8).map(|i| slab(-1.0, -1.0, -3.0 - i as f32)).collect();
    soup.push(slab(-0.5, -1.0, -1.0));
    soup.push(slab(-1.0, -1.0, -1.0));
    let tree = AabbTree::build(soup, ONE_PER_LEAF);

    let ray = Ray::new(Point3::new(-0.25, -0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
    assert_eq!(&tree.candidates(&ray)[..2], &[9, 8]);
    for cull in [false, true] {
        let hit = tree.pick(&ray, PickOptions { cull_back_faces: cull }).unwrap();
        assert_eq!(hit.t, 2.0);
        assert_eq!(hit.triangle, 8);
    }
}

#[test]
fn should_visit_left_child_first_on_equal_entry() {
    // Both boxes contain the ray origin, so both are entered at t = 0. The
    // left child holds the triangle with the smaller centroid x, index 1.
    let shifted = Triangle::new(
        Point3::new(-1.0, -2.0, -2.0),
        Point3::new(3.0, -2.0, 2.0),
        Point3::new(1.0, 2.0, 0.0),
    );
    let centred = Triangle::new(
        Point3::new(-2.0, -2.0, -2.0),
        Point3::new(2.0, -2.0, 2.0),
        Point3::new(0.0, 2.0, 0.0),
    );
    let tree = AabbTree::build(vec![shifted, centred], ONE_PER_LEAF);
    assert_eq!(tree.stats(), TreeStats { nodes: 3, leaves: 2, depth: 2 });

    for direction in [Vector3::new(0.0, 0.0, -1.0), Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)] {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), direction);
        assert_eq!(tree.candidates(&ray), vec![1, 0], "direction {direction:?}");
    }
}
