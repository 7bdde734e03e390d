use image::{DynamicImage, GrayImage, Luma};
use mini_api::{
    landscape::{Heightmap, MAX_DETAIL},
    resources::normal_map_from_heights,
};

fn ramp() -> Heightmap {
    // Rises along x, constant along z.
    Heightmap::new(2, 2, vec![0.0, 1.0, 0.0, 1.0]).unwrap()
}

#[test]
fn should_generate_normalised_square_maps() {
    let map = Heightmap::generate(3, 0.5, 7).unwrap();
    assert_eq!((map.width, map.depth), (9, 9));
    assert_eq!(map.heights.len(), 81);
    assert!(map.heights.iter().all(|h| (0.0..=1.0).contains(h)));
    assert!(map.heights.iter().any(|&h| h == 0.0));
    assert!(map.heights.iter().any(|&h| h == 1.0));
}

#[test]
fn should_generate_deterministically() {
    let a = Heightmap::generate(4, 0.6, 1234).unwrap();
    let b = Heightmap::generate(4, 0.6, 1234).unwrap();
    let c = Heightmap::generate(4, 0.6, 4321).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn should_reject_invalid_detail() {
    assert!(Heightmap::generate(0, 0.5, 1).is_err());
    assert!(Heightmap::generate(MAX_DETAIL + 1, 0.5, 1).is_err());
}

#[test]
fn should_validate_dimensions() {
    assert!(Heightmap::new(1, 4, vec![0.0; 4]).is_err());
    assert!(Heightmap::new(2, 2, vec![0.0; 3]).is_err());
    assert!(Heightmap::new(3, 2, vec![0.0; 6]).is_ok());
}

#[test]
fn should_interpolate_heights() {
    let map = ramp();
    assert_eq!(map.height_at(0.5, 0.5), 0.5);
    assert_eq!(map.height_at(0.25, 0.0), 0.25);
    assert_eq!(map.height_at(-3.0, 0.0), 0.0);
    assert_eq!(map.height_at(5.0, 5.0), 1.0);
    assert_eq!(map.sample(0.6, 0.0), 1.0);
    assert_eq!(map.sample(0.4, 9.0), 0.0);
}

#[test]
fn should_sample_world_positions() {
    let map = ramp();
    assert_eq!(map.world_size(4.0), (4.0, 4.0));
    // The mesh is centred, so the world origin is the middle of the map.
    assert_eq!(map.height_at_world(0.0, 0.0, 4.0, 10.0), 5.0);
    assert_eq!(map.height_at_world(2.0, -2.0, 4.0, 10.0), 10.0);
}

#[test]
fn should_build_terrain_mesh() {
    let map = Heightmap::new(3, 3, vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0, 0.0, 0.5, 1.0]).unwrap();
    let mesh = map.to_mesh(1.0, 2.0);
    assert_eq!(mesh.vertices.len(), 9);
    assert_eq!(mesh.indices.len(), 24);
    assert!(mesh.validate().is_ok());
    assert_eq!(mesh.vertices[0].position, [-1.0, 0.0, -1.0]);
    assert_eq!(mesh.vertices[8].position, [1.0, 2.0, 1.0]);
    assert_eq!(mesh.vertices[8].tex_coords, [1.0, 1.0]);
    for v in &mesh.vertices {
        // Slope rises along +x, so normals lean towards -x.
        assert!(v.normal[1] > 0.0 && v.normal[0] < 0.0, "{:?}", v.normal);
    }
}

#[test]
fn should_read_heights_from_luminance() {
    let mut img = GrayImage::new(2, 2);
    img.put_pixel(1, 0, Luma([255]));
    img.put_pixel(0, 1, Luma([51]));
    let map = Heightmap::from_image(&DynamicImage::ImageLuma8(img)).unwrap();
    assert_eq!(map.heights, vec![0.0, 1.0, 0.2, 0.0]);

    let too_small = DynamicImage::ImageLuma8(GrayImage::new(1, 8));
    assert!(Heightmap::from_image(&too_small).is_err());
}

#[test]
fn should_derive_normal_maps() {
    let img = normal_map_from_heights(&ramp(), 1.0);
    assert_eq!(img.dimensions(), (2, 2));
    for pixel in img.pixels() {
        assert!(pixel[0] < 128);
        assert_eq!(pixel[1], 128);
        assert!(pixel[2] > 128);
        assert_eq!(pixel[3], 255);
    }
}
