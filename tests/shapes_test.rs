use cgmath::{EuclideanSpace, InnerSpace, Vector2, Vector3};
use mini_api::{
    data_structures::{
        mesh::MeshData,
        vertex::{VertexBufferBuilder, VertexFormat},
    },
    geometry::Rect,
    pipelines::flat::{FLAT_FORMAT, FlatBatch},
    shapes,
};

/// Every triangle faces away from the origin.
fn assert_outward(mesh: &MeshData) {
    for tri in mesh.triangles() {
        if tri.area() < 1e-6 {
            continue;
        }
        assert!(tri.cross().dot(tri.centroid().to_vec()) > 0.0, "{:?}", tri);
    }
}

#[test]
fn should_build_closed_sphere() {
    let sphere = shapes::sphere(2.0, 8, 12);
    assert_eq!(sphere.vertices.len(), 9 * 13);
    // Pole rings contribute one triangle per segment.
    assert_eq!(sphere.triangle_count(), 2 * 12 * 7);
    assert!(sphere.validate().is_ok());
    for v in &sphere.vertices {
        let p = Vector3::from(v.position);
        assert!((p.magnitude() - 2.0).abs() < 1e-5);
        assert!((Vector3::from(v.normal) - p / 2.0).magnitude() < 1e-5);
    }
    assert_outward(&sphere);
}

#[test]
fn should_clamp_sphere_resolution() {
    let sphere = shapes::sphere(1.0, 0, 0);
    assert_eq!(sphere.vertices.len(), 3 * 4);
    assert_eq!(sphere.triangle_count(), 2 * 3);
    assert_outward(&sphere);
}

#[test]
fn should_build_cube_faces() {
    let cube = shapes::cube(2.0);
    assert_eq!(cube.vertices.len(), 24);
    assert_eq!(cube.indices.len(), 36);
    let bounds = cube.bounds().unwrap();
    assert_eq!(bounds.min, cgmath::Point3::new(-1.0, -1.0, -1.0));
    assert_eq!(bounds.max, cgmath::Point3::new(1.0, 1.0, 1.0));
    assert_outward(&cube);
    for tri in cube.triangles() {
        assert!((tri.area() - 2.0).abs() < 1e-5);
    }
}

#[test]
fn should_face_grids_up() {
    let plane = shapes::plane(4.0, 2.0, 4, 2);
    assert_eq!(plane.vertices.len(), 15);
    assert_eq!(plane.indices.len(), 48);
    assert!(plane.triangles().iter().all(|t| t.normal().y > 0.999));
    assert_eq!(plane.vertices[0].position, [-2.0, 0.0, -1.0]);
    assert_eq!(plane.vertices[14].tex_coords, [1.0, 1.0]);
}

#[test]
fn should_orient_quad_tangents() {
    let quad = shapes::quad(2.0, 2.0);
    assert!(quad.triangles().iter().all(|t| t.normal().z > 0.999));
    for v in &quad.vertices {
        let tangent = Vector3::from(v.tangent).normalize();
        let bitangent = Vector3::from(v.bitangent).normalize();
        assert!((tangent - Vector3::unit_x()).magnitude() < 1e-5, "{:?}", v.tangent);
        assert!((bitangent - Vector3::unit_y()).magnitude() < 1e-5, "{:?}", v.bitangent);
        assert!((tangent.cross(bitangent) - Vector3::from(v.normal)).magnitude() < 1e-5);
    }
}

#[test]
fn should_interleave_requested_attributes() {
    let quad = shapes::quad(1.0, 1.0);
    let format = VertexFormat::POSITION | VertexFormat::TEXCOORD;
    let builder = VertexBufferBuilder::from_mesh(format, &quad, [1.0; 4]).unwrap();
    assert_eq!(format.components(), 5);
    assert_eq!(format.stride(), 20);
    assert_eq!(builder.vertex_count(), 4);
    assert_eq!(builder.floats().len(), 20);
    assert_eq!(&builder.floats()[..5], &[-0.5, -0.5, 0.0, 0.0, 1.0]);

    let attributes = format.attributes(0);
    assert_eq!(attributes.len(), 2);
    assert_eq!(attributes[1].offset, 12);
    assert_eq!(attributes[1].shader_location, 1);
    assert_eq!(attributes[1].format, wgpu::VertexFormat::Float32x2);

    assert!(VertexBufferBuilder::new(VertexFormat::empty()).is_err());
}

#[test]
fn should_append_meshes() {
    let mut mesh = shapes::quad(1.0, 1.0);
    mesh.append(&shapes::quad(1.0, 1.0));
    assert_eq!(mesh.vertices.len(), 8);
    assert_eq!(&mesh.indices[6..], &[4, 5, 6, 4, 6, 7]);
    assert!(mesh.validate().is_ok());

    mesh.indices.push(99);
    assert!(mesh.validate().is_err());
}

#[test]
fn should_start_flat_batches_empty() {
    let mut batch = FlatBatch::new();
    assert_eq!((batch.vertex_count(), batch.index_count()), (0, 0));
    assert!(batch.vertex_bytes().is_empty());
    assert_eq!(FLAT_FORMAT.stride(), 28);

    batch.rect(&Rect::new(Vector2::new(-1.0, -1.0), Vector2::new(0.0, 0.5)), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!((batch.vertex_count(), batch.index_count()), (4, 6));
    assert_eq!(batch.vertex_bytes().len(), 4 * 28);
    assert_eq!(batch.index_bytes().len(), 6 * 4);

    batch.clear();
    assert_eq!(batch.vertex_count(), 0);
}
