//! Loading meshes, textures, models and heightmaps from `./assets`, and
//! uploading CPU meshes to the GPU.

use std::path::PathBuf;

use anyhow::Context as _;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        mesh::MeshData,
        model::{Material, Mesh, Model},
        texture::Texture,
    },
    landscape::Heightmap,
    models::{AnimationRange, Md2Model},
};

pub mod animation;
pub mod texture;

pub use animation::KeyframeAnimation;
pub use texture::normal_map_from_heights;

fn asset_path(file_name: &str) -> PathBuf {
    std::path::Path::new("./").join("assets").join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(file_name);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

pub async fn load_texture(
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    Texture::from_bytes(device, queue, &data, file_name, format, is_normal_map)
}

/// Parse an MD2 model and list the animations encoded in its frame names.
pub async fn load_model_md2(file_name: &str) -> anyhow::Result<(Md2Model, Vec<AnimationRange>)> {
    let data = load_binary(file_name).await?;
    let model = Md2Model::parse(&data).with_context(|| format!("parsing {file_name}"))?;
    let animations = model.animations();
    log::info!(
        "loaded {file_name}: {} frames, {} triangles, {} animations",
        model.frame_count(),
        model.triangles.len(),
        animations.len()
    );
    Ok((model, animations))
}

pub async fn load_heightmap(file_name: &str) -> anyhow::Result<Heightmap> {
    let data = load_binary(file_name).await?;
    let img = image::load_from_memory(&data).with_context(|| format!("decoding {file_name}"))?;
    Heightmap::from_image(&img)
}

/// Upload vertices and indices of `mesh` into fresh GPU buffers.
///
/// The vertex buffer is `COPY_DST` as well, so animated meshes (MD2 frames)
/// can be rewritten in place with [`write_mesh`].
pub fn upload_mesh(device: &wgpu::Device, mesh: &MeshData, name: &str, material: usize) -> Mesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{name} Vertex Buffer")),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{name} Index Buffer")),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
    });
    Mesh {
        name: name.to_string(),
        vertex_buffer,
        index_buffer,
        num_elements: mesh.indices.len() as u32,
        material,
    }
}

/// Overwrite the buffers of `target` with `mesh`, which must have the same
/// vertex and index counts it was uploaded with.
pub fn write_mesh(queue: &wgpu::Queue, target: &Mesh, mesh: &MeshData) -> anyhow::Result<()> {
    anyhow::ensure!(
        mesh.indices.len() as u32 == target.num_elements,
        "mesh {} has {} indices, buffer holds {}",
        target.name,
        mesh.indices.len(),
        target.num_elements
    );
    let bytes: &[u8] = bytemuck::cast_slice(&mesh.vertices);
    anyhow::ensure!(
        bytes.len() as u64 <= target.vertex_buffer.size(),
        "mesh {} grew beyond its vertex buffer",
        target.name
    );
    queue.write_buffer(&target.vertex_buffer, 0, bytes);
    queue.write_buffer(&target.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
    Ok(())
}

/// Single mesh model with one material.
pub fn model_from_mesh(
    device: &wgpu::Device,
    mesh: &MeshData,
    name: &str,
    diffuse: Texture,
    normal: Texture,
    layout: &wgpu::BindGroupLayout,
) -> Model {
    let material = Material::new(device, name, diffuse, normal, layout);
    Model {
        meshes: vec![upload_mesh(device, mesh, name, 0)],
        materials: vec![material],
    }
}

/// Single mesh model painted in one colour with a flat normal map.
pub fn solid_model(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    mesh: &MeshData,
    name: &str,
    rgba: [u8; 4],
    layout: &wgpu::BindGroupLayout,
) -> Model {
    let diffuse = Texture::solid(device, queue, rgba, name, false);
    let normal = Texture::create_default_normal_map(device, queue);
    model_from_mesh(device, mesh, name, diffuse, normal, layout)
}
