//! Data types shared by the CPU side helpers and the GPU pipelines.
//!
//! - `vertex` holds vertex formats and interleaved vertex buffers
//! - `mesh` is CPU mesh data (normals, tangents, triangle soup)
//! - `model` contains GPU meshes, materials and draw helpers
//! - `instance` holds per-instance transforms
//! - `texture` wraps GPU textures

pub mod instance;
pub mod mesh;
pub mod model;
pub mod texture;
pub mod vertex;
