//! mini-api
//!
//! A small helper library for graphics demos: geometry, vertex buffers,
//! procedural shapes, shader compilation, MD2 models and AABB-tree picking,
//! plus a wgpu/winit runtime that drives demos through a fixed set of
//! callbacks (init, resize, update, render, touch, final).
//!
//! High-level modules
//! - `geometry`: rays, planes, triangles and rectangles
//! - `camera`: camera, projection, orbit controller and screen rays
//! - `data_structures`: vertices, meshes, models, instances, textures
//! - `shapes`: procedural meshes (sphere, cube, plane, quad)
//! - `shader`: WGSL sources and compilation diagnostics
//! - `models`: the MD2 model format
//! - `collision`: bounding boxes and the AABB tree used for picking
//! - `landscape`: heightmaps and terrain meshes
//! - `sim`: CPU simulations of the starfield and breakout demos
//! - `pipelines`: the basic, flat and plasma render pipelines
//! - `resources`: asset loading and mesh upload
//! - `context`: GPU and window context
//! - `flow`: the demo callback surface and the event loop
//! - `render`: render composition for pipeline reuse
//! - `pick`: CPU picking across flows

pub mod camera;
pub mod collision;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod geometry;
pub mod landscape;
pub mod models;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod shader;
pub mod shapes;
pub mod sim;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
pub use winit::keyboard::{KeyCode, PhysicalKey};
