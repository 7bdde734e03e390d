//! Collision detection: bounding boxes and the AABB tree used for picking.
//!
//! A typical picking setup extracts the triangle soup of a mesh, builds an
//! [`AabbTree`] once, and then resolves one ray per frame (or per touch):
//!
//! ```
//! use mini_api::{collision::{AabbTree, PickOptions, TreeConfig}, geometry::Ray, shapes};
//! use cgmath::{Point3, Vector3};
//!
//! let sphere = shapes::sphere(1.0, 8, 12);
//! let tree = AabbTree::from_mesh(&sphere, TreeConfig::default());
//! let ray = Ray::new(Point3::new(0.05, 0.03, 5.0), Vector3::new(0.0, 0.0, -1.0));
//! let hit = tree.pick(&ray, PickOptions::default()).unwrap();
//! assert!((hit.t - 4.0).abs() < 0.1);
//! ```

pub mod aabb;
pub mod tree;

pub use aabb::Aabb;
pub use tree::{AabbTree, PickOptions, RayHit, TreeConfig, TreeStats};

use crate::data_structures::mesh::MeshData;

impl AabbTree {
    /// Build a tree over the triangles of `mesh`; triangle `i` is the `i`th index triple.
    pub fn from_mesh(mesh: &MeshData, config: TreeConfig) -> Self {
        Self::build(mesh.triangles(), config)
    }
}
