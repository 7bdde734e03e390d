//! Object picking on the CPU.
//!
//! When a touch (or left click) begins, the runtime casts a ray from the
//! pointer through the camera and tests it against every [`Collider`] the
//! flows returned from `on_render`. Each instance is tested in its own model
//! space: the ray is moved by the inverse instance transform, so one AABB tree
//! serves every instance. The nearest hit wins and `on_click` is dispatched
//! only to the flows that rendered the hit id.

use std::collections::{HashMap, HashSet};

use cgmath::Transform;

use crate::{
    collision::PickOptions,
    flow::GraphicsFlow,
    geometry::Ray,
    render::Collider,
};

/// The object under the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pick {
    /// Id of the `Instanced` render that was hit.
    pub id: u32,
    /// Index into the collider's instances.
    pub instance: usize,
    /// Index of the triangle in the collider's triangle soup.
    pub triangle: usize,
    /// Ray parameter of the hit.
    pub t: f32,
    /// Hit position in world space.
    pub point: cgmath::Point3<f32>,
}

/// Nearest hit of `ray` among `colliders`. Earlier entries win ties.
pub fn pick_nearest(ray: &Ray, colliders: &[(u32, Collider<'_>)]) -> Option<Pick> {
    let options = PickOptions {
        cull_back_faces: true,
    };
    let mut best: Option<Pick> = None;
    for (id, collider) in colliders {
        for (index, instance) in collider.instances.iter().enumerate() {
            let Some(inverse) = instance.inverse_matrix() else {
                log::debug!("skipping degenerate instance {index} of id {id}");
                continue;
            };
            let local = ray.transform(&inverse);
            let Some(hit) = collider.tree.pick(&local, options) else {
                continue;
            };
            if best.is_some_and(|b| b.t <= hit.t) {
                continue;
            }
            best = Some(Pick {
                id: *id,
                instance: index,
                triangle: hit.triangle,
                t: hit.t,
                point: instance.to_matrix().transform_point(hit.point),
            });
        }
    }
    best
}

/// Resolve `ray` against everything the flows render and find the owners of
/// the hit object.
pub fn pick_flows<State, Event>(
    flows: &[Box<dyn GraphicsFlow<State, Event>>],
    ray: &Ray,
) -> Option<(Pick, HashSet<usize>)> {
    let mut owners: HashMap<u32, HashSet<usize>> = HashMap::new();
    let mut colliders = Vec::new();
    for (flow_id, flow) in flows.iter().enumerate() {
        let render = flow.on_render();
        render.map_ids(flow_id, &mut owners);
        render.colliders(&mut colliders);
    }
    if colliders.is_empty() {
        return None;
    }

    let pick = pick_nearest(ray, &colliders)?;
    log::debug!("picked {:?}", pick);
    let flow_ids = owners.remove(&pick.id).unwrap_or_default();
    Some((pick, flow_ids))
}
