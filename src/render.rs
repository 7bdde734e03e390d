//! Render composition and pipeline batching.
//!
//! Flows describe what to draw each frame with a [`Render`]. The runtime walks
//! the render tree once per frame, sorts instanced models and flat geometry
//! into per-pipeline batches and runs custom closures in place, so every
//! pipeline is bound once no matter how many flows use it.
//!
//! # Key types
//!
//! - [`Render<'a, 'pass>`] is the primary enum describing render operations
//! - [`Instanced<'a>`] is a model drawn once per entry of an instance buffer
//! - [`Flat<'a>`] is coloured 2D geometry in clip space
//! - [`Collider<'a>`] makes an instanced model pickable

use std::collections::{HashMap, HashSet};

use wgpu::RenderPass;

use crate::{
    collision::AabbTree,
    context::Context,
    data_structures::{instance::Instance, model::Model},
    pipelines::flat::FlatBuffers,
};

/// CPU side shape of an instanced model, tested by the picker.
///
/// `tree` is built in model space; `instances` must mirror the contents of
/// the instance buffer so every instance can be tested in its own space.
#[derive(Clone, Copy, Debug)]
pub struct Collider<'a> {
    pub tree: &'a AabbTree,
    pub instances: &'a [Instance],
}

/// A model drawn `amount` times with the basic pipeline.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
    pub id: u32,
    pub collider: Option<Collider<'a>>,
}

/// Indexed triangles in the flat vertex format (position + colour).
pub struct Flat<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    /// Number of indices to draw.
    pub amount: u32,
    pub id: u32,
}

impl<'a> From<&'a FlatBuffers> for Flat<'a> {
    fn from(buffers: &'a FlatBuffers) -> Self {
        Self {
            vertex: &buffers.vertex,
            index: &buffers.index,
            amount: buffers.amount,
            id: 0,
        }
    }
}

/// Specifies how a flow's objects are drawn this frame.
///
/// - `None` renders nothing
/// - `Default(Instanced)` and `Defaults(Vec<Instanced>)` use the lit basic pipeline
/// - `Flat(Flat)` and `Flats(Vec<Flat>)` use the 2D colour pipeline, drawn on top
/// - `Composed(Vec<Render>)` nests any of the above
/// - `Custom(...)` runs a closure on the render pass before the batches, for
///   effects with their own pipeline
pub enum Render<'a, 'pass>
where
    'pass: 'a,
{
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Flat(Flat<'a>),
    Flats(Vec<Flat<'a>>),
    Composed(Vec<Render<'a, 'pass>>),
    Custom(Box<dyn 'a + FnOnce(&Context, &mut RenderPass<'pass>)>),
}

/// Per-pipeline batches collected from all flows.
#[derive(Default)]
pub(crate) struct Batches<'a> {
    pub basics: Vec<Instanced<'a>>,
    pub flats: Vec<Flat<'a>>,
}

impl<'a, 'pass> Render<'a, 'pass> {
    /// Record which flows own which object ids.
    pub(crate) fn map_ids(&self, flow_id: usize, map: &mut HashMap<u32, HashSet<usize>>) {
        let mut insert = |id: u32| {
            map.entry(id).or_default().insert(flow_id);
        };
        match self {
            Render::Default(instanced) => insert(instanced.id),
            Render::Defaults(vec) => vec.iter().for_each(|instanced| insert(instanced.id)),
            Render::Flat(flat) => insert(flat.id),
            Render::Flats(vec) => vec.iter().for_each(|flat| insert(flat.id)),
            Render::Composed(renders) => renders
                .iter()
                .for_each(|render| render.map_ids(flow_id, map)),
            Render::None | Render::Custom(_) => (),
        }
    }

    /// Every pickable instanced model, with its id.
    pub(crate) fn colliders(&self, out: &mut Vec<(u32, Collider<'a>)>) {
        match self {
            Render::Default(instanced) => out.extend(instanced.collider.map(|c| (instanced.id, c))),
            Render::Defaults(vec) => {
                out.extend(vec.iter().filter_map(|i| i.collider.map(|c| (i.id, c))))
            }
            Render::Composed(renders) => renders.iter().for_each(|render| render.colliders(out)),
            Render::None | Render::Flat(_) | Render::Flats(_) | Render::Custom(_) => (),
        }
    }

    pub(crate) fn set_pipelines(
        self,
        ctx: &Context,
        render_pass: &mut RenderPass<'pass>,
        batches: &mut Batches<'a>,
    ) {
        match self {
            Render::Default(instanced) => batches.basics.push(instanced),
            Render::Defaults(mut vec) => batches.basics.append(&mut vec),
            Render::Flat(flat) => batches.flats.push(flat),
            Render::Flats(mut vec) => batches.flats.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(ctx, render_pass, batches)),
            Render::Custom(f) => f(ctx, render_pass),
            Render::None => (),
        }
    }
}

impl<'a, 'pass> From<Instanced<'a>> for Render<'a, 'pass> {
    fn from(instanced: Instanced<'a>) -> Self {
        Render::Default(instanced)
    }
}

impl<'a, 'pass> From<Flat<'a>> for Render<'a, 'pass> {
    fn from(flat: Flat<'a>) -> Self {
        Render::Flat(flat)
    }
}
