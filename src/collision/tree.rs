//! Bounding volume hierarchy over a triangle soup.
//!
//! The tree is stored as an arena: nodes refer to their children by index and
//! leaves refer to a contiguous run of the `order` permutation, which maps back
//! to the caller's triangle indices. Every query reports the caller's indices.

use std::{cmp::Ordering, collections::BinaryHeap};

use cgmath::Point3;

use crate::{
    collision::aabb::Aabb,
    geometry::{Ray, Triangle},
};

/// Build parameters for [`AabbTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// A node holding at most this many triangles is not split any further.
    pub max_leaf_triangles: usize,
    /// Nodes at this depth (root = 0) become leaves regardless of their size.
    pub max_depth: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_leaf_triangles: 4,
            max_depth: 32,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PickOptions {
    pub cull_back_faces: bool,
}

/// Nearest exact intersection found by [`AabbTree::pick`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Index into the triangle soup the tree was built from.
    pub triangle: usize,
    pub t: f32,
    pub point: Point3<f32>,
    pub u: f32,
    pub v: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub nodes: usize,
    pub leaves: usize,
    /// Number of levels; a tree made of a single leaf has depth 1.
    pub depth: usize,
}

#[derive(Clone, Debug)]
enum Node {
    Leaf {
        bounds: Aabb,
        first: usize,
        count: usize,
    },
    Branch {
        bounds: Aabb,
        left: usize,
        right: usize,
    },
}

impl Node {
    fn bounds(&self) -> &Aabb {
        match self {
            Node::Leaf { bounds, .. } | Node::Branch { bounds, .. } => bounds,
        }
    }
}

/// Node waiting to be visited, ordered by entry distance.
///
/// `seq` is the insertion order so that equal distances visit the node that
/// was queued first (the left child) first.
#[derive(Clone, Copy, Debug)]
struct Pending {
    t: f32,
    seq: usize,
    node: usize,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed so that `BinaryHeap` pops the nearest node first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .t
            .total_cmp(&self.t)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Best-first traversal queue shared by the ray queries.
struct Frontier {
    heap: BinaryHeap<Pending>,
    seq: usize,
}

impl Frontier {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    fn push(&mut self, t: f32, node: usize) {
        self.heap.push(Pending {
            t,
            seq: self.seq,
            node,
        });
        self.seq += 1;
    }

    fn pop(&mut self) -> Option<Pending> {
        self.heap.pop()
    }
}

/// Axis-aligned bounding box tree used for ray picking and box queries.
#[derive(Clone, Debug)]
pub struct AabbTree {
    triangles: Vec<Triangle>,
    triangle_bounds: Vec<Aabb>,
    order: Vec<usize>,
    nodes: Vec<Node>,
    levels: usize,
}

impl AabbTree {
    pub fn build(triangles: Vec<Triangle>, config: TreeConfig) -> Self {
        let config = TreeConfig {
            max_leaf_triangles: config.max_leaf_triangles.max(1),
            ..config
        };
        let triangle_bounds: Vec<Aabb> = triangles.iter().map(Aabb::from_triangle).collect();
        let centroids: Vec<Point3<f32>> = triangles.iter().map(Triangle::centroid).collect();
        let mut tree = Self {
            order: (0..triangles.len()).collect(),
            triangles,
            triangle_bounds,
            nodes: Vec::new(),
            levels: 0,
        };
        if !tree.triangles.is_empty() {
            let n = tree.triangles.len();
            tree.build_node(&centroids, 0, n, 0, &config);
        }
        log::debug!(
            "built AABB tree over {} triangles: {:?}",
            tree.triangles.len(),
            tree.stats()
        );
        tree
    }

    fn build_node(
        &mut self,
        centroids: &[Point3<f32>],
        start: usize,
        end: usize,
        depth: usize,
        config: &TreeConfig,
    ) -> usize {
        let bounds = self.order[start..end]
            .iter()
            .fold(Aabb::empty(), |acc, &i| acc.union(&self.triangle_bounds[i]));
        let centroid_bounds = self.order[start..end]
            .iter()
            .fold(Aabb::empty(), |acc, &i| acc.grow(centroids[i]));
        let axis = centroid_bounds.longest_axis();
        let spread = centroid_bounds.extent()[axis];
        let count = end - start;
        let index = self.nodes.len();
        self.levels = self.levels.max(depth + 1);

        if count <= config.max_leaf_triangles || depth >= config.max_depth || spread <= 0.0 {
            self.nodes.push(Node::Leaf {
                bounds,
                first: start,
                count,
            });
            return index;
        }

        self.order[start..end].sort_by(|&a, &b| {
            centroids[a][axis]
                .total_cmp(&centroids[b][axis])
                .then(a.cmp(&b))
        });
        let mid = start + count / 2;

        // Reserve the slot so the parent precedes its children in the arena.
        self.nodes.push(Node::Leaf {
            bounds,
            first: start,
            count: 0,
        });
        let left = self.build_node(centroids, start, mid, depth + 1, config);
        let right = self.build_node(centroids, mid, end, depth + 1, config);
        self.nodes[index] = Node::Branch {
            bounds,
            left,
            right,
        };
        index
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn triangle(&self, index: usize) -> Option<&Triangle> {
        self.triangles.get(index)
    }

    /// Bounds of the whole soup, `None` for an empty tree.
    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| *n.bounds())
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            nodes: self.nodes.len(),
            leaves: self
                .nodes
                .iter()
                .filter(|n| matches!(n, Node::Leaf { .. }))
                .count(),
            depth: self.levels,
        }
    }

    fn leaf_triangles(&self, first: usize, count: usize) -> &[usize] {
        &self.order[first..first + count]
    }

    fn frontier(&self, ray: &Ray) -> Frontier {
        let mut frontier = Frontier::new();
        if let Some((t, _)) = self.nodes.first().and_then(|n| n.bounds().intersect_ray(ray)) {
            frontier.push(t, 0);
        }
        frontier
    }

    /// Triangles stored in every leaf whose box is crossed by `ray`.
    ///
    /// Leaves are reported nearest entry distance first. Within a leaf the
    /// triangles keep their build order.
    pub fn candidates(&self, ray: &Ray) -> Vec<usize> {
        let mut out = Vec::new();
        let mut frontier = self.frontier(ray);
        while let Some(pending) = frontier.pop() {
            match &self.nodes[pending.node] {
                Node::Leaf { first, count, .. } => {
                    out.extend_from_slice(self.leaf_triangles(*first, *count));
                }
                Node::Branch { left, right, .. } => {
                    for child in [*left, *right] {
                        if let Some((t, _)) = self.nodes[child].bounds().intersect_ray(ray) {
                            frontier.push(t, child);
                        }
                    }
                }
            }
        }
        out
    }

    /// Nearest triangle hit by `ray`.
    ///
    /// Hits at exactly the same distance resolve to the lowest triangle index.
    pub fn pick(&self, ray: &Ray, options: PickOptions) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        let mut frontier = self.frontier(ray);
        while let Some(pending) = frontier.pop() {
            if best.is_some_and(|b| pending.t > b.t) {
                break;
            }
            match &self.nodes[pending.node] {
                Node::Leaf { first, count, .. } => {
                    for &index in self.leaf_triangles(*first, *count) {
                        let Some(hit) = self.triangles[index].intersect(ray, options.cull_back_faces)
                        else {
                            continue;
                        };
                        let closer = match best {
                            None => true,
                            Some(b) => hit.t < b.t || (hit.t == b.t && index < b.triangle),
                        };
                        if closer {
                            best = Some(RayHit {
                                triangle: index,
                                t: hit.t,
                                point: ray.at(hit.t),
                                u: hit.u,
                                v: hit.v,
                            });
                        }
                    }
                }
                Node::Branch { left, right, .. } => {
                    for child in [*left, *right] {
                        let Some((t, _)) = self.nodes[child].bounds().intersect_ray(ray) else {
                            continue;
                        };
                        if best.is_none_or(|b| t <= b.t) {
                            frontier.push(t, child);
                        }
                    }
                }
            }
        }
        best
    }

    /// Triangles whose own bounds overlap `area`, in ascending index order.
    pub fn query_aabb(&self, area: &Aabb) -> Vec<usize> {
        let mut out = Vec::new();
        if self.nodes.is_empty() {
            return out;
        }
        let mut stack = vec![0];
        while let Some(node) = stack.pop() {
            let node = &self.nodes[node];
            if !node.bounds().intersects(area) {
                continue;
            }
            match node {
                Node::Leaf { first, count, .. } => out.extend(
                    self.leaf_triangles(*first, *count)
                        .iter()
                        .copied()
                        .filter(|&i| self.triangle_bounds[i].intersects(area)),
                ),
                Node::Branch { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_pops_nearest_then_oldest() {
        let mut frontier = Frontier::new();
        frontier.push(2.0, 10);
        frontier.push(1.0, 11);
        frontier.push(1.0, 12);
        let order: Vec<usize> = std::iter::from_fn(|| frontier.pop().map(|p| p.node)).collect();
        assert_eq!(order, vec![11, 12, 10]);
    }
}
