//! Intersector protocol driven by the intersection visitor

use super::stacks::MatrixStacks;
use crate::foundation::math::{Mat4d, Point3d, Vec3d};
use crate::scene::{Geometry, NodeId, SceneGraph};

/// A primitive hit reported by an intersector
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// Sort key: position along a segment, or normalized distance for volumes
    pub ratio: f64,
    /// Nodes from the traversal root down to the hit leaf
    pub node_path: Vec<NodeId>,
    /// Hit point in the leaf's local space
    pub local_point: Vec3d,
    /// Unit face normal in the leaf's local space
    pub local_normal: Vec3d,
    /// Vertex indices of the hit triangle
    pub triangle: [u32; 3],
    /// Model matrix at the leaf
    pub model_matrix: Mat4d,
}

impl Intersection {
    /// Hit point in the space of the traversal root
    pub fn world_point(&self) -> Vec3d {
        self.model_matrix
            .transform_point(&Point3d::from(self.local_point))
            .coords
    }

    /// Leaf that was hit
    pub fn node(&self) -> Option<NodeId> {
        self.node_path.last().copied()
    }
}

/// Insert keeping hits sorted by ratio, ties in arrival order
pub(crate) fn insert_sorted(hits: &mut Vec<Intersection>, hit: Intersection) {
    let index = hits.partition_point(|existing| existing.ratio <= hit.ratio);
    hits.insert(index, hit);
}

/// What an intersector sees when testing a leaf
pub struct IntersectionContext<'a> {
    /// Graph being traversed
    pub graph: &'a SceneGraph,
    /// Matrix stacks at the leaf
    pub stacks: &'a MatrixStacks,
    /// Nodes from the traversal root down to the leaf, inclusive
    pub node_path: &'a [NodeId],
}

/// Pluggable hit test run by [`IntersectionVisitor`](super::IntersectionVisitor)
pub trait Intersector {
    /// Whether the subgraph rooted at `id` may contain hits
    ///
    /// Called before descending into groups, transforms and leaves. The
    /// node's bound is expressed in the space of the last transformation
    /// handed to [`Intersector::set_current_transformation`].
    fn enter(&mut self, graph: &SceneGraph, id: NodeId) -> bool;

    /// Test the primitives of a geometry leaf
    fn intersect(&mut self, ctx: &IntersectionContext<'_>, id: NodeId, geometry: &Geometry);

    /// Local to window transformation valid for the nodes visited next
    fn set_current_transformation(&mut self, transformation: &Mat4d);

    /// Forget the hits of a previous traversal
    fn reset(&mut self) {}
}
