//! Depth-first node visitor

use super::graph::SceneGraph;
use super::node::{Camera, Geometry, NodeId, ReferenceFrame};
use crate::foundation::math::Mat4d;

/// Visitor with one entry point per node kind
///
/// Every entry point defaults to visiting the children, so an implementor
/// only overrides the kinds it cares about. Dispatch goes through
/// [`SceneGraph::accept`].
pub trait NodeVisitor {
    /// Mask tested against each node's mask; zero overlap skips the node
    fn traversal_mask(&self) -> u32 {
        u32::MAX
    }

    /// Visit a group
    fn apply_group(&mut self, graph: &SceneGraph, id: NodeId) {
        self.traverse(graph, id);
    }

    /// Visit a transform
    fn apply_transform(&mut self, graph: &SceneGraph, id: NodeId, _matrix: &Mat4d, _frame: ReferenceFrame) {
        self.traverse(graph, id);
    }

    /// Visit a camera
    fn apply_camera(&mut self, graph: &SceneGraph, id: NodeId, _camera: &Camera) {
        self.traverse(graph, id);
    }

    /// Visit a geometry leaf
    fn apply_geometry(&mut self, _graph: &SceneGraph, _id: NodeId, _geometry: &Geometry) {}

    /// Visit every child in order
    fn traverse(&mut self, graph: &SceneGraph, id: NodeId) {
        for &child in graph.children(id) {
            graph.accept(child, self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeKind;

    #[derive(Default)]
    struct CollectVisitor {
        visited: Vec<NodeId>,
        mask: u32,
    }

    impl NodeVisitor for CollectVisitor {
        fn traversal_mask(&self) -> u32 {
            self.mask
        }

        fn apply_group(&mut self, graph: &SceneGraph, id: NodeId) {
            self.visited.push(id);
            self.traverse(graph, id);
        }

        fn apply_geometry(&mut self, _graph: &SceneGraph, id: NodeId, _geometry: &Geometry) {
            self.visited.push(id);
        }
    }

    #[test]
    fn test_depth_first_order_and_mask() {
        let mut graph = SceneGraph::new();
        let root = graph.add_group();
        let left = graph.add_group();
        let leaf = graph.add_node(NodeKind::Geometry(Geometry::default()));
        let hidden = graph.add_group();
        graph.add_child(root, left).unwrap();
        graph.add_child(left, leaf).unwrap();
        graph.add_child(root, hidden).unwrap();
        graph.set_node_mask(hidden, 0b10).unwrap();

        let mut visitor = CollectVisitor {
            mask: 0b01,
            ..Default::default()
        };
        graph.accept(root, &mut visitor);
        assert_eq!(visitor.visited, vec![root, left, leaf]);
    }
}
