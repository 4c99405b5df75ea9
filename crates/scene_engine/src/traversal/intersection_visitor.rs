//! Intersection traversal
//!
//! Walks the graph depth first while maintaining the model, view,
//! projection and window stacks, and hands the composed transformation to
//! an [`Intersector`] before and after every camera and transform. The
//! republish after the children restores the parent's transformation for
//! the following siblings.

use super::intersector::{IntersectionContext, Intersector};
use super::stacks::MatrixStacks;
use crate::foundation::math::Mat4d;
use crate::scene::{Camera, Geometry, NodeId, NodeVisitor, ReferenceFrame, SceneGraph};

/// Visitor running one intersector over a graph
pub struct IntersectionVisitor<I: Intersector> {
    intersector: I,
    stacks: MatrixStacks,
    node_path: Vec<NodeId>,
    traversal_mask: u32,
}

impl<I: Intersector> IntersectionVisitor<I> {
    /// Visitor with fresh identity stacks
    pub fn new(intersector: I) -> Self {
        Self {
            intersector,
            stacks: MatrixStacks::new(),
            node_path: Vec::new(),
            traversal_mask: u32::MAX,
        }
    }

    /// Restrict the traversal to nodes whose mask overlaps `mask`
    pub fn set_traversal_mask(&mut self, mask: u32) {
        self.traversal_mask = mask;
    }

    /// Reset the stacks and the intersector, then traverse from `root`
    pub fn apply(&mut self, graph: &SceneGraph, root: NodeId) {
        self.reset();
        self.intersector.set_current_transformation(&self.stacks.transformation());
        graph.accept(root, self);
    }

    /// Back to identity stacks and an empty intersector
    pub fn reset(&mut self) {
        self.stacks.reset();
        self.node_path.clear();
        self.intersector.reset();
    }

    /// `window * projection * view * model` at the current depth
    pub fn transformation(&self) -> Mat4d {
        self.stacks.transformation()
    }

    /// Current matrix stacks
    pub fn stacks(&self) -> &MatrixStacks {
        &self.stacks
    }

    /// The intersector and its results
    pub fn intersector(&self) -> &I {
        &self.intersector
    }

    /// Mutable access to the intersector
    pub fn intersector_mut(&mut self) -> &mut I {
        &mut self.intersector
    }

    /// Take the intersector back
    pub fn into_intersector(self) -> I {
        self.intersector
    }

    fn publish_transformation(&mut self) {
        let transformation = self.stacks.transformation();
        self.intersector.set_current_transformation(&transformation);
    }
}

impl<I: Intersector> NodeVisitor for IntersectionVisitor<I> {
    fn traversal_mask(&self) -> u32 {
        self.traversal_mask
    }

    fn apply_group(&mut self, graph: &SceneGraph, id: NodeId) {
        if !self.intersector.enter(graph, id) {
            return;
        }
        self.node_path.push(id);
        self.traverse(graph, id);
        self.node_path.pop();
    }

    fn apply_transform(&mut self, graph: &SceneGraph, id: NodeId, matrix: &Mat4d, frame: ReferenceFrame) {
        if !self.intersector.enter(graph, id) {
            return;
        }

        match frame {
            ReferenceFrame::Absolute => {
                self.stacks.view.push(Mat4d::identity());
                self.stacks.model.push(*matrix);
            }
            ReferenceFrame::Relative => {
                let model = self.stacks.model.top() * matrix;
                self.stacks.model.push(model);
            }
        }
        self.publish_transformation();

        self.node_path.push(id);
        self.traverse(graph, id);
        self.node_path.pop();

        self.stacks.model.pop();
        if frame == ReferenceFrame::Absolute {
            self.stacks.view.pop();
        }
        self.publish_transformation();
    }

    fn apply_camera(&mut self, graph: &SceneGraph, id: NodeId, camera: &Camera) {
        if let Some(viewport) = &camera.viewport {
            self.stacks.window.push(viewport.compute_window_matrix());
        }

        let (projection, view, model) = match camera.reference_frame {
            ReferenceFrame::Relative => (
                self.stacks.projection.top() * camera.projection,
                *self.stacks.view.top(),
                self.stacks.model.top() * camera.view,
            ),
            ReferenceFrame::Absolute => (camera.projection, camera.view, Mat4d::identity()),
        };
        self.stacks.projection.push(projection);
        self.stacks.view.push(view);
        self.stacks.model.push(model);
        self.publish_transformation();

        self.node_path.push(id);
        self.traverse(graph, id);
        self.node_path.pop();

        self.stacks.model.pop();
        self.stacks.view.pop();
        self.stacks.projection.pop();
        if camera.viewport.is_some() {
            self.stacks.window.pop();
        }
        self.publish_transformation();
    }

    fn apply_geometry(&mut self, graph: &SceneGraph, id: NodeId, geometry: &Geometry) {
        if !self.intersector.enter(graph, id) {
            return;
        }

        self.node_path.push(id);
        let ctx = IntersectionContext {
            graph,
            stacks: &self.stacks,
            node_path: &self.node_path,
        };
        self.intersector.intersect(&ctx, id, geometry);
        self.node_path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Vec3d, Viewport};
    use approx::assert_relative_eq;

    /// Records every published transformation and the leaves it reaches
    #[derive(Default)]
    struct TraceIntersector {
        current: Mat4d,
        published: Vec<Mat4d>,
        leaves: Vec<(NodeId, Mat4d, usize)>,
        rejected: Option<NodeId>,
    }

    impl Intersector for TraceIntersector {
        fn enter(&mut self, _graph: &SceneGraph, id: NodeId) -> bool {
            self.rejected != Some(id)
        }

        fn intersect(&mut self, ctx: &IntersectionContext<'_>, id: NodeId, _geometry: &Geometry) {
            self.leaves.push((id, self.current, ctx.node_path.len()));
        }

        fn set_current_transformation(&mut self, transformation: &Mat4d) {
            self.current = *transformation;
            self.published.push(*transformation);
        }
    }

    fn translation(x: f64, y: f64, z: f64) -> Mat4d {
        Mat4d::new_translation(&Vec3d::new(x, y, z))
    }

    #[test]
    fn test_sibling_sees_parent_transformation() {
        let mut graph = SceneGraph::new();
        let root = graph.add_group();
        let moved = graph.add_transform(translation(1.0, 0.0, 0.0));
        let inside = graph.add_geometry(Geometry::default());
        let sibling = graph.add_geometry(Geometry::default());
        graph.add_child(root, moved).unwrap();
        graph.add_child(moved, inside).unwrap();
        graph.add_child(root, sibling).unwrap();

        let mut visitor = IntersectionVisitor::new(TraceIntersector::default());
        visitor.apply(&graph, root);
        let trace = visitor.into_intersector();

        assert_eq!(trace.leaves.len(), 2);
        assert_relative_eq!(trace.leaves[0].1, translation(1.0, 0.0, 0.0));
        assert_eq!(trace.leaves[0].2, 3);
        assert_relative_eq!(trace.leaves[1].1, Mat4d::identity());
        assert_eq!(trace.leaves[1].2, 2);
    }

    #[test]
    fn test_absolute_transform_replaces_model_and_view() {
        let mut graph = SceneGraph::new();
        let camera = graph.add_camera(Camera {
            view: translation(0.0, 0.0, -10.0),
            ..Default::default()
        });
        let outer = graph.add_transform(translation(1.0, 0.0, 0.0));
        let absolute = graph.add_transform(translation(0.0, 2.0, 0.0));
        graph.set_reference_frame(absolute, ReferenceFrame::Absolute).unwrap();
        let leaf = graph.add_geometry(Geometry::default());
        graph.add_child(camera, outer).unwrap();
        graph.add_child(outer, absolute).unwrap();
        graph.add_child(absolute, leaf).unwrap();

        let mut visitor = IntersectionVisitor::new(TraceIntersector::default());
        visitor.apply(&graph, camera);
        let trace = visitor.into_intersector();

        assert_relative_eq!(trace.leaves[0].1, translation(0.0, 2.0, 0.0));
        assert_relative_eq!(*trace.published.last().unwrap(), Mat4d::identity());
    }

    #[test]
    fn test_relative_camera_composes_with_parent() {
        let mut graph = SceneGraph::new();
        let outer = graph.add_camera(Camera {
            projection: Mat4d::new_scaling(2.0),
            viewport: Some(Viewport::new(0.0, 0.0, 100.0, 50.0)),
            ..Default::default()
        });
        let inner = graph.add_camera(Camera {
            view: translation(0.0, 0.0, -5.0),
            projection: Mat4d::new_scaling(3.0),
            ..Default::default()
        });
        let leaf = graph.add_geometry(Geometry::default());
        graph.add_child(outer, inner).unwrap();
        graph.add_child(inner, leaf).unwrap();

        let mut visitor = IntersectionVisitor::new(TraceIntersector::default());
        visitor.apply(&graph, outer);
        let trace = visitor.into_intersector();

        let window = Viewport::new(0.0, 0.0, 100.0, 50.0).compute_window_matrix();
        let expected = window * Mat4d::new_scaling(2.0) * Mat4d::new_scaling(3.0) * translation(0.0, 0.0, -5.0);
        assert_relative_eq!(trace.leaves[0].1, expected, epsilon = 1e-9);
        assert_eq!(visitor_depths_after(&graph, outer), (1, 1, 1, 1));
    }

    #[test]
    fn test_rejected_subgraph_is_skipped() {
        let mut graph = SceneGraph::new();
        let root = graph.add_group();
        let pruned = graph.add_group();
        let hidden = graph.add_geometry(Geometry::default());
        let visible = graph.add_geometry(Geometry::default());
        graph.add_child(root, pruned).unwrap();
        graph.add_child(pruned, hidden).unwrap();
        graph.add_child(root, visible).unwrap();

        let mut visitor = IntersectionVisitor::new(TraceIntersector {
            rejected: Some(pruned),
            ..Default::default()
        });
        visitor.apply(&graph, root);

        let leaves: Vec<_> = visitor.intersector().leaves.iter().map(|leaf| leaf.0).collect();
        assert_eq!(leaves, vec![visible]);
    }

    fn visitor_depths_after(graph: &SceneGraph, root: NodeId) -> (usize, usize, usize, usize) {
        let mut visitor = IntersectionVisitor::new(TraceIntersector::default());
        visitor.apply(graph, root);
        let stacks = visitor.stacks();
        (
            stacks.model.depth(),
            stacks.view.depth(),
            stacks.projection.depth(),
            stacks.window.depth(),
        )
    }
}
