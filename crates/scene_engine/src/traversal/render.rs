//! # Render Traversal
//!
//! Collects the drawable leaves of a graph into a [`RenderBin`], then draws
//! them through a [`State`] so that only state changes between consecutive
//! leaves reach the graphics context.
//!
//! ## Architecture
//!
//! - **RenderVisitor**: walks the graph with the same matrix stacks as the
//!   intersection visitor and records one leaf per geometry
//! - **RenderLeaf**: state path, model-view and projection for one geometry
//! - **RenderBin**: sorts leaves so those sharing a state path are
//!   contiguous, then replays them

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::stacks::MatrixStacks;
use crate::foundation::math::{to_f32, Mat4d};
use crate::gfx::GraphicsContext;
use crate::scene::{Camera, Geometry, NodeId, NodeKind, NodeVisitor, ReferenceFrame, SceneGraph};
use crate::state::{State, StateSet};

/// Uniform receiving the model-view matrix
pub const MODEL_VIEW_UNIFORM: &str = "ModelViewMatrix";
/// Uniform receiving the projection matrix
pub const PROJECTION_UNIFORM: &str = "ProjectionMatrix";

/// One geometry to draw
#[derive(Debug, Clone)]
pub struct RenderLeaf {
    /// State sets from the root down to the geometry, inclusive
    pub state_path: Vec<Rc<StateSet>>,
    /// Model-view matrix at the geometry
    pub model_view: Mat4d,
    /// Projection matrix at the geometry
    pub projection: Mat4d,
    /// Geometry node
    pub geometry: NodeId,
}

impl RenderLeaf {
    /// State set identities along the path
    fn path_key(&self) -> Vec<*const StateSet> {
        self.state_path.iter().map(Rc::as_ptr).collect()
    }
}

/// Leaves collected for one frame
#[derive(Debug, Default)]
pub struct RenderBin {
    leaves: Vec<RenderLeaf>,
}

impl RenderBin {
    /// Create an empty bin
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf
    pub fn push(&mut self, leaf: RenderLeaf) {
        self.leaves.push(leaf);
    }

    /// Leaves in draw order
    pub fn leaves(&self) -> &[RenderLeaf] {
        &self.leaves
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether nothing was collected
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Drop every leaf
    pub fn clear(&mut self) {
        self.leaves.clear();
    }

    /// Make leaves sharing a state path contiguous
    ///
    /// Groups keep the order in which their first leaf was collected, and
    /// leaves keep their order within a group.
    pub fn sort(&mut self) {
        let mut first_seen: HashMap<Vec<*const StateSet>, usize> = HashMap::new();
        let groups: Vec<usize> = self
            .leaves
            .iter()
            .map(|leaf| {
                let next = first_seen.len();
                *first_seen.entry(leaf.path_key()).or_insert(next)
            })
            .collect();

        let mut order: Vec<usize> = (0..self.leaves.len()).collect();
        order.sort_by_key(|&index| groups[index]);

        let mut slots: Vec<Option<RenderLeaf>> = self.leaves.drain(..).map(Some).collect();
        self.leaves = order.into_iter().filter_map(|index| slots[index].take()).collect();
    }

    /// Replay the leaves through the state and return the number of draw calls
    ///
    /// Moving from one leaf to the next pops the state sets that are not
    /// shared and pushes the new ones, so `apply` only sees real changes.
    pub fn draw(&self, state: &mut State, gl: &mut dyn GraphicsContext, graph: &SceneGraph) -> usize {
        let base_depth = state.state_set_stack_size();
        let mut current: Vec<Rc<StateSet>> = Vec::new();
        let mut draws = 0;

        for leaf in &self.leaves {
            let Some(NodeKind::Geometry(geometry)) = graph.get(leaf.geometry).map(|node| node.kind()) else {
                log::warn!("Skipping render leaf for missing geometry {:?}", leaf.geometry);
                continue;
            };

            let common = common_prefix(&current, &leaf.state_path);
            while current.len() > common {
                state.pop_state_set();
                current.pop();
            }
            for state_set in &leaf.state_path[common..] {
                state.push_state_set(Rc::clone(state_set));
                current.push(Rc::clone(state_set));
            }

            state.apply(gl);
            gl.set_uniform_matrix4(MODEL_VIEW_UNIFORM, &to_f32(&leaf.model_view));
            gl.set_uniform_matrix4(PROJECTION_UNIFORM, &to_f32(&leaf.projection));
            for primitive in &geometry.primitive_sets {
                gl.draw(primitive);
                draws += 1;
            }
        }

        for _ in 0..current.len() {
            state.pop_state_set();
        }
        debug_assert_eq!(state.state_set_stack_size(), base_depth);
        draws
    }
}

fn common_prefix(a: &[Rc<StateSet>], b: &[Rc<StateSet>]) -> usize {
    a.iter()
        .zip(b)
        .take_while(|(x, y)| Rc::ptr_eq(x, y))
        .count()
}

/// Visitor filling a render bin
#[derive(Debug, Default)]
pub struct RenderVisitor {
    stacks: MatrixStacks,
    state_path: Vec<Rc<StateSet>>,
    bin: RenderBin,
    traversal_mask: u32,
}

impl RenderVisitor {
    /// Create a visitor with identity stacks
    pub fn new() -> Self {
        Self {
            traversal_mask: u32::MAX,
            ..Default::default()
        }
    }

    /// Restrict the traversal to nodes whose mask overlaps `mask`
    pub fn set_traversal_mask(&mut self, mask: u32) {
        self.traversal_mask = mask;
    }

    /// Traverse from `root` and return the unsorted bin
    pub fn collect(&mut self, graph: &SceneGraph, root: NodeId) -> RenderBin {
        self.stacks.reset();
        self.state_path.clear();
        self.bin.clear();
        graph.accept(root, self);
        std::mem::take(&mut self.bin)
    }

    fn push_state(&mut self, graph: &SceneGraph, id: NodeId) -> bool {
        match graph.get(id).and_then(|node| node.state_set()) {
            Some(state_set) => {
                self.state_path.push(Rc::clone(state_set));
                true
            }
            None => false,
        }
    }

    fn pop_state(&mut self, pushed: bool) {
        if pushed {
            self.state_path.pop();
        }
    }
}

impl NodeVisitor for RenderVisitor {
    fn traversal_mask(&self) -> u32 {
        self.traversal_mask
    }

    fn apply_group(&mut self, graph: &SceneGraph, id: NodeId) {
        let pushed = self.push_state(graph, id);
        self.traverse(graph, id);
        self.pop_state(pushed);
    }

    fn apply_transform(&mut self, graph: &SceneGraph, id: NodeId, matrix: &Mat4d, frame: ReferenceFrame) {
        let pushed = self.push_state(graph, id);
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

        self.traverse(graph, id);

        self.stacks.model.pop();
        if frame == ReferenceFrame::Absolute {
            self.stacks.view.pop();
        }
        self.pop_state(pushed);
    }

    fn apply_camera(&mut self, graph: &SceneGraph, id: NodeId, camera: &Camera) {
        let pushed = self.push_state(graph, id);
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

        self.traverse(graph, id);

        self.stacks.model.pop();
        self.stacks.view.pop();
        self.stacks.projection.pop();
        self.pop_state(pushed);
    }

    fn apply_geometry(&mut self, graph: &SceneGraph, id: NodeId, geometry: &Geometry) {
        if geometry.primitive_sets.is_empty() {
            return;
        }
        let pushed = self.push_state(graph, id);
        self.bin.push(RenderLeaf {
            state_path: self.state_path.clone(),
            model_view: self.stacks.model_view(),
            projection: *self.stacks.projection.top(),
            geometry: id,
        });
        self.pop_state(pushed);
    }
}

/// Collect, sort and draw a graph in one call; returns the number of draw calls
pub fn render_graph(state: &mut State, gl: &mut dyn GraphicsContext, graph: &SceneGraph, root: NodeId) -> usize {
    let mut bin = RenderVisitor::new().collect(graph, root);
    bin.sort();
    bin.draw(state, gl, graph)
}

/// Number of distinct state paths in a bin
pub fn count_state_paths(bin: &RenderBin) -> usize {
    bin.leaves()
        .iter()
        .map(RenderLeaf::path_key)
        .collect::<HashSet<_>>()
        .len()
}
