//! Scene node payloads

use std::cell::Cell;
use std::rc::Rc;

use slotmap::new_key_type;

use super::bounds::BoundingSphere;
use super::primitive::PrimitiveSet;
use crate::foundation::math::{vec_to_f64, Mat4d, Vec3, Vec3d, Viewport};
use crate::state::StateSet;

new_key_type! {
    /// Handle to a node in a [`SceneGraph`](super::SceneGraph)
    pub struct NodeId;
}

/// Whether a node's matrices compose with or replace the inherited ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceFrame {
    /// Compose with the parent's matrices
    #[default]
    Relative,
    /// Replace the parent's matrices
    Absolute,
}

/// View, projection and viewport for a subgraph
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// World to eye matrix
    pub view: Mat4d,
    /// Eye to clip matrix
    pub projection: Mat4d,
    /// Window area, if the camera defines one
    pub viewport: Option<Viewport>,
    /// How the matrices combine with an enclosing camera
    pub reference_frame: ReferenceFrame,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view: Mat4d::identity(),
            projection: Mat4d::identity(),
            viewport: None,
            reference_frame: ReferenceFrame::Relative,
        }
    }
}

/// Drawable vertices and the primitive sets assembling them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Draw calls over the vertices
    pub primitive_sets: Vec<PrimitiveSet>,
}

impl Geometry {
    /// Geometry from vertices and primitive sets
    pub fn new(vertices: Vec<Vec3>, primitive_sets: Vec<PrimitiveSet>) -> Self {
        Self {
            vertices,
            primitive_sets,
        }
    }

    /// Vertex position in double precision
    pub fn vertex(&self, index: u32) -> Option<Vec3d> {
        self.vertices.get(index as usize).map(vec_to_f64)
    }

    /// Sphere around every vertex
    pub fn compute_bound(&self) -> BoundingSphere {
        let vertices: Vec<_> = self.vertices.iter().map(vec_to_f64).collect();
        BoundingSphere::from_points(vertices.iter())
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain grouping node
    Group,
    /// Local matrix applied to the children
    Transform {
        /// Local matrix
        matrix: Mat4d,
        /// How the matrix combines with the parent's
        reference_frame: ReferenceFrame,
    },
    /// Camera applied to the children
    Camera(Camera),
    /// Drawable leaf
    Geometry(Geometry),
}

impl NodeKind {
    /// Relative transform node
    pub fn transform(matrix: Mat4d) -> Self {
        Self::Transform {
            matrix,
            reference_frame: ReferenceFrame::Relative,
        }
    }

    /// Whether the node may have children
    pub fn accepts_children(&self) -> bool {
        !matches!(self, Self::Geometry(_))
    }
}

/// A node stored in the scene graph arena
#[derive(Debug)]
pub struct Node {
    pub(super) name: String,
    pub(super) kind: NodeKind,
    pub(super) children: Vec<NodeId>,
    pub(super) parents: Vec<NodeId>,
    pub(super) state_set: Option<Rc<StateSet>>,
    pub(super) node_mask: u32,
    pub(super) bound: Cell<Option<BoundingSphere>>,
}

impl Node {
    pub(super) fn new(kind: NodeKind) -> Self {
        Self {
            name: String::new(),
            kind,
            children: Vec::new(),
            parents: Vec::new(),
            state_set: None,
            node_mask: u32::MAX,
            bound: Cell::new(None),
        }
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node payload
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Children in traversal order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Nodes this node is attached to
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// State attached to this node
    pub fn state_set(&self) -> Option<&Rc<StateSet>> {
        self.state_set.as_ref()
    }

    /// Mask tested against a visitor's traversal mask
    pub fn node_mask(&self) -> u32 {
        self.node_mask
    }
}
