//! Arena-backed scene graph
//!
//! Nodes live in a slot map and refer to each other by [`NodeId`]. A node
//! may have several parents, so subgraphs can be instanced, but cycles are
//! rejected when children are attached.

use std::rc::Rc;

use slotmap::SlotMap;
use thiserror::Error;

use super::bounds::BoundingSphere;
use super::node::{Camera, Geometry, Node, NodeId, NodeKind, ReferenceFrame};
use super::visitor::NodeVisitor;
use crate::foundation::math::Mat4d;
use crate::state::StateSet;

/// Errors raised when editing the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The id does not name a live node
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    /// The node is a leaf and cannot hold children
    #[error("node {0:?} cannot have children")]
    NotAGroup(NodeId),
    /// Attaching the child would make the graph cyclic
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// Intended parent
        parent: NodeId,
        /// Intended child
        child: NodeId,
    },
    /// The node is not of the kind the operation expects
    #[error("node {id:?} is not a {expected}")]
    KindMismatch {
        /// Offending node
        id: NodeId,
        /// Kind the operation needs
        expected: &'static str,
    },
}

/// Scene graph arena
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a detached node
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.insert(Node::new(kind))
    }

    /// Insert a detached group
    pub fn add_group(&mut self) -> NodeId {
        self.add_node(NodeKind::Group)
    }

    /// Insert a detached relative transform
    pub fn add_transform(&mut self, matrix: Mat4d) -> NodeId {
        self.add_node(NodeKind::transform(matrix))
    }

    /// Insert a detached camera
    pub fn add_camera(&mut self, camera: Camera) -> NodeId {
        self.add_node(NodeKind::Camera(camera))
    }

    /// Insert a detached geometry leaf
    pub fn add_geometry(&mut self, geometry: Geometry) -> NodeId {
        self.add_node(NodeKind::Geometry(geometry))
    }

    /// Node by id
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Node by id, as a result
    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::UnknownNode(id))
    }

    /// Whether the id names a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes without parents
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parents.is_empty())
            .map(|(id, _)| id)
    }

    /// Children of a node, empty for unknown ids
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// Parents of a node, empty for unknown ids
    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.parents.as_slice())
            .unwrap_or_default()
    }

    /// Set the debug name
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    /// Attach or clear the state set of a node
    pub fn set_state_set(&mut self, id: NodeId, state_set: Option<Rc<StateSet>>) -> Result<(), SceneError> {
        self.node_mut(id)?.state_set = state_set;
        Ok(())
    }

    /// Set the mask tested against visitors' traversal masks
    pub fn set_node_mask(&mut self, id: NodeId, mask: u32) -> Result<(), SceneError> {
        self.node_mut(id)?.node_mask = mask;
        Ok(())
    }

    /// Replace the local matrix of a transform
    pub fn set_matrix(&mut self, id: NodeId, new_matrix: Mat4d) -> Result<(), SceneError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Transform { matrix, .. } => *matrix = new_matrix,
            _ => {
                return Err(SceneError::KindMismatch {
                    id,
                    expected: "transform",
                })
            }
        }
        self.dirty_bound(id);
        Ok(())
    }

    /// Replace the reference frame of a transform or camera
    pub fn set_reference_frame(&mut self, id: NodeId, frame: ReferenceFrame) -> Result<(), SceneError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Transform { reference_frame, .. } => *reference_frame = frame,
            NodeKind::Camera(camera) => camera.reference_frame = frame,
            _ => {
                return Err(SceneError::KindMismatch {
                    id,
                    expected: "transform or camera",
                })
            }
        }
        self.dirty_bound(id);
        Ok(())
    }

    /// Edit a camera in place
    pub fn update_camera<R>(&mut self, id: NodeId, f: impl FnOnce(&mut Camera) -> R) -> Result<R, SceneError> {
        let NodeKind::Camera(camera) = &mut self.node_mut(id)?.kind else {
            return Err(SceneError::KindMismatch { id, expected: "camera" });
        };
        let result = f(camera);
        self.dirty_bound(id);
        Ok(result)
    }

    /// Edit a geometry in place
    pub fn update_geometry<R>(&mut self, id: NodeId, f: impl FnOnce(&mut Geometry) -> R) -> Result<R, SceneError> {
        let NodeKind::Geometry(geometry) = &mut self.node_mut(id)?.kind else {
            return Err(SceneError::KindMismatch {
                id,
                expected: "geometry",
            });
        };
        let result = f(geometry);
        self.dirty_bound(id);
        Ok(result)
    }

    /// Append a child
    ///
    /// A node may be attached under several parents. Attaching a node under
    /// itself or one of its descendants fails.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if !self.node(parent)?.kind.accepts_children() {
            return Err(SceneError::NotAGroup(parent));
        }
        self.node(child)?;
        if parent == child || self.is_descendant(parent, child) {
            return Err(SceneError::Cycle { parent, child });
        }

        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parents.push(parent);
        self.dirty_bound(parent);
        log::debug!("Attached node {:?} under {:?}", child, parent);
        Ok(())
    }

    /// Detach one occurrence of a child; returns whether it was attached
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, SceneError> {
        self.node(child)?;
        let children = &mut self.node_mut(parent)?.children;
        let Some(index) = children.iter().position(|&id| id == child) else {
            return Ok(false);
        };
        children.remove(index);

        let parents = &mut self.node_mut(child)?.parents;
        if let Some(index) = parents.iter().position(|&id| id == parent) {
            parents.remove(index);
        }
        self.dirty_bound(parent);
        Ok(true)
    }

    /// Delete a node, detaching it from its parents and children
    ///
    /// Children stay in the graph; the ones left without parents become roots.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, SceneError> {
        let parents = self.node(id)?.parents.clone();
        for parent in parents {
            self.remove_child(parent, id)?;
        }
        let node = self.nodes.remove(id).ok_or(SceneError::UnknownNode(id))?;
        for &child in &node.children {
            if let Some(child) = self.nodes.get_mut(child) {
                if let Some(index) = child.parents.iter().position(|&p| p == id) {
                    child.parents.remove(index);
                }
            }
        }
        Ok(node)
    }

    /// Bounding sphere of a node in its parent's coordinates
    ///
    /// Cached until the node or one of its descendants changes. Cameras and
    /// absolute transforms have no bound, which disables pruning for them.
    pub fn bound(&self, id: NodeId) -> BoundingSphere {
        let Some(node) = self.nodes.get(id) else {
            return BoundingSphere::invalid();
        };
        if let Some(bound) = node.bound.get() {
            return bound;
        }

        let bound = match &node.kind {
            NodeKind::Geometry(geometry) => geometry.compute_bound(),
            NodeKind::Group => self.children_bound(node),
            NodeKind::Transform {
                matrix,
                reference_frame: ReferenceFrame::Relative,
            } => self.children_bound(node).transformed(matrix),
            NodeKind::Transform { .. } | NodeKind::Camera(_) => BoundingSphere::invalid(),
        };
        node.bound.set(Some(bound));
        bound
    }

    /// Matrix from the local space at the end of a path to the path's root space
    pub fn local_to_world(&self, path: &[NodeId]) -> Mat4d {
        let mut matrix = Mat4d::identity();
        for node in path.iter().filter_map(|&id| self.nodes.get(id)) {
            match &node.kind {
                NodeKind::Transform {
                    matrix: local,
                    reference_frame: ReferenceFrame::Relative,
                } => matrix *= local,
                NodeKind::Transform { matrix: local, .. } => matrix = *local,
                _ => {}
            }
        }
        matrix
    }

    /// Dispatch a visitor on a node according to its kind
    ///
    /// Nodes whose mask does not intersect the visitor's traversal mask are
    /// skipped with their subgraph.
    pub fn accept<V: NodeVisitor + ?Sized>(&self, id: NodeId, visitor: &mut V) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if node.node_mask & visitor.traversal_mask() == 0 {
            return;
        }

        match &node.kind {
            NodeKind::Group => visitor.apply_group(self, id),
            NodeKind::Transform {
                matrix,
                reference_frame,
            } => visitor.apply_transform(self, id, matrix, *reference_frame),
            NodeKind::Camera(camera) => visitor.apply_camera(self, id, camera),
            NodeKind::Geometry(geometry) => visitor.apply_geometry(self, id, geometry),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))
    }

    fn children_bound(&self, node: &Node) -> BoundingSphere {
        let mut bound = BoundingSphere::invalid();
        for &child in &node.children {
            bound.expand_by_sphere(&self.bound(child));
        }
        bound
    }

    /// Whether `node` lies below `ancestor`
    fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            for &parent in self.parents(current) {
                if parent == ancestor {
                    return true;
                }
                pending.push(parent);
            }
        }
        false
    }

    fn dirty_bound(&self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.get(current) {
                node.bound.set(None);
                pending.extend_from_slice(&node.parents);
            }
        }
    }
}
