//! Scene graph
//!
//! ## Architecture
//!
//! ```text
//! SceneGraph (slot map arena)
//!      ├── Group
//!      ├── Transform ── local matrix, reference frame
//!      ├── Camera ───── view, projection, viewport
//!      └── Geometry ─── vertices, primitive sets
//! ```
//!
//! Each node may carry a shared [`StateSet`](crate::state::StateSet).
//! Traversals implement [`NodeVisitor`] and are dispatched by node kind.

mod bounds;
mod functor;
mod graph;
mod node;
mod primitive;
mod visitor;

pub use bounds::{BoundingBox, BoundingSphere};
pub use functor::{collect_triangles, for_each_triangle};
pub use graph::{SceneError, SceneGraph};
pub use node::{Camera, Geometry, Node, NodeId, NodeKind, ReferenceFrame};
pub use primitive::{PrimitiveMode, PrimitiveSet};
pub use visitor::NodeVisitor;
