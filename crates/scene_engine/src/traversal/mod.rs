//! Graph traversals
//!
//! Both traversals keep model, view, projection and window matrix stacks
//! while walking the graph. [`IntersectionVisitor`] drives a pluggable
//! [`Intersector`] for picking; [`RenderVisitor`] collects drawable leaves
//! into a [`RenderBin`] replayed through a [`State`](crate::state::State).

mod intersection_visitor;
mod intersector;
mod line_segment;
mod render;
mod sphere;
mod stacks;

pub use intersection_visitor::IntersectionVisitor;
pub use intersector::{Intersection, IntersectionContext, Intersector};
pub use line_segment::LineSegmentIntersector;
pub use render::{count_state_paths, render_graph, RenderBin, RenderLeaf, RenderVisitor, MODEL_VIEW_UNIFORM, PROJECTION_UNIFORM};
pub use sphere::SphereIntersector;
pub use stacks::{MatrixStack, MatrixStacks};
