//! # Scene Engine
//!
//! Scene-graph render state management, texture object pooling and picking
//! traversals over a retained-mode graphics context.
//!
//! ## Features
//!
//! - **State Accumulation**: per-type attribute stacks with override and
//!   protected modes, applying only what changed between draws
//! - **Texture Pooling**: texture objects recycled by profile, with
//!   time-budgeted deletion of orphans
//! - **Picking**: line segment and sphere intersectors driven by a visitor
//!   that keeps model, view, projection and window stacks
//! - **Render Bins**: leaves grouped by state path to minimize state changes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! let mut graph = SceneGraph::new();
//! let root = graph.add_group();
//!
//! let mut state = State::new();
//! let mut gl = RecordingContext::new();
//! render_graph(&mut state, &mut gl, &graph, root);
//!
//! let mut picker = IntersectionVisitor::new(LineSegmentIntersector::from_window(400.0, 300.0));
//! picker.apply(&graph, root);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod gfx;
pub mod scene;
pub mod state;
pub mod texture;
pub mod traversal;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, FlushOrder, RendererSettings},
        foundation::{
            math::{Mat4, Mat4d, Mat4dExt, Vec3, Vec3d, Viewport},
            time::Stopwatch,
        },
        gfx::{GraphicsContext, PixelFormat, RecordingContext, TextureTarget},
        scene::{
            Camera, Geometry, NodeId, NodeKind, NodeVisitor, PrimitiveMode, PrimitiveSet, ReferenceFrame,
            SceneError, SceneGraph,
        },
        state::{AttributeRef, Material, State, StateMode, StateSet, Texture},
        texture::{TextureError, TextureManager},
        traversal::{
            render_graph, Intersection, IntersectionVisitor, Intersector, LineSegmentIntersector, RenderBin,
            RenderVisitor, SphereIntersector,
        },
    };
}
