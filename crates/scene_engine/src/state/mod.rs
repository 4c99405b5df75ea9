//! Render state accumulation
//!
//! Scene nodes carry [`StateSet`]s. While a traversal walks down the graph,
//! the sets on the current path are pushed onto a [`State`], which resolves
//! one attribute per type (and per texture unit for texture attributes)
//! according to each entry's [`StateMode`], and applies only what changed.

pub mod mode;
pub mod attribute;
pub mod attributes;
pub mod texture;
pub mod program;
pub mod state_set;
pub mod stack;
pub mod render_state;

pub use attribute::{ApplyContext, AttributeRef, AttributeRegistry, StateAttribute};
pub use attributes::{Billboard, BlendFunc, CullFace, Depth, Material};
pub use mode::StateMode;
pub use program::{DefaultShaderGenerator, Program, ShaderGenerator};
pub use render_state::State;
pub use stack::AttributeStack;
pub use state_set::{StateEntry, StateSet};
pub use texture::Texture;
