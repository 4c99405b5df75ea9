//! Texture object pooling
//!
//! GPU texture handles are grouped by [`TextureProfile`] and recycled
//! instead of reallocated. See [`TextureManager`] for the pooling policy.

pub mod profile;
pub mod object_set;
pub mod manager;

pub use manager::{ReleasedTextures, TextureError, TextureManager, TextureManagerId, TextureStats};
pub use object_set::{ObjectState, TextureObject, TextureObjectKey, TextureObjectSet};
pub use profile::TextureProfile;
