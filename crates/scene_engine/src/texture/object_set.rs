//! Per-profile collections of texture objects
//!
//! Texture objects live in a slot arena owned by the manager. A
//! [`TextureObjectSet`] only tracks which keys of its profile are in use and
//! which are orphaned; a key is in exactly one of the two lists at any time.

use slotmap::{new_key_type, SlotMap};

use super::profile::TextureProfile;
use crate::foundation::time::FrameClock;
use crate::gfx::{GraphicsContext, TextureId, TextureTarget};

new_key_type! {
    /// Handle to a pooled texture object
    ///
    /// Stays valid across release and reuse; becomes stale once the object is
    /// physically deleted or the context is lost.
    pub struct TextureObjectKey;
}

/// Where a texture object currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// Handed out to a texture
    Used,
    /// Released and waiting for reuse or deletion
    Orphaned,
}

/// A native texture handle tracked by the pool
#[derive(Debug, Clone)]
pub struct TextureObject {
    id: TextureId,
    target: TextureTarget,
    set_index: usize,
    state: ObjectState,
}

impl TextureObject {
    /// Native handle
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Binding target of the owning profile
    pub fn target(&self) -> TextureTarget {
        self.target
    }

    /// Index of the owning set inside the manager
    pub fn set_index(&self) -> usize {
        self.set_index
    }

    /// Used or orphaned
    pub fn state(&self) -> ObjectState {
        self.state
    }

    /// Bind on the active texture unit
    pub fn bind(&self, gl: &mut dyn GraphicsContext) {
        gl.bind_texture(self.target, Some(self.id));
    }
}

/// Arena holding every live texture object
pub type TextureObjectArena = SlotMap<TextureObjectKey, TextureObject>;

/// Texture objects sharing one profile
#[derive(Debug)]
pub struct TextureObjectSet {
    profile: TextureProfile,
    used: Vec<TextureObjectKey>,
    orphaned: Vec<TextureObjectKey>,
}

impl TextureObjectSet {
    /// Create an empty set for a profile
    pub fn new(profile: TextureProfile) -> Self {
        Self {
            profile,
            used: Vec::new(),
            orphaned: Vec::new(),
        }
    }

    /// Profile shared by every object of this set
    pub fn profile(&self) -> &TextureProfile {
        &self.profile
    }

    /// Keys currently handed out
    pub fn used(&self) -> &[TextureObjectKey] {
        &self.used
    }

    /// Keys released and awaiting reuse or deletion
    pub fn orphaned(&self) -> &[TextureObjectKey] {
        &self.orphaned
    }

    /// Reuse the most recently orphaned object or allocate a new one
    pub fn take_or_generate(
        &mut self,
        objects: &mut TextureObjectArena,
        gl: &mut dyn GraphicsContext,
        set_index: usize,
    ) -> TextureObjectKey {
        if let Some(key) = self.orphaned.pop() {
            if let Some(object) = objects.get_mut(key) {
                object.state = ObjectState::Used;
            }
            self.used.push(key);
            log::debug!("Reused texture object {:?} for {:?}", key, self.profile);
            return key;
        }

        let id = gl.create_texture();
        let key = objects.insert(TextureObject {
            id,
            target: self.profile.target,
            set_index,
            state: ObjectState::Used,
        });
        self.used.push(key);
        log::debug!("Created texture object {:?} ({:?}) for {:?}", key, id, self.profile);
        key
    }

    /// Move a used object to the orphaned list
    ///
    /// Returns `false` when the key is not in the used list.
    pub fn orphan(&mut self, objects: &mut TextureObjectArena, key: TextureObjectKey) -> bool {
        let Some(index) = self.used.iter().position(|k| *k == key) else {
            return false;
        };
        self.used.swap_remove(index);
        self.orphaned.push(key);
        if let Some(object) = objects.get_mut(key) {
            object.state = ObjectState::Orphaned;
        }
        true
    }

    /// Delete orphaned objects, oldest first, until the time budget runs out
    ///
    /// The budget is checked between deletions; a deletion in flight is never
    /// interrupted. Returns what is left of the budget.
    pub fn flush_deleted(
        &mut self,
        objects: &mut TextureObjectArena,
        gl: &mut dyn GraphicsContext,
        clock: &dyn FrameClock,
        available_time: f64,
    ) -> f64 {
        if available_time <= 0.0 {
            return available_time;
        }

        let begin = clock.now_seconds();
        let mut elapsed = 0.0;
        let mut flushed = 0;
        while flushed < self.orphaned.len() && elapsed < available_time {
            let key = self.orphaned[flushed];
            if let Some(object) = objects.remove(key) {
                gl.delete_texture(object.id);
            }
            flushed += 1;
            elapsed = clock.now_seconds() - begin;
        }
        self.orphaned.drain(..flushed);

        if flushed > 0 {
            log::debug!(
                "Flushed {} orphaned textures of {:?} in {:.3} ms",
                flushed,
                self.profile,
                elapsed * 1000.0
            );
        }
        available_time - elapsed
    }

    /// Delete every orphaned object, returning how many were released
    pub fn flush_all_deleted(
        &mut self,
        objects: &mut TextureObjectArena,
        gl: &mut dyn GraphicsContext,
    ) -> usize {
        let count = self.orphaned.len();
        for key in self.orphaned.drain(..) {
            if let Some(object) = objects.remove(key) {
                gl.delete_texture(object.id);
            }
        }
        count
    }

    /// Forget every object without issuing deletions
    pub fn on_lost_context(&mut self, objects: &mut TextureObjectArena) {
        for key in self.orphaned.drain(..).chain(self.used.drain(..)) {
            objects.remove(key);
        }
    }
}
