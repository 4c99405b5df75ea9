//! Texture object pooling with deferred, time-budgeted deletion
//!
//! # Architecture
//!
//! ```text
//! TextureManager
//!         ├── TextureObjectArena (slot map of native handles)
//!         └── TextureObjectSet per TextureProfile (first-seen order)
//!                 ├── used
//!                 └── orphaned ──► reused by generate()
//!                                 └──► deleted by flush_deleted() within a budget
//! ```
//!
//! Releasing a texture never deletes it. Orphaned handles are reused by the
//! next request for an identical profile, smoothing allocation churn, and
//! are only physically deleted when a frame budget allows it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::object_set::{
    ObjectState, TextureObject, TextureObjectArena, TextureObjectKey, TextureObjectSet,
};
use super::profile::TextureProfile;
use crate::config::{FlushOrder, RendererSettings};
use crate::foundation::time::{FrameClock, SystemClock};
use crate::gfx::{GraphicsContext, PixelFormat, TextureTarget};

const MB: f64 = 1024.0 * 1024.0;

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies the pool that issued a texture object key
///
/// Keys are only meaningful to the pool that created them; a texture
/// applied through several pools keeps one key per pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureManagerId(u64);

/// Errors returned when releasing texture objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TextureError {
    /// The key was deleted or invalidated by a lost context
    #[error("texture object {0:?} is stale")]
    StaleHandle(TextureObjectKey),
    /// The key is already orphaned
    #[error("texture object {0:?} was already released")]
    AlreadyReleased(TextureObjectKey),
}

/// Memory used by the pool, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextureStats {
    /// Bytes held by textures in use
    pub used_bytes: f64,
    /// Bytes held by orphaned textures
    pub reserved_bytes: f64,
    /// Sum of both
    pub total_bytes: f64,
}

/// Result of a full flush for one profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleasedTextures {
    /// Profile the textures belonged to
    pub profile: TextureProfile,
    /// Number of deleted objects
    pub count: usize,
    /// Estimated bytes given back
    pub bytes: f64,
}

/// Pools texture objects by profile
pub struct TextureManager {
    id: TextureManagerId,
    objects: TextureObjectArena,
    sets: Vec<TextureObjectSet>,
    set_lookup: HashMap<TextureProfile, usize>,
    flush_order: FlushOrder,
    flush_cursor: usize,
    clock: Box<dyn FrameClock>,
}

impl Default for TextureManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureManager {
    /// Create an empty pool measuring time with the system clock
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock::new()))
    }

    /// Create an empty pool with a custom time source
    pub fn with_clock(clock: Box<dyn FrameClock>) -> Self {
        Self {
            id: TextureManagerId(NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed)),
            objects: TextureObjectArena::with_key(),
            sets: Vec::new(),
            set_lookup: HashMap::new(),
            flush_order: FlushOrder::RoundRobin,
            flush_cursor: 0,
            clock,
        }
    }

    /// Create an empty pool configured from renderer settings
    pub fn with_settings(settings: &RendererSettings) -> Self {
        let mut manager = Self::new();
        manager.flush_order = settings.flush_order;
        manager
    }

    /// Identity of this pool
    pub fn id(&self) -> TextureManagerId {
        self.id
    }

    /// Choose how budgeted flushes visit profiles
    pub fn set_flush_order(&mut self, order: FlushOrder) {
        self.flush_order = order;
        self.flush_cursor = 0;
    }

    /// Get a texture object for a profile, reusing an orphaned one if possible
    pub fn generate(
        &mut self,
        gl: &mut dyn GraphicsContext,
        target: TextureTarget,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> TextureObjectKey {
        let profile = TextureProfile::new(target, format, width, height);
        let set_index = match self.set_lookup.get(&profile) {
            Some(index) => *index,
            None => {
                let index = self.sets.len();
                self.sets.push(TextureObjectSet::new(profile));
                self.set_lookup.insert(profile, index);
                index
            }
        };

        self.sets[set_index].take_or_generate(&mut self.objects, gl, set_index)
    }

    /// Return a texture object to its profile's orphaned list
    ///
    /// Nothing is deleted here. Releasing twice, or releasing a stale key,
    /// is reported as an error and otherwise ignored.
    pub fn release(&mut self, key: TextureObjectKey) -> Result<(), TextureError> {
        let Some(object) = self.objects.get(key) else {
            log::warn!("Ignoring release of stale texture object {:?}", key);
            return Err(TextureError::StaleHandle(key));
        };
        if object.state() == ObjectState::Orphaned {
            log::warn!("Ignoring double release of texture object {:?}", key);
            return Err(TextureError::AlreadyReleased(key));
        }

        let set_index = object.set_index();
        self.sets[set_index].orphan(&mut self.objects, key);
        log::debug!("Orphaned texture object {:?}", key);
        Ok(())
    }

    /// Look up a live texture object
    pub fn get(&self, key: TextureObjectKey) -> Option<&TextureObject> {
        self.objects.get(key)
    }

    /// Profile of a live texture object
    pub fn profile_of(&self, key: TextureObjectKey) -> Option<TextureProfile> {
        let object = self.objects.get(key)?;
        self.sets.get(object.set_index()).map(|set| *set.profile())
    }

    /// Bind a live texture object; stale keys bind nothing
    pub fn bind(&self, gl: &mut dyn GraphicsContext, key: TextureObjectKey) -> bool {
        match self.objects.get(key) {
            Some(object) => {
                object.bind(gl);
                true
            }
            None => false,
        }
    }

    /// Delete orphaned objects until `available_time` seconds are spent
    ///
    /// Returns the unused part of the budget so several passes can share one
    /// frame allowance. A budget of zero or less deletes nothing.
    pub fn flush_deleted(&mut self, gl: &mut dyn GraphicsContext, available_time: f64) -> f64 {
        if available_time <= 0.0 || self.sets.is_empty() {
            return available_time;
        }

        let count = self.sets.len();
        let start = match self.flush_order {
            FlushOrder::InsertionOrder => 0,
            FlushOrder::RoundRobin => self.flush_cursor % count,
        };

        let mut remaining = available_time;
        for step in 0..count {
            let index = (start + step) % count;
            remaining = self.sets[index].flush_deleted(
                &mut self.objects,
                gl,
                self.clock.as_ref(),
                remaining,
            );
            if remaining <= 0.0 {
                self.flush_cursor = (index + 1) % count;
                break;
            }
        }
        remaining
    }

    /// Delete every orphaned object regardless of time
    pub fn flush_all_deleted(&mut self, gl: &mut dyn GraphicsContext) -> Vec<ReleasedTextures> {
        let mut released = Vec::with_capacity(self.sets.len());
        for set in &mut self.sets {
            let count = set.flush_all_deleted(&mut self.objects, gl);
            let bytes = count as f64 * set.profile().size_bytes();
            log::info!(
                "TextureManager: released {} textures of {:?} with {:.3} MB",
                count,
                set.profile(),
                bytes / MB
            );
            released.push(ReleasedTextures {
                profile: *set.profile(),
                count,
                bytes,
            });
        }
        released
    }

    /// Forget every tracked object after the context was lost
    ///
    /// No delete calls are issued since the context that owned the handles
    /// is gone. Every previously returned key becomes stale.
    pub fn on_lost_context(&mut self) {
        for set in &mut self.sets {
            set.on_lost_context(&mut self.objects);
        }
        self.objects.clear();
        self.flush_cursor = 0;
        log::info!("TextureManager: context lost, all texture objects reset");
    }

    /// Sets in first-seen profile order
    pub fn sets(&self) -> &[TextureObjectSet] {
        &self.sets
    }

    /// Set for a given profile, if one was ever requested
    pub fn set_for(&self, profile: &TextureProfile) -> Option<&TextureObjectSet> {
        self.set_lookup.get(profile).map(|index| &self.sets[*index])
    }

    /// Total used objects across profiles
    pub fn used_count(&self) -> usize {
        self.sets.iter().map(|set| set.used().len()).sum()
    }

    /// Total orphaned objects across profiles
    pub fn orphaned_count(&self) -> usize {
        self.sets.iter().map(|set| set.orphaned().len()).sum()
    }

    /// Compute memory statistics
    pub fn update_stats(&self) -> TextureStats {
        let mut stats = TextureStats::default();
        for set in &self.sets {
            let size = set.profile().size_bytes();
            stats.used_bytes += set.used().len() as f64 * size;
            stats.reserved_bytes += set.orphaned().len() as f64 * size;
        }
        stats.total_bytes = stats.used_bytes + stats.reserved_bytes;
        stats
    }

    /// Log used memory per profile and in total
    pub fn report_stats(&self) {
        let mut total = 0.0;
        for set in &self.sets {
            let profile = set.profile();
            let count = set.used().len();
            let size = count as f64 * profile.size_bytes() / MB;
            total += size;
            log::info!(
                "{} MB with {} texture of {}x{} {:?}",
                size,
                count,
                profile.width,
                profile.height,
                profile.format
            );
        }
        log::info!("{} MB in total", total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{GfxCall, RecordingContext, TextureId};
    use approx::assert_relative_eq;
    use std::cell::Cell;

    /// Clock advancing by a fixed step every time it is read
    struct SteppingClock {
        now: Cell<f64>,
        step: f64,
    }

    impl FrameClock for SteppingClock {
        fn now_seconds(&self) -> f64 {
            let now = self.now.get();
            self.now.set(now + self.step);
            now
        }
    }

    fn stepping_manager(step: f64) -> TextureManager {
        TextureManager::with_clock(Box::new(SteppingClock {
            now: Cell::new(0.0),
            step,
        }))
    }

    fn rgba(manager: &mut TextureManager, gl: &mut RecordingContext, size: u32) -> TextureObjectKey {
        manager.generate(gl, TextureTarget::Texture2D, PixelFormat::Rgba, size, size)
    }

    #[test]
    fn test_release_then_generate_reuses_handle() {
        let mut gl = RecordingContext::new();
        let mut manager = TextureManager::new();

        let first = rgba(&mut manager, &mut gl, 64);
        let first_id = manager.get(first).unwrap().id();
        manager.release(first).unwrap();
        let second = rgba(&mut manager, &mut gl, 64);

        assert_eq!(first, second);
        assert_eq!(manager.get(second).unwrap().id(), first_id);
        assert_eq!(gl.count(|c| matches!(c, GfxCall::CreateTexture(_))), 1);
    }

    #[test]
    fn test_different_profile_allocates() {
        let mut gl = RecordingContext::new();
        let mut manager = TextureManager::new();

        let first = rgba(&mut manager, &mut gl, 64);
        manager.release(first).unwrap();
        let other = manager.generate(&mut gl, TextureTarget::Texture2D, PixelFormat::Rgb, 64, 64);

        assert_ne!(manager.get(other).unwrap().id(), TextureId(1));
        assert_eq!(manager.sets().len(), 2);
        assert_eq!(manager.orphaned_count(), 1);
    }

    #[test]
    fn test_double_release_is_rejected() {
        let mut gl = RecordingContext::new();
        let mut manager = TextureManager::new();

        let key = rgba(&mut manager, &mut gl, 8);
        assert!(manager.release(key).is_ok());
        assert_eq!(manager.release(key), Err(TextureError::AlreadyReleased(key)));
        assert_eq!(manager.orphaned_count(), 1);
        assert_eq!(manager.used_count(), 0);
    }

    #[test]
    fn test_flush_with_no_budget_deletes_nothing() {
        let mut gl = RecordingContext::new();
        let mut manager = stepping_manager(0.001);

        let key = rgba(&mut manager, &mut gl, 8);
        manager.release(key).unwrap();

        assert_eq!(manager.flush_deleted(&mut gl, 0.0), 0.0);
        assert_eq!(manager.flush_deleted(&mut gl, -1.0), -1.0);
        assert!(gl.deleted_textures().is_empty());
        assert_eq!(manager.orphaned_count(), 1);
    }

    #[test]
    fn test_flush_stops_when_budget_is_spent() {
        let mut gl = RecordingContext::new();
        // every clock read advances one millisecond
        let mut manager = stepping_manager(0.001);

        let keys: Vec<_> = (0..5).map(|_| rgba(&mut manager, &mut gl, 8)).collect();
        for key in &keys {
            manager.release(*key).unwrap();
        }

        // begin read at t=0, each deletion is followed by a read 1ms later
        let remaining = manager.flush_deleted(&mut gl, 0.002);
        assert_eq!(gl.deleted_textures().len(), 2);
        assert_relative_eq!(remaining, 0.0, epsilon = 1e-12);
        assert_eq!(manager.orphaned_count(), 3);
        // oldest orphans go first and their keys become stale
        assert!(manager.get(keys[0]).is_none());
        assert!(manager.get(keys[4]).is_some());
    }

    #[test]
    fn test_flush_returns_unused_budget() {
        let mut gl = RecordingContext::new();
        let mut manager = stepping_manager(0.001);

        let key = rgba(&mut manager, &mut gl, 8);
        manager.release(key).unwrap();

        let remaining = manager.flush_deleted(&mut gl, 0.010);
        assert_relative_eq!(remaining, 0.009, epsilon = 1e-12);
        assert_eq!(manager.orphaned_count(), 0);
    }

    #[test]
    fn test_round_robin_resumes_after_stopped_profile() {
        let mut gl = RecordingContext::new();
        let mut manager = stepping_manager(0.001);

        let small: Vec<_> = (0..3).map(|_| rgba(&mut manager, &mut gl, 8)).collect();
        let large: Vec<_> = (0..3).map(|_| rgba(&mut manager, &mut gl, 16)).collect();
        for key in small.iter().chain(large.iter()) {
            manager.release(*key).unwrap();
        }

        manager.flush_deleted(&mut gl, 0.001);
        assert_eq!(manager.sets()[0].profile().width, 8);
        assert_eq!(manager.sets()[0].orphaned().len(), 2);

        // the second call starts with the 16x16 profile
        manager.flush_deleted(&mut gl, 0.001);
        assert_eq!(manager.sets()[1].orphaned().len(), 2);
    }

    #[test]
    fn test_insertion_order_always_starts_first() {
        let mut gl = RecordingContext::new();
        let mut manager = stepping_manager(0.001);
        manager.set_flush_order(FlushOrder::InsertionOrder);

        let small: Vec<_> = (0..3).map(|_| rgba(&mut manager, &mut gl, 8)).collect();
        let large: Vec<_> = (0..3).map(|_| rgba(&mut manager, &mut gl, 16)).collect();
        for key in small.iter().chain(large.iter()) {
            manager.release(*key).unwrap();
        }

        manager.flush_deleted(&mut gl, 0.001);
        manager.flush_deleted(&mut gl, 0.001);
        assert_eq!(manager.sets()[0].orphaned().len(), 1);
        assert_eq!(manager.sets()[1].orphaned().len(), 3);
    }

    #[test]
    fn test_flush_all_reports_bytes_per_profile() {
        let mut gl = RecordingContext::new();
        let mut manager = TextureManager::new();

        let a = manager.generate(&mut gl, TextureTarget::Texture2D, PixelFormat::Rgba, 4, 4);
        let b = manager.generate(&mut gl, TextureTarget::Texture2D, PixelFormat::Rgba, 4, 4);
        let cube = manager.generate(&mut gl, TextureTarget::CubeMap, PixelFormat::Rgba, 4, 4);
        manager.release(a).unwrap();
        manager.release(b).unwrap();
        manager.release(cube).unwrap();

        let released = manager.flush_all_deleted(&mut gl);
        assert_eq!(released.len(), 2);
        assert_eq!(released[0].count, 2);
        assert_relative_eq!(released[0].bytes, 2.0 * (64.0 + 64.0 / 3.0), epsilon = 1e-9);
        assert_eq!(released[1].count, 1);
        assert_relative_eq!(released[1].bytes, 512.0, epsilon = 1e-9);
        assert_eq!(gl.deleted_textures().len(), 3);
        assert_eq!(manager.orphaned_count(), 0);
    }

    #[test]
    fn test_lost_context_clears_without_deleting() {
        let mut gl = RecordingContext::new();
        let mut manager = TextureManager::new();

        let used = rgba(&mut manager, &mut gl, 8);
        let orphan = rgba(&mut manager, &mut gl, 8);
        manager.release(orphan).unwrap();

        manager.on_lost_context();
        gl.clear();

        assert_eq!(manager.used_count(), 0);
        assert_eq!(manager.orphaned_count(), 0);
        assert!(manager.get(used).is_none());
        assert!(!manager.bind(&mut gl, used));
        assert_eq!(manager.release(orphan), Err(TextureError::StaleHandle(orphan)));
        manager.flush_all_deleted(&mut gl);
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn test_stats_split_used_and_reserved() {
        let mut gl = RecordingContext::new();
        let mut manager = TextureManager::new();

        let a = manager.generate(&mut gl, TextureTarget::Texture2D, PixelFormat::Rgba, 4, 4);
        let _b = manager.generate(&mut gl, TextureTarget::Texture2D, PixelFormat::Rgba, 4, 4);
        manager.release(a).unwrap();

        let stats = manager.update_stats();
        let size = 64.0 + 64.0 / 3.0;
        assert_relative_eq!(stats.used_bytes, size, epsilon = 1e-9);
        assert_relative_eq!(stats.reserved_bytes, size, epsilon = 1e-9);
        assert_relative_eq!(stats.total_bytes, 2.0 * size, epsilon = 1e-9);
    }

    #[test]
    fn test_pools_have_distinct_ids() {
        let first = TextureManager::new();
        let second = TextureManager::new();
        assert_ne!(first.id(), second.id());
        assert_eq!(first.id(), first.id());
    }

    #[test]
    fn test_profile_of_follows_key_lifetime() {
        let mut gl = RecordingContext::new();
        let mut manager = TextureManager::new();
        let key = rgba(&mut manager, &mut gl, 16);

        let profile = manager.profile_of(key).unwrap();
        assert_eq!(profile, TextureProfile::new(TextureTarget::Texture2D, PixelFormat::Rgba, 16, 16));

        manager.on_lost_context();
        assert_eq!(manager.profile_of(key), None);
    }
}
