//! Per attribute type stacks mirroring the root-to-node path

use super::attribute::{ApplyContext, AttributeRef};
use super::state_set::StateEntry;

/// Stack of entries for one attribute type (and one texture unit)
///
/// Every push records the entry that is resolved at that depth, so a pop
/// restores the previous top in O(1).
#[derive(Debug, Default)]
pub struct AttributeStack {
    entries: Vec<StateEntry>,
    global_default: Option<AttributeRef>,
    last_applied: Option<(AttributeRef, u64)>,
}

impl AttributeStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the entry a state set requests for this type
    ///
    /// When the current top carries `OVERRIDE` the top is pushed again
    /// instead, unless the incoming entry is `PROTECTED`. The first override
    /// nearest the root therefore wins over anything below it, including
    /// `OFF` and later overrides.
    pub fn push(&mut self, entry: &StateEntry) {
        let resolved = match self.entries.last() {
            Some(top) if top.mode.is_override() && !entry.mode.is_protected() => top.clone(),
            _ => entry.clone(),
        };
        self.entries.push(resolved);
    }

    /// Restore the previous top
    pub fn pop(&mut self) {
        debug_assert!(!self.entries.is_empty(), "attribute stack popped while empty");
        self.entries.pop();
    }

    /// Entry resolved at the current depth
    pub fn top(&self) -> Option<&StateEntry> {
        self.entries.last()
    }

    /// Number of pushed entries
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Attribute in effect: the top when it is on, the global default otherwise
    pub fn resolved(&self) -> Option<&AttributeRef> {
        match self.entries.last() {
            Some(top) if top.mode.is_on() => Some(&top.attribute),
            _ => self.global_default.as_ref(),
        }
    }

    /// The top attribute when it is on, ignoring the global default
    pub fn active(&self) -> Option<&AttributeRef> {
        self.entries
            .last()
            .filter(|top| top.mode.is_on())
            .map(|top| &top.attribute)
    }

    /// Attribute applied when nothing on the path enables this type
    pub fn global_default(&self) -> Option<&AttributeRef> {
        self.global_default.as_ref()
    }

    /// Replace the global default
    pub fn set_global_default(&mut self, attribute: AttributeRef) {
        self.global_default = Some(attribute);
    }

    /// Whether applying would issue graphics calls
    pub fn needs_apply(&self) -> bool {
        match (self.resolved(), &self.last_applied) {
            (None, _) => false,
            (Some(resolved), Some((last, revision))) => !resolved.ptr_eq(last) || resolved.revision() != *revision,
            (Some(_), None) => true,
        }
    }

    /// Apply the resolved attribute if it differs from what was last applied
    ///
    /// Returns whether graphics calls were issued.
    pub fn apply(&mut self, ctx: &mut ApplyContext<'_>) -> bool {
        if !self.needs_apply() {
            return false;
        }
        let Some(resolved) = self.resolved().cloned() else {
            return false;
        };
        let revision = resolved.apply(ctx);
        self.last_applied = Some((resolved, revision));
        true
    }

    /// Drop every entry and forget what was applied
    pub fn reset(&mut self) {
        self.entries.clear();
        self.last_applied = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::RecordingContext;
    use crate::state::{Material, StateMode};
    use crate::texture::TextureManager;

    fn entry(mode: StateMode) -> StateEntry {
        StateEntry {
            attribute: AttributeRef::new(Material::default()),
            mode,
        }
    }

    #[test]
    fn test_override_then_protected() {
        let mut stack = AttributeStack::new();
        let locked = entry(StateMode::ON | StateMode::OVERRIDE);
        let protected = entry(StateMode::ON | StateMode::PROTECTED);

        stack.push(&locked);
        stack.push(&entry(StateMode::ON));
        assert!(stack.top().unwrap().attribute.ptr_eq(&locked.attribute));

        stack.push(&protected);
        assert!(stack.top().unwrap().attribute.ptr_eq(&protected.attribute));
        assert_eq!(stack.depth(), 3);
    }

    #[test]
    fn test_off_resolves_to_global_default() {
        let mut stack = AttributeStack::new();
        let default = AttributeRef::new(Material::default());
        stack.set_global_default(default.clone());

        stack.push(&entry(StateMode::ON));
        stack.push(&entry(StateMode::OFF));
        assert!(stack.resolved().unwrap().ptr_eq(&default));
        assert!(stack.active().is_none());

        stack.pop();
        assert!(!stack.resolved().unwrap().ptr_eq(&default));
    }

    #[test]
    fn test_empty_stack_without_default_needs_nothing() {
        let stack = AttributeStack::new();
        assert!(stack.resolved().is_none());
        assert!(!stack.needs_apply());
    }

    #[test]
    fn test_each_stack_tracks_its_own_revision() {
        let mut gl = RecordingContext::new();
        let mut textures = TextureManager::new();
        let shared = entry(StateMode::ON);
        let mut first = AttributeStack::new();
        let mut second = AttributeStack::new();
        first.push(&shared);
        second.push(&shared);

        let mut ctx = ApplyContext {
            gl: &mut gl,
            textures: &mut textures,
            texture_unit: None,
        };
        assert!(first.apply(&mut ctx));
        assert!(second.apply(&mut ctx));
        assert!(!first.apply(&mut ctx));

        shared.attribute.modify(|m: &mut Material| m.diffuse = [1.0, 0.0, 0.0, 1.0]);
        assert!(first.apply(&mut ctx));
        assert!(second.needs_apply());
        assert!(second.apply(&mut ctx));
        assert!(!second.needs_apply());
    }
}
