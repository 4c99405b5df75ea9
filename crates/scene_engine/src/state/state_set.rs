//! Collections of attributes attached to scene nodes

use super::attribute::AttributeRef;
use super::mode::StateMode;

/// An attribute and the mode it was set with
#[derive(Debug, Clone, PartialEq)]
pub struct StateEntry {
    /// Shared attribute
    pub attribute: AttributeRef,
    /// How the attribute combines with inherited state
    pub mode: StateMode,
}

/// Attributes and modes attached to a scene node
///
/// At most one entry per attribute type, plus one entry per type and
/// texture unit for texture attributes. Nodes share state sets through
/// `Rc<StateSet>`; a set is treated as read-only once it is shared.
#[derive(Debug, Clone, Default)]
pub struct StateSet {
    name: String,
    attributes: Vec<StateEntry>,
    texture_attributes: Vec<Vec<StateEntry>>,
}

impl StateSet {
    /// Create an empty state set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty, named state set
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set an attribute with the `ON` mode
    pub fn set_attribute(&mut self, attribute: AttributeRef) {
        self.set_attribute_and_modes(attribute, StateMode::ON);
    }

    /// Set an attribute with explicit modes, replacing any entry of the same type
    ///
    /// `INHERIT` removes the entry instead. Texture attributes go to unit 0.
    pub fn set_attribute_and_modes(&mut self, attribute: AttributeRef, mode: StateMode) {
        if attribute.is_texture_attribute() {
            self.set_texture_attribute_and_modes(0, attribute, mode);
            return;
        }
        debug_assert!(mode.is_well_formed(), "malformed attribute mode {mode:?}");
        Self::upsert(&mut self.attributes, attribute, mode);
    }

    /// Set a texture attribute on a unit with explicit modes
    pub fn set_texture_attribute_and_modes(&mut self, unit: usize, attribute: AttributeRef, mode: StateMode) {
        debug_assert!(mode.is_well_formed(), "malformed attribute mode {mode:?}");
        if self.texture_attributes.len() <= unit {
            self.texture_attributes.resize_with(unit + 1, Vec::new);
        }
        Self::upsert(&mut self.texture_attributes[unit], attribute, mode);
    }

    /// Remove the entry of an attribute type
    pub fn remove_attribute(&mut self, type_name: &str) {
        self.attributes.retain(|entry| entry.attribute.type_name() != type_name);
    }

    /// Remove the entry of a texture attribute type on a unit
    pub fn remove_texture_attribute(&mut self, unit: usize, type_name: &str) {
        if let Some(entries) = self.texture_attributes.get_mut(unit) {
            entries.retain(|entry| entry.attribute.type_name() != type_name);
        }
    }

    /// Entry for an attribute type
    pub fn attribute(&self, type_name: &str) -> Option<&StateEntry> {
        self.attributes
            .iter()
            .find(|entry| entry.attribute.type_name() == type_name)
    }

    /// Entry for a texture attribute type on a unit
    pub fn texture_attribute(&self, unit: usize, type_name: &str) -> Option<&StateEntry> {
        self.texture_attributes
            .get(unit)?
            .iter()
            .find(|entry| entry.attribute.type_name() == type_name)
    }

    /// Regular attribute entries in insertion order
    pub fn attributes(&self) -> &[StateEntry] {
        &self.attributes
    }

    /// Texture attribute entries indexed by unit
    pub fn texture_attributes(&self) -> &[Vec<StateEntry>] {
        &self.texture_attributes
    }

    /// Whether the set holds no entries at all
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.texture_attributes.iter().all(Vec::is_empty)
    }

    fn upsert(entries: &mut Vec<StateEntry>, attribute: AttributeRef, mode: StateMode) {
        let type_name = attribute.type_name();
        let existing = entries
            .iter()
            .position(|entry| entry.attribute.type_name() == type_name);

        if mode == StateMode::INHERIT {
            if let Some(index) = existing {
                entries.remove(index);
            }
            return;
        }

        let entry = StateEntry { attribute, mode };
        match existing {
            Some(index) => entries[index] = entry,
            None => entries.push(entry),
        }
    }
}
