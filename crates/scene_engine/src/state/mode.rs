//! Attribute modes controlling how state combines down the scene graph

use bitflags::bitflags;

bitflags! {
    /// How an attribute entry combines with the state inherited from ancestors
    ///
    /// `OFF` is the absence of `ON`. `OVERRIDE` locks the entry for every
    /// descendant that does not request `PROTECTED`. `INHERIT` removes the
    /// entry from a state set and cannot be combined with other bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateMode: u8 {
        /// Attribute is enabled
        const ON = 0b0001;
        /// Descendants cannot replace this entry
        const OVERRIDE = 0b0010;
        /// Entry escapes an ancestor's override
        const PROTECTED = 0b0100;
        /// Entry is taken from the parent
        const INHERIT = 0b1000;
    }
}

impl StateMode {
    /// Attribute disabled
    pub const OFF: Self = Self::empty();

    /// Decode raw mode bits
    ///
    /// # Panics
    ///
    /// Unknown bits or `INHERIT` mixed with other bits are a caller bug.
    pub fn from_raw(bits: u8) -> Self {
        let mode = Self::from_bits(bits)
            .unwrap_or_else(|| panic!("malformed attribute mode bits {bits:#06b}"));
        assert!(mode.is_well_formed(), "malformed attribute mode {mode:?}");
        mode
    }

    /// `INHERIT` stands alone
    pub fn is_well_formed(self) -> bool {
        !self.contains(Self::INHERIT) || self == Self::INHERIT
    }

    /// Whether the attribute takes effect
    pub fn is_on(self) -> bool {
        self.contains(Self::ON)
    }

    /// Whether the entry locks descendants
    pub fn is_override(self) -> bool {
        self.contains(Self::OVERRIDE)
    }

    /// Whether the entry escapes an ancestor's override
    pub fn is_protected(self) -> bool {
        self.contains(Self::PROTECTED)
    }
}

impl Default for StateMode {
    fn default() -> Self {
        Self::ON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_off_is_absence_of_on() {
        assert!(!StateMode::OFF.is_on());
        assert!(!(StateMode::OFF | StateMode::OVERRIDE).is_on());
        assert!((StateMode::ON | StateMode::OVERRIDE).is_override());
    }

    #[test]
    fn test_from_raw_accepts_known_bits() {
        assert_eq!(StateMode::from_raw(0b0011), StateMode::ON | StateMode::OVERRIDE);
        assert_eq!(StateMode::from_raw(0b1000), StateMode::INHERIT);
    }

    #[test]
    #[should_panic(expected = "malformed")]
    fn test_from_raw_rejects_unknown_bits() {
        let _ = StateMode::from_raw(0b1_0000);
    }

    #[test]
    #[should_panic(expected = "malformed")]
    fn test_from_raw_rejects_inherit_combinations() {
        let _ = StateMode::from_raw(0b1001);
    }
}
