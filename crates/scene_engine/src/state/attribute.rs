//! State attributes, shared attribute handles and the type registry

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::gfx::GraphicsContext;
use crate::texture::TextureManager;

/// Everything an attribute may touch while applying itself
pub struct ApplyContext<'a> {
    /// Graphics context receiving the calls
    pub gl: &'a mut dyn GraphicsContext,
    /// Texture pool for attributes backed by texture objects
    pub textures: &'a mut TextureManager,
    /// Active texture unit when applying a texture attribute
    pub texture_unit: Option<u32>,
}

/// A single piece of render state
///
/// Implementors are identified by a stable type name. One attribute
/// instance may be referenced by many state sets through [`AttributeRef`].
pub trait StateAttribute: Any + fmt::Debug {
    /// Stable type key, shared by every instance of the attribute type
    fn type_name(&self) -> &'static str;

    /// Texture attributes are resolved per texture unit
    fn is_texture_attribute(&self) -> bool {
        false
    }

    /// A default-constructed instance of the same type
    fn clone_type(&self) -> Box<dyn StateAttribute>;

    /// Issue the graphics calls that make this attribute current
    fn apply(&mut self, ctx: &mut ApplyContext<'_>);

    /// Downcasting support
    fn as_any(&self) -> &dyn Any;

    /// Downcasting support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct AttributeCell {
    revision: Cell<u64>,
    attribute: RefCell<Box<dyn StateAttribute>>,
}

/// Shared, reference-counted handle to an attribute
///
/// Equality is identity: two handles are the same attribute only if they
/// point at the same instance. Mutating through [`AttributeRef::modify`]
/// bumps the attribute's revision; every stack remembers the revision it
/// applied, so each of them re-applies the attribute independently.
#[derive(Clone)]
pub struct AttributeRef {
    inner: Rc<AttributeCell>,
    type_name: &'static str,
    texture: bool,
}

impl AttributeRef {
    /// Wrap an attribute
    pub fn new(attribute: impl StateAttribute) -> Self {
        Self::from_boxed(Box::new(attribute))
    }

    /// Wrap an already boxed attribute
    pub fn from_boxed(attribute: Box<dyn StateAttribute>) -> Self {
        let type_name = attribute.type_name();
        let texture = attribute.is_texture_attribute();
        Self {
            inner: Rc::new(AttributeCell {
                revision: Cell::new(0),
                attribute: RefCell::new(attribute),
            }),
            type_name,
            texture,
        }
    }

    /// Type key of the wrapped attribute
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the wrapped attribute is per texture unit
    pub fn is_texture_attribute(&self) -> bool {
        self.texture
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &AttributeRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Change counter, bumped by every modification
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    /// Force a re-apply wherever the attribute is resolved next
    pub fn dirty(&self) {
        self.inner.revision.set(self.inner.revision.get().wrapping_add(1));
    }

    /// A fresh default instance of the same attribute type
    pub fn clone_type(&self) -> AttributeRef {
        AttributeRef::from_boxed(self.inner.attribute.borrow().clone_type())
    }

    /// Read the concrete attribute
    ///
    /// Returns `None` when `A` is not the wrapped type.
    pub fn with<A: StateAttribute, R>(&self, f: impl FnOnce(&A) -> R) -> Option<R> {
        let attribute = self.inner.attribute.borrow();
        attribute.as_any().downcast_ref::<A>().map(f)
    }

    /// Mutate the concrete attribute and bump its revision
    ///
    /// Returns `None` when `A` is not the wrapped type.
    pub fn modify<A: StateAttribute, R>(&self, f: impl FnOnce(&mut A) -> R) -> Option<R> {
        let mut attribute = self.inner.attribute.borrow_mut();
        let result = attribute.as_any_mut().downcast_mut::<A>().map(f);
        drop(attribute);
        if result.is_some() {
            self.dirty();
        }
        result
    }

    /// Apply the attribute and return the revision that was applied
    pub fn apply(&self, ctx: &mut ApplyContext<'_>) -> u64 {
        self.inner.attribute.borrow_mut().apply(ctx);
        self.revision()
    }
}

impl PartialEq for AttributeRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.attribute.try_borrow() {
            Ok(attribute) => write!(f, "AttributeRef({attribute:?})"),
            Err(_) => write!(f, "AttributeRef({})", self.type_name),
        }
    }
}

/// Maps attribute type names to dense stack slots
///
/// Built once per render state instead of living in a process-wide table, so
/// independent states (one per graphics context) can coexist. Texture
/// attribute types use their own slot space.
#[derive(Debug, Default, Clone)]
pub struct AttributeRegistry {
    slots: HashMap<&'static str, usize>,
    texture_slots: HashMap<&'static str, usize>,
}

impl AttributeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for a regular attribute type, registering it on first use
    pub fn slot_of(&mut self, type_name: &'static str) -> usize {
        let next = self.slots.len();
        *self.slots.entry(type_name).or_insert(next)
    }

    /// Slot for a texture attribute type, registering it on first use
    pub fn texture_slot_of(&mut self, type_name: &'static str) -> usize {
        let next = self.texture_slots.len();
        *self.texture_slots.entry(type_name).or_insert(next)
    }

    /// Slot of an already registered regular attribute type
    pub fn lookup(&self, type_name: &str) -> Option<usize> {
        self.slots.get(type_name).copied()
    }

    /// Slot of an already registered texture attribute type
    pub fn lookup_texture(&self, type_name: &str) -> Option<usize> {
        self.texture_slots.get(type_name).copied()
    }

    /// Number of regular attribute types seen
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no attribute type was registered yet
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.texture_slots.is_empty()
    }
}
