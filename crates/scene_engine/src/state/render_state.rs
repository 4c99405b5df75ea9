//! Accumulated render state for one graphics context
//!
//! # Architecture
//!
//! ```text
//! State
//!   ├── AttributeRegistry (type name -> slot)
//!   ├── attribute stacks [slot]
//!   ├── texture stacks [unit][slot]
//!   ├── program stack ──► ShaderGenerator when empty
//!   ├── state set stack (root-to-node path)
//!   └── TextureManager
//! ```
//!
//! State sets are pushed while walking down the graph and popped on the way
//! back up. `apply` resolves the top of every stack and issues graphics
//! calls only for the types whose resolved attribute changed since the last
//! apply, or whose attribute was modified in place.

use std::rc::Rc;

use super::attribute::{ApplyContext, AttributeRef, AttributeRegistry};
use super::program::{DefaultShaderGenerator, Program, ShaderGenerator};
use super::stack::AttributeStack;
use super::state_set::{StateEntry, StateSet};
use crate::config::RendererSettings;
use crate::gfx::GraphicsContext;
use crate::texture::TextureManager;

/// Render state stack
pub struct State {
    registry: AttributeRegistry,
    attribute_stacks: Vec<AttributeStack>,
    texture_stacks: Vec<Vec<AttributeStack>>,
    program_stack: AttributeStack,
    state_set_stack: Vec<Rc<StateSet>>,
    shader_generator: Box<dyn ShaderGenerator>,
    last_program: Option<(AttributeRef, u64)>,
    active_unit: Option<u32>,
    texture_manager: TextureManager,
    max_texture_units: usize,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// Create a state using the default shader generator
    pub fn new() -> Self {
        Self::with_generator(Box::new(DefaultShaderGenerator::new()))
    }

    /// Create a state with a custom shader generator
    pub fn with_generator(shader_generator: Box<dyn ShaderGenerator>) -> Self {
        let defaults = RendererSettings::default();
        Self {
            registry: AttributeRegistry::new(),
            attribute_stacks: Vec::new(),
            texture_stacks: Vec::new(),
            program_stack: AttributeStack::new(),
            state_set_stack: Vec::new(),
            shader_generator,
            last_program: None,
            active_unit: None,
            texture_manager: TextureManager::with_settings(&defaults),
            max_texture_units: defaults.max_texture_units as usize,
        }
    }

    /// Create a state configured from renderer settings
    pub fn with_settings(settings: &RendererSettings, shader_generator: Box<dyn ShaderGenerator>) -> Self {
        Self {
            texture_manager: TextureManager::with_settings(settings),
            max_texture_units: settings.max_texture_units as usize,
            ..Self::with_generator(shader_generator)
        }
    }

    /// Push the entries of a state set on top of the current path
    pub fn push_state_set(&mut self, state_set: Rc<StateSet>) {
        for entry in state_set.attributes() {
            if entry.attribute.type_name() == Program::TYPE_NAME {
                self.program_stack.push(entry);
            } else {
                let slot = self.attribute_slot(&entry.attribute);
                self.attribute_stacks[slot].push(entry);
            }
        }

        for (unit, entries) in state_set.texture_attributes().iter().enumerate() {
            if unit >= self.max_texture_units {
                log::warn!(
                    "Ignoring texture unit {} of state set '{}', only {} units available",
                    unit,
                    state_set.name(),
                    self.max_texture_units
                );
                continue;
            }
            for entry in entries {
                let slot = self.texture_slot(unit, &entry.attribute);
                self.texture_stacks[unit][slot].push(entry);
            }
        }

        self.state_set_stack.push(state_set);
    }

    /// Pop the most recently pushed state set
    ///
    /// Popping an empty stack is a caller bug: it asserts in debug builds
    /// and is logged and ignored otherwise.
    pub fn pop_state_set(&mut self) {
        let Some(state_set) = self.state_set_stack.pop() else {
            debug_assert!(false, "pop_state_set called on an empty state set stack");
            log::error!("Unbalanced pop_state_set ignored");
            return;
        };

        for entry in state_set.attributes() {
            if entry.attribute.type_name() == Program::TYPE_NAME {
                self.program_stack.pop();
            } else if let Some(slot) = self.registry.lookup(entry.attribute.type_name()) {
                self.attribute_stacks[slot].pop();
            }
        }

        for (unit, entries) in state_set
            .texture_attributes()
            .iter()
            .enumerate()
            .take(self.max_texture_units)
        {
            for entry in entries {
                if let Some(slot) = self.registry.lookup_texture(entry.attribute.type_name()) {
                    self.texture_stacks[unit][slot].pop();
                }
            }
        }
    }

    /// Push, apply and pop a state set without retaining it
    pub fn apply_state_set(&mut self, gl: &mut dyn GraphicsContext, state_set: Rc<StateSet>) {
        self.push_state_set(state_set);
        self.apply(gl);
        self.pop_state_set();
    }

    /// Issue the graphics calls for every stack whose resolved value changed
    pub fn apply(&mut self, gl: &mut dyn GraphicsContext) {
        let program = match self.program_stack.resolved() {
            Some(program) => program.clone(),
            None => {
                let (attributes, texture_attributes) =
                    active_attributes(&self.attribute_stacks, &self.texture_stacks);
                self.shader_generator.generate(&attributes, &texture_attributes)
            }
        };

        let mut ctx = ApplyContext {
            gl,
            textures: &mut self.texture_manager,
            texture_unit: None,
        };

        let program_changed = match &self.last_program {
            Some((last, revision)) => !last.ptr_eq(&program) || program.revision() != *revision,
            None => true,
        };
        if program_changed {
            let revision = program.apply(&mut ctx);
            self.last_program = Some((program, revision));
        }

        for stack in &mut self.attribute_stacks {
            stack.apply(&mut ctx);
        }

        for (unit, stacks) in self.texture_stacks.iter_mut().enumerate() {
            let unit = unit as u32;
            for stack in stacks.iter_mut() {
                if !stack.needs_apply() {
                    continue;
                }
                if self.active_unit != Some(unit) {
                    ctx.gl.active_texture(unit);
                    self.active_unit = Some(unit);
                }
                ctx.texture_unit = Some(unit);
                stack.apply(&mut ctx);
            }
        }
    }

    /// Program made current by the last apply
    pub fn last_program_applied(&self) -> Option<&AttributeRef> {
        self.last_program.as_ref().map(|(program, _)| program)
    }

    /// Number of state sets currently pushed
    pub fn state_set_stack_size(&self) -> usize {
        self.state_set_stack.len()
    }

    /// State sets on the current path, root first
    pub fn state_set_stack(&self) -> &[Rc<StateSet>] {
        &self.state_set_stack
    }

    /// Depth of the stack for an attribute type
    pub fn attribute_stack_depth(&self, type_name: &str) -> usize {
        if type_name == Program::TYPE_NAME {
            return self.program_stack.depth();
        }
        self.registry
            .lookup(type_name)
            .map_or(0, |slot| self.attribute_stacks[slot].depth())
    }

    /// Entry at the top of an attribute type's stack
    pub fn top_entry(&self, type_name: &str) -> Option<&StateEntry> {
        if type_name == Program::TYPE_NAME {
            return self.program_stack.top();
        }
        self.attribute_stacks.get(self.registry.lookup(type_name)?)?.top()
    }

    /// Attribute that applies for a type at the current depth
    pub fn resolved_attribute(&self, type_name: &str) -> Option<&AttributeRef> {
        if type_name == Program::TYPE_NAME {
            return self.program_stack.resolved();
        }
        self.attribute_stacks.get(self.registry.lookup(type_name)?)?.resolved()
    }

    /// Texture attribute that applies for a unit and type at the current depth
    pub fn resolved_texture_attribute(&self, unit: usize, type_name: &str) -> Option<&AttributeRef> {
        let slot = self.registry.lookup_texture(type_name)?;
        self.texture_stacks.get(unit)?.get(slot)?.resolved()
    }

    /// Replace the attribute applied when no state set enables its type
    pub fn set_global_default_attribute(&mut self, attribute: AttributeRef) {
        if attribute.type_name() == Program::TYPE_NAME {
            self.program_stack.set_global_default(attribute);
            return;
        }
        let slot = self.attribute_slot(&attribute);
        self.attribute_stacks[slot].set_global_default(attribute);
    }

    /// Global default of an attribute type
    pub fn global_default_attribute(&self, type_name: &str) -> Option<&AttributeRef> {
        if type_name == Program::TYPE_NAME {
            return self.program_stack.global_default();
        }
        self.attribute_stacks
            .get(self.registry.lookup(type_name)?)?
            .global_default()
    }

    /// Replace the texture attribute applied on a unit when nothing enables its type
    pub fn set_global_default_texture_attribute(&mut self, unit: usize, attribute: AttributeRef) {
        let slot = self.texture_slot(unit, &attribute);
        self.texture_stacks[unit][slot].set_global_default(attribute);
    }

    /// Global default of a texture attribute type on a unit
    pub fn global_default_texture_attribute(&self, unit: usize, type_name: &str) -> Option<&AttributeRef> {
        let slot = self.registry.lookup_texture(type_name)?;
        self.texture_stacks.get(unit)?.get(slot)?.global_default()
    }

    /// Drop every pushed state set and forget what was applied
    ///
    /// The next apply re-issues every resolved attribute. Used after the
    /// graphics context was recreated.
    pub fn reset(&mut self) {
        self.state_set_stack.clear();
        self.attribute_stacks.iter_mut().for_each(AttributeStack::reset);
        self.texture_stacks
            .iter_mut()
            .flatten()
            .for_each(AttributeStack::reset);
        self.program_stack.reset();
        self.last_program = None;
        self.active_unit = None;
    }

    /// Texture pool owned by this state
    pub fn texture_manager(&self) -> &TextureManager {
        &self.texture_manager
    }

    /// Mutable texture pool owned by this state
    pub fn texture_manager_mut(&mut self) -> &mut TextureManager {
        &mut self.texture_manager
    }

    /// Attribute type registry of this state
    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    fn attribute_slot(&mut self, attribute: &AttributeRef) -> usize {
        let slot = self.registry.slot_of(attribute.type_name());
        if self.attribute_stacks.len() <= slot {
            self.attribute_stacks.resize_with(slot + 1, AttributeStack::new);
        }
        let stack = &mut self.attribute_stacks[slot];
        if stack.global_default().is_none() {
            stack.set_global_default(attribute.clone_type());
        }
        slot
    }

    fn texture_slot(&mut self, unit: usize, attribute: &AttributeRef) -> usize {
        let slot = self.registry.texture_slot_of(attribute.type_name());
        if self.texture_stacks.len() <= unit {
            self.texture_stacks.resize_with(unit + 1, Vec::new);
        }
        let stacks = &mut self.texture_stacks[unit];
        if stacks.len() <= slot {
            stacks.resize_with(slot + 1, AttributeStack::new);
        }
        if stacks[slot].global_default().is_none() {
            stacks[slot].set_global_default(attribute.clone_type());
        }
        slot
    }
}

/// Attributes enabled on the current path, without global defaults
fn active_attributes(
    attribute_stacks: &[AttributeStack],
    texture_stacks: &[Vec<AttributeStack>],
) -> (Vec<AttributeRef>, Vec<Vec<AttributeRef>>) {
    let attributes = attribute_stacks
        .iter()
        .filter_map(|stack| stack.active().cloned())
        .collect();
    let texture_attributes = texture_stacks
        .iter()
        .map(|stacks| {
            stacks
                .iter()
                .filter_map(|stack| stack.active().cloned())
                .collect()
        })
        .collect();
    (attributes, texture_attributes)
}
