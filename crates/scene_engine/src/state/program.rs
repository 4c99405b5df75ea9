//! Shader program attribute and the shader generator seam

use std::any::Any;
use std::collections::HashMap;

use super::attribute::{ApplyContext, AttributeRef, StateAttribute};
use super::attributes::Billboard;
use crate::gfx::ProgramId;

/// Shader program made current when resolved
///
/// Compiled lazily through the graphics context on first apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    vertex_source: String,
    fragment_source: String,
    program: Option<ProgramId>,
}

impl Program {
    /// Type key
    pub const TYPE_NAME: &'static str = "Program";

    /// Program from vertex and fragment source
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            program: None,
        }
    }

    /// Vertex shader source
    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    /// Fragment shader source
    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    /// Native program once compiled
    pub fn program_id(&self) -> Option<ProgramId> {
        self.program
    }
}

impl StateAttribute for Program {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_type(&self) -> Box<dyn StateAttribute> {
        Box::new(Self::default())
    }

    fn apply(&mut self, ctx: &mut ApplyContext<'_>) {
        let program = match self.program {
            Some(program) => program,
            None => {
                let program = ctx.gl.create_program(&self.vertex_source, &self.fragment_source);
                self.program = Some(program);
                program
            }
        };
        ctx.gl.use_program(Some(program));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Produces a program when no program attribute is active
pub trait ShaderGenerator {
    /// Program matching the active attributes
    ///
    /// `attributes` holds the resolved regular attributes and
    /// `texture_attributes` the resolved attributes per texture unit.
    fn generate(
        &mut self,
        attributes: &[AttributeRef],
        texture_attributes: &[Vec<AttributeRef>],
    ) -> AttributeRef;
}

/// Generator producing one cached program per active attribute combination
#[derive(Debug, Default)]
pub struct DefaultShaderGenerator {
    cache: HashMap<String, AttributeRef>,
}

impl DefaultShaderGenerator {
    /// Create an empty generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct programs generated so far
    pub fn cached_programs(&self) -> usize {
        self.cache.len()
    }

    fn cache_key(attributes: &[AttributeRef], texture_attributes: &[Vec<AttributeRef>]) -> String {
        let mut names: Vec<String> = attributes
            .iter()
            .map(|attribute| attribute.type_name().to_string())
            .collect();
        for (unit, unit_attributes) in texture_attributes.iter().enumerate() {
            names.extend(
                unit_attributes
                    .iter()
                    .map(|attribute| format!("{}{}", attribute.type_name(), unit)),
            );
        }
        names.sort();
        names.join(";")
    }

    fn defines(key: &str) -> String {
        key.split(';')
            .filter(|name| !name.is_empty())
            .map(|name| format!("#define WITH_{}\n", name.to_uppercase()))
            .collect()
    }
}

impl ShaderGenerator for DefaultShaderGenerator {
    fn generate(
        &mut self,
        attributes: &[AttributeRef],
        texture_attributes: &[Vec<AttributeRef>],
    ) -> AttributeRef {
        let names = Self::cache_key(attributes, texture_attributes);
        let billboard = attributes
            .iter()
            .any(|a| a.with(Billboard::is_enabled).unwrap_or(false));
        // a disabled billboard keeps its type in the names
        let key = if billboard { format!("{names}+billboard") } else { names.clone() };
        if let Some(program) = self.cache.get(&key) {
            return program.clone();
        }

        let defines = Self::defines(&names);
        let vertex = format!(
            "{defines}{}\nvoid main() {{ gl_Position = ProjectionMatrix * ModelViewMatrix * vec4(Vertex, 1.0); }}\n",
            if billboard { "#define BILLBOARD" } else { "" }
        );
        let fragment = format!("{defines}void main() {{ gl_FragColor = vec4(1.0); }}\n");

        log::debug!("Generated shader program for [{}]", key);
        let program = AttributeRef::new(Program::new(vertex, fragment));
        self.cache.insert(key, program.clone());
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::attributes::{Billboard, Depth, Material};
    use crate::state::Texture;

    #[test]
    fn test_generator_caches_by_attribute_types() {
        let mut generator = DefaultShaderGenerator::new();
        let first = generator.generate(
            &[AttributeRef::new(Depth::default()), AttributeRef::new(Material::default())],
            &[],
        );
        // different instances, same types in another order
        let second = generator.generate(
            &[AttributeRef::new(Material::default()), AttributeRef::new(Depth::default())],
            &[],
        );
        assert!(first.ptr_eq(&second));
        assert_eq!(generator.cached_programs(), 1);
    }

    #[test]
    fn test_texture_unit_changes_program() {
        let mut generator = DefaultShaderGenerator::new();
        let unit0 = generator.generate(&[], &[vec![AttributeRef::new(Texture::default())]]);
        let unit1 = generator.generate(&[], &[vec![], vec![AttributeRef::new(Texture::default())]]);
        assert!(!unit0.ptr_eq(&unit1));
    }

    #[test]
    fn test_generated_source_carries_defines() {
        let mut generator = DefaultShaderGenerator::new();
        let program = generator.generate(&[AttributeRef::new(Material::default())], &[]);
        let source = program.with(|p: &Program| p.fragment_source().to_string()).unwrap();
        assert!(source.contains("#define WITH_MATERIAL"));
    }

    #[test]
    fn test_billboard_toggle_selects_another_program() {
        let mut generator = DefaultShaderGenerator::new();
        let billboard = AttributeRef::new(Billboard::default());
        billboard.modify(|b: &mut Billboard| b.set_enabled(true));
        let facing = generator.generate(std::slice::from_ref(&billboard), &[]);

        billboard.modify(|b: &mut Billboard| b.set_enabled(false));
        let plain = generator.generate(std::slice::from_ref(&billboard), &[]);

        assert!(!facing.ptr_eq(&plain));
        let source = facing.with(|p: &Program| p.vertex_source().to_string()).unwrap();
        assert!(source.contains("#define BILLBOARD"));
    }
}
