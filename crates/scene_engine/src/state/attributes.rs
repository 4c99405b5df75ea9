//! Fixed-function render state attributes

use std::any::Any;

use super::attribute::{ApplyContext, StateAttribute};
use crate::gfx::{BlendFactor, CullMode, DepthFunc};

/// Depth test configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Depth {
    func: DepthFunc,
    near: f64,
    far: f64,
    write_mask: bool,
}

impl Default for Depth {
    fn default() -> Self {
        Self {
            func: DepthFunc::Less,
            near: 0.0,
            far: 1.0,
            write_mask: true,
        }
    }
}

impl Depth {
    /// Type key
    pub const TYPE_NAME: &'static str = "Depth";

    /// Depth test with a comparison function and default range
    pub fn new(func: DepthFunc) -> Self {
        Self {
            func,
            ..Default::default()
        }
    }

    /// Comparison function
    pub fn func(&self) -> DepthFunc {
        self.func
    }

    /// Set the depth range
    pub fn set_range(&mut self, near: f64, far: f64) {
        self.near = near;
        self.far = far;
    }

    /// Depth range
    pub fn range(&self) -> (f64, f64) {
        (self.near, self.far)
    }

    /// Enable or disable depth writes
    pub fn set_write_mask(&mut self, mask: bool) {
        self.write_mask = mask;
    }

    /// Whether depth writes are enabled
    pub fn write_mask(&self) -> bool {
        self.write_mask
    }
}

impl StateAttribute for Depth {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_type(&self) -> Box<dyn StateAttribute> {
        Box::new(Self::default())
    }

    fn apply(&mut self, ctx: &mut ApplyContext<'_>) {
        ctx.gl.set_depth(self.func, self.near, self.far, self.write_mask);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Blend function; the default disables blending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlendFunc {
    factors: Option<(BlendFactor, BlendFactor)>,
}

impl BlendFunc {
    /// Type key
    pub const TYPE_NAME: &'static str = "BlendFunc";

    /// Blend with source and destination factors
    pub fn new(source: BlendFactor, destination: BlendFactor) -> Self {
        Self {
            factors: Some((source, destination)),
        }
    }

    /// Standard alpha blending
    pub fn alpha() -> Self {
        Self::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)
    }

    /// Source and destination factors, `None` when blending is disabled
    pub fn factors(&self) -> Option<(BlendFactor, BlendFactor)> {
        self.factors
    }
}

impl StateAttribute for BlendFunc {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_type(&self) -> Box<dyn StateAttribute> {
        Box::new(Self::default())
    }

    fn apply(&mut self, ctx: &mut ApplyContext<'_>) {
        ctx.gl.set_blend_func(self.factors);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Face culling; the default culls back faces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CullFace {
    mode: CullMode,
}

impl Default for CullFace {
    fn default() -> Self {
        Self {
            mode: CullMode::Back,
        }
    }
}

impl CullFace {
    /// Type key
    pub const TYPE_NAME: &'static str = "CullFace";

    /// Cull with a given mode
    pub fn new(mode: CullMode) -> Self {
        Self { mode }
    }

    /// Culling mode
    pub fn mode(&self) -> CullMode {
        self.mode
    }
}

impl StateAttribute for CullFace {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_type(&self) -> Box<dyn StateAttribute> {
        Box::new(Self::default())
    }

    fn apply(&mut self, ctx: &mut ApplyContext<'_>) {
        ctx.gl.set_cull_face(self.mode);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Surface material colors
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Ambient color
    pub ambient: [f32; 4],
    /// Diffuse color
    pub diffuse: [f32; 4],
    /// Specular color
    pub specular: [f32; 4],
    /// Specular exponent
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: [0.2, 0.2, 0.2, 1.0],
            diffuse: [0.8, 0.8, 0.8, 1.0],
            specular: [0.0, 0.0, 0.0, 1.0],
            shininess: 12.5,
        }
    }
}

impl Material {
    /// Type key
    pub const TYPE_NAME: &'static str = "Material";

    /// Default material with a diffuse color
    pub fn with_diffuse(diffuse: [f32; 4]) -> Self {
        Self {
            diffuse,
            ..Default::default()
        }
    }
}

impl StateAttribute for Material {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_type(&self) -> Box<dyn StateAttribute> {
        Box::new(Self::default())
    }

    fn apply(&mut self, ctx: &mut ApplyContext<'_>) {
        ctx.gl.set_material(self.ambient, self.diffuse, self.specular, self.shininess);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Switches the generated shader to billboard vertex processing
///
/// Issues no graphics calls of its own; its presence only changes the
/// active attribute set the shader generator sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Billboard {
    enabled: bool,
}

impl Default for Billboard {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Billboard {
    /// Type key
    pub const TYPE_NAME: &'static str = "Billboard";

    /// Enable or disable billboarding
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether billboarding is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl StateAttribute for Billboard {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_type(&self) -> Box<dyn StateAttribute> {
        Box::new(Self::default())
    }

    fn apply(&mut self, _ctx: &mut ApplyContext<'_>) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
