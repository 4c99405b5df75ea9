//! Headless graphics context that records every call
//!
//! Handles are handed out from monotonically increasing counters, so a
//! recorded trace is deterministic and can be asserted on directly.

use super::{
    BlendFactor, CullMode, DepthFunc, GraphicsContext, PixelFormat, ProgramId, TextureId,
    TextureTarget,
};
use crate::foundation::math::Mat4;
use crate::scene::{PrimitiveMode, PrimitiveSet};

/// One recorded graphics call
#[derive(Debug, Clone, PartialEq)]
pub enum GfxCall {
    /// `create_texture` returned this id
    CreateTexture(TextureId),
    /// `delete_texture`
    DeleteTexture(TextureId),
    /// `bind_texture`
    BindTexture(TextureTarget, Option<TextureId>),
    /// `active_texture`
    ActiveTexture(u32),
    /// `tex_image_2d`
    TexImage2D(TextureTarget, PixelFormat, u32, u32),
    /// `create_program` returned this id
    CreateProgram(ProgramId),
    /// `use_program`
    UseProgram(Option<ProgramId>),
    /// `delete_program`
    DeleteProgram(ProgramId),
    /// `set_uniform_matrix4`
    UniformMatrix4(String, Mat4),
    /// `set_depth`
    Depth(DepthFunc, f64, f64, bool),
    /// `set_blend_func`
    BlendFunc(Option<(BlendFactor, BlendFactor)>),
    /// `set_cull_face`
    CullFace(CullMode),
    /// `set_material`
    Material([f32; 4]),
    /// `draw` with the primitive mode and vertex/index count
    Draw(PrimitiveMode, usize),
}

/// Graphics context that records calls instead of executing them
#[derive(Debug, Default)]
pub struct RecordingContext {
    calls: Vec<GfxCall>,
    next_texture: u32,
    next_program: u32,
}

impl RecordingContext {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far, oldest first
    pub fn calls(&self) -> &[GfxCall] {
        &self.calls
    }

    /// Forget recorded calls (handle counters keep running)
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching a predicate
    pub fn count(&self, predicate: impl Fn(&GfxCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// How many times a texture was bound
    pub fn bind_count(&self, texture: TextureId) -> usize {
        self.count(|call| matches!(call, GfxCall::BindTexture(_, Some(id)) if *id == texture))
    }

    /// Textures deleted, in call order
    pub fn deleted_textures(&self) -> Vec<TextureId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                GfxCall::DeleteTexture(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Number of draw calls
    pub fn draw_count(&self) -> usize {
        self.count(|call| matches!(call, GfxCall::Draw(..)))
    }
}

impl GraphicsContext for RecordingContext {
    fn create_texture(&mut self) -> TextureId {
        self.next_texture += 1;
        let id = TextureId(self.next_texture);
        self.calls.push(GfxCall::CreateTexture(id));
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.calls.push(GfxCall::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureId>) {
        self.calls.push(GfxCall::BindTexture(target, texture));
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(GfxCall::ActiveTexture(unit));
    }

    fn tex_image_2d(&mut self, target: TextureTarget, format: PixelFormat, width: u32, height: u32) {
        self.calls.push(GfxCall::TexImage2D(target, format, width, height));
    }

    fn create_program(&mut self, _vertex_source: &str, _fragment_source: &str) -> ProgramId {
        self.next_program += 1;
        let id = ProgramId(self.next_program);
        self.calls.push(GfxCall::CreateProgram(id));
        id
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.calls.push(GfxCall::UseProgram(program));
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.calls.push(GfxCall::DeleteProgram(program));
    }

    fn set_uniform_matrix4(&mut self, name: &str, value: &Mat4) {
        self.calls.push(GfxCall::UniformMatrix4(name.to_string(), *value));
    }

    fn set_depth(&mut self, func: DepthFunc, near: f64, far: f64, write_mask: bool) {
        self.calls.push(GfxCall::Depth(func, near, far, write_mask));
    }

    fn set_blend_func(&mut self, factors: Option<(BlendFactor, BlendFactor)>) {
        self.calls.push(GfxCall::BlendFunc(factors));
    }

    fn set_cull_face(&mut self, mode: CullMode) {
        self.calls.push(GfxCall::CullFace(mode));
    }

    fn set_material(&mut self, _ambient: [f32; 4], diffuse: [f32; 4], _specular: [f32; 4], _shininess: f32) {
        self.calls.push(GfxCall::Material(diffuse));
    }

    fn draw(&mut self, primitive: &PrimitiveSet) {
        self.calls.push(GfxCall::Draw(primitive.mode(), primitive.count()));
    }
}
