//! Graphics context abstraction
//!
//! The render state and the texture pool never talk to a graphics API
//! directly. Everything goes through [`GraphicsContext`], which a backend
//! implements with its primitive operations. [`RecordingContext`] is the
//! headless implementation used by tests and the demo driver.

pub mod recording;

pub use recording::{GfxCall, RecordingContext};

use crate::foundation::math::Mat4;
use crate::scene::PrimitiveSet;

/// Handle to a texture object owned by the graphics context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Handle to a linked shader program owned by the graphics context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Texture binding targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// Regular 2D texture
    Texture2D,
    /// Six-faced cube map
    CubeMap,
}

impl TextureTarget {
    /// GL enumerant, used when building pool keys
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::Texture2D => 0x0DE1,
            Self::CubeMap => 0x8513,
        }
    }
}

/// Internal pixel formats understood by the texture pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single alpha channel
    Alpha,
    /// Single luminance channel
    Luminance,
    /// Luminance and alpha
    LuminanceAlpha,
    /// Red, green and blue
    Rgb,
    /// Red, green, blue and alpha
    Rgba,
}

impl PixelFormat {
    /// GL enumerant, used when building pool keys
    pub const fn gl_enum(self) -> u32 {
        match self {
            Self::Alpha => 0x1906,
            Self::Luminance => 0x1909,
            Self::LuminanceAlpha => 0x190A,
            Self::Rgb => 0x1907,
            Self::Rgba => 0x1908,
        }
    }

    /// Storage bits per texel
    pub const fn bits_per_texel(self) -> u32 {
        match self {
            Self::Alpha | Self::Luminance => 8,
            Self::LuminanceAlpha => 16,
            Self::Rgb => 24,
            Self::Rgba => 32,
        }
    }
}

/// Depth comparison functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    /// Depth testing disabled
    Disable,
    /// Never passes
    Never,
    /// Passes if the incoming depth is less than the stored depth
    Less,
    /// Passes if equal
    Equal,
    /// Passes if less or equal
    LessEqual,
    /// Passes if greater
    Greater,
    /// Passes if not equal
    NotEqual,
    /// Passes if greater or equal
    GreaterEqual,
    /// Always passes
    Always,
}

/// Blend factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    OneMinusSrcAlpha,
    /// Destination alpha
    DstAlpha,
    /// 1 - destination alpha
    OneMinusDstAlpha,
}

/// Face culling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// No culling
    None,
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
}

/// Primitive operations a graphics backend provides
///
/// The context is passed by reference into every call that needs it and is
/// never retained by the render state or the texture pool.
pub trait GraphicsContext {
    /// Allocate a new texture object
    fn create_texture(&mut self) -> TextureId;

    /// Free a texture object
    fn delete_texture(&mut self, texture: TextureId);

    /// Bind a texture (or unbind with `None`) on the active unit
    fn bind_texture(&mut self, target: TextureTarget, texture: Option<TextureId>);

    /// Select the texture unit subsequent binds apply to
    fn active_texture(&mut self, unit: u32);

    /// Allocate storage for the currently bound texture
    fn tex_image_2d(&mut self, target: TextureTarget, format: PixelFormat, width: u32, height: u32);

    /// Compile and link a program from source
    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> ProgramId;

    /// Make a program current
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Free a program
    fn delete_program(&mut self, program: ProgramId);

    /// Upload a matrix uniform to the current program
    fn set_uniform_matrix4(&mut self, name: &str, value: &Mat4);

    /// Configure depth testing
    fn set_depth(&mut self, func: DepthFunc, near: f64, far: f64, write_mask: bool);

    /// Configure blending; `None` disables it
    fn set_blend_func(&mut self, factors: Option<(BlendFactor, BlendFactor)>);

    /// Configure face culling
    fn set_cull_face(&mut self, mode: CullMode);

    /// Upload material colors
    fn set_material(&mut self, ambient: [f32; 4], diffuse: [f32; 4], specular: [f32; 4], shininess: f32);

    /// Issue a draw call for one primitive set of the bound geometry
    fn draw(&mut self, primitive: &PrimitiveSet);
}
