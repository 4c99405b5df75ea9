//! Texture attribute backed by the texture object pool

use std::any::Any;

use super::attribute::{ApplyContext, StateAttribute};
use crate::gfx::{PixelFormat, TextureTarget};
use crate::texture::{TextureError, TextureManager, TextureManagerId, TextureObjectKey, TextureProfile};

/// Texture bound to a texture unit
///
/// The native texture object is requested from the pool the first time the
/// attribute is applied, and handed back with [`Texture::release_texture_object`].
/// One key is kept per pool, so the same texture can be applied through
/// several render states. A texture without a size unbinds its unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    name: String,
    target: TextureTarget,
    format: PixelFormat,
    width: u32,
    height: u32,
    texture_objects: Vec<(TextureManagerId, TextureObjectKey)>,
}

impl Default for Texture {
    fn default() -> Self {
        Self {
            name: String::new(),
            target: TextureTarget::Texture2D,
            format: PixelFormat::Rgba,
            width: 0,
            height: 0,
            texture_objects: Vec::new(),
        }
    }
}

impl Texture {
    /// Type key
    pub const TYPE_NAME: &'static str = "Texture";

    /// 2D texture with a format and size
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            ..Default::default()
        }
    }

    /// Cube map with a format and face size
    pub fn cube_map(format: PixelFormat, size: u32) -> Self {
        Self {
            target: TextureTarget::CubeMap,
            ..Self::new(format, size, size)
        }
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the debug name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Resize; the texture object of `textures` no longer matches and is released
    ///
    /// Objects held in other pools are replaced the next time the texture is
    /// applied through them.
    pub fn set_texture_size(&mut self, textures: &mut TextureManager, width: u32, height: u32) {
        if self.width != width || self.height != height {
            if let Err(e) = self.release_texture_object(textures) {
                log::debug!("Resized texture '{}' had no live object to release: {}", self.name, e);
            }
            self.width = width;
            self.height = height;
        }
    }

    /// Binding target
    pub fn target(&self) -> TextureTarget {
        self.target
    }

    /// Width and height
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Handle issued by a pool, once the texture was applied through it
    pub fn texture_object(&self, textures: &TextureManager) -> Option<TextureObjectKey> {
        self.key_for(textures.id())
    }

    /// Give the texture object of one pool back for reuse
    pub fn release_texture_object(&mut self, textures: &mut TextureManager) -> Result<(), TextureError> {
        match self.take_key(textures.id()) {
            Some(key) => textures.release(key),
            None => Ok(()),
        }
    }

    fn profile(&self) -> TextureProfile {
        TextureProfile::new(self.target, self.format, self.width, self.height)
    }

    fn key_for(&self, manager: TextureManagerId) -> Option<TextureObjectKey> {
        self.texture_objects
            .iter()
            .find(|(id, _)| *id == manager)
            .map(|(_, key)| *key)
    }

    fn take_key(&mut self, manager: TextureManagerId) -> Option<TextureObjectKey> {
        let index = self.texture_objects.iter().position(|(id, _)| *id == manager)?;
        Some(self.texture_objects.swap_remove(index).1)
    }
}

impl StateAttribute for Texture {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn is_texture_attribute(&self) -> bool {
        true
    }

    fn clone_type(&self) -> Box<dyn StateAttribute> {
        Box::new(Self::default())
    }

    fn apply(&mut self, ctx: &mut ApplyContext<'_>) {
        if self.width == 0 || self.height == 0 {
            ctx.gl.bind_texture(self.target, None);
            return;
        }

        let manager = ctx.textures.id();
        if let Some(key) = self.take_key(manager) {
            match ctx.textures.profile_of(key) {
                Some(profile) if profile == self.profile() => {
                    ctx.textures.bind(ctx.gl, key);
                    self.texture_objects.push((manager, key));
                    return;
                }
                // resized since the object was generated
                Some(_) => {
                    if let Err(e) = ctx.textures.release(key) {
                        log::debug!("Could not release outdated object of texture '{}': {}", self.name, e);
                    }
                }
                // stale after a flush or a lost context
                None => {}
            }
        }

        let key = ctx
            .textures
            .generate(ctx.gl, self.target, self.format, self.width, self.height);
        ctx.textures.bind(ctx.gl, key);
        ctx.gl.tex_image_2d(self.target, self.format, self.width, self.height);
        self.texture_objects.push((manager, key));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{GfxCall, RecordingContext};

    #[test]
    fn test_first_apply_uploads_then_binds() {
        let mut gl = RecordingContext::new();
        let mut textures = TextureManager::new();
        let mut texture = Texture::new(PixelFormat::Rgb, 2, 2);

        let mut ctx = ApplyContext {
            gl: &mut gl,
            textures: &mut textures,
            texture_unit: Some(0),
        };
        texture.apply(&mut ctx);
        texture.apply(&mut ctx);

        assert_eq!(gl.count(|c| matches!(c, GfxCall::TexImage2D(..))), 1);
        assert_eq!(gl.count(|c| matches!(c, GfxCall::BindTexture(_, Some(_)))), 2);
    }

    #[test]
    fn test_released_object_is_reused_by_next_texture() {
        let mut gl = RecordingContext::new();
        let mut textures = TextureManager::new();
        let mut first = Texture::new(PixelFormat::Rgba, 4, 4);
        let mut second = Texture::new(PixelFormat::Rgba, 4, 4);

        let mut ctx = ApplyContext {
            gl: &mut gl,
            textures: &mut textures,
            texture_unit: Some(0),
        };
        first.apply(&mut ctx);
        let key = first.texture_object(ctx.textures).unwrap();
        first.release_texture_object(ctx.textures).unwrap();
        second.apply(&mut ctx);

        assert_eq!(second.texture_object(ctx.textures), Some(key));
        assert_eq!(first.texture_object(ctx.textures), None);
    }

    #[test]
    fn test_stale_key_regenerates_after_lost_context() {
        let mut gl = RecordingContext::new();
        let mut textures = TextureManager::new();
        let mut texture = Texture::new(PixelFormat::Rgba, 4, 4);

        let mut ctx = ApplyContext {
            gl: &mut gl,
            textures: &mut textures,
            texture_unit: Some(0),
        };
        texture.apply(&mut ctx);
        ctx.textures.on_lost_context();
        texture.apply(&mut ctx);

        assert_eq!(gl.count(|c| matches!(c, GfxCall::CreateTexture(_))), 2);
        assert_eq!(textures.used_count(), 1);
    }

    #[test]
    fn test_empty_texture_unbinds() {
        let mut gl = RecordingContext::new();
        let mut textures = TextureManager::new();
        let mut texture = Texture::default();

        texture.apply(&mut ApplyContext {
            gl: &mut gl,
            textures: &mut textures,
            texture_unit: Some(1),
        });
        assert_eq!(
            gl.calls(),
            &[GfxCall::BindTexture(TextureTarget::Texture2D, None)]
        );
    }

    #[test]
    fn test_keys_are_kept_per_pool() {
        let mut gl_a = RecordingContext::new();
        let mut gl_b = RecordingContext::new();
        let mut pool_a = TextureManager::new();
        let mut pool_b = TextureManager::new();
        let mut small = Texture::new(PixelFormat::Rgba, 4, 4);
        let mut large = Texture::new(PixelFormat::Rgba, 8, 8);

        small.apply(&mut ApplyContext {
            gl: &mut gl_a,
            textures: &mut pool_a,
            texture_unit: Some(0),
        });
        large.apply(&mut ApplyContext {
            gl: &mut gl_b,
            textures: &mut pool_b,
            texture_unit: Some(0),
        });
        gl_b.clear();

        // same slot in another pool must not be mistaken for this texture's object
        small.apply(&mut ApplyContext {
            gl: &mut gl_b,
            textures: &mut pool_b,
            texture_unit: Some(0),
        });

        assert_eq!(gl_b.count(|c| matches!(c, GfxCall::TexImage2D(_, _, 4, 4))), 1);
        assert_eq!(pool_b.used_count(), 2);
        assert_ne!(small.texture_object(&pool_b), large.texture_object(&pool_b));
        assert!(small.texture_object(&pool_a).is_some());
        assert_eq!(pool_a.used_count(), 1);
    }

    #[test]
    fn test_resize_replaces_object_in_every_pool() {
        let mut gl_a = RecordingContext::new();
        let mut gl_b = RecordingContext::new();
        let mut pool_a = TextureManager::new();
        let mut pool_b = TextureManager::new();
        let mut texture = Texture::new(PixelFormat::Rgb, 4, 4);

        for (gl, pool) in [(&mut gl_a, &mut pool_a), (&mut gl_b, &mut pool_b)] {
            texture.apply(&mut ApplyContext {
                gl,
                textures: pool,
                texture_unit: Some(0),
            });
        }

        texture.set_texture_size(&mut pool_a, 16, 16);
        assert_eq!(pool_a.orphaned_count(), 1);
        assert_eq!(texture.texture_object(&pool_a), None);

        gl_b.clear();
        texture.apply(&mut ApplyContext {
            gl: &mut gl_b,
            textures: &mut pool_b,
            texture_unit: Some(0),
        });
        assert_eq!(gl_b.count(|c| matches!(c, GfxCall::TexImage2D(_, _, 16, 16))), 1);
        assert_eq!(pool_b.orphaned_count(), 1);
        assert_eq!(pool_b.used_count(), 1);
    }

    #[test]
    fn test_resize_without_object_is_quiet() {
        let mut textures = TextureManager::new();
        let mut texture = Texture::new(PixelFormat::Rgb, 4, 4);
        texture.set_texture_size(&mut textures, 2, 2);
        assert_eq!(texture.size(), (2, 2));
        assert_eq!(textures.orphaned_count(), 0);
    }
}
