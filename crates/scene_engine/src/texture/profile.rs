//! Structural texture profiles used as pooling keys

use crate::gfx::{PixelFormat, TextureTarget};

/// Shape and format of a GPU texture
///
/// Two profiles are equal only when all four fields match exactly; there is
/// no approximate matching and no format coercion. The profile itself is
/// the pool key, so keys cannot collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureProfile {
    /// Binding target
    pub target: TextureTarget,
    /// Internal pixel format
    pub format: PixelFormat,
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
}

impl TextureProfile {
    /// Create a new profile
    pub fn new(target: TextureTarget, format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            target,
            format,
            width,
            height,
        }
    }

    /// Whether another profile describes exactly the same storage
    pub fn matches(&self, other: &TextureProfile) -> bool {
        self == other
    }

    /// Estimated GPU memory in bytes
    ///
    /// Texel bits from the format times the area, times six for cube maps,
    /// plus a third for mipmap storage whether or not mipmaps are used.
    pub fn size_bytes(&self) -> f64 {
        let bits = f64::from(self.width)
            * f64::from(self.height)
            * f64::from(self.format.bits_per_texel());
        let mut size = bits.ceil() / 8.0;

        if self.target == TextureTarget::CubeMap {
            size *= 6.0;
        }

        size + size / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rgba_2d_size() {
        let profile = TextureProfile::new(TextureTarget::Texture2D, PixelFormat::Rgba, 4, 4);
        assert_relative_eq!(profile.size_bytes(), 64.0 + 64.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cube_map_size() {
        let profile = TextureProfile::new(TextureTarget::CubeMap, PixelFormat::Rgba, 4, 4);
        assert_relative_eq!(profile.size_bytes(), 512.0, epsilon = 1e-9);
    }

    #[test]
    fn test_texel_bits_per_format() {
        let size = |format| TextureProfile::new(TextureTarget::Texture2D, format, 3, 1).size_bytes();
        // 3 texels, no cube factor, +1/3 overhead
        assert_relative_eq!(size(PixelFormat::Alpha), 3.0 * 4.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(size(PixelFormat::Luminance), 3.0 * 4.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(size(PixelFormat::LuminanceAlpha), 6.0 * 4.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(size(PixelFormat::Rgb), 9.0 * 4.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(size(PixelFormat::Rgba), 12.0 * 4.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_profiles_match_exactly() {
        let a = TextureProfile::new(TextureTarget::Texture2D, PixelFormat::Rgba, 256, 256);
        let b = TextureProfile::new(TextureTarget::Texture2D, PixelFormat::Rgba, 256, 256);
        let c = TextureProfile::new(TextureTarget::Texture2D, PixelFormat::Rgb, 256, 256);
        let d = TextureProfile::new(TextureTarget::Texture2D, PixelFormat::Rgba, 12, 3);
        let e = TextureProfile::new(TextureTarget::Texture2D, PixelFormat::Rgba, 1, 23);
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
        assert!(!d.matches(&e));
    }
}
