//! Math utilities and types
//!
//! Provides the vector and matrix aliases used by the scene graph and the
//! traversal stacks. Geometry payloads stay in single precision while every
//! accumulated transform is kept in double precision.

pub use nalgebra::{Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Double precision 3D vector type
pub type Vec3d = Vector3<f64>;

/// Double precision 4x4 matrix type
pub type Mat4d = Matrix4<f64>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Double precision 3D point type
pub type Point3d = nalgebra::Point3<f64>;

/// Rectangular window region a camera renders into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels
    pub x: f64,
    /// Bottom edge in pixels
    pub y: f64,
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl Viewport {
    /// Create a new viewport
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Matrix mapping normalized device coordinates to window coordinates
    ///
    /// `T(x, y, 0) * S(w/2, h/2, 1/2) * T(1, 1, 1)`: NDC `[-1, 1]` lands on
    /// `[x, x + width]` horizontally and depth lands on `[0, 1]`.
    pub fn compute_window_matrix(&self) -> Mat4d {
        let offset = Mat4d::new_translation(&Vec3d::new(1.0, 1.0, 1.0));
        let scale = Mat4d::new_nonuniform_scaling(&Vec3d::new(
            0.5 * self.width,
            0.5 * self.height,
            0.5,
        ));
        let origin = Mat4d::new_translation(&Vec3d::new(self.x, self.y, 0.0));
        origin * scale * offset
    }

    /// Aspect ratio (width / height)
    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// Promote a single precision matrix to double precision
pub fn to_f64(matrix: &Mat4) -> Mat4d {
    matrix.map(f64::from)
}

/// Demote a double precision matrix for upload to the graphics context
#[allow(clippy::cast_possible_truncation)]
pub fn to_f32(matrix: &Mat4d) -> Mat4 {
    matrix.map(|v| v as f32)
}

/// Promote a single precision vector to double precision
pub fn vec_to_f64(v: &Vec3) -> Vec3d {
    v.map(f64::from)
}

/// Extension trait for Mat4d with camera construction helpers
pub trait Mat4dExt {
    /// Right-handed perspective projection (OpenGL clip conventions)
    fn perspective(fov_y: f64, aspect: f64, near: f64, far: f64) -> Mat4d;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3d, target: Vec3d, up: Vec3d) -> Mat4d;
}

impl Mat4dExt for Mat4d {
    fn perspective(fov_y: f64, aspect: f64, near: f64, far: f64) -> Mat4d {
        nalgebra::Perspective3::new(aspect, fov_y, near, far).to_homogeneous()
    }

    fn look_at(eye: Vec3d, target: Vec3d, up: Vec3d) -> Mat4d {
        Mat4d::look_at_rh(&Point3d::from(eye), &Point3d::from(target), &up)
    }
}
