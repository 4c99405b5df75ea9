//! Model, view, projection and window matrix stacks

use crate::foundation::math::Mat4d;

/// Stack of matrices that is never empty
#[derive(Debug, Clone)]
pub struct MatrixStack {
    matrices: Vec<Mat4d>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self {
            matrices: vec![Mat4d::identity()],
        }
    }
}

impl MatrixStack {
    /// Stack holding the identity
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a matrix
    pub fn push(&mut self, matrix: Mat4d) {
        self.matrices.push(matrix);
    }

    /// Pop the top matrix; the base identity is never popped
    pub fn pop(&mut self) {
        debug_assert!(self.matrices.len() > 1, "matrix stack popped past its base");
        if self.matrices.len() > 1 {
            self.matrices.pop();
        } else {
            log::error!("Unbalanced matrix stack pop ignored");
        }
    }

    /// Current top
    pub fn top(&self) -> &Mat4d {
        // never empty: the base entry is never popped
        &self.matrices[self.matrices.len() - 1]
    }

    /// Number of entries, including the base identity
    pub fn depth(&self) -> usize {
        self.matrices.len()
    }

    /// Back to the base identity
    pub fn reset(&mut self) {
        self.matrices.truncate(1);
        self.matrices[0] = Mat4d::identity();
    }
}

/// The four parallel stacks carried by a traversal
///
/// All matrices are double precision: window coordinate picking through
/// ill-conditioned camera matrices jitters in single precision.
#[derive(Debug, Clone, Default)]
pub struct MatrixStacks {
    /// Local to world
    pub model: MatrixStack,
    /// World to eye
    pub view: MatrixStack,
    /// Eye to clip
    pub projection: MatrixStack,
    /// Clip to window
    pub window: MatrixStack,
}

impl MatrixStacks {
    /// Four stacks holding the identity
    pub fn new() -> Self {
        Self::default()
    }

    /// `window * projection * view * model` at the current depth
    pub fn transformation(&self) -> Mat4d {
        self.window.top() * self.projection.top() * self.view.top() * self.model.top()
    }

    /// `view * model` at the current depth
    pub fn model_view(&self) -> Mat4d {
        self.view.top() * self.model.top()
    }

    /// Back to one identity per stack
    pub fn reset(&mut self) {
        self.model.reset();
        self.view.reset();
        self.projection.reset();
        self.window.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3d;
    use approx::assert_relative_eq;

    #[test]
    fn test_transformation_order() {
        let mut stacks = MatrixStacks::new();
        let model = Mat4d::new_translation(&Vec3d::new(1.0, 0.0, 0.0));
        let view = Mat4d::new_scaling(2.0);
        let window = Mat4d::new_translation(&Vec3d::new(0.0, 5.0, 0.0));
        stacks.model.push(model);
        stacks.view.push(view);
        stacks.window.push(window);

        assert_relative_eq!(stacks.transformation(), window * view * model);
        assert_relative_eq!(stacks.model_view(), view * model);
    }

    #[test]
    fn test_reset_keeps_identity_base() {
        let mut stacks = MatrixStacks::new();
        stacks.projection.push(Mat4d::new_scaling(3.0));
        stacks.reset();
        assert_eq!(stacks.projection.depth(), 1);
        assert_relative_eq!(stacks.transformation(), Mat4d::identity());
    }
}
