//! Bounding volumes used to prune traversals

use crate::foundation::math::{Mat4d, Point3d, Vec3d};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vec3d,
    /// Maximum corner
    pub max: Vec3d,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::invalid()
    }
}

impl BoundingBox {
    /// Box from min and max corners
    pub fn new(min: Vec3d, max: Vec3d) -> Self {
        Self { min, max }
    }

    /// Empty box that any point expands
    pub fn invalid() -> Self {
        Self {
            min: Vec3d::repeat(f64::INFINITY),
            max: Vec3d::repeat(f64::NEG_INFINITY),
        }
    }

    /// Whether the box encloses at least one point
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Grow to include a point
    pub fn expand_by(&mut self, point: &Vec3d) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Center of the box
    pub fn center(&self) -> Vec3d {
        (self.min + self.max) * 0.5
    }

    /// Whether a point lies inside or on the box
    pub fn contains_point(&self, point: &Vec3d) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

/// Bounding sphere; a negative radius marks an invalid (empty) sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center
    pub center: Vec3d,
    /// Radius, negative when invalid
    pub radius: f64,
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::invalid()
    }
}

impl BoundingSphere {
    /// Sphere from center and radius
    pub fn new(center: Vec3d, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Empty sphere
    pub fn invalid() -> Self {
        Self {
            center: Vec3d::zeros(),
            radius: -1.0,
        }
    }

    /// Whether the sphere encloses anything
    pub fn is_valid(&self) -> bool {
        self.radius >= 0.0
    }

    /// Smallest sphere around a set of points, centered on their box
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3d> + Clone) -> Self {
        let mut bbox = BoundingBox::invalid();
        for point in points.clone() {
            bbox.expand_by(point);
        }
        if !bbox.is_valid() {
            return Self::invalid();
        }

        let center = bbox.center();
        let radius = points
            .into_iter()
            .map(|point| (point - center).norm())
            .fold(0.0, f64::max);
        Self { center, radius }
    }

    /// Grow to enclose another sphere
    pub fn expand_by_sphere(&mut self, other: &BoundingSphere) {
        if !other.is_valid() {
            return;
        }
        if !self.is_valid() {
            *self = *other;
            return;
        }

        let offset = other.center - self.center;
        let distance = offset.norm();
        if distance + other.radius <= self.radius {
            return;
        }
        if distance + self.radius <= other.radius {
            *self = *other;
            return;
        }

        let radius = (self.radius + distance + other.radius) * 0.5;
        self.center += offset * ((radius - self.radius) / distance);
        self.radius = radius;
    }

    /// Sphere enclosing this one after a transformation
    pub fn transformed(&self, matrix: &Mat4d) -> Self {
        if !self.is_valid() {
            return *self;
        }
        let center = matrix.transform_point(&Point3d::from(self.center)).coords;
        let scale = (0..3)
            .map(|column| matrix.fixed_view::<3, 1>(0, column).norm())
            .fold(0.0, f64::max);
        Self {
            center,
            radius: self.radius * scale,
        }
    }

    /// Whether two spheres overlap
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        self.is_valid()
            && other.is_valid()
            && (self.center - other.center).norm_squared() <= (self.radius + other.radius).powi(2)
    }
}
