//! Sphere volume queries

use super::intersector::{insert_sorted, Intersection, IntersectionContext, Intersector};
use crate::foundation::math::{Mat4d, Vec3d};
use crate::scene::{for_each_triangle, BoundingSphere, Geometry, NodeId, SceneGraph};

/// Collects triangles touching a sphere
///
/// The sphere is expressed in the space the traversal's transformation maps
/// into: world space for a graph without cameras.
#[derive(Debug, Clone)]
pub struct SphereIntersector {
    sphere: BoundingSphere,
    local_sphere: BoundingSphere,
    local_valid: bool,
    hits: Vec<Intersection>,
}

impl SphereIntersector {
    /// Query sphere
    pub fn new(center: Vec3d, radius: f64) -> Self {
        let sphere = BoundingSphere::new(center, radius);
        Self {
            sphere,
            local_sphere: sphere,
            local_valid: true,
            hits: Vec::new(),
        }
    }

    /// Hits sorted by distance from the sphere center
    pub fn hits(&self) -> &[Intersection] {
        &self.hits
    }

    /// Whether anything was hit
    pub fn contains_intersections(&self) -> bool {
        !self.hits.is_empty()
    }
}

/// Point of triangle `abc` closest to `p`
fn closest_point_on_triangle(p: &Vec3d, a: &Vec3d, b: &Vec3d, c: &Vec3d) -> Vec3d {
    let ab = b - a;
    let ac = c - a;

    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

impl Intersector for SphereIntersector {
    fn enter(&mut self, graph: &SceneGraph, id: NodeId) -> bool {
        if !self.local_valid {
            return false;
        }
        let bound = graph.bound(id);
        !bound.is_valid() || bound.intersects(&self.local_sphere)
    }

    fn intersect(&mut self, ctx: &IntersectionContext<'_>, _id: NodeId, geometry: &Geometry) {
        if !self.local_valid {
            return;
        }

        let center = self.local_sphere.center;
        let radius = self.local_sphere.radius;
        let model_matrix = *ctx.stacks.model.top();
        let mut found = Vec::new();

        for_each_triangle(&geometry.primitive_sets, |i0, i1, i2| {
            let (Some(v0), Some(v1), Some(v2)) = (geometry.vertex(i0), geometry.vertex(i1), geometry.vertex(i2)) else {
                return;
            };
            let closest = closest_point_on_triangle(&center, &v0, &v1, &v2);
            let distance = (closest - center).norm();
            if distance <= radius {
                let normal = (v1 - v0).cross(&(v2 - v0));
                found.push(Intersection {
                    ratio: if radius > 0.0 { distance / radius } else { 0.0 },
                    node_path: ctx.node_path.to_vec(),
                    local_point: closest,
                    local_normal: normal.try_normalize(f64::EPSILON).unwrap_or_else(Vec3d::zeros),
                    triangle: [i0, i1, i2],
                    model_matrix,
                });
            }
        });

        if !found.is_empty() {
            log::debug!(
                "Sphere touched {} triangle(s) of node {:?}",
                found.len(),
                ctx.node_path.last()
            );
        }
        for hit in found {
            insert_sorted(&mut self.hits, hit);
        }
    }

    fn set_current_transformation(&mut self, transformation: &Mat4d) {
        match transformation.try_inverse() {
            Some(inverse) => {
                self.local_sphere = self.sphere.transformed(&inverse);
                self.local_valid = true;
            }
            None => self.local_valid = false,
        }
    }

    fn reset(&mut self) {
        self.hits.clear();
        self.local_sphere = self.sphere;
        self.local_valid = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::scene::{PrimitiveMode, PrimitiveSet};
    use crate::traversal::IntersectionVisitor;
    use approx::assert_relative_eq;

    fn triangle_at(z: f32) -> Geometry {
        Geometry::new(
            vec![Vec3::new(0.0, 0.0, z), Vec3::new(1.0, 0.0, z), Vec3::new(0.0, 1.0, z)],
            vec![PrimitiveSet::draw_arrays(PrimitiveMode::Triangles, 0, 3)],
        )
    }

    #[test]
    fn test_closest_point_regions() {
        let a = Vec3d::zeros();
        let b = Vec3d::new(1.0, 0.0, 0.0);
        let c = Vec3d::new(0.0, 1.0, 0.0);

        assert_relative_eq!(closest_point_on_triangle(&Vec3d::new(-1.0, -1.0, 0.0), &a, &b, &c), a);
        assert_relative_eq!(
            closest_point_on_triangle(&Vec3d::new(0.5, -1.0, 0.0), &a, &b, &c),
            Vec3d::new(0.5, 0.0, 0.0)
        );
        assert_relative_eq!(
            closest_point_on_triangle(&Vec3d::new(0.25, 0.25, 3.0), &a, &b, &c),
            Vec3d::new(0.25, 0.25, 0.0)
        );
        assert_relative_eq!(
            closest_point_on_triangle(&Vec3d::new(1.0, 1.0, 0.0), &a, &b, &c),
            Vec3d::new(0.5, 0.5, 0.0)
        );
    }

    #[test]
    fn test_sphere_selects_touching_leaves() {
        let mut graph = SceneGraph::new();
        let root = graph.add_group();
        let close = graph.add_geometry(triangle_at(0.5));
        let far = graph.add_geometry(triangle_at(5.0));
        let moved = graph.add_transform(Mat4d::new_translation(&Vec3d::new(0.0, 0.0, -5.2)));
        let moved_leaf = graph.add_geometry(triangle_at(5.0));
        graph.add_child(root, close).unwrap();
        graph.add_child(root, far).unwrap();
        graph.add_child(root, moved).unwrap();
        graph.add_child(moved, moved_leaf).unwrap();

        let mut visitor = IntersectionVisitor::new(SphereIntersector::new(Vec3d::new(0.2, 0.2, 0.0), 1.0));
        visitor.apply(&graph, root);

        let hits = visitor.intersector().hits();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node(), Some(moved_leaf));
        assert_relative_eq!(hits[0].ratio, 0.2, epsilon = 1e-6);
        assert_eq!(hits[1].node(), Some(close));
        assert_relative_eq!(hits[1].world_point(), Vec3d::new(0.2, 0.2, 0.5), epsilon = 1e-6);
    }
}
