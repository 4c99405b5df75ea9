//! Line segment picking
//!
//! The segment is given in window coordinates, typically from the near to
//! the far plane under the cursor. Each published transformation is
//! inverted to bring the segment into the local space of the nodes visited
//! next, so bounds and triangles are tested without transforming them.

use super::intersector::{insert_sorted, Intersection, IntersectionContext, Intersector};
use crate::foundation::math::{Mat4d, Point3d, Vec3d};
use crate::scene::{for_each_triangle, BoundingSphere, Geometry, NodeId, SceneGraph};

const EPSILON: f64 = 1e-12;

/// Collects triangles crossed by a window-space segment
#[derive(Debug, Clone)]
pub struct LineSegmentIntersector {
    start: Vec3d,
    end: Vec3d,
    local_start: Vec3d,
    local_end: Vec3d,
    local_valid: bool,
    hits: Vec<Intersection>,
}

impl LineSegmentIntersector {
    /// Segment from `start` to `end` in window coordinates
    pub fn new(start: Vec3d, end: Vec3d) -> Self {
        Self {
            start,
            end,
            local_start: start,
            local_end: end,
            local_valid: true,
            hits: Vec::new(),
        }
    }

    /// Segment through a window position, from the near to the far plane
    pub fn from_window(x: f64, y: f64) -> Self {
        Self::new(Vec3d::new(x, y, 0.0), Vec3d::new(x, y, 1.0))
    }

    /// Replace the segment
    pub fn set(&mut self, start: Vec3d, end: Vec3d) {
        self.start = start;
        self.end = end;
        self.local_start = start;
        self.local_end = end;
        self.local_valid = true;
    }

    /// Segment start in window coordinates
    pub fn start(&self) -> &Vec3d {
        &self.start
    }

    /// Segment end in window coordinates
    pub fn end(&self) -> &Vec3d {
        &self.end
    }

    /// Hits sorted from the segment start
    pub fn hits(&self) -> &[Intersection] {
        &self.hits
    }

    /// Hit closest to the segment start
    pub fn first_hit(&self) -> Option<&Intersection> {
        self.hits.first()
    }

    /// Whether anything was hit
    pub fn contains_intersections(&self) -> bool {
        !self.hits.is_empty()
    }

    /// Whether the local segment can cross a sphere
    ///
    /// An invalid sphere never prunes.
    fn intersects(&self, bound: &BoundingSphere) -> bool {
        if !bound.is_valid() {
            return true;
        }

        let sm = self.local_start - bound.center;
        let c = sm.norm_squared() - bound.radius * bound.radius;
        if c < 0.0 {
            return true;
        }

        let se = self.local_end - self.local_start;
        let a = se.norm_squared();
        if a < EPSILON {
            return false;
        }
        let b = 2.0 * sm.dot(&se);
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return false;
        }

        let root = discriminant.sqrt();
        let r1 = (-b - root) / (2.0 * a);
        let r2 = (-b + root) / (2.0 * a);
        !((r1 <= 0.0 && r2 <= 0.0) || (r1 >= 1.0 && r2 >= 1.0))
    }
}

/// Möller-Trumbore test of the segment `origin + t * direction`, `t` in `[0, 1]`
///
/// Returns `t` when the segment crosses the triangle, from either side.
fn intersect_triangle(origin: &Vec3d, direction: &Vec3d, v0: &Vec3d, v1: &Vec3d, v2: &Vec3d) -> Option<f64> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);
    // parallel to the triangle plane
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    (0.0..=1.0).contains(&t).then_some(t)
}

impl Intersector for LineSegmentIntersector {
    fn enter(&mut self, graph: &SceneGraph, id: NodeId) -> bool {
        self.local_valid && self.intersects(&graph.bound(id))
    }

    fn intersect(&mut self, ctx: &IntersectionContext<'_>, _id: NodeId, geometry: &Geometry) {
        if !self.local_valid {
            return;
        }

        let origin = self.local_start;
        let direction = self.local_end - self.local_start;
        let model_matrix = *ctx.stacks.model.top();
        let mut found = Vec::new();

        for_each_triangle(&geometry.primitive_sets, |i0, i1, i2| {
            let (Some(v0), Some(v1), Some(v2)) = (geometry.vertex(i0), geometry.vertex(i1), geometry.vertex(i2)) else {
                return;
            };
            if let Some(ratio) = intersect_triangle(&origin, &direction, &v0, &v1, &v2) {
                let normal = (v1 - v0).cross(&(v2 - v0)).normalize();
                found.push(Intersection {
                    ratio,
                    node_path: ctx.node_path.to_vec(),
                    local_point: origin + direction * ratio,
                    local_normal: normal,
                    triangle: [i0, i1, i2],
                    model_matrix,
                });
            }
        });

        if !found.is_empty() {
            log::debug!(
                "Segment crossed {} triangle(s) of node {:?}",
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
                self.local_start = inverse.transform_point(&Point3d::from(self.start)).coords;
                self.local_end = inverse.transform_point(&Point3d::from(self.end)).coords;
                self.local_valid = true;
            }
            None => {
                log::debug!("Skipping subgraph under a singular transformation");
                self.local_valid = false;
            }
        }
    }

    fn reset(&mut self) {
        self.hits.clear();
        self.local_start = self.start;
        self.local_end = self.end;
        self.local_valid = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4dExt, Vec3, Viewport};
    use crate::scene::{Camera, PrimitiveMode, PrimitiveSet};
    use crate::traversal::IntersectionVisitor;
    use approx::assert_relative_eq;

    /// Unit quad in the z = 0 plane, two triangles
    fn quad() -> Geometry {
        Geometry::new(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![PrimitiveSet::draw_elements(PrimitiveMode::Triangles, vec![0, 1, 2, 0, 2, 3])],
        )
    }

    #[test]
    fn test_segment_hits_closest_first() {
        let mut graph = SceneGraph::new();
        let root = graph.add_group();
        let near = graph.add_transform(Mat4d::new_translation(&Vec3d::new(0.0, 0.0, 2.0)));
        let near_leaf = graph.add_geometry(quad());
        let far_leaf = graph.add_geometry(quad());
        graph.add_child(root, far_leaf).unwrap();
        graph.add_child(root, near).unwrap();
        graph.add_child(near, near_leaf).unwrap();

        let segment = LineSegmentIntersector::new(Vec3d::new(0.5, 0.25, 10.0), Vec3d::new(0.5, 0.25, -10.0));
        let mut visitor = IntersectionVisitor::new(segment);
        visitor.apply(&graph, root);

        let hits = visitor.intersector().hits();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node(), Some(near_leaf));
        assert_relative_eq!(hits[0].ratio, 0.4);
        assert_relative_eq!(hits[0].local_point, Vec3d::new(0.5, 0.25, 0.0));
        assert_relative_eq!(hits[0].world_point(), Vec3d::new(0.5, 0.25, 2.0));
        assert_eq!(hits[1].node(), Some(far_leaf));
        assert_relative_eq!(hits[1].ratio, 0.5);
    }

    #[test]
    fn test_segment_missing_bound_is_pruned() {
        let mut graph = SceneGraph::new();
        let root = graph.add_group();
        let leaf = graph.add_geometry(quad());
        graph.add_child(root, leaf).unwrap();

        let mut visitor = IntersectionVisitor::new(LineSegmentIntersector::new(
            Vec3d::new(5.0, 5.0, 10.0),
            Vec3d::new(5.0, 5.0, -10.0),
        ));
        visitor.apply(&graph, root);
        assert!(!visitor.intersector().contains_intersections());
    }

    #[test]
    fn test_segment_stopping_short_misses() {
        let segment = LineSegmentIntersector::new(Vec3d::new(0.0, 0.0, 10.0), Vec3d::new(0.0, 0.0, 1.0));
        assert!(!segment.intersects(&BoundingSphere::new(Vec3d::zeros(), 0.5)));
        assert!(segment.intersects(&BoundingSphere::new(Vec3d::zeros(), 2.0)));
        assert!(segment.intersects(&BoundingSphere::invalid()));
    }

    #[test]
    fn test_window_pick_through_camera() {
        let viewport = Viewport::new(0.0, 0.0, 800.0, 600.0);
        let mut graph = SceneGraph::new();
        let camera = graph.add_camera(Camera {
            view: Mat4d::look_at(Vec3d::new(0.0, 0.0, 5.0), Vec3d::zeros(), Vec3d::y()),
            projection: Mat4d::perspective(std::f64::consts::FRAC_PI_4, viewport.aspect_ratio(), 0.1, 100.0),
            viewport: Some(viewport),
            ..Default::default()
        });
        let leaf = graph.add_geometry(quad());
        graph.add_child(camera, leaf).unwrap();

        let mut visitor = IntersectionVisitor::new(LineSegmentIntersector::from_window(400.0, 300.0));
        visitor.apply(&graph, camera);

        let hit = visitor.intersector().first_hit().unwrap();
        assert_eq!(hit.node(), Some(leaf));
        assert_relative_eq!(hit.local_point, Vec3d::zeros(), epsilon = 1e-6);
        assert_relative_eq!(hit.local_normal.z.abs(), 1.0);
    }

    #[test]
    fn test_ignores_out_of_range_indices() {
        let mut geometry = quad();
        geometry.primitive_sets = vec![PrimitiveSet::draw_elements(PrimitiveMode::Triangles, vec![0, 1, 9])];
        let mut graph = SceneGraph::new();
        let leaf = graph.add_geometry(geometry);

        let mut visitor = IntersectionVisitor::new(LineSegmentIntersector::new(
            Vec3d::new(0.0, 0.0, 1.0),
            Vec3d::new(0.0, 0.0, -1.0),
        ));
        visitor.apply(&graph, leaf);
        assert!(visitor.intersector().hits().is_empty());
    }
}
