//! Geometric primitives shared by the camera, the collision system and the demos.
//!
//! Everything here is plain `cgmath` data: rays cast from the screen, planes,
//! triangles with an exact ray test, and 2D rectangles for flat games.

use cgmath::{
    EuclideanSpace, InnerSpace, Matrix4, Point2, Point3, Transform, Vector2, Vector3, Vector4,
};

/// Determinant threshold below which a ray is considered parallel to a triangle.
pub const EPSILON: f32 = 1e-7;

/// A half-line `origin + t * direction` for `t >= 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t`.
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Apply an affine transform to the ray.
    ///
    /// The direction is not renormalised, so a parameter `t` found in the
    /// transformed space addresses the same point as in the original space.
    /// This is what lets the picker test instances in their local space and
    /// still compare distances in world space.
    pub fn transform(&self, matrix: &Matrix4<f32>) -> Ray {
        Ray {
            origin: matrix.transform_point(self.origin),
            direction: matrix.transform_vector(self.direction),
        }
    }

    /// Unproject a screen position into a world space ray.
    ///
    /// `x`/`y` are pixels with the origin in the top-left corner. The depth
    /// range follows wgpu clip space (0 at the near plane, 1 at the far plane).
    pub fn from_screen(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        inverse_view_proj: &Matrix4<f32>,
    ) -> Ray {
        let ndc_x = 2.0 * x / width.max(1.0) - 1.0;
        let ndc_y = 1.0 - 2.0 * y / height.max(1.0);
        let near = Point3::from_homogeneous(inverse_view_proj * Vector4::new(ndc_x, ndc_y, 0.0, 1.0));
        let far = Point3::from_homogeneous(inverse_view_proj * Vector4::new(ndc_x, ndc_y, 1.0, 1.0));
        Ray {
            origin: near,
            direction: (far - near).normalize(),
        }
    }

    /// Distance along the ray to `plane`, if the ray hits it in front of the origin.
    pub fn intersect_plane(&self, plane: &Plane) -> Option<f32> {
        let denom = plane.normal.dot(self.direction);
        if denom.abs() < EPSILON {
            return None;
        }
        let t = (plane.distance - plane.normal.dot(self.origin.to_vec())) / denom;
        (t >= 0.0).then_some(t)
    }

    /// Where the ray meets the `y = 0` floor, as `(x, z)`.
    pub fn intersect_with_floor(&self) -> Option<Point2<f32>> {
        let floor = Plane::from_point_normal(Point3::origin(), Vector3::unit_y());
        self.intersect_plane(&floor).map(|t| {
            let p = self.at(t);
            Point2::new(p.x, p.z)
        })
    }
}

/// The plane of all points `p` with `normal · p = distance`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub distance: f32,
}

impl Plane {
    pub fn from_point_normal(point: Point3<f32>, normal: Vector3<f32>) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: normal.dot(point.to_vec()),
        }
    }

    pub fn signed_distance(&self, point: Point3<f32>) -> f32 {
        self.normal.dot(point.to_vec()) - self.distance
    }
}

/// Result of an exact ray/triangle test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    /// Barycentric weight of `b`.
    pub u: f32,
    /// Barycentric weight of `c`.
    pub v: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub a: Point3<f32>,
    pub b: Point3<f32>,
    pub c: Point3<f32>,
}

impl Triangle {
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        Self { a, b, c }
    }

    /// Unnormalised face normal; counter-clockwise winding faces the viewer.
    pub fn cross(&self) -> Vector3<f32> {
        (self.b - self.a).cross(self.c - self.a)
    }

    pub fn normal(&self) -> Vector3<f32> {
        let n = self.cross();
        if n.magnitude2() > 0.0 { n.normalize() } else { n }
    }

    pub fn area(&self) -> f32 {
        self.cross().magnitude() * 0.5
    }

    pub fn centroid(&self) -> Point3<f32> {
        Point3::centroid(&[self.a, self.b, self.c])
    }

    /// Möller–Trumbore ray/triangle intersection.
    ///
    /// With `cull_back_faces` only triangles wound counter-clockwise towards
    /// the ray origin can be hit.
    pub fn intersect(&self, ray: &Ray, cull_back_faces: bool) -> Option<TriangleHit> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if cull_back_faces {
            if det < EPSILON {
                return None;
            }
        } else if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - self.a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t >= 0.0).then_some(TriangleHit { t, u, v })
    }
}

/// Axis-aligned 2D rectangle, used by the flat demos.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}

impl Rect {
    pub fn new(a: Vector2<f32>, b: Vector2<f32>) -> Self {
        Self {
            min: Vector2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vector2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_center(center: Vector2<f32>, size: Vector2<f32>) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vector2<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vector2<f32> {
        self.max - self.min
    }

    pub fn contains(&self, p: Vector2<f32>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn closest_point(&self, p: Vector2<f32>) -> Vector2<f32> {
        Vector2::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transformed_ray_keeps_parameter() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let m = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)) * Matrix4::from_scale(2.0);
        let moved = ray.transform(&m);
        let p = moved.at(2.0);
        let expected = m.transform_point(ray.at(2.0));
        assert!((p - expected).magnitude() < 1e-5);
    }

    #[test]
    fn plane_behind_origin_is_missed() {
        let ray = Ray::new(Point3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
        assert!(ray.intersect_with_floor().is_none());
    }
}
