//! View frustum for visibility culling

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::physics::collision::BoundingSphere;

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized, pointing into the frustum)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }

    /// Plane from `(a, b, c, d)` coefficients, normalized
    fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.xyz();
        let length = normal.norm();
        if length <= f32::EPSILON {
            return Self { normal: Vec3::zeros(), distance: 0.0 };
        }
        Self {
            normal: normal / length,
            distance: coefficients.w / length,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Six planes bounding what a camera can see
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for clip space with z in [-w, w].
    pub fn from_matrix(view_projection: &Mat4) -> Self {
        let row = |i: usize| view_projection.row(i).transpose();
        let (x, y, z, w) = (row(0), row(1), row(2), row(3));
        Self {
            planes: [
                Plane::from_coefficients(w + x),
                Plane::from_coefficients(w - x),
                Plane::from_coefficients(w + y),
                Plane::from_coefficients(w - y),
                Plane::from_coefficients(w + z),
                Plane::from_coefficients(w - z),
            ],
        }
    }

    /// Check if a sphere is inside or intersects the frustum
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(sphere.center) >= -sphere.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;

    #[test]
    fn test_perspective_frustum_culls_behind_and_beside() {
        // Camera at origin looking down -z
        let frustum = Frustum::from_matrix(&Mat4::perspective(1.0, 1.0, 0.1, 100.0));

        let ahead = BoundingSphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0);
        let behind = BoundingSphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0);
        let beside = BoundingSphere::new(Vec3::new(50.0, 0.0, -10.0), 1.0);
        let too_far = BoundingSphere::new(Vec3::new(0.0, 0.0, -200.0), 1.0);

        assert!(frustum.intersects_sphere(&ahead));
        assert!(!frustum.intersects_sphere(&behind));
        assert!(!frustum.intersects_sphere(&beside));
        assert!(!frustum.intersects_sphere(&too_far));
    }
}
