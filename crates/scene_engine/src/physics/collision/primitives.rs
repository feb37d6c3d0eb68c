//! Primitive shapes and intersection algorithms
//!
//! Provides rays, spheres, boxes and triangles with the intersection tests
//! the raycaster needs. Everything here works in whatever space the caller
//! hands it; the raycaster transforms rays into model space first.

use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::scene::SceneError;

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction.
    ///
    /// Fails when the direction has no length or either vector is not finite.
    pub fn new(origin: Vec3, direction: Vec3) -> Result<Self, SceneError> {
        let finite = origin.iter().chain(direction.iter()).all(|c| c.is_finite());
        let length = direction.norm();
        if !finite || length <= f32::EPSILON {
            return Err(SceneError::Precondition(format!(
                "ray needs a finite origin and a non-zero direction, got {origin:?} -> {direction:?}"
            )));
        }
        Ok(Self {
            origin,
            direction: direction / length,
        })
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// The same ray expressed through `matrix`, with the direction renormalized.
    ///
    /// Returns `None` if the matrix collapses the direction.
    pub fn transformed(&self, matrix: &Mat4) -> Option<Self> {
        let origin = matrix.transform_point(&Point3::from(self.origin)).coords;
        let direction = matrix.transform_vector(&self.direction);
        let length = direction.norm();
        if length <= f32::EPSILON {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / length,
        })
    }
}

/// A bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// The center position of the sphere
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere enclosing this one after `matrix` is applied
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let center = matrix.transform_point(&Point3::from(self.center)).coords;
        let max_scale = (0..3)
            .map(|axis| matrix.fixed_view::<3, 1>(0, axis).norm())
            .fold(0.0_f32, f32::max);
        Self::new(center, self.radius * max_scale)
    }

    /// Broad-phase test.
    ///
    /// Returns a lower bound on the distance along the ray to the sphere
    /// surface (zero when the origin is inside), or `None` when the ray
    /// points away from the sphere or passes beside it.
    pub fn distance_to_bounds(&self, ray: &Ray) -> Option<f32> {
        let to_center = self.center - ray.origin;
        let distance_squared = to_center.norm_squared();
        let radius_squared = self.radius * self.radius;
        if distance_squared <= radius_squared {
            return Some(0.0);
        }
        let along = to_center.dot(&ray.direction);
        if along < 0.0 {
            return None;
        }
        if distance_squared - along * along > radius_squared {
            return None;
        }
        Some(distance_squared.sqrt() - self.radius)
    }

    /// Test ray intersection with this sphere.
    ///
    /// Returns the distance to the first surface crossing in front of the
    /// origin (the exit point when starting inside).
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let oc = ray.origin - self.center;

        // Solve |origin + t*direction - center|^2 = radius^2 with |direction| = 1
        let b = oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let root = discriminant.sqrt();
        let t1 = -b - root;
        let t2 = -b + root;
        if t1 >= 0.0 {
            Some(t1)
        } else if t2 >= 0.0 {
            Some(t2)
        } else {
            None
        }
    }
}

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from its corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a box centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half size of the box
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Slab test. Returns the entry distance, or the exit distance when the
    /// origin is inside the box.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            if direction.abs() <= f32::EPSILON {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let t1 = (self.min[axis] - origin) * inv;
            let t2 = (self.max[axis] - origin) * inv;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }

        if t_max < t_min || t_max < 0.0 {
            None
        } else if t_min >= 0.0 {
            Some(t_min)
        } else {
            Some(t_max)
        }
    }
}

/// A triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculates the normal of the triangle (right-hand rule)
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2).normalize()
    }

    /// Single-sided Möller-Trumbore intersection.
    ///
    /// Only front faces (counter-clockwise when seen from the ray origin)
    /// are hit. Returns the distance along the ray.
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        const EPSILON: f32 = 1e-6;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let det = edge1.dot(&h);

        // Back face or parallel
        if det < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self.v0;
        let u = inv_det * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = inv_det * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * edge2.dot(&q);
        (t >= 0.0).then_some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_triangle_is_single_sided() {
        // Counter-clockwise seen from -z
        let triangle = Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
        );
        let front = Ray::new(Vec3::new(0.0, 0.0, -3.0), Vec3::new(0.0, 0.0, 1.0)).unwrap();
        let back = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -1.0)).unwrap();

        assert_relative_eq!(triangle.intersect_ray(&front).unwrap(), 3.0);
        assert!(triangle.intersect_ray(&back).is_none());
    }

    #[test]
    fn test_ray_rejects_degenerate_direction() {
        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 4.0)).unwrap();
        assert_relative_eq!(ray.direction, Vec3::z());

        assert!(matches!(
            Ray::new(Vec3::zeros(), Vec3::zeros()),
            Err(SceneError::Precondition(_))
        ));
        assert!(Ray::new(Vec3::zeros(), Vec3::new(f32::NAN, 0.0, 1.0)).is_err());
        assert!(Ray::new(Vec3::new(f32::INFINITY, 0.0, 0.0), Vec3::z()).is_err());
    }

    #[test]
    fn test_distance_to_bounds() {
        let sphere = BoundingSphere::new(Vec3::zeros(), 1.0);
        let toward = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::z()).unwrap();
        let away = Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::z()).unwrap();
        let beside = Ray::new(Vec3::new(5.0, 5.0, -5.0), Vec3::z()).unwrap();
        let inside = Ray::new(Vec3::new(0.2, 0.0, 0.0), Vec3::x()).unwrap();

        assert_relative_eq!(sphere.distance_to_bounds(&toward).unwrap(), 4.0);
        assert!(sphere.distance_to_bounds(&away).is_none());
        assert!(sphere.distance_to_bounds(&beside).is_none());
        assert_relative_eq!(sphere.distance_to_bounds(&inside).unwrap(), 0.0);
    }

    #[test]
    fn test_aabb_slab_reports_exit_from_inside() {
        let aabb = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let outside = Ray::new(Vec3::new(-4.0, 0.0, 0.0), Vec3::x()).unwrap();
        let inside = Ray::new(Vec3::zeros(), Vec3::x()).unwrap();
        let parallel_miss = Ray::new(Vec3::new(-4.0, 2.0, 0.0), Vec3::x()).unwrap();

        assert_relative_eq!(aabb.intersect_ray(&outside).unwrap(), 3.0);
        assert_relative_eq!(aabb.intersect_ray(&inside).unwrap(), 1.0);
        assert!(aabb.intersect_ray(&parallel_miss).is_none());
    }

    #[test]
    fn test_transformed_sphere_uses_largest_scale() {
        let sphere = BoundingSphere::new(Vec3::new(1.0, 0.0, 0.0), 1.0);
        let matrix = Mat4::new_translation(&Vec3::new(0.0, 2.0, 0.0))
            * Mat4::new_nonuniform_scaling(&Vec3::new(3.0, 1.0, 2.0));
        let world = sphere.transformed(&matrix);
        assert_relative_eq!(world.center, Vec3::new(3.0, 2.0, 0.0));
        assert_relative_eq!(world.radius, 3.0);
    }
}
