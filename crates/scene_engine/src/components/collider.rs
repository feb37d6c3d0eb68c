//! Analytic collider shapes
//!
//! Colliders are raycast in model space exactly like meshes, but their
//! narrow phase is a closed-form shape test instead of a triangle walk.

use crate::foundation::math::Vec3;
use crate::physics::collision::{Aabb, BoundingSphere, Ray};
use crate::scene::schema::{unknown_property, Inspect, PropertyDescriptor, PropertyKind, PropertyValue};
use crate::scene::SceneError;

/// Shape of a collider in model space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    /// Sphere around the origin
    Sphere {
        /// Radius
        radius: f32,
    },
    /// Axis-aligned box
    Box {
        /// Full size along each axis
        size: Vec3,
        /// Center offset from the origin
        offset: Vec3,
    },
    /// Y-aligned capped cylinder
    Cylinder {
        /// Radius
        radius: f32,
        /// Height along +Y from the base
        height: f32,
        /// Center of the base disc
        offset: Vec3,
    },
}

/// Raycastable analytic shape
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    shape: ColliderShape,
}

impl Collider {
    /// Wrap a shape after checking its dimensions are positive
    pub fn new(shape: ColliderShape) -> Result<Self, SceneError> {
        let valid = match shape {
            ColliderShape::Sphere { radius } => radius > 0.0,
            ColliderShape::Box { size, .. } => size.iter().all(|&extent| extent > 0.0),
            ColliderShape::Cylinder { radius, height, .. } => radius > 0.0 && height > 0.0,
        };
        if !valid {
            return Err(SceneError::Precondition(format!(
                "collider dimensions must be positive: {shape:?}"
            )));
        }
        Ok(Self { shape })
    }

    /// Sphere of the given radius
    pub fn sphere(radius: f32) -> Result<Self, SceneError> {
        Self::new(ColliderShape::Sphere { radius })
    }

    /// Centered box of the given size
    pub fn cuboid(size: Vec3) -> Result<Self, SceneError> {
        Self::new(ColliderShape::Box { size, offset: Vec3::zeros() })
    }

    /// Cylinder centered on the origin
    pub fn cylinder(radius: f32, height: f32) -> Result<Self, SceneError> {
        Self::new(ColliderShape::Cylinder {
            radius,
            height,
            offset: Vec3::new(0.0, -height * 0.5, 0.0),
        })
    }

    /// The shape
    pub fn shape(&self) -> ColliderShape {
        self.shape
    }

    /// Model-space sphere enclosing the shape
    pub fn local_bounds(&self) -> BoundingSphere {
        match self.shape {
            ColliderShape::Sphere { radius } => BoundingSphere::new(Vec3::zeros(), radius),
            ColliderShape::Box { size, offset } => BoundingSphere::new(offset, size.norm() * 0.5),
            ColliderShape::Cylinder { radius, height, offset } => {
                let half = height * 0.5;
                BoundingSphere::new(offset + Vec3::new(0.0, half, 0.0), radius.hypot(half))
            }
        }
    }

    /// Distance along a model-space ray to the shape surface
    pub fn intersect_local(&self, ray: &Ray) -> Option<f32> {
        match self.shape {
            ColliderShape::Sphere { radius } => {
                BoundingSphere::new(Vec3::zeros(), radius).intersect_ray(ray)
            }
            ColliderShape::Box { size, offset } => {
                Aabb::from_center_extents(offset, size * 0.5).intersect_ray(ray)
            }
            ColliderShape::Cylinder { radius, height, offset } => {
                intersect_cylinder(ray, radius, height, offset)
            }
        }
    }
}

fn intersect_cylinder(ray: &Ray, radius: f32, height: f32, base: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-6;
    let origin = ray.origin - base;
    let direction = ray.direction;
    let radius_squared = radius * radius;
    let mut candidates = [f32::NAN; 4];

    // Side wall: solve in the XZ plane, then clip by height
    let a = direction.x * direction.x + direction.z * direction.z;
    if a > EPSILON {
        let half_b = origin.x * direction.x + origin.z * direction.z;
        let c = origin.x * origin.x + origin.z * origin.z - radius_squared;
        let discriminant = half_b * half_b - a * c;
        if discriminant >= 0.0 {
            let root = discriminant.sqrt();
            for (slot, t) in [(-half_b - root) / a, (-half_b + root) / a].into_iter().enumerate() {
                let y = origin.y + t * direction.y;
                if (0.0..=height).contains(&y) {
                    candidates[slot] = t;
                }
            }
        }
    }

    // End caps
    if direction.y.abs() > EPSILON {
        for (slot, cap) in [0.0, height].into_iter().enumerate() {
            let t = (cap - origin.y) / direction.y;
            let point = origin + direction * t;
            if point.x * point.x + point.z * point.z <= radius_squared {
                candidates[2 + slot] = t;
            }
        }
    }

    candidates
        .into_iter()
        .filter(|t| *t >= 0.0)
        .min_by(f32::total_cmp)
}

static COLLIDER_SCHEMA: [PropertyDescriptor; 5] = [
    PropertyDescriptor::new("shape", PropertyKind::Text, "sphere, box or cylinder (read only)"),
    PropertyDescriptor::new("radius", PropertyKind::Float, "Sphere or cylinder radius"),
    PropertyDescriptor::new("height", PropertyKind::Float, "Cylinder height"),
    PropertyDescriptor::new("size", PropertyKind::Vec3, "Box size"),
    PropertyDescriptor::new("offset", PropertyKind::Vec3, "Box center or cylinder base"),
];

impl Inspect for Collider {
    fn schema(&self) -> &'static [PropertyDescriptor] {
        &COLLIDER_SCHEMA
    }

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match (name, self.shape) {
            ("shape", shape) => Some(PropertyValue::Text(
                match shape {
                    ColliderShape::Sphere { .. } => "sphere",
                    ColliderShape::Box { .. } => "box",
                    ColliderShape::Cylinder { .. } => "cylinder",
                }
                .to_string(),
            )),
            ("radius", ColliderShape::Sphere { radius } | ColliderShape::Cylinder { radius, .. }) => {
                Some(PropertyValue::Float(radius))
            }
            ("height", ColliderShape::Cylinder { height, .. }) => Some(PropertyValue::Float(height)),
            ("size", ColliderShape::Box { size, .. }) => Some(PropertyValue::from_vec3(&size)),
            ("offset", ColliderShape::Box { offset, .. } | ColliderShape::Cylinder { offset, .. }) => {
                Some(PropertyValue::from_vec3(&offset))
            }
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Result<(), SceneError> {
        let mut shape = self.shape;
        match (name, &mut shape) {
            ("radius", ColliderShape::Sphere { radius } | ColliderShape::Cylinder { radius, .. }) => {
                *radius = value.as_float(name)?;
            }
            ("height", ColliderShape::Cylinder { height, .. }) => *height = value.as_float(name)?,
            ("size", ColliderShape::Box { size, .. }) => *size = value.as_vec3(name)?,
            ("offset", ColliderShape::Box { offset, .. } | ColliderShape::Cylinder { offset, .. }) => {
                *offset = value.as_vec3(name)?;
            }
            _ => return Err(unknown_property("Collider", name)),
        }
        *self = Self::new(shape)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cylinder_side_and_cap_hits() {
        let collider = Collider::cylinder(0.5, 1.0).unwrap();

        let side = Ray::new(Vec3::new(-3.0, 0.0, 0.0), Vec3::x()).unwrap();
        assert_relative_eq!(collider.intersect_local(&side).unwrap(), 2.5, epsilon = 1e-5);

        let top = Ray::new(Vec3::new(0.1, 4.0, 0.0), -Vec3::y()).unwrap();
        assert_relative_eq!(collider.intersect_local(&top).unwrap(), 3.5, epsilon = 1e-5);

        let above = Ray::new(Vec3::new(-3.0, 0.8, 0.0), Vec3::x()).unwrap();
        assert!(collider.intersect_local(&above).is_none());
    }

    #[test]
    fn test_bounds_enclose_shape() {
        let cylinder = Collider::cylinder(0.5, 1.0).unwrap().local_bounds();
        assert_relative_eq!(cylinder.center, Vec3::zeros());
        assert_relative_eq!(cylinder.radius, 0.5_f32.hypot(0.5));

        let cuboid = Collider::cuboid(Vec3::new(2.0, 2.0, 1.0)).unwrap().local_bounds();
        assert_relative_eq!(cuboid.radius, 1.5);
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        assert!(Collider::sphere(0.0).is_err());
        let mut collider = Collider::sphere(1.0).unwrap();
        assert!(collider.set("radius", &PropertyValue::Float(-1.0)).is_err());
        assert_eq!(collider.get("radius"), Some(PropertyValue::Float(1.0)));
    }
}
