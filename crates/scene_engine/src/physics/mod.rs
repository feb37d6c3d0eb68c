//! Ray queries against scene geometry
//!
//! Provides the collision primitives and the two-phase [`Raycaster`] used
//! for picking. There is no collision response.

pub mod collision;
pub mod raycaster;

pub use collision::{Aabb, BoundingSphere, Ray, Triangle};
pub use raycaster::{
    RaycastCandidate, RaycastHit, RaycastMode, RaycastResult, RaycastStats, RaycastTarget, Raycaster,
};
