//! Collision primitives
//!
//! Shapes are stored in model space. Queries bring the ray into model space
//! instead of moving the shape into world space, so a transform change never
//! touches collision data.
//!
//! - [`Ray`], [`BoundingSphere`], [`Aabb`], [`Triangle`] - primitives with
//!   their intersection tests

pub mod primitives;

pub use primitives::{Aabb, BoundingSphere, Ray, Triangle};
