//! Hierarchical transform state
//!
//! A [`NodeTransform`] holds a node's local TRS, its parent/child links and
//! three lazily computed caches: the world matrix, its inverse and the world
//! rotation. Each cache has its own dirty flag. The caches sit behind
//! [`Cell`]s so reads through a shared [`SceneGraph`](super::SceneGraph)
//! borrow can memoize results.
//!
//! Invariant kept by the graph: if a node's world matrix (or world rotation)
//! is dirty, the same cache is dirty on every descendant. That is what lets
//! invalidation stop as soon as it reaches an already-dirty node.

use std::cell::Cell;

use crate::foundation::math::{Mat4, Quat, Transform};
use crate::scene::scene_graph::NodeKey;

/// Local TRS, hierarchy links and cached world state of one node
#[derive(Debug)]
pub struct NodeTransform {
    pub(crate) local: Transform,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,

    world: Cell<Mat4>,
    world_dirty: Cell<bool>,
    inverse: Cell<Option<Mat4>>,
    inverse_dirty: Cell<bool>,
    world_rotation: Cell<Quat>,
    rotation_dirty: Cell<bool>,

    recomputes: Cell<u64>,
}

impl NodeTransform {
    pub(crate) fn new(parent: Option<NodeKey>) -> Self {
        Self {
            local: Transform::identity(),
            parent,
            children: Vec::new(),
            world: Cell::new(Mat4::identity()),
            world_dirty: Cell::new(true),
            inverse: Cell::new(None),
            inverse_dirty: Cell::new(true),
            world_rotation: Cell::new(Quat::identity()),
            rotation_dirty: Cell::new(true),
            recomputes: Cell::new(0),
        }
    }

    /// Local position, rotation and scale
    pub fn local(&self) -> &Transform {
        &self.local
    }

    /// Number of times the world matrix has been recomputed
    pub fn recompute_count(&self) -> u64 {
        self.recomputes.get()
    }

    /// Whether the cached world matrix is stale
    pub fn is_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    /// Mark every cache stale.
    ///
    /// Returns `false` when all caches were already stale, in which case the
    /// descendants are stale too and the caller can stop walking.
    pub(crate) fn mark_dirty(&self) -> bool {
        if self.world_dirty.get() && self.rotation_dirty.get() {
            return false;
        }
        self.world_dirty.set(true);
        self.inverse_dirty.set(true);
        self.rotation_dirty.set(true);
        true
    }

    /// Cached world matrix, computing it with `parent_world` when stale.
    pub(crate) fn resolve_world(&self, parent_world: impl FnOnce() -> Option<Mat4>) -> Mat4 {
        if self.world_dirty.get() {
            let local = self.local.to_matrix();
            let world = match parent_world() {
                Some(parent) => parent * local,
                None => local,
            };
            self.world.set(world);
            self.world_dirty.set(false);
            self.recomputes.set(self.recomputes.get() + 1);
        }
        self.world.get()
    }

    /// Cached inverse of `world`; `None` when the matrix is singular.
    pub(crate) fn resolve_inverse(&self, world: Mat4) -> Option<Mat4> {
        if self.inverse_dirty.get() {
            self.inverse.set(world.try_inverse());
            self.inverse_dirty.set(false);
        }
        self.inverse.get()
    }

    pub(crate) fn resolve_rotation(&self, parent_rotation: impl FnOnce() -> Option<Quat>) -> Quat {
        if self.rotation_dirty.get() {
            let rotation = match parent_rotation() {
                Some(parent) => parent * self.local.rotation,
                None => self.local.rotation,
            };
            self.world_rotation.set(rotation);
            self.rotation_dirty.set(false);
        }
        self.world_rotation.get()
    }
}
