//! Node arena and transform hierarchy
//!
//! The [`SceneGraph`] owns every node of one scene in a generational arena.
//! Parent/child links are arena keys, so there is no ownership cycle and a
//! stale id is detected instead of dangling. World matrices are resolved
//! lazily: a read walks up only through ancestors whose caches are stale,
//! and a write walks down only through descendants that are still clean.

use std::sync::atomic::{AtomicU32, Ordering};

use slotmap::{Key, SlotMap};

use crate::foundation::math::{utils, Mat4, Point3, Quat, Transform, Vec3};
use crate::scene::component::ComponentKey;
use crate::scene::transform::NodeTransform;
use crate::scene::{Layer, SceneError};

slotmap::new_key_type! {
    /// Arena key of a node inside one scene
    pub struct NodeKey;
}

/// Process-unique identity of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u32);

impl SceneId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Stable handle to a node
///
/// The handle remembers which scene created it, so passing it to another
/// scene is reported as [`SceneError::ForeignNode`] rather than silently
/// addressing an unrelated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) scene: SceneId,
    pub(crate) key: NodeKey,
}

impl NodeId {
    /// Scene the node belongs to
    pub fn scene(self) -> SceneId {
        self.scene
    }

    /// Numeric form used by snapshots; unique within the scene for its lifetime
    pub fn to_raw(self) -> u64 {
        self.key.data().as_ffi()
    }
}

/// One entry of the arena
#[derive(Debug)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) layer: Layer,
    pub(crate) transform: NodeTransform,
    pub(crate) components: Vec<ComponentKey>,
}

impl Node {
    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layer bits
    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// Transform state
    pub fn transform(&self) -> &NodeTransform {
        &self.transform
    }
}

/// Arena of nodes plus the transform hierarchy between them
#[derive(Debug)]
pub struct SceneGraph {
    scene: SceneId,
    nodes: SlotMap<NodeKey, Node>,
    roots: Vec<NodeKey>,
}

impl SceneGraph {
    /// Create an empty graph for `scene`
    pub fn new(scene: SceneId) -> Self {
        Self {
            scene,
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
        }
    }

    /// Scene this graph belongs to
    pub fn scene(&self) -> SceneId {
        self.scene
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` addresses a live node of this graph
    pub fn contains(&self, id: NodeId) -> bool {
        self.resolve(id).is_ok()
    }

    pub(crate) fn resolve(&self, id: NodeId) -> Result<NodeKey, SceneError> {
        if id.scene != self.scene {
            return Err(SceneError::ForeignNode);
        }
        if self.nodes.contains_key(id.key) {
            Ok(id.key)
        } else {
            Err(SceneError::NodeDisposed)
        }
    }

    pub(crate) fn id_of(&self, key: NodeKey) -> NodeId {
        NodeId { scene: self.scene, key }
    }

    pub(crate) fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub(crate) fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    pub(crate) fn insert(&mut self, name: String, parent: Option<NodeKey>) -> NodeKey {
        let parent = parent.filter(|p| self.nodes.contains_key(*p));
        let key = self.nodes.insert(Node {
            name,
            layer: Layer::DEFAULT,
            transform: NodeTransform::new(parent),
            components: Vec::new(),
        });
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => parent_node.transform.children.push(key),
            None => self.roots.push(key),
        }
        key
    }

    /// Unlink and drop a node. Children still attached become roots.
    pub(crate) fn remove(&mut self, key: NodeKey) -> Option<Node> {
        let parent = self.nodes.get(key)?.transform.parent;
        self.unlink(key, parent);
        let node = self.nodes.remove(key)?;
        for &child in &node.transform.children {
            if let Some(orphan) = self.nodes.get_mut(child) {
                orphan.transform.parent = None;
                self.roots.push(child);
            }
            self.invalidate(child);
        }
        Some(node)
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Result<&Node, SceneError> {
        let key = self.resolve(id)?;
        self.nodes.get(key).ok_or(SceneError::NodeDisposed)
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        let key = self.resolve(id)?;
        self.nodes.get_mut(key).ok_or(SceneError::NodeDisposed)
    }

    /// Top-level nodes in creation order
    pub fn roots(&self) -> Vec<NodeId> {
        self.roots.iter().map(|&key| self.id_of(key)).collect()
    }

    /// Display name of a node
    pub fn name(&self, id: NodeId) -> Result<&str, SceneError> {
        Ok(self.get(id)?.name.as_str())
    }

    /// Rename a node
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SceneError> {
        self.get_mut(id)?.name = name.into();
        Ok(())
    }

    /// Layer bits of a node
    pub fn layer(&self, id: NodeId) -> Result<Layer, SceneError> {
        Ok(self.get(id)?.layer)
    }

    /// Move a node to different layers
    pub fn set_layer(&mut self, id: NodeId, layer: Layer) -> Result<(), SceneError> {
        self.get_mut(id)?.layer = layer;
        Ok(())
    }

    /// Parent of a node, if any
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.get(id)?.transform.parent.map(|key| self.id_of(key)))
    }

    /// Direct children of a node, in attachment order
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>, SceneError> {
        Ok(self
            .get(id)?
            .transform
            .children
            .iter()
            .map(|&key| self.id_of(key))
            .collect())
    }

    /// Local position, rotation and scale
    pub fn local_transform(&self, id: NodeId) -> Result<Transform, SceneError> {
        Ok(self.get(id)?.transform.local)
    }

    /// Local position
    pub fn local_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.get(id)?.transform.local.position)
    }

    /// Local rotation
    pub fn local_rotation(&self, id: NodeId) -> Result<Quat, SceneError> {
        Ok(self.get(id)?.transform.local.rotation)
    }

    /// Local scale
    pub fn local_scale(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.get(id)?.transform.local.scale)
    }

    /// Replace the whole local TRS; a write equal to the current value is a no-op
    pub fn set_local_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), SceneError> {
        let key = self.resolve(id)?;
        self.write_local(key, |local| *local = transform);
        Ok(())
    }

    /// Set local position; a write equal to the current value is a no-op
    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        let key = self.resolve(id)?;
        self.write_local(key, |local| local.position = position);
        Ok(())
    }

    /// Set local rotation; a write equal to the current value is a no-op
    pub fn set_local_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), SceneError> {
        let key = self.resolve(id)?;
        self.write_local(key, |local| local.rotation = rotation);
        Ok(())
    }

    /// Set local scale; a write equal to the current value is a no-op
    pub fn set_local_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), SceneError> {
        let key = self.resolve(id)?;
        self.write_local(key, |local| local.scale = scale);
        Ok(())
    }

    fn write_local(&mut self, key: NodeKey, write: impl FnOnce(&mut Transform)) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        let before = node.transform.local;
        write(&mut node.transform.local);
        if node.transform.local != before {
            self.invalidate(key);
        }
    }

    /// World matrix, recomputed only if stale
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let key = self.resolve(id)?;
        Ok(self.world_matrix_of(key))
    }

    /// Inverse world matrix, recomputed only if stale
    pub fn inverse_world_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let key = self.resolve(id)?;
        self.inverse_world_matrix_of(key).ok_or(SceneError::SingularTransform)
    }

    /// World-space position (translation of the world matrix)
    pub fn world_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(utils::translation_of(&self.world_matrix(id)?))
    }

    /// World-space rotation (parent world rotation composed with local)
    pub fn world_rotation(&self, id: NodeId) -> Result<Quat, SceneError> {
        let key = self.resolve(id)?;
        Ok(self.world_rotation_of(key))
    }

    /// Solve the local position that places the node at `position` in world space
    pub fn set_world_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        let key = self.resolve(id)?;
        let local = match self.nodes.get(key).and_then(|n| n.transform.parent) {
            Some(parent) => {
                let inverse = self
                    .inverse_world_matrix_of(parent)
                    .ok_or(SceneError::SingularTransform)?;
                inverse.transform_point(&Point3::from(position)).coords
            }
            None => position,
        };
        self.write_local(key, |t| t.position = local);
        Ok(())
    }

    /// Solve the local rotation that gives the node `rotation` in world space
    pub fn set_world_rotation(&mut self, id: NodeId, rotation: Quat) -> Result<(), SceneError> {
        let key = self.resolve(id)?;
        let local = match self.nodes.get(key).and_then(|n| n.transform.parent) {
            Some(parent) => self.world_rotation_of(parent).inverse() * rotation,
            None => rotation,
        };
        self.write_local(key, |t| t.rotation = local);
        Ok(())
    }

    /// Re-link a node under `parent` (or make it a root). Local values are kept,
    /// so the world pose generally changes.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        let key = self.resolve(id)?;
        let parent_key = parent.map(|p| self.resolve(p)).transpose()?;
        self.reparent(key, parent_key)
    }

    /// Re-link a node while keeping its world position and rotation
    pub fn set_parent_preserving_world(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
    ) -> Result<(), SceneError> {
        let position = self.world_position(id)?;
        let rotation = self.world_rotation(id)?;
        self.set_parent(id, parent)?;
        self.set_world_position(id, position)?;
        self.set_world_rotation(id, rotation)
    }

    /// Number of world matrix recomputations a node has performed
    pub fn recompute_count(&self, id: NodeId) -> Result<u64, SceneError> {
        Ok(self.get(id)?.transform.recompute_count())
    }

    fn reparent(&mut self, key: NodeKey, parent: Option<NodeKey>) -> Result<(), SceneError> {
        let current = self.nodes.get(key).ok_or(SceneError::NodeDisposed)?.transform.parent;
        if current == parent {
            return Ok(());
        }
        if let Some(new_parent) = parent {
            if self.is_self_or_ancestor(key, new_parent) {
                return Err(SceneError::HierarchyCycle);
            }
        }

        self.unlink(key, current);
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => parent_node.transform.children.push(key),
            None => self.roots.push(key),
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.transform.parent = parent;
        }
        self.invalidate(key);
        log::trace!("Reparented node {:?} under {:?}", key, parent);
        Ok(())
    }

    fn is_self_or_ancestor(&self, ancestor: NodeKey, mut key: NodeKey) -> bool {
        loop {
            if key == ancestor {
                return true;
            }
            match self.nodes.get(key).and_then(|n| n.transform.parent) {
                Some(parent) => key = parent,
                None => return false,
            }
        }
    }

    fn unlink(&mut self, key: NodeKey, parent: Option<NodeKey>) {
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => parent_node.transform.children.retain(|&c| c != key),
            None => self.roots.retain(|&r| r != key),
        }
    }

    /// Mark a node and its descendants stale, stopping at already-stale nodes
    pub(crate) fn invalidate(&self, key: NodeKey) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        if !node.transform.mark_dirty() {
            return;
        }
        for &child in &node.transform.children {
            self.invalidate(child);
        }
    }

    pub(crate) fn world_matrix_of(&self, key: NodeKey) -> Mat4 {
        match self.nodes.get(key) {
            Some(node) => node
                .transform
                .resolve_world(|| node.transform.parent.map(|p| self.world_matrix_of(p))),
            None => Mat4::identity(),
        }
    }

    pub(crate) fn inverse_world_matrix_of(&self, key: NodeKey) -> Option<Mat4> {
        let world = self.world_matrix_of(key);
        self.nodes.get(key)?.transform.resolve_inverse(world)
    }

    pub(crate) fn world_rotation_of(&self, key: NodeKey) -> Quat {
        match self.nodes.get(key) {
            Some(node) => node
                .transform
                .resolve_rotation(|| node.transform.parent.map(|p| self.world_rotation_of(p))),
            None => Quat::identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::constants::HALF_PI;
    use approx::assert_relative_eq;

    fn graph() -> SceneGraph {
        SceneGraph::new(SceneId::next())
    }

    fn add(graph: &mut SceneGraph, name: &str, parent: Option<NodeId>) -> NodeId {
        let key = graph.insert(name.to_string(), parent.map(|p| p.key));
        graph.id_of(key)
    }

    fn ground_truth(graph: &SceneGraph, id: NodeId) -> Mat4 {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(graph.local_transform(node).unwrap().to_matrix());
            current = graph.parent(node).unwrap();
        }
        chain.iter().rev().fold(Mat4::identity(), |acc, local| acc * local)
    }

    #[test]
    fn test_cached_world_matrix_matches_ground_truth_after_every_write() {
        let mut graph = graph();
        let root = add(&mut graph, "root", None);
        let mid = add(&mut graph, "mid", Some(root));
        let leaf = add(&mut graph, "leaf", Some(mid));
        let nodes = [root, mid, leaf];

        // Deterministic pseudo-random write sequence
        let mut seed: u32 = 12345;
        let mut next = || {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            f32::from((seed >> 16) as u16 % 200) / 20.0 - 5.0
        };

        for step in 0..60 {
            let target = nodes[step % 3];
            match step % 4 {
                0 => graph.set_local_position(target, Vec3::new(next(), next(), next())).unwrap(),
                1 => graph
                    .set_local_rotation(target, Quat::from_axis_angle(&Vec3::z_axis(), next()))
                    .unwrap(),
                2 => graph
                    .set_local_scale(target, Vec3::new(1.0 + next().abs(), 1.0, 0.5))
                    .unwrap(),
                _ => graph.set_world_position(target, Vec3::new(next(), 0.0, next())).unwrap(),
            }
            // Read some nodes between writes so caches are a mix of clean and stale
            if step % 2 == 0 {
                let _ = graph.world_matrix(nodes[(step + 1) % 3]).unwrap();
            }
            for node in nodes {
                let cached = graph.world_matrix(node).unwrap();
                assert_relative_eq!(cached, ground_truth(&graph, node), epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_reparent_preserving_world_keeps_pose_and_changes_local() {
        let mut graph = graph();
        let a = add(&mut graph, "a", None);
        let b = add(&mut graph, "b", None);
        graph.set_local_position(a, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        graph
            .set_local_rotation(a, Quat::from_axis_angle(&Vec3::y_axis(), HALF_PI))
            .unwrap();
        graph.set_local_position(b, Vec3::new(0.0, 5.0, -2.0)).unwrap();
        graph
            .set_local_rotation(b, Quat::from_axis_angle(&Vec3::x_axis(), 0.3))
            .unwrap();

        let child = add(&mut graph, "child", Some(a));
        let world_position = Vec3::new(1.0, 2.0, 3.0);
        let world_rotation = Quat::from_axis_angle(&Vec3::z_axis(), 0.7);
        graph.set_world_position(child, world_position).unwrap();
        graph.set_world_rotation(child, world_rotation).unwrap();
        let local_under_a = graph.local_position(child).unwrap();

        graph.set_parent_preserving_world(child, Some(b)).unwrap();

        assert_eq!(graph.parent(child).unwrap(), Some(b));
        assert_relative_eq!(graph.world_position(child).unwrap(), world_position, epsilon = 1e-4);
        let rotation_error = graph.world_rotation(child).unwrap().angle_to(&world_rotation);
        assert!(rotation_error < 1e-3, "rotation drifted by {rotation_error}");
        assert!((graph.local_position(child).unwrap() - local_under_a).norm() > 1e-2);
    }

    #[test]
    fn test_invalidation_is_idempotent() {
        let mut graph = graph();
        let root = add(&mut graph, "root", None);
        let a = add(&mut graph, "a", Some(root));
        let b = add(&mut graph, "b", Some(a));
        let leaf = add(&mut graph, "leaf", Some(b));

        let _ = graph.world_matrix(leaf).unwrap();
        assert_eq!(graph.recompute_count(leaf).unwrap(), 1);
        assert_eq!(graph.recompute_count(a).unwrap(), 1);

        graph.set_local_position(root, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        graph.set_local_position(root, Vec3::new(2.0, 0.0, 0.0)).unwrap();
        graph.set_local_position(a, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        graph.invalidate(root.key);

        let world = graph.world_matrix(leaf).unwrap();
        let again = graph.world_matrix(leaf).unwrap();
        assert_eq!(world, again);
        assert_relative_eq!(utils::translation_of(&world), Vec3::new(2.0, 1.0, 0.0));
        for node in [root, a, b, leaf] {
            assert_eq!(graph.recompute_count(node).unwrap(), 2);
        }
    }

    #[test]
    fn test_equal_write_does_not_dirty() {
        let mut graph = graph();
        let root = add(&mut graph, "root", None);
        let child = add(&mut graph, "child", Some(root));
        graph.set_local_position(root, Vec3::new(3.0, 0.0, 0.0)).unwrap();
        let _ = graph.world_matrix(child).unwrap();

        graph.set_local_position(root, Vec3::new(3.0, 0.0, 0.0)).unwrap();

        assert!(!graph.get(child).unwrap().transform().is_dirty());
        assert!(!graph.get(root).unwrap().transform().is_dirty());
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut graph = graph();
        let root = add(&mut graph, "root", None);
        let child = add(&mut graph, "child", Some(root));
        assert!(matches!(graph.set_parent(root, Some(child)), Err(SceneError::HierarchyCycle)));
        assert!(matches!(graph.set_parent(root, Some(root)), Err(SceneError::HierarchyCycle)));
        graph.set_parent(child, None).unwrap();
        assert_eq!(graph.roots(), vec![root, child]);
    }

    #[test]
    fn test_foreign_and_stale_ids_are_rejected() {
        let mut first = graph();
        let second = graph();
        let node = add(&mut first, "node", None);
        assert!(matches!(second.world_matrix(node), Err(SceneError::ForeignNode)));

        first.remove(node.key);
        assert!(matches!(first.world_matrix(node), Err(SceneError::NodeDisposed)));
        assert!(matches!(
            first.set_local_position(node, Vec3::zeros()),
            Err(SceneError::NodeDisposed)
        ));
    }

    #[test]
    fn test_zero_scale_has_no_inverse() {
        let mut graph = graph();
        let node = add(&mut graph, "flat", None);
        graph.set_local_scale(node, Vec3::new(1.0, 0.0, 1.0)).unwrap();
        assert!(matches!(graph.inverse_world_matrix(node), Err(SceneError::SingularTransform)));
    }
}
