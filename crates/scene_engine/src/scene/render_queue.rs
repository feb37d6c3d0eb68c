//! Renderable partitioning and sort policies
//!
//! Every renderable component sits in exactly one of two lists, chosen by
//! its material's render queue:
//!
//! - **Opaque**, sorted by shader to minimise state changes. Materialless
//!   renderables sort under the default material's shader. Ties keep
//!   insertion order. The sort only runs when membership changed since the
//!   last one.
//! - **Transparent**, sorted back to front by squared distance to the camera.
//!   The order depends on the camera, so it is rebuilt for every camera.
//!
//! Moving between lists is always remove-then-insert.

use std::sync::Arc;

use slotmap::SecondaryMap;

use crate::foundation::math::{Mat4, Vec3};
use crate::physics::collision::BoundingSphere;
use crate::render::{DrawCall, Material, RenderBucket, ShaderId};
use crate::scene::component::{ComponentId, ComponentKey};
use crate::scene::Layer;

/// Per-frame draw data of one renderable
#[derive(Debug, Clone)]
pub struct RenderItem {
    /// Component being drawn
    pub component: ComponentId,
    /// Layers of the owning node
    pub layer: Layer,
    /// World matrix
    pub model: Mat4,
    /// World position, used for transparent sorting
    pub position: Vec3,
    /// World-space bounding sphere
    pub bounds: Option<BoundingSphere>,
    /// Effective material
    pub material: Arc<Material>,
    /// Draw prepared by the renderer, if it has anything to draw
    pub draw: Option<DrawCall>,
}

#[derive(Debug, Clone, Copy)]
struct OpaqueEntry {
    key: ComponentKey,
    shader: Option<ShaderId>,
    sequence: u64,
}

/// Opaque and transparent renderable lists
#[derive(Debug, Default)]
pub struct RenderableCollection {
    opaque: Vec<OpaqueEntry>,
    transparent: Vec<ComponentKey>,
    default_shader: ShaderId,
    needs_full_sort: bool,
    next_sequence: u64,
    items: SecondaryMap<ComponentKey, RenderItem>,
}

impl RenderableCollection {
    /// Create empty lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Shader that materialless renderables are grouped under
    pub fn set_default_shader(&mut self, shader: ShaderId) {
        if self.default_shader != shader {
            self.default_shader = shader;
            self.needs_full_sort = true;
        }
    }

    /// Insert a renderable into the list its material selects.
    /// `None` means the default material, which is opaque.
    pub fn add(&mut self, key: ComponentKey, material: Option<&Material>) {
        match material.map_or(RenderBucket::Opaque, |m| m.queue().bucket()) {
            RenderBucket::Opaque => {
                self.opaque.push(OpaqueEntry {
                    key,
                    shader: material.map(Material::shader),
                    sequence: self.next_sequence,
                });
                self.next_sequence += 1;
                self.needs_full_sort = true;
            }
            RenderBucket::Transparent => self.transparent.push(key),
        }
    }

    /// Remove a renderable from whichever list holds it
    pub fn remove(&mut self, key: ComponentKey) -> bool {
        let before = self.len();
        self.opaque.retain(|entry| entry.key != key);
        self.transparent.retain(|&k| k != key);
        self.items.remove(key);
        self.len() != before
    }

    /// Re-partition after a material change
    pub fn reclassify(&mut self, key: ComponentKey, material: Option<&Material>) {
        self.remove(key);
        self.add(key, material);
    }

    /// Total number of renderables
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    /// Whether both lists are empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bucket currently holding `key`
    pub fn bucket_of(&self, key: ComponentKey) -> Option<RenderBucket> {
        if self.opaque.iter().any(|entry| entry.key == key) {
            Some(RenderBucket::Opaque)
        } else if self.transparent.contains(&key) {
            Some(RenderBucket::Transparent)
        } else {
            None
        }
    }

    /// Opaque keys in current order
    pub fn opaque_keys(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.opaque.iter().map(|entry| entry.key)
    }

    /// Transparent keys in current order
    pub fn transparent_keys(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.transparent.iter().copied()
    }

    /// Every key, opaque first
    pub fn keys(&self) -> Vec<ComponentKey> {
        self.opaque_keys().chain(self.transparent_keys()).collect()
    }

    /// Drop last frame's draw data
    pub fn begin_frame(&mut self) {
        self.items.clear();
    }

    /// Record this frame's draw data for `key`
    pub fn set_item(&mut self, key: ComponentKey, item: RenderItem) {
        self.items.insert(key, item);
    }

    /// Draw data recorded for `key` this frame
    pub fn item(&self, key: ComponentKey) -> Option<&RenderItem> {
        self.items.get(key)
    }

    /// Sort the opaque list if membership changed since the last sort
    pub fn sort_opaque(&mut self) {
        if !self.needs_full_sort {
            return;
        }
        let default_shader = self.default_shader;
        self.opaque
            .sort_by_key(|entry| (entry.shader.unwrap_or(default_shader), entry.sequence));
        self.needs_full_sort = false;
    }

    /// Sort the transparent list farthest-first from `camera_position`.
    /// Renderables without draw data this frame sort last.
    pub fn sort_transparent(&mut self, camera_position: Vec3) {
        let items = &self.items;
        let distance = |key: &ComponentKey| {
            items
                .get(*key)
                .map_or(f32::NEG_INFINITY, |item| (item.position - camera_position).norm_squared())
        };
        self.transparent
            .sort_by(|a, b| distance(b).total_cmp(&distance(a)));
    }

    /// Prepare both lists for drawing from `camera_position`
    pub fn sort_for_camera(&mut self, camera_position: Vec3) {
        self.sort_opaque();
        self.sort_transparent(camera_position);
    }

    /// Opaque draw data in draw order; renderables skipped this frame are omitted
    pub fn opaque_items(&self) -> impl Iterator<Item = &RenderItem> + '_ {
        self.opaque.iter().filter_map(|entry| self.items.get(entry.key))
    }

    /// Transparent draw data in draw order
    pub fn transparent_items(&self) -> impl Iterator<Item = &RenderItem> + '_ {
        self.transparent.iter().filter_map(|&key| self.items.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderQueue;
    use crate::scene::scene_graph::SceneId;
    use slotmap::SlotMap;

    struct Fixture {
        keys: SlotMap<ComponentKey, ()>,
        scene: SceneId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                keys: SlotMap::with_key(),
                scene: SceneId::next(),
            }
        }

        fn key(&mut self) -> ComponentKey {
            self.keys.insert(())
        }

        fn item(&self, key: ComponentKey, position: Vec3) -> RenderItem {
            RenderItem {
                component: ComponentId { scene: self.scene, key },
                layer: Layer::DEFAULT,
                model: Mat4::new_translation(&position),
                position,
                bounds: None,
                material: Arc::new(Material::default()),
                draw: None,
            }
        }
    }

    fn glass() -> Material {
        Material::new("glass", ShaderId(3)).with_queue(RenderQueue::Transparent)
    }

    #[test]
    fn test_material_change_moves_renderable_exactly_once() {
        let mut fixture = Fixture::new();
        let mut collection = RenderableCollection::new();
        let key = fixture.key();

        collection.add(key, Some(&Material::new("stone", ShaderId(1))));
        assert_eq!(collection.bucket_of(key), Some(RenderBucket::Opaque));

        collection.reclassify(key, Some(&glass()));

        assert_eq!(collection.opaque_keys().count(), 0);
        assert_eq!(collection.transparent_keys().filter(|&k| k == key).count(), 1);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_transparent_sorted_farthest_first() {
        let mut fixture = Fixture::new();
        let mut collection = RenderableCollection::new();
        let material = glass();

        let mut by_distance = Vec::new();
        for distance in [1.0, 5.0, 3.0] {
            let key = fixture.key();
            collection.add(key, Some(&material));
            collection.set_item(key, fixture.item(key, Vec3::new(0.0, 0.0, -distance)));
            by_distance.push((distance, key));
        }

        collection.sort_for_camera(Vec3::zeros());

        let order: Vec<ComponentKey> = collection.transparent_keys().collect();
        assert_eq!(order, vec![by_distance[1].1, by_distance[2].1, by_distance[0].1]);
    }

    #[test]
    fn test_opaque_sorted_by_shader_with_default_first_and_stable_ties() {
        let mut fixture = Fixture::new();
        let mut collection = RenderableCollection::new();
        let shader_two = Material::new("b", ShaderId(2));
        let shader_one = Material::new("a", ShaderId(1));

        let first_two = fixture.key();
        let only_one = fixture.key();
        let second_two = fixture.key();
        let defaulted = fixture.key();
        collection.add(first_two, Some(&shader_two));
        collection.add(only_one, Some(&shader_one));
        collection.add(second_two, Some(&shader_two));
        collection.add(defaulted, None);

        collection.sort_opaque();

        let order: Vec<ComponentKey> = collection.opaque_keys().collect();
        assert_eq!(order, vec![defaulted, only_one, first_two, second_two]);
    }

    #[test]
    fn test_default_material_renderables_group_with_matching_shader() {
        let mut fixture = Fixture::new();
        let mut collection = RenderableCollection::new();
        let shader_two = Material::new("b", ShaderId(2));
        let shader_one = Material::new("a", ShaderId(1));

        let defaulted = fixture.key();
        let only_one = fixture.key();
        let explicit_two = fixture.key();
        collection.add(defaulted, None);
        collection.add(only_one, Some(&shader_one));
        collection.add(explicit_two, Some(&shader_two));
        collection.sort_opaque();

        collection.set_default_shader(ShaderId(2));
        collection.sort_opaque();

        let order: Vec<ComponentKey> = collection.opaque_keys().collect();
        assert_eq!(order, vec![only_one, defaulted, explicit_two]);
    }

    #[test]
    fn test_custom_shader_opaque_joins_opaque_list() {
        let mut fixture = Fixture::new();
        let mut collection = RenderableCollection::new();
        let key = fixture.key();
        let custom = Material::new("custom", ShaderId(9)).with_queue(RenderQueue::CustomShaderOpaque);

        collection.add(key, Some(&custom));

        assert_eq!(collection.bucket_of(key), Some(RenderBucket::Opaque));
        assert!(collection.remove(key));
        assert!(!collection.remove(key));
        assert!(collection.is_empty());
    }
}
