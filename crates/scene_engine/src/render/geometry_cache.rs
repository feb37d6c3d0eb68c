//! Reference-counted GPU geometry
//!
//! Many renderers can show the same mesh. The cache uploads a mesh the first
//! time it is acquired and hands the same [`MeshHandle`] to later users.
//! Entries are keyed by `Arc` pointer, not by contents. Each entry keeps its
//! `Arc` alive, so the address cannot be reused while the entry exists.
//!
//! Acquire and release must balance. A release without a matching acquire
//! is a programming error and is reported as
//! [`RenderError::UnbalancedRelease`] instead of being ignored.

use std::collections::HashMap;
use std::sync::Arc;

use crate::render::{GpuBackend, Mesh, MeshHandle, RenderError};

#[derive(Debug)]
struct CacheEntry {
    // Pins the allocation the key was derived from
    _mesh: Arc<Mesh>,
    handle: MeshHandle,
    ref_count: usize,
}

/// Map from mesh identity to uploaded buffers
#[derive(Debug, Default)]
pub struct GeometryCache {
    entries: HashMap<usize, CacheEntry>,
}

fn identity(mesh: &Arc<Mesh>) -> usize {
    Arc::as_ptr(mesh) as usize
}

impl GeometryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more user of `mesh`, uploading it if this is the first
    pub fn acquire(
        &mut self,
        backend: &mut dyn GpuBackend,
        mesh: &Arc<Mesh>,
    ) -> Result<MeshHandle, RenderError> {
        let key = identity(mesh);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.ref_count += 1;
            log::trace!("Mesh '{}' now has {} users", mesh.name(), entry.ref_count);
            return Ok(entry.handle);
        }

        let handle = backend.upload_mesh(mesh)?;
        log::info!("Uploaded mesh '{}' as {:?}", mesh.name(), handle);
        self.entries.insert(
            key,
            CacheEntry {
                _mesh: Arc::clone(mesh),
                handle,
                ref_count: 1,
            },
        );
        Ok(handle)
    }

    /// Drop one user of `mesh`; the last release frees the upload exactly once
    pub fn release(&mut self, backend: &mut dyn GpuBackend, mesh: &Arc<Mesh>) -> Result<(), RenderError> {
        let key = identity(mesh);
        let Some(entry) = self.entries.get_mut(&key) else {
            log::error!("Release of mesh '{}' which holds no cached geometry", mesh.name());
            return Err(RenderError::UnbalancedRelease(mesh.name().to_string()));
        };

        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return Ok(());
        }

        let handle = entry.handle;
        self.entries.remove(&key);
        log::info!("Releasing mesh '{}' ({:?})", mesh.name(), handle);
        backend.release_mesh(handle)
    }

    /// Uploaded handle of `mesh`, if any renderer holds it
    pub fn handle(&self, mesh: &Arc<Mesh>) -> Option<MeshHandle> {
        self.entries.get(&identity(mesh)).map(|entry| entry.handle)
    }

    /// Current number of users of `mesh`
    pub fn ref_count(&self, mesh: &Arc<Mesh>) -> usize {
        self.entries.get(&identity(mesh)).map_or(0, |entry| entry.ref_count)
    }

    /// Number of distinct meshes cached
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::{HeadlessBackend, PrimitiveTopology};

    fn triangle(name: &str) -> Arc<Mesh> {
        Arc::new(Mesh::new(
            name,
            vec![Vec3::zeros(), Vec3::x(), Vec3::y()],
            PrimitiveTopology::Triangles,
        ))
    }

    #[test]
    fn test_balanced_acquire_release_frees_exactly_once() {
        let mut backend = HeadlessBackend::new();
        let mut cache = GeometryCache::new();
        let mesh = triangle("shared");

        let handles: Vec<MeshHandle> = (0..5)
            .map(|_| cache.acquire(&mut backend, &mesh).unwrap())
            .collect();
        assert!(handles.iter().all(|&h| h == handles[0]));
        assert_eq!(backend.upload_count(), 1);
        assert_eq!(cache.ref_count(&mesh), 5);

        for _ in 0..5 {
            cache.release(&mut backend, &mesh).unwrap();
        }

        assert!(cache.is_empty());
        assert_eq!(cache.handle(&mesh), None);
        assert_eq!(backend.release_count(), 1);
        assert_eq!(backend.live_mesh_count(), 0);
    }

    #[test]
    fn test_equal_contents_are_distinct_entries() {
        let mut backend = HeadlessBackend::new();
        let mut cache = GeometryCache::new();
        let first = triangle("twin");
        let second = triangle("twin");

        let a = cache.acquire(&mut backend, &first).unwrap();
        let b = cache.acquire(&mut backend, &second).unwrap();

        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_unbalanced_release_is_an_error() {
        let mut backend = HeadlessBackend::new();
        let mut cache = GeometryCache::new();
        let mesh = triangle("lonely");

        cache.acquire(&mut backend, &mesh).unwrap();
        cache.release(&mut backend, &mesh).unwrap();

        assert!(matches!(
            cache.release(&mut backend, &mesh),
            Err(RenderError::UnbalancedRelease(_))
        ));
        assert_eq!(backend.release_count(), 1);
    }

    #[test]
    fn test_swapping_meshes_leaves_other_users_untouched() {
        let mut backend = HeadlessBackend::new();
        let mut cache = GeometryCache::new();
        let old = triangle("old");
        let new = triangle("new");

        let shared = cache.acquire(&mut backend, &old).unwrap();
        cache.acquire(&mut backend, &old).unwrap();

        // One renderer moves to another mesh
        cache.release(&mut backend, &old).unwrap();
        cache.acquire(&mut backend, &new).unwrap();

        assert_eq!(cache.handle(&old), Some(shared));
        assert_eq!(cache.ref_count(&old), 1);
        assert_eq!(backend.release_count(), 0);
    }
}
