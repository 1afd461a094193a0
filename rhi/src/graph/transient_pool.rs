//! Pool of physical resources backing transient attachments.
//!
//! A transient attachment is allocated from the pool when its use-chain
//! starts and handed back when it ends. Released resources are parked per
//! frame slot until that slot's fence has been waited on, then move to the
//! free list where later allocations with an identical descriptor reuse them.
//! Free resources that sit idle for longer than the frames in flight are
//! destroyed.
//!
//! ```text
//! acquire ──► in use ──release──► pending[slot] ──recycle──► free ──► acquire
//!                                                              │
//!                                                              └─ idle too long ──► destroyed
//! ```

use rustc_hash::FxHashMap;

use crate::backend::{BackendResult, GpuBackend};
use crate::types::{BufferDescriptor, ImageDescriptor};

use super::attachment::PhysicalResource;

/// Exact physical description a pooled resource was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKey {
    Image(ImageDescriptor),
    Buffer(BufferDescriptor),
}

#[derive(Debug, Clone, Copy)]
struct PooledResource {
    resource: PhysicalResource,
    idle_frames: u32,
}

/// Pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransientPoolStats {
    /// Resources created through the backend.
    pub created: u64,
    /// Allocations served from the free list.
    pub reused: u64,
    /// Resources destroyed through the backend.
    pub destroyed: u64,
}

/// Physical resources for transient attachments.
#[derive(Debug)]
pub struct TransientPool {
    free: FxHashMap<PoolKey, Vec<PooledResource>>,
    pending: Vec<Vec<(PoolKey, PhysicalResource)>>,
    reuse: bool,
    stats: TransientPoolStats,
}

impl TransientPool {
    /// Create an empty pool for `frame_count` frame slots.
    pub fn new(frame_count: usize, reuse: bool) -> Self {
        Self {
            free: FxHashMap::default(),
            pending: vec![Vec::new(); frame_count],
            reuse,
            stats: TransientPoolStats::default(),
        }
    }

    /// Get a resource matching `key`, reusing a free one when possible.
    ///
    /// Returns the resource and whether it was reused.
    pub fn acquire(
        &mut self,
        backend: &dyn GpuBackend,
        name: &str,
        key: PoolKey,
    ) -> BackendResult<(PhysicalResource, bool)> {
        if let Some(pooled) = self.free.get_mut(&key).and_then(Vec::pop) {
            self.stats.reused += 1;
            log::trace!("Transient pool: reusing resource for '{}'", name);
            return Ok((pooled.resource, true));
        }

        let resource = match &key {
            PoolKey::Image(descriptor) => {
                PhysicalResource::Image(backend.create_image(name, descriptor)?)
            }
            PoolKey::Buffer(descriptor) => {
                PhysicalResource::Buffer(backend.create_buffer(name, descriptor)?)
            }
        };
        self.stats.created += 1;
        Ok((resource, false))
    }

    /// Hand back a resource that was never used by the GPU.
    pub fn release_unused(&mut self, key: PoolKey, resource: PhysicalResource) {
        self.park(key, resource);
    }

    /// Hand back a resource used by the frame in `slot`.
    ///
    /// It becomes reusable after [`TransientPool::recycle`] runs for the slot.
    pub fn release(&mut self, slot: usize, key: PoolKey, resource: PhysicalResource) {
        self.pending[slot].push((key, resource));
    }

    fn park(&mut self, key: PoolKey, resource: PhysicalResource) {
        self.free.entry(key).or_default().push(PooledResource {
            resource,
            idle_frames: 0,
        });
    }

    /// Age the free list and move `slot`'s released resources into it.
    ///
    /// Must only be called once the GPU has finished the frame that last ran
    /// in `slot`.
    pub fn recycle(&mut self, backend: &dyn GpuBackend, slot: usize, max_idle_frames: u32) {
        let mut destroyed = 0u64;
        self.free.retain(|_, bucket| {
            bucket.retain_mut(|pooled| {
                pooled.idle_frames += 1;
                if pooled.idle_frames > max_idle_frames {
                    destroy(backend, pooled.resource);
                    destroyed += 1;
                    false
                } else {
                    true
                }
            });
            !bucket.is_empty()
        });
        self.stats.destroyed += destroyed;

        for (key, resource) in std::mem::take(&mut self.pending[slot]) {
            if self.reuse {
                self.park(key, resource);
            } else {
                destroy(backend, resource);
                self.stats.destroyed += 1;
            }
        }
    }

    /// Destroy every free resource. Pending resources are left alone.
    pub fn trim(&mut self, backend: &dyn GpuBackend) {
        for (_, bucket) in self.free.drain() {
            for pooled in bucket {
                destroy(backend, pooled.resource);
                self.stats.destroyed += 1;
            }
        }
    }

    /// Destroy everything, including pending resources.
    ///
    /// The device must be idle.
    pub fn destroy_all(&mut self, backend: &dyn GpuBackend) {
        self.trim(backend);
        for pending in &mut self.pending {
            for (_, resource) in pending.drain(..) {
                destroy(backend, resource);
                self.stats.destroyed += 1;
            }
        }
    }

    /// Number of resources in the free list.
    pub fn free_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    /// Number of resources waiting for their frame slot to retire.
    pub fn pending_count(&self) -> usize {
        self.pending.iter().map(Vec::len).sum()
    }

    pub fn stats(&self) -> TransientPoolStats {
        self.stats
    }
}

fn destroy(backend: &dyn GpuBackend, resource: PhysicalResource) {
    match resource {
        PhysicalResource::Image(image) => backend.destroy_image(image),
        PhysicalResource::Buffer(buffer) => backend.destroy_buffer(buffer),
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::types::{BufferUsage, Format, ImageUsage};

    fn image_key(width: u32) -> PoolKey {
        PoolKey::Image(ImageDescriptor::new_2d(
            width,
            width,
            Format::Rgba8Unorm,
            ImageUsage::COLOR_ATTACHMENT,
        ))
    }

    #[test]
    fn test_acquire_creates() {
        let backend = DummyBackend::new();
        let mut pool = TransientPool::new(2, true);
        let (resource, reused) = pool.acquire(&backend, "a", image_key(8)).unwrap();
        assert!(!reused);
        assert!(matches!(resource, PhysicalResource::Image(_)));
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_release_waits_for_slot() {
        let backend = DummyBackend::new();
        let mut pool = TransientPool::new(2, true);
        let key = image_key(8);
        let (first, _) = pool.acquire(&backend, "a", key).unwrap();
        pool.release(0, key, first);
        assert_eq!(pool.pending_count(), 1);

        // Slot 0 not yet retired: a new allocation must not alias.
        let (second, reused) = pool.acquire(&backend, "b", key).unwrap();
        assert!(!reused);
        assert_ne!(first, second);

        pool.recycle(&backend, 0, 2);
        assert_eq!(pool.free_count(), 1);
        let (third, reused) = pool.acquire(&backend, "c", key).unwrap();
        assert!(reused);
        assert_eq!(third, first);
    }

    #[test]
    fn test_key_mismatch_not_reused() {
        let backend = DummyBackend::new();
        let mut pool = TransientPool::new(1, true);
        let (resource, _) = pool.acquire(&backend, "a", image_key(8)).unwrap();
        pool.release_unused(image_key(8), resource);
        let (_, reused) = pool.acquire(&backend, "b", image_key(16)).unwrap();
        assert!(!reused);
        let buffer_key = PoolKey::Buffer(BufferDescriptor::new(64, BufferUsage::STORAGE));
        let (_, reused) = pool.acquire(&backend, "c", buffer_key).unwrap();
        assert!(!reused);
    }

    #[test]
    fn test_idle_resources_destroyed() {
        let backend = DummyBackend::new();
        let mut pool = TransientPool::new(1, true);
        let key = image_key(8);
        let (resource, _) = pool.acquire(&backend, "a", key).unwrap();
        pool.release(0, key, resource);

        pool.recycle(&backend, 0, 1);
        assert_eq!(pool.free_count(), 1);
        pool.recycle(&backend, 0, 1);
        assert_eq!(pool.free_count(), 1);
        pool.recycle(&backend, 0, 1);
        assert_eq!(pool.free_count(), 0);
        assert_eq!(backend.live_images(), 0);
        assert_eq!(pool.stats().destroyed, 1);
    }

    #[test]
    fn test_reuse_disabled_destroys_on_recycle() {
        let backend = DummyBackend::new();
        let mut pool = TransientPool::new(1, false);
        let key = image_key(8);
        let (resource, _) = pool.acquire(&backend, "a", key).unwrap();
        pool.release(0, key, resource);
        pool.recycle(&backend, 0, 3);
        assert_eq!(pool.free_count(), 0);
        assert_eq!(backend.live_images(), 0);
    }

    #[test]
    fn test_destroy_all() {
        let backend = DummyBackend::new();
        let mut pool = TransientPool::new(2, true);
        let key = image_key(8);
        let (a, _) = pool.acquire(&backend, "a", key).unwrap();
        let (b, _) = pool.acquire(&backend, "b", key).unwrap();
        pool.release(1, key, a);
        pool.release_unused(key, b);
        pool.destroy_all(&backend);
        assert_eq!(backend.live_images(), 0);
        assert_eq!(pool.free_count() + pool.pending_count(), 0);
    }
}
