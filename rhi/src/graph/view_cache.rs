//! Content-addressed cache of image and buffer views.
//!
//! Views are keyed by the physical resource and the full view description,
//! so each distinct (resource, view) pair maps to exactly one backend view.
//! The cache is owned by the frame scheduler. Entries go away in three ways:
//!
//! - [`ViewCache::invalidate`] when the resource is released or removed,
//! - [`ViewCache::evict`] once the cache grows past its capacity, dropping
//!   entries that have been idle for longer than the frames in flight,
//! - [`ViewCache::drain`] on teardown.
//!
//! Removed views are returned to the caller, which destroys them once the
//! GPU is done with them.

use rustc_hash::FxHashMap;

use crate::backend::{BackendResult, BufferHandle, GpuBackend, ImageHandle};
use crate::types::{BufferViewInfo, ImageViewInfo};

use super::attachment::PhysicalResource;
use super::pass_attachment::ResolvedView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ViewKey {
    Image(ImageHandle, ImageViewInfo),
    Buffer(BufferHandle, BufferViewInfo),
}

impl ViewKey {
    fn resource(&self) -> PhysicalResource {
        match *self {
            Self::Image(image, _) => PhysicalResource::Image(image),
            Self::Buffer(buffer, _) => PhysicalResource::Buffer(buffer),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedView {
    view: ResolvedView,
    last_used_frame: u64,
}

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Deduplicates view objects by content.
#[derive(Debug)]
pub struct ViewCache {
    entries: FxHashMap<ViewKey, CachedView>,
    capacity: usize,
    stats: ViewCacheStats,
}

impl ViewCache {
    /// Create an empty cache that starts evicting above `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            capacity,
            stats: ViewCacheStats::default(),
        }
    }

    fn get_or_create(
        &mut self,
        key: ViewKey,
        frame: u64,
        create: impl FnOnce() -> BackendResult<ResolvedView>,
    ) -> BackendResult<ResolvedView> {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used_frame = frame;
            self.stats.hits += 1;
            return Ok(entry.view);
        }
        let view = create()?;
        self.stats.misses += 1;
        self.entries.insert(
            key,
            CachedView {
                view,
                last_used_frame: frame,
            },
        );
        Ok(view)
    }

    /// Get the view of `image` described by `info`, creating it on a miss.
    pub fn get_or_create_image_view(
        &mut self,
        backend: &dyn GpuBackend,
        image: ImageHandle,
        info: &ImageViewInfo,
        frame: u64,
    ) -> BackendResult<ResolvedView> {
        self.get_or_create(ViewKey::Image(image, *info), frame, || {
            backend
                .create_image_view(image, info)
                .map(ResolvedView::Image)
        })
    }

    /// Get the view of `buffer` described by `info`, creating it on a miss.
    pub fn get_or_create_buffer_view(
        &mut self,
        backend: &dyn GpuBackend,
        buffer: BufferHandle,
        info: &BufferViewInfo,
        frame: u64,
    ) -> BackendResult<ResolvedView> {
        self.get_or_create(ViewKey::Buffer(buffer, *info), frame, || {
            backend
                .create_buffer_view(buffer, info)
                .map(ResolvedView::Buffer)
        })
    }

    /// Remove every view of `resource`.
    pub fn invalidate(&mut self, resource: PhysicalResource) -> Vec<ResolvedView> {
        let mut removed = Vec::new();
        self.entries.retain(|key, entry| {
            if key.resource() == resource {
                removed.push(entry.view);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Shrink the cache back to its capacity.
    ///
    /// Only entries unused for more than `max_idle_frames` are candidates,
    /// least recently used first; views still possibly referenced by frames in
    /// flight are never evicted, even if that leaves the cache over capacity.
    pub fn evict(&mut self, frame: u64, max_idle_frames: u64) -> Vec<ResolvedView> {
        if self.entries.len() <= self.capacity {
            return Vec::new();
        }
        let mut candidates: Vec<(u64, ViewKey)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.last_used_frame + max_idle_frames < frame)
            .map(|(key, entry)| (entry.last_used_frame, *key))
            .collect();
        candidates.sort_unstable_by_key(|(last_used, _)| *last_used);

        let excess = self.entries.len() - self.capacity;
        let mut removed = Vec::with_capacity(excess.min(candidates.len()));
        for (_, key) in candidates.into_iter().take(excess) {
            if let Some(entry) = self.entries.remove(&key) {
                removed.push(entry.view);
            }
        }
        self.stats.evictions += removed.len() as u64;
        if !removed.is_empty() {
            log::debug!("View cache evicted {} views", removed.len());
        }
        removed
    }

    /// Remove every entry.
    pub fn drain(&mut self) -> Vec<ResolvedView> {
        self.entries.drain().map(|(_, entry)| entry.view).collect()
    }

    /// Number of cached views.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> ViewCacheStats {
        self.stats
    }
}
