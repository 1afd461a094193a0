//! Frame scheduler.
//!
//! The [`FrameScheduler`] drives one frame of GPU work at a time:
//!
//! ```text
//! Idle ──begin()──► Recording ──submit()*──► compile() ──► Compiled ──end()──► Idle
//!                       ▲                        │                      │
//!                       └──────begin()────── Failed ◄───────────────────┘ (on error)
//! ```
//!
//! While recording, the caller creates passes, registers attachments and
//! declares which passes use which attachments. Each use becomes a node in
//! the attachment's use-chain. `compile()` walks the chains to allocate
//! transient resources, resolve views and compute barriers and cross-queue
//! waits. `end()` replays the passes in submission order through command
//! lists, submits them, presents the swapchains and releases transients.
//!
//! Submission order is execution order. There is no reordering.
//!
//! # Example
//!
//! ```ignore
//! let mut scheduler = FrameScheduler::new(backend, SchedulerConfig::default())?;
//! let output = scheduler.import_swapchain("Output", swapchain);
//!
//! scheduler.begin()?;
//! let x = scheduler.create_image("X", ImageCreateInfo::render_target(format, usage));
//! let a = scheduler.create_pass("A", QueueType::Graphics);
//! scheduler.use_image(a, x, ImageUseInfo::color_output(black));
//! let b = scheduler.create_pass("B", QueueType::Graphics);
//! scheduler.use_image(b, x, ImageUseInfo::shader_read());
//! scheduler.use_image(b, output, ImageUseInfo::color_output(black));
//! scheduler.submit(a);
//! scheduler.submit(b);
//! scheduler.compile()?;
//! scheduler.end()?;
//! ```

use std::sync::Arc;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::backend::{
    BackendError, BufferHandle, BufferViewHandle, FenceHandle, GpuBackend, ImageHandle,
    ImageViewHandle, SubmitInfo,
};
use crate::command::{RenderingAttachment, RenderingInfo};
use crate::error::{RhiError, RhiResult};
use crate::profiling::{frame_mark, profile_function, profile_plot, profile_scope_dynamic};
use crate::swapchain::Swapchain;
use crate::types::{
    BufferDescriptor, BufferUsage, BufferViewInfo, Extent2d, ImageAspect, ImageCreateInfo,
    ImageDescriptor, ImageUsage, ImageViewInfo, QueueType,
};

use super::attachment::{
    Attachment, AttachmentKind, AttachmentRegistry, AttachmentSource, PhysicalResource,
};
use super::barrier::{Barrier, BarrierBatch, BarrierResource, PipelineStage, ResourceState};
use super::handle::{AttachmentHandle, PassAttachmentHandle, PassHandle};
use super::pass::{Pass, PassContext, PassResource, PassSize, PassState};
use super::pass_attachment::{
    AttachmentUsage, BufferUseInfo, ChainIter, ImageUseInfo, PassAttachment, PassAttachmentArena,
    ResolvedView, ViewInfo, last_writer_before,
};
use super::sync::{FrameFences, QueueTimeline, QueueWaits};
use super::transient_pool::{PoolKey, TransientPool, TransientPoolStats};
use super::view_cache::{ViewCache, ViewCacheStats};

/// Scheduler configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Frames in flight. Also the idle age after which pooled resources and
    /// cached views may be destroyed.
    pub frame_count: usize,
    /// Extent render-target relative sizes resolve against.
    pub frame_extent: Extent2d,
    /// View count above which idle views are evicted.
    pub view_cache_capacity: usize,
    /// Reuse released transient resources in later frames.
    pub transient_reuse: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_count: 3,
            frame_extent: Extent2d::new(1280, 720),
            view_cache_capacity: 1024,
            transient_reuse: true,
        }
    }
}

impl SchedulerConfig {
    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = frame_count;
        self
    }

    pub fn with_frame_extent(mut self, extent: Extent2d) -> Self {
        self.frame_extent = extent;
        self
    }

    pub fn with_view_cache_capacity(mut self, capacity: usize) -> Self {
        self.view_cache_capacity = capacity;
        self
    }

    pub fn with_transient_reuse(mut self, reuse: bool) -> Self {
        self.transient_reuse = reuse;
        self
    }
}

/// Where the scheduler is in the frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// Between frames.
    Idle,
    /// Passes and uses are being recorded.
    Recording,
    /// Ready for `end()`.
    Compiled,
    /// Compile or end failed; the next call must be `begin()`.
    Failed,
}

/// Counters of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub passes: usize,
    pub barriers: usize,
    pub queue_waits: usize,
    /// Transient allocations, including reused ones.
    pub allocations: usize,
    /// Transient allocations served by the pool.
    pub reused_allocations: usize,
    pub releases: usize,
    pub view_hits: u64,
    pub view_misses: u64,
}

/// Per-frame render graph and GPU submission scheduler.
pub struct FrameScheduler {
    backend: Arc<dyn GpuBackend>,
    config: SchedulerConfig,
    state: FrameState,
    registry: AttachmentRegistry,
    passes: SlotMap<PassHandle, Pass>,
    pass_order: Vec<PassHandle>,
    nodes: PassAttachmentArena,
    view_cache: ViewCache,
    pool: TransientPool,
    timelines: Vec<QueueTimeline>,
    fences: FrameFences,
    /// Views waiting for the slot's fence before destruction.
    retired_views: Vec<Vec<ResolvedView>>,
    frame_index: u64,
    stats: FrameStats,
    view_stats_at_begin: ViewCacheStats,
}

impl FrameScheduler {
    /// Create a scheduler on top of `backend`.
    pub fn new(backend: Arc<dyn GpuBackend>, config: SchedulerConfig) -> RhiResult<Self> {
        assert!(config.frame_count > 0, "frame_count must be at least 1");
        assert!(
            !config.frame_extent.is_empty(),
            "frame extent must not be zero"
        );

        let mut timelines = Vec::with_capacity(QueueType::ALL.len());
        for queue in QueueType::ALL {
            match QueueTimeline::new(backend.as_ref(), queue) {
                Ok(timeline) => timelines.push(timeline),
                Err(err) => {
                    for timeline in &timelines {
                        backend.destroy_semaphore(timeline.semaphore());
                    }
                    return Err(err.into());
                }
            }
        }
        let fences = match FrameFences::new(backend.as_ref(), config.frame_count) {
            Ok(fences) => fences,
            Err(err) => {
                for timeline in &timelines {
                    backend.destroy_semaphore(timeline.semaphore());
                }
                return Err(err.into());
            }
        };

        log::debug!(
            "Created frame scheduler on {} backend ({} frames in flight, {}x{})",
            backend.name(),
            config.frame_count,
            config.frame_extent.width,
            config.frame_extent.height
        );

        Ok(Self {
            backend,
            state: FrameState::Idle,
            registry: AttachmentRegistry::new(),
            passes: SlotMap::with_key(),
            pass_order: Vec::new(),
            nodes: PassAttachmentArena::with_key(),
            view_cache: ViewCache::new(config.view_cache_capacity),
            pool: TransientPool::new(config.frame_count, config.transient_reuse),
            timelines,
            fences,
            retired_views: vec![Vec::new(); config.frame_count],
            frame_index: 0,
            stats: FrameStats::default(),
            view_stats_at_begin: ViewCacheStats::default(),
            config,
        })
    }

    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Index of the frame being recorded, or of the next one when idle.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Frame slot of the current frame index.
    pub fn frame_slot(&self) -> usize {
        self.fences.slot(self.frame_index)
    }

    pub fn frame_extent(&self) -> Extent2d {
        self.config.frame_extent
    }

    pub fn registry(&self) -> &AttachmentRegistry {
        &self.registry
    }

    pub fn view_cache_stats(&self) -> ViewCacheStats {
        self.view_cache.stats()
    }

    /// Number of views currently cached.
    pub fn cached_view_count(&self) -> usize {
        self.view_cache.len()
    }

    pub fn transient_pool_stats(&self) -> TransientPoolStats {
        self.pool.stats()
    }

    pub fn transient_pool(&self) -> &TransientPool {
        &self.pool
    }

    pub fn view_cache(&self) -> &ViewCache {
        &self.view_cache
    }

    /// Counters of the frame in progress, or of the last finished one.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Timeline of a queue.
    pub fn timeline(&self, queue: QueueType) -> &QueueTimeline {
        &self.timelines[queue.index()]
    }

    // ─── Frame cycle ───────────────────────────────────────────────────

    /// Start recording a new frame.
    ///
    /// Waits for the GPU to finish the frame that last used this frame slot,
    /// then destroys what that frame retired and forgets the previous frame's
    /// passes, chains and transient attachments.
    pub fn begin(&mut self) -> RhiResult<()> {
        profile_function!();
        assert!(
            matches!(self.state, FrameState::Idle | FrameState::Failed),
            "begin() called while a frame is {:?}",
            self.state
        );

        let slot = self.fences.slot(self.frame_index);
        self.fences.wait_and_reset(self.backend.as_ref(), slot)?;

        let retired = std::mem::take(&mut self.retired_views[slot]);
        destroy_views(self.backend.as_ref(), retired);
        self.pool
            .recycle(self.backend.as_ref(), slot, self.config.frame_count as u32);
        let evicted = self
            .view_cache
            .evict(self.frame_index, self.config.frame_count as u64);
        destroy_views(self.backend.as_ref(), evicted);

        let removed = self.registry.remove_transients();
        self.registry.reset_chains();
        self.passes.clear();
        self.pass_order.clear();
        self.nodes.clear();

        self.stats = FrameStats {
            frame_index: self.frame_index,
            ..FrameStats::default()
        };
        self.view_stats_at_begin = self.view_cache.stats();
        self.state = FrameState::Recording;
        log::trace!(
            "Begin frame {} (slot {}, {} transient attachments dropped)",
            self.frame_index,
            slot,
            removed
        );
        Ok(())
    }

    /// Append a pass to the execution order.
    ///
    /// Every pass that used one of this pass's attachments earlier must
    /// already be submitted, so chain order always equals submission order.
    pub fn submit(&mut self, pass: PassHandle) {
        self.assert_recording("submit");
        let Some(entry) = self.passes.get(pass) else {
            panic!("submit() called with an unknown pass handle");
        };
        assert!(
            entry.state == PassState::Recording,
            "pass '{}' is submitted twice",
            entry.name()
        );
        for &node in entry.uses() {
            if let Some(prev) = self.nodes[node].prev {
                let earlier = &self.passes[self.nodes[prev].pass];
                assert!(
                    earlier.state == PassState::Submitted,
                    "pass '{}' submitted before pass '{}', which uses '{}' earlier",
                    entry.name(),
                    earlier.name(),
                    self.attachment_name(self.nodes[node].attachment)
                );
            }
        }

        self.passes[pass].state = PassState::Submitted;
        self.pass_order.push(pass);
    }

    /// Allocate transients, resolve views and compute synchronization.
    ///
    /// On error everything allocated so far is returned to the pool and the
    /// frame is marked failed.
    pub fn compile(&mut self) -> RhiResult<()> {
        profile_function!();
        self.assert_recording("compile");
        for (_, pass) in &self.passes {
            assert!(
                pass.state == PassState::Submitted,
                "pass '{}' was created but never submitted",
                pass.name()
            );
        }

        match self.compile_frame() {
            Ok(()) => {
                for &pass in &self.pass_order {
                    self.passes[pass].state = PassState::Compiled;
                }
                self.stats.passes = self.pass_order.len();
                self.state = FrameState::Compiled;
                log::debug!(
                    "Compiled frame {}: {} passes, {} barriers, {} allocations ({} reused), {} queue waits",
                    self.frame_index,
                    self.stats.passes,
                    self.stats.barriers,
                    self.stats.allocations,
                    self.stats.reused_allocations,
                    self.stats.queue_waits
                );
                Ok(())
            }
            Err(err) => {
                log::error!("Failed to compile frame {}: {}", self.frame_index, err);
                self.return_bound_transients();
                self.state = FrameState::Failed;
                Err(err)
            }
        }
    }

    /// Record and submit every pass, present swapchains and release transients.
    pub fn end(&mut self) -> RhiResult<()> {
        profile_function!();
        assert!(
            self.state == FrameState::Compiled,
            "end() called on a frame that is {:?}, expected Compiled",
            self.state
        );

        let slot = self.fences.slot(self.frame_index);
        let result = self
            .execute_frame(slot)
            .and_then(|()| self.present_and_persist());
        let frame_index = self.frame_index;
        self.frame_index += 1;

        match result {
            Ok(()) => {
                let view_stats = self.view_cache.stats();
                self.stats.view_hits = view_stats.hits - self.view_stats_at_begin.hits;
                self.stats.view_misses = view_stats.misses - self.view_stats_at_begin.misses;
                log::debug!(
                    "Frame {} done: {} passes, {} barriers, {} allocations, {} releases, views {} hits / {} misses",
                    frame_index,
                    self.stats.passes,
                    self.stats.barriers,
                    self.stats.allocations,
                    self.stats.releases,
                    self.stats.view_hits,
                    self.stats.view_misses
                );
                profile_plot!("rhi: passes", self.stats.passes);
                profile_plot!("rhi: barriers", self.stats.barriers);
                profile_plot!("rhi: transient allocations", self.stats.allocations);
                self.state = FrameState::Idle;
                frame_mark!();
                Ok(())
            }
            Err(err) => {
                log::error!("Frame {} failed during end(): {}", frame_index, err);
                if let Err(wait_err) = self.backend.wait_idle() {
                    log::error!("wait_idle after failed frame: {}", wait_err);
                }
                self.return_bound_transients();
                self.state = FrameState::Failed;
                Err(err)
            }
        }
    }

    /// Change the extent render-target relative sizes resolve against.
    pub fn resize(&mut self, extent: Extent2d) {
        assert!(
            matches!(self.state, FrameState::Idle | FrameState::Failed),
            "resize() called while a frame is {:?}",
            self.state
        );
        assert!(!extent.is_empty(), "cannot resize to a zero frame extent");
        if extent == self.config.frame_extent {
            return;
        }
        log::debug!(
            "Frame extent {}x{} -> {}x{}",
            self.config.frame_extent.width,
            self.config.frame_extent.height,
            extent.width,
            extent.height
        );
        self.config.frame_extent = extent;
        self.pool.trim(self.backend.as_ref());
    }

    /// Wait for every frame in flight and destroy everything they retired.
    pub fn wait_idle(&mut self) -> RhiResult<()> {
        assert!(
            matches!(self.state, FrameState::Idle | FrameState::Failed),
            "wait_idle() called while a frame is {:?}",
            self.state
        );
        self.backend.wait_idle()?;
        for slot in 0..self.fences.len() {
            self.fences.wait_and_reset(self.backend.as_ref(), slot)?;
            let retired = std::mem::take(&mut self.retired_views[slot]);
            destroy_views(self.backend.as_ref(), retired);
            self.pool
                .recycle(self.backend.as_ref(), slot, self.config.frame_count as u32);
        }
        Ok(())
    }

    // ─── Attachments ───────────────────────────────────────────────────

    /// Register a caller-owned image. It stays registered until removed.
    pub fn import_image(
        &mut self,
        name: &str,
        image: ImageHandle,
        descriptor: ImageDescriptor,
    ) -> AttachmentHandle {
        self.assert_not_compiled("import_image");
        self.registry.import_image(name, image, descriptor)
    }

    /// Register a caller-owned buffer. It stays registered until removed.
    pub fn import_buffer(
        &mut self,
        name: &str,
        buffer: BufferHandle,
        descriptor: BufferDescriptor,
    ) -> AttachmentHandle {
        self.assert_not_compiled("import_buffer");
        self.registry.import_buffer(name, buffer, descriptor)
    }

    /// Register a swapchain. Its current image is looked up on every access.
    pub fn import_swapchain(
        &mut self,
        name: &str,
        swapchain: Arc<dyn Swapchain>,
    ) -> AttachmentHandle {
        self.assert_not_compiled("import_swapchain");
        self.registry.import_swapchain(name, swapchain)
    }

    /// Register a transient image for the current frame.
    pub fn create_image(&mut self, name: &str, info: ImageCreateInfo) -> AttachmentHandle {
        self.assert_recording("create_image");
        self.registry.create_image(name, info)
    }

    /// Register a transient buffer for the current frame.
    pub fn create_buffer(&mut self, name: &str, descriptor: BufferDescriptor) -> AttachmentHandle {
        self.assert_recording("create_buffer");
        self.registry.create_buffer(name, descriptor)
    }

    /// Remove a persistent attachment and retire its cached views.
    ///
    /// Returns false if the handle is stale.
    pub fn remove_attachment(&mut self, attachment: AttachmentHandle) -> bool {
        self.assert_not_compiled("remove_attachment");
        let Some(entry) = self.registry.get(attachment) else {
            return false;
        };
        assert!(
            !entry.is_transient(),
            "transient attachment '{}' cannot be removed explicitly",
            entry.name()
        );
        assert!(
            self.state != FrameState::Recording || !entry.is_used(),
            "attachment '{}' is used by the frame being recorded",
            entry.name()
        );

        let Some(removed) = self.registry.remove(attachment) else {
            return false;
        };
        if let Some(resource) = removed.resource() {
            let views = self.view_cache.invalidate(resource);
            self.retire_views(views);
        }
        log::trace!("Removed attachment '{}'", removed.name());
        true
    }

    pub fn attachment(&self, attachment: AttachmentHandle) -> Option<&Attachment> {
        self.registry.get(attachment)
    }

    /// Look up an attachment by name.
    pub fn find(&self, name: &str) -> Option<AttachmentHandle> {
        self.registry.find(name)
    }

    /// Image bound to an attachment right now.
    ///
    /// Swapchains return their current image on every call.
    pub fn image(&self, attachment: AttachmentHandle) -> RhiResult<ImageHandle> {
        match self.resolve(attachment)? {
            PhysicalResource::Image(image) => Ok(image),
            PhysicalResource::Buffer(_) => panic!(
                "attachment '{}' is a buffer, not an image",
                self.attachment_name(attachment)
            ),
        }
    }

    /// Buffer bound to an attachment right now.
    pub fn buffer(&self, attachment: AttachmentHandle) -> RhiResult<BufferHandle> {
        match self.resolve(attachment)? {
            PhysicalResource::Buffer(buffer) => Ok(buffer),
            PhysicalResource::Image(_) => panic!(
                "attachment '{}' is an image, not a buffer",
                self.attachment_name(attachment)
            ),
        }
    }

    /// Cached view of the image bound to an attachment.
    pub fn get_image_view(
        &mut self,
        attachment: AttachmentHandle,
        info: &ImageViewInfo,
    ) -> RhiResult<ImageViewHandle> {
        let image = self.image(attachment)?;
        let view = self.view_cache.get_or_create_image_view(
            self.backend.as_ref(),
            image,
            info,
            self.frame_index,
        )?;
        view.image().ok_or(RhiError::StaleHandle)
    }

    /// Cached view of the buffer bound to an attachment.
    pub fn get_buffer_view(
        &mut self,
        attachment: AttachmentHandle,
        info: &BufferViewInfo,
    ) -> RhiResult<BufferViewHandle> {
        let buffer = self.buffer(attachment)?;
        let view = self.view_cache.get_or_create_buffer_view(
            self.backend.as_ref(),
            buffer,
            info,
            self.frame_index,
        )?;
        view.buffer().ok_or(RhiError::StaleHandle)
    }

    /// Uses of an attachment this frame, in submission order.
    pub fn chain(&self, attachment: AttachmentHandle) -> ChainIter<'_> {
        let head = self.registry.get(attachment).and_then(Attachment::first_use);
        ChainIter::new(&self.nodes, head)
    }

    pub fn pass_attachment(&self, node: PassAttachmentHandle) -> Option<&PassAttachment> {
        self.nodes.get(node)
    }

    // ─── Passes ────────────────────────────────────────────────────────

    /// Create a pass for the current frame.
    pub fn create_pass(&mut self, name: &str, queue: QueueType) -> PassHandle {
        self.assert_recording("create_pass");
        assert!(!name.is_empty(), "pass name must not be empty");
        self.passes.insert(Pass::new(name.to_string(), queue))
    }

    /// Set the render area of a pass. Defaults to the full frame extent.
    pub fn set_pass_size(&mut self, pass: PassHandle, size: PassSize) {
        self.assert_recording("set_pass_size");
        self.recording_pass_mut(pass, "set_pass_size").set_size(size);
    }

    /// Set the callback recording the pass's commands.
    pub fn set_execute<F>(&mut self, pass: PassHandle, execute: F)
    where
        F: FnOnce(&mut PassContext<'_>) + Send + 'static,
    {
        let Some(entry) = self.passes.get_mut(pass) else {
            panic!("set_execute() called with an unknown pass handle");
        };
        assert!(
            entry.state != PassState::Executed,
            "pass '{}' has already executed",
            entry.name()
        );
        entry.execute = Some(Box::new(execute));
    }

    pub fn pass(&self, pass: PassHandle) -> Option<&Pass> {
        self.passes.get(pass)
    }

    /// Submitted passes in execution order.
    pub fn pass_order(&self) -> &[PassHandle] {
        &self.pass_order
    }

    /// Declare that `pass` uses an image attachment.
    pub fn use_image(
        &mut self,
        pass: PassHandle,
        attachment: AttachmentHandle,
        info: ImageUseInfo,
    ) -> PassAttachmentHandle {
        self.assert_recording("use_image");
        self.check_use(pass, attachment, AttachmentKind::Image, info.usage);
        assert!(
            info.usage.allows(info.access),
            "{:?} usage does not allow {:?} access",
            info.usage,
            info.access
        );
        if let Some(flags) = self.attachment_image_usage(attachment) {
            let required = required_image_usage(info.usage);
            assert!(
                flags.contains(required),
                "attachment '{}' lacks the {:?} usage flag needed for {:?}",
                self.attachment_name(attachment),
                required,
                info.usage
            );
        }
        self.link(PassAttachment::from_image_use(pass, attachment, &info))
    }

    /// Declare that `pass` uses a buffer attachment.
    pub fn use_buffer(
        &mut self,
        pass: PassHandle,
        attachment: AttachmentHandle,
        info: BufferUseInfo,
    ) -> PassAttachmentHandle {
        self.assert_recording("use_buffer");
        self.check_use(pass, attachment, AttachmentKind::Buffer, info.usage);
        assert!(
            info.usage.allows(info.access),
            "{:?} usage does not allow {:?} access",
            info.usage,
            info.access
        );
        if let Some(flags) = self.attachment_buffer_usage(attachment) {
            let required = required_buffer_usage(info.usage);
            assert!(
                flags.intersects(required),
                "attachment '{}' lacks a {:?} usage flag needed for {:?}",
                self.attachment_name(attachment),
                required,
                info.usage
            );
        }
        self.link(PassAttachment::from_buffer_use(pass, attachment, &info))
    }

    fn check_use(
        &self,
        pass: PassHandle,
        attachment: AttachmentHandle,
        kind: AttachmentKind,
        usage: AttachmentUsage,
    ) {
        let Some(entry) = self.passes.get(pass) else {
            panic!("unknown pass handle");
        };
        assert!(
            entry.state == PassState::Recording,
            "pass '{}' is no longer recording",
            entry.name()
        );
        let Some(target) = self.registry.get(attachment) else {
            panic!("unknown attachment handle");
        };
        assert!(
            target.kind() == kind,
            "attachment '{}' is not {}",
            target.name(),
            match kind {
                AttachmentKind::Image => "an image",
                AttachmentKind::Buffer => "a buffer",
            }
        );
        let valid = match kind {
            AttachmentKind::Image => usage.is_image_usage(),
            AttachmentKind::Buffer => usage.is_buffer_usage(),
        };
        assert!(
            valid,
            "{:?} usage is not valid for attachment '{}'",
            usage,
            target.name()
        );
        assert!(
            !entry
                .uses()
                .iter()
                .any(|&node| self.nodes[node].attachment == attachment),
            "pass '{}' already uses attachment '{}'",
            entry.name(),
            target.name()
        );
    }

    /// Append a node to the tail of its attachment's chain.
    fn link(&mut self, node: PassAttachment) -> PassAttachmentHandle {
        let pass = node.pass;
        let attachment = node.attachment;
        let usage = node.usage;
        let handle = self.nodes.insert(node);

        if let Some(entry) = self.registry.get_mut(attachment) {
            match entry.last_use {
                Some(last) => {
                    self.nodes[handle].prev = Some(last);
                    self.nodes[last].next = Some(handle);
                }
                None => entry.first_use = Some(handle),
            }
            entry.last_use = Some(handle);
        }
        self.passes[pass].record_use(handle, usage);
        handle
    }

    // ─── Compile ───────────────────────────────────────────────────────

    fn compile_frame(&mut self) -> RhiResult<()> {
        let frame_extent = self.config.frame_extent;
        for &pass in &self.pass_order {
            let entry = &mut self.passes[pass];
            entry.extent = entry.size().resolve(frame_extent);
        }

        for (_, attachment) in self.registry.iter_mut() {
            if attachment.is_transient() && !attachment.is_used() {
                log::trace!(
                    "Transient attachment '{}' is never used, skipping allocation",
                    attachment.name()
                );
                attachment.released = true;
            }
        }

        self.allocate_transients()?;
        self.resolve_views()?;
        self.compute_barriers()?;
        self.assign_queue_sync();
        Ok(())
    }

    /// Allocate every transient at the first node of its chain.
    fn allocate_transients(&mut self) -> RhiResult<()> {
        let order = self.pass_order.clone();
        for pass in order {
            let extent = self.passes[pass].extent;
            let uses = self.passes[pass].uses.clone();
            for node in uses {
                if self.nodes[node].prev.is_some() {
                    continue;
                }
                let Some(attachment) = self.registry.get_mut(self.nodes[node].attachment) else {
                    continue;
                };
                let (key, resolved) = match attachment.source() {
                    AttachmentSource::TransientImage(info) => {
                        let descriptor = info.resolve(extent);
                        (PoolKey::Image(descriptor), Some(descriptor))
                    }
                    AttachmentSource::TransientBuffer(descriptor) => {
                        (PoolKey::Buffer(*descriptor), None)
                    }
                    _ => continue,
                };

                match self
                    .pool
                    .acquire(self.backend.as_ref(), attachment.name(), key)
                {
                    Ok((resource, reused)) => {
                        log::trace!(
                            "Allocated '{}' at pass '{}'{}",
                            attachment.name(),
                            self.passes[pass].name(),
                            if reused { " (reused)" } else { "" }
                        );
                        attachment.transient = Some(resource);
                        attachment.resolved_image = resolved;
                        attachment.allocated_at = Some(pass);
                        self.stats.allocations += 1;
                        if reused {
                            self.stats.reused_allocations += 1;
                        }
                    }
                    Err(BackendError::OutOfMemory) => {
                        return Err(RhiError::OutOfMemory {
                            attachment: attachment.name().to_string(),
                        });
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(())
    }

    /// Resolve the view of every node through the view cache.
    fn resolve_views(&mut self) -> RhiResult<()> {
        let order = self.pass_order.clone();
        for pass in order {
            let uses = self.passes[pass].uses.clone();
            for node in uses {
                let view_info = self.nodes[node].view_info;
                let resource = self.resolve(self.nodes[node].attachment)?;
                let view = match (view_info, resource) {
                    (ViewInfo::Image(info), PhysicalResource::Image(image)) => {
                        self.view_cache.get_or_create_image_view(
                            self.backend.as_ref(),
                            image,
                            &info,
                            self.frame_index,
                        )?
                    }
                    (ViewInfo::Buffer(info), PhysicalResource::Buffer(buffer)) => {
                        self.view_cache.get_or_create_buffer_view(
                            self.backend.as_ref(),
                            buffer,
                            &info,
                            self.frame_index,
                        )?
                    }
                    _ => panic!(
                        "view of attachment '{}' does not match its resource kind",
                        self.attachment_name(self.nodes[node].attachment)
                    ),
                };
                self.nodes[node].view = Some(view);
            }
        }
        Ok(())
    }

    /// Barrier before every node from its predecessor's state, plus the final
    /// present transition of each swapchain.
    fn compute_barriers(&mut self) -> RhiResult<()> {
        let order = self.pass_order.clone();
        for pass in order {
            let queue = self.passes[pass].queue();
            let mut batch = BarrierBatch::new();
            for &handle in &self.passes[pass].uses {
                let node = &self.nodes[handle];
                let Some(attachment) = self.registry.get(node.attachment) else {
                    return Err(RhiError::StaleHandle);
                };
                let dst_use = node.attachment_use();
                let (src, src_use, src_queue) = match node.prev {
                    Some(prev) => {
                        let prev = &self.nodes[prev];
                        let prev_queue = self.passes[prev.pass].queue();
                        (
                            ResourceState::for_use(prev.attachment_use(), prev_queue),
                            Some(prev.attachment_use()),
                            prev_queue,
                        )
                    }
                    None if attachment.is_transient() => (ResourceState::UNDEFINED, None, queue),
                    None => (attachment.state, None, queue),
                };
                batch.push(Barrier {
                    attachment: node.attachment,
                    resource: barrier_resource(attachment, node)?,
                    src,
                    dst: ResourceState::for_use(dst_use, queue),
                    src_use,
                    dst_use: Some(dst_use),
                    src_queue,
                    dst_queue: queue,
                });
            }
            self.stats.barriers += batch.len();
            self.passes[pass].barriers = batch;
        }

        let swapchain_tails: Vec<PassAttachmentHandle> = self
            .registry
            .iter()
            .filter(|(_, attachment)| attachment.swapchain().is_some())
            .filter_map(|(_, attachment)| attachment.last_use())
            .collect();
        for tail in swapchain_tails {
            let node = &self.nodes[tail];
            let Some(attachment) = self.registry.get(node.attachment) else {
                continue;
            };
            let queue = self.passes[node.pass].queue();
            let barrier = Barrier {
                attachment: node.attachment,
                resource: barrier_resource(attachment, node)?,
                src: ResourceState::for_use(node.attachment_use(), queue),
                dst: ResourceState::PRESENT,
                src_use: Some(node.attachment_use()),
                dst_use: None,
                src_queue: queue,
                dst_queue: queue,
            };
            let pass = node.pass;
            if self.passes[pass].post_barriers.push(barrier) {
                self.stats.barriers += 1;
            }
        }
        Ok(())
    }

    /// Assign timeline values and the cross-queue waits they imply.
    fn assign_queue_sync(&mut self) {
        for &pass in &self.pass_order {
            let queue = self.passes[pass].queue();
            self.passes[pass].signal_value = self.timelines[queue.index()].advance();
        }

        // Last value each queue signals this frame.
        let mut queue_tails = [None; QueueType::ALL.len()];
        for &pass in &self.pass_order {
            let entry = &self.passes[pass];
            queue_tails[entry.queue().index()] = Some(entry.signal_value);
        }

        let order = self.pass_order.clone();
        let last = order.last().copied();
        for pass in order {
            let queue = self.passes[pass].queue();
            let mut waits = QueueWaits::default();
            for &handle in &self.passes[pass].uses {
                let node = &self.nodes[handle];
                let stage = ResourceState::for_use(node.attachment_use(), queue).stage;
                let mut depend_on = |other: PassAttachmentHandle| {
                    let producer = &self.passes[self.nodes[other].pass];
                    if producer.queue() != queue {
                        waits.add(producer.queue(), producer.signal_value, stage);
                    }
                };
                // Read after write.
                if node.access.reads() {
                    if let Some(writer) = last_writer_before(&self.nodes, handle) {
                        depend_on(writer);
                    }
                }
                // Write after read or write.
                if node.access.writes() {
                    if let Some(prev) = node.prev {
                        depend_on(prev);
                    }
                }
            }
            // The fenced submission completes after every queue's work of the frame.
            if Some(pass) == last {
                for other in QueueType::ALL {
                    if other == queue {
                        continue;
                    }
                    if let Some(value) = queue_tails[other.index()] {
                        if !waits.covers(other, value) {
                            waits.add(other, value, PipelineStage::ALL_COMMANDS);
                        }
                    }
                }
            }
            let resolved = waits.resolve(&self.timelines);
            self.stats.queue_waits += resolved.len();
            self.passes[pass].waits = resolved.into_iter().collect();
        }
    }

    // ─── End ───────────────────────────────────────────────────────────

    fn execute_frame(&mut self, slot: usize) -> RhiResult<()> {
        let fence = self.fences.fence(slot);
        if self.pass_order.is_empty() {
            let mut command_list = self.backend.create_command_list(QueueType::Graphics)?;
            command_list.begin();
            command_list.end();
            self.backend.submit(
                QueueType::Graphics,
                command_list,
                &SubmitInfo {
                    fence: Some(fence),
                    ..Default::default()
                },
            )?;
            self.fences.mark_submitted(slot);
            return Ok(());
        }

        let order = self.pass_order.clone();
        let last = order.len() - 1;
        for (index, pass) in order.into_iter().enumerate() {
            let is_last = index == last;
            self.execute_pass(pass, is_last.then_some(fence))?;
            if is_last {
                self.fences.mark_submitted(slot);
            }

            let releases: SmallVec<[AttachmentHandle; 4]> = self.passes[pass]
                .uses
                .iter()
                .map(|&node| &self.nodes[node])
                .filter(|node| node.is_last_use())
                .map(|node| node.attachment)
                .filter(|&attachment| {
                    self.registry
                        .get(attachment)
                        .is_some_and(Attachment::is_transient)
                })
                .collect();
            for attachment in releases {
                self.release_transient(attachment, pass, slot);
            }
        }
        Ok(())
    }

    fn execute_pass(&mut self, pass: PassHandle, fence: Option<FenceHandle>) -> RhiResult<()> {
        let entry = &mut self.passes[pass];
        profile_scope_dynamic!(entry.name());
        let queue = entry.queue();

        let mut resources: SmallVec<[PassResource; 8]> = SmallVec::with_capacity(entry.uses.len());
        for &handle in &entry.uses {
            let node = &self.nodes[handle];
            let attachment = self
                .registry
                .get(node.attachment)
                .ok_or(RhiError::StaleHandle)?;
            let resource = attachment
                .resource()
                .ok_or_else(|| RhiError::AttachmentNotResolved {
                    name: attachment.name().to_string(),
                })?;
            resources.push(PassResource {
                attachment: node.attachment,
                resource,
                view: node.view,
            });
        }

        let mut command_list = self.backend.create_command_list(queue)?;
        command_list.begin();
        if !entry.barriers.is_empty() {
            command_list.pipeline_barrier(&entry.barriers);
        }
        let rendering = queue == QueueType::Graphics && entry.has_render_targets();
        if rendering {
            command_list.begin_rendering(&rendering_info(entry, &self.nodes));
        }
        if let Some(execute) = entry.execute.take() {
            let mut context = PassContext::new(
                entry.name(),
                queue,
                entry.extent,
                &resources[..],
                &mut *command_list,
            );
            execute(&mut context);
        }
        if rendering {
            command_list.end_rendering();
        }
        if !entry.post_barriers.is_empty() {
            command_list.pipeline_barrier(&entry.post_barriers);
        }
        command_list.end();

        let signal = self.timelines[queue.index()].signal(entry.signal_value);
        self.backend.submit(
            queue,
            command_list,
            &SubmitInfo {
                waits: &entry.waits[..],
                signal: Some(signal),
                fence,
            },
        )?;
        entry.state = PassState::Executed;
        log::trace!(
            "Executed pass '{}' on {} queue (signal {})",
            entry.name(),
            queue.name(),
            entry.signal_value
        );
        Ok(())
    }

    /// Hand a transient back to the pool at the last node of its chain.
    fn release_transient(&mut self, attachment: AttachmentHandle, pass: PassHandle, slot: usize) {
        let Some(entry) = self.registry.get_mut(attachment) else {
            return;
        };
        let Some(resource) = entry.transient.take() else {
            return;
        };
        if let Some(key) = pool_key(entry) {
            self.pool.release(slot, key, resource);
        }
        let views = self.view_cache.invalidate(resource);
        self.retired_views[slot].extend(views);
        entry.released = true;
        entry.released_at = Some(pass);
        self.stats.releases += 1;
        log::trace!("Released '{}'", entry.name());
    }

    fn present_and_persist(&mut self) -> RhiResult<()> {
        let swapchains: Vec<Arc<dyn Swapchain>> = self
            .registry
            .iter()
            .filter(|(_, attachment)| attachment.is_used())
            .filter_map(|(_, attachment)| attachment.swapchain().cloned())
            .collect();
        for swapchain in swapchains {
            swapchain.present()?;
        }

        for (_, attachment) in self.registry.iter_mut() {
            if attachment.is_transient() || attachment.swapchain().is_some() {
                continue;
            }
            if let Some(last) = attachment.last_use {
                let node = &self.nodes[last];
                attachment.state =
                    ResourceState::for_use(node.attachment_use(), self.passes[node.pass].queue());
            }
        }
        Ok(())
    }

    /// Return every still-bound transient to the pool, destroying its views.
    ///
    /// Only valid when the GPU no longer uses them.
    fn return_bound_transients(&mut self) {
        let mut views = Vec::new();
        for (_, attachment) in self.registry.iter_mut() {
            let Some(resource) = attachment.transient.take() else {
                continue;
            };
            if let Some(key) = pool_key(attachment) {
                self.pool.release_unused(key, resource);
            }
            views.extend(self.view_cache.invalidate(resource));
            attachment.released = true;
        }
        destroy_views(self.backend.as_ref(), views);
    }

    // ─── Helpers ───────────────────────────────────────────────────────

    fn resolve(&self, attachment: AttachmentHandle) -> RhiResult<PhysicalResource> {
        let entry = self.registry.get(attachment).ok_or(RhiError::StaleHandle)?;
        entry
            .resource()
            .ok_or_else(|| RhiError::AttachmentNotResolved {
                name: entry.name().to_string(),
            })
    }

    /// Queue views for destruction once the last submitted frame retires.
    fn retire_views(&mut self, views: Vec<ResolvedView>) {
        if self.frame_index == 0 {
            destroy_views(self.backend.as_ref(), views);
        } else {
            let slot = self.fences.slot(self.frame_index - 1);
            self.retired_views[slot].extend(views);
        }
    }

    fn attachment_name(&self, attachment: AttachmentHandle) -> &str {
        self.registry
            .get(attachment)
            .map(Attachment::name)
            .unwrap_or("<removed>")
    }

    fn attachment_image_usage(&self, attachment: AttachmentHandle) -> Option<ImageUsage> {
        match self.registry.get(attachment)?.source() {
            AttachmentSource::TransientImage(info) => Some(info.usage),
            AttachmentSource::ImportedImage { descriptor, .. } => Some(descriptor.usage),
            _ => None,
        }
    }

    fn attachment_buffer_usage(&self, attachment: AttachmentHandle) -> Option<BufferUsage> {
        match self.registry.get(attachment)?.source() {
            AttachmentSource::TransientBuffer(descriptor)
            | AttachmentSource::ImportedBuffer { descriptor, .. } => Some(descriptor.usage),
            _ => None,
        }
    }

    fn recording_pass_mut(&mut self, pass: PassHandle, call: &str) -> &mut Pass {
        let Some(entry) = self.passes.get_mut(pass) else {
            panic!("{call}() called with an unknown pass handle");
        };
        assert!(
            entry.state == PassState::Recording,
            "pass '{}' is no longer recording",
            entry.name()
        );
        entry
    }

    fn assert_recording(&self, call: &str) {
        assert!(
            self.state == FrameState::Recording,
            "{call}() called while the frame is {:?}, expected Recording",
            self.state
        );
    }

    fn assert_not_compiled(&self, call: &str) {
        assert!(
            self.state != FrameState::Compiled,
            "{call}() called on a compiled frame"
        );
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        if let Err(err) = self.backend.wait_idle() {
            log::error!("wait_idle during scheduler teardown failed: {}", err);
        }
        self.return_bound_transients();

        let backend = self.backend.as_ref();
        let mut views = self.view_cache.drain();
        for retired in &mut self.retired_views {
            views.append(retired);
        }
        destroy_views(backend, views);
        self.pool.destroy_all(backend);
        self.fences.destroy(backend);
        for timeline in &self.timelines {
            backend.destroy_semaphore(timeline.semaphore());
        }
        log::debug!("Frame scheduler destroyed after {} frames", self.frame_index);
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .field("frame_index", &self.frame_index)
            .field("attachments", &self.registry.len())
            .field("passes", &self.pass_order.len())
            .finish()
    }
}

fn destroy_views(backend: &dyn GpuBackend, views: Vec<ResolvedView>) {
    for view in views {
        match view {
            ResolvedView::Image(view) => backend.destroy_image_view(view),
            ResolvedView::Buffer(view) => backend.destroy_buffer_view(view),
        }
    }
}

fn pool_key(attachment: &Attachment) -> Option<PoolKey> {
    match attachment.source() {
        AttachmentSource::TransientImage(_) => attachment.resolved_image.map(PoolKey::Image),
        AttachmentSource::TransientBuffer(descriptor) => Some(PoolKey::Buffer(*descriptor)),
        _ => None,
    }
}

fn barrier_resource(attachment: &Attachment, node: &PassAttachment) -> RhiResult<BarrierResource> {
    match attachment.resource() {
        Some(PhysicalResource::Image(image)) => Ok(BarrierResource::Image {
            image,
            aspect: match node.view_info {
                ViewInfo::Image(info) => info.subresource.aspect,
                ViewInfo::Buffer(_) => ImageAspect::COLOR,
            },
        }),
        Some(PhysicalResource::Buffer(buffer)) => Ok(BarrierResource::Buffer(buffer)),
        None => Err(RhiError::AttachmentNotResolved {
            name: attachment.name().to_string(),
        }),
    }
}

fn required_image_usage(usage: AttachmentUsage) -> ImageUsage {
    match usage {
        AttachmentUsage::Color | AttachmentUsage::Resolve => ImageUsage::COLOR_ATTACHMENT,
        AttachmentUsage::DepthStencil => ImageUsage::DEPTH_STENCIL_ATTACHMENT,
        AttachmentUsage::ShaderResource => ImageUsage::SAMPLED,
        AttachmentUsage::ShaderStorage => ImageUsage::STORAGE,
        AttachmentUsage::CopySource => ImageUsage::COPY_SRC,
        AttachmentUsage::CopyDestination => ImageUsage::COPY_DST,
        AttachmentUsage::VertexInput => ImageUsage::empty(),
    }
}

/// Buffer usage flags of which at least one is required.
fn required_buffer_usage(usage: AttachmentUsage) -> BufferUsage {
    match usage {
        AttachmentUsage::ShaderResource => BufferUsage::UNIFORM | BufferUsage::STORAGE,
        AttachmentUsage::ShaderStorage => BufferUsage::STORAGE,
        AttachmentUsage::CopySource => BufferUsage::COPY_SRC,
        AttachmentUsage::CopyDestination => BufferUsage::COPY_DST,
        AttachmentUsage::VertexInput => BufferUsage::VERTEX | BufferUsage::INDEX,
        AttachmentUsage::Color | AttachmentUsage::DepthStencil | AttachmentUsage::Resolve => {
            BufferUsage::all()
        }
    }
}

fn rendering_info(pass: &Pass, nodes: &PassAttachmentArena) -> RenderingInfo {
    let target = |handle: PassAttachmentHandle| {
        let node = &nodes[handle];
        Some(RenderingAttachment {
            view: node.view?.image()?,
            layout: ResourceState::for_use(node.attachment_use(), pass.queue()).layout,
            load_op: node.load_op,
            store_op: node.store_op,
        })
    };
    RenderingInfo {
        extent: pass.extent(),
        color_attachments: pass.color.iter().filter_map(|&h| target(h)).collect(),
        resolve_attachments: pass.resolve.iter().filter_map(|&h| target(h)).collect(),
        depth_stencil_attachment: pass.depth_stencil.and_then(target),
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::graph::ImageLayout;
    use crate::types::{ClearValue, Format};

    const BLACK: ClearValue = ClearValue::color(0.0, 0.0, 0.0, 1.0);

    fn scheduler() -> (Arc<DummyBackend>, FrameScheduler) {
        let backend = Arc::new(DummyBackend::new());
        let scheduler = FrameScheduler::new(
            backend.clone(),
            SchedulerConfig::default().with_frame_extent(Extent2d::new(1600, 1200)),
        )
        .unwrap();
        (backend, scheduler)
    }

    fn target() -> ImageCreateInfo {
        ImageCreateInfo::render_target(
            Format::Rgba8Unorm,
            ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
        )
    }

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.frame_count, 3);
        assert_eq!(config.frame_extent, Extent2d::new(1280, 720));
        assert_eq!(config.view_cache_capacity, 1024);
        assert!(config.transient_reuse);
    }

    #[test]
    fn test_empty_frame() {
        let (backend, mut scheduler) = scheduler();
        scheduler.begin().unwrap();
        scheduler.compile().unwrap();
        scheduler.end().unwrap();
        assert_eq!(scheduler.state(), FrameState::Idle);
        assert_eq!(scheduler.frame_index(), 1);
        assert_eq!(backend.stats().submissions, 1);
        assert!(scheduler.fences.is_submitted(0));
    }

    #[test]
    fn test_write_then_read_barrier() {
        let (_backend, mut scheduler) = scheduler();
        scheduler.begin().unwrap();
        let x = scheduler.create_image("X", target());
        let a = scheduler.create_pass("A", QueueType::Graphics);
        let b = scheduler.create_pass("B", QueueType::Graphics);
        scheduler.use_image(a, x, ImageUseInfo::color_output(BLACK));
        scheduler.use_image(b, x, ImageUseInfo::shader_read());
        scheduler.submit(a);
        scheduler.submit(b);
        scheduler.compile().unwrap();

        let first = scheduler.pass(a).unwrap().barriers().find(x).copied().unwrap();
        assert_eq!(first.src.layout, ImageLayout::Undefined);
        assert_eq!(first.dst.layout, ImageLayout::ColorAttachment);

        let second = scheduler.pass(b).unwrap().barriers().find(x).copied().unwrap();
        assert_eq!(second.src.layout, ImageLayout::ColorAttachment);
        assert_eq!(second.dst.layout, ImageLayout::ShaderReadOnly);
        assert_eq!(
            scheduler.attachment(x).unwrap().image_extent(),
            Some(Extent2d::new(1600, 1200).into())
        );
    }

    #[test]
    fn test_unused_transient_never_allocated() {
        let (backend, mut scheduler) = scheduler();
        scheduler.begin().unwrap();
        let unused = scheduler.create_image("Unused", target());
        scheduler.compile().unwrap();
        assert!(scheduler.attachment(unused).unwrap().is_released());
        assert!(scheduler.attachment(unused).unwrap().allocated_at().is_none());
        assert_eq!(backend.live_images(), 0);
        scheduler.end().unwrap();
    }

    #[test]
    #[should_panic(expected = "submitted twice")]
    fn test_double_submit_panics() {
        let (_backend, mut scheduler) = scheduler();
        scheduler.begin().unwrap();
        let pass = scheduler.create_pass("A", QueueType::Graphics);
        scheduler.submit(pass);
        scheduler.submit(pass);
    }

    #[test]
    #[should_panic(expected = "created but never submitted")]
    fn test_unsubmitted_pass_panics() {
        let (_backend, mut scheduler) = scheduler();
        scheduler.begin().unwrap();
        scheduler.create_pass("A", QueueType::Graphics);
        let _ = scheduler.compile();
    }

    #[test]
    #[should_panic(expected = "expected Recording")]
    fn test_create_pass_outside_frame_panics() {
        let (_backend, mut scheduler) = scheduler();
        scheduler.create_pass("A", QueueType::Graphics);
    }

    #[test]
    #[should_panic(expected = "lacks the")]
    fn test_missing_usage_flag_panics() {
        let (_backend, mut scheduler) = scheduler();
        scheduler.begin().unwrap();
        let x = scheduler.create_image(
            "X",
            ImageCreateInfo::render_target(Format::Rgba8Unorm, ImageUsage::COLOR_ATTACHMENT),
        );
        let pass = scheduler.create_pass("A", QueueType::Graphics);
        scheduler.use_image(pass, x, ImageUseInfo::shader_read());
    }

    #[test]
    fn test_rendering_info_uses_resolved_views() {
        let (backend, mut scheduler) = scheduler();
        scheduler.begin().unwrap();
        let color = scheduler.create_image("Color", target());
        let depth = scheduler.create_image(
            "Depth",
            ImageCreateInfo::render_target(
                Format::Depth32Float,
                ImageUsage::DEPTH_STENCIL_ATTACHMENT,
            ),
        );
        let pass = scheduler.create_pass("Main", QueueType::Graphics);
        scheduler.use_image(pass, color, ImageUseInfo::color_output(BLACK));
        scheduler.use_image(pass, depth, ImageUseInfo::depth_output(ClearValue::depth(1.0)));
        scheduler.submit(pass);
        scheduler.compile().unwrap();
        scheduler.end().unwrap();

        let submissions = backend.submissions();
        let rendering = submissions[0]
            .commands
            .iter()
            .find_map(|command| match command {
                crate::backend::dummy::RecordedCommand::BeginRendering(info) => Some(info.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(rendering.extent, Extent2d::new(1600, 1200));
        assert_eq!(rendering.color_attachments.len(), 1);
        assert_eq!(
            rendering.depth_stencil_attachment.unwrap().layout,
            ImageLayout::DepthStencilAttachment
        );
    }
}
