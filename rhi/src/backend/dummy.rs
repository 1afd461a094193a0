//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations but provides
//! a valid implementation of [`GpuBackend`] for exercising the frame
//! scheduler without GPU hardware. It keeps a ledger of every object it
//! creates and every submission it receives, so tests can observe exactly
//! what the scheduler asked the device to do.
//!
//! GPU work completes instantly: fences and timeline semaphores attached to
//! a submission are signaled inside [`GpuBackend::submit`].

use std::any::Any;

use parking_lot::Mutex;
use slotmap::SlotMap;

use crate::command::{CommandList, RenderingInfo};
use crate::graph::{Barrier, BarrierBatch};
use crate::types::{
    BufferDescriptor, BufferViewInfo, Extent3d, ImageDescriptor, ImageViewInfo, QueueType,
};

use super::{
    BackendError, BackendResult, BufferHandle, BufferViewHandle, FenceHandle, GpuBackend,
    ImageHandle, ImageViewHandle, SemaphoreHandle, SemaphoreSignal, SemaphoreWait, SubmitInfo,
};

/// A command captured by a [`DummyCommandList`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    PipelineBarrier(Vec<Barrier>),
    BeginRendering(RenderingInfo),
    EndRendering,
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    CopyBuffer {
        src: BufferHandle,
        dst: BufferHandle,
        size: u64,
    },
    CopyImage {
        src: ImageHandle,
        dst: ImageHandle,
        extent: Extent3d,
    },
    CopyBufferToImage {
        src: BufferHandle,
        dst: ImageHandle,
        extent: Extent3d,
    },
}

/// A submission received by the dummy backend.
#[derive(Debug, Clone)]
pub struct SubmitRecord {
    pub queue: QueueType,
    pub commands: Vec<RecordedCommand>,
    pub waits: Vec<SemaphoreWait>,
    pub signal: Option<SemaphoreSignal>,
    pub fence: Option<FenceHandle>,
}

/// Object counters of the dummy backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    pub images_created: u64,
    pub images_destroyed: u64,
    pub buffers_created: u64,
    pub buffers_destroyed: u64,
    pub image_views_created: u64,
    pub image_views_destroyed: u64,
    pub buffer_views_created: u64,
    pub buffer_views_destroyed: u64,
    pub submissions: u64,
}

/// Command list that records into memory.
#[derive(Debug)]
pub struct DummyCommandList {
    queue: QueueType,
    recording: bool,
    commands: Vec<RecordedCommand>,
}

impl DummyCommandList {
    fn new(queue: QueueType) -> Self {
        Self {
            queue,
            recording: false,
            commands: Vec::new(),
        }
    }

    fn record(&mut self, command: RecordedCommand) {
        assert!(self.recording, "command recorded outside begin()/end()");
        self.commands.push(command);
    }

    /// Commands recorded so far.
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }
}

impl CommandList for DummyCommandList {
    fn queue(&self) -> QueueType {
        self.queue
    }

    fn begin(&mut self) {
        assert!(!self.recording, "command list is already recording");
        self.recording = true;
    }

    fn end(&mut self) {
        assert!(self.recording, "command list is not recording");
        self.recording = false;
    }

    fn pipeline_barrier(&mut self, batch: &BarrierBatch) {
        self.record(RecordedCommand::PipelineBarrier(batch.barriers().to_vec()));
    }

    fn begin_rendering(&mut self, info: &RenderingInfo) {
        self.record(RecordedCommand::BeginRendering(info.clone()));
    }

    fn end_rendering(&mut self) {
        self.record(RecordedCommand::EndRendering);
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, _first_vertex: u32, _first_instance: u32) {
        self.record(RecordedCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.record(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.record(RecordedCommand::Dispatch { x, y, z });
    }

    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, size: u64) {
        self.record(RecordedCommand::CopyBuffer { src, dst, size });
    }

    fn copy_image(&mut self, src: ImageHandle, dst: ImageHandle, extent: Extent3d) {
        self.record(RecordedCommand::CopyImage { src, dst, extent });
    }

    fn copy_buffer_to_image(&mut self, src: BufferHandle, dst: ImageHandle, extent: Extent3d) {
        self.record(RecordedCommand::CopyBufferToImage { src, dst, extent });
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[derive(Debug)]
struct DummyImage {
    name: String,
    descriptor: ImageDescriptor,
}

#[derive(Debug)]
struct DummyBuffer {
    name: String,
    descriptor: BufferDescriptor,
}

#[derive(Debug, Default)]
struct DummyState {
    images: SlotMap<ImageHandle, DummyImage>,
    buffers: SlotMap<BufferHandle, DummyBuffer>,
    image_views: SlotMap<ImageViewHandle, ImageHandle>,
    buffer_views: SlotMap<BufferViewHandle, BufferHandle>,
    fences: SlotMap<FenceHandle, bool>,
    semaphores: SlotMap<SemaphoreHandle, u64>,
    submissions: Vec<SubmitRecord>,
    memory_used: u64,
    memory_budget: Option<u64>,
    stats: DummyStats,
}

impl DummyState {
    fn reserve(&mut self, bytes: u64) -> BackendResult<()> {
        if let Some(budget) = self.memory_budget {
            if self.memory_used + bytes > budget {
                return Err(BackendError::OutOfMemory);
            }
        }
        self.memory_used += bytes;
        Ok(())
    }
}

/// Dummy GPU backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    state: Mutex<DummyState>,
}

impl DummyBackend {
    /// Create a new dummy backend with unlimited memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dummy backend that fails allocations beyond `bytes`.
    pub fn with_memory_budget(bytes: u64) -> Self {
        let backend = Self::new();
        backend.set_memory_budget(Some(bytes));
        backend
    }

    /// Change the memory budget. `None` removes the limit.
    pub fn set_memory_budget(&self, budget: Option<u64>) {
        self.state.lock().memory_budget = budget;
    }

    /// Bytes currently allocated by live images and buffers.
    pub fn memory_used(&self) -> u64 {
        self.state.lock().memory_used
    }

    /// Snapshot of the object counters.
    pub fn stats(&self) -> DummyStats {
        self.state.lock().stats
    }

    /// Every submission received so far.
    pub fn submissions(&self) -> Vec<SubmitRecord> {
        self.state.lock().submissions.clone()
    }

    /// Forget recorded submissions.
    pub fn clear_submissions(&self) {
        self.state.lock().submissions.clear();
    }

    /// Number of live images.
    pub fn live_images(&self) -> usize {
        self.state.lock().images.len()
    }

    /// Number of live image views.
    pub fn live_image_views(&self) -> usize {
        self.state.lock().image_views.len()
    }

    /// Returns true if the image exists.
    pub fn is_image_alive(&self, image: ImageHandle) -> bool {
        self.state.lock().images.contains_key(image)
    }

    /// Returns true if the image view exists.
    pub fn is_image_view_alive(&self, view: ImageViewHandle) -> bool {
        self.state.lock().image_views.contains_key(view)
    }

    /// Descriptor of a live image.
    pub fn image_descriptor(&self, image: ImageHandle) -> Option<ImageDescriptor> {
        self.state.lock().images.get(image).map(|i| i.descriptor)
    }

    /// Debug name of a live image.
    pub fn image_name(&self, image: ImageHandle) -> Option<String> {
        self.state.lock().images.get(image).map(|i| i.name.clone())
    }

    /// Descriptor of a live buffer.
    pub fn buffer_descriptor(&self, buffer: BufferHandle) -> Option<BufferDescriptor> {
        self.state.lock().buffers.get(buffer).map(|b| b.descriptor)
    }

    /// Current value of a timeline semaphore.
    pub fn semaphore_value(&self, semaphore: SemaphoreHandle) -> Option<u64> {
        self.state.lock().semaphores.get(semaphore).copied()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_image(&self, name: &str, descriptor: &ImageDescriptor) -> BackendResult<ImageHandle> {
        log::trace!(
            "DummyBackend: creating image '{}' ({}x{}x{}, {:?})",
            name,
            descriptor.extent.width,
            descriptor.extent.height,
            descriptor.extent.depth,
            descriptor.format
        );
        let mut state = self.state.lock();
        state.reserve(descriptor.size_in_bytes())?;
        state.stats.images_created += 1;
        Ok(state.images.insert(DummyImage {
            name: name.to_string(),
            descriptor: *descriptor,
        }))
    }

    fn destroy_image(&self, image: ImageHandle) {
        let mut state = self.state.lock();
        match state.images.remove(image) {
            Some(removed) => {
                log::trace!("DummyBackend: destroying image '{}'", removed.name);
                state.memory_used -= removed.descriptor.size_in_bytes();
                state.stats.images_destroyed += 1;
            }
            None => log::warn!("DummyBackend: destroying unknown image {:?}", image),
        }
    }

    fn create_buffer(
        &self,
        name: &str,
        descriptor: &BufferDescriptor,
    ) -> BackendResult<BufferHandle> {
        log::trace!(
            "DummyBackend: creating buffer '{}' (size: {})",
            name,
            descriptor.size
        );
        let mut state = self.state.lock();
        state.reserve(descriptor.size)?;
        state.stats.buffers_created += 1;
        Ok(state.buffers.insert(DummyBuffer {
            name: name.to_string(),
            descriptor: *descriptor,
        }))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.lock();
        match state.buffers.remove(buffer) {
            Some(removed) => {
                log::trace!("DummyBackend: destroying buffer '{}'", removed.name);
                state.memory_used -= removed.descriptor.size;
                state.stats.buffers_destroyed += 1;
            }
            None => log::warn!("DummyBackend: destroying unknown buffer {:?}", buffer),
        }
    }

    fn create_image_view(
        &self,
        image: ImageHandle,
        info: &ImageViewInfo,
    ) -> BackendResult<ImageViewHandle> {
        let mut state = self.state.lock();
        if !state.images.contains_key(image) {
            return Err(BackendError::InvalidHandle(format!(
                "image view of unknown image {image:?}"
            )));
        }
        log::trace!("DummyBackend: creating image view {:?}", info.subresource);
        state.stats.image_views_created += 1;
        Ok(state.image_views.insert(image))
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        let mut state = self.state.lock();
        if state.image_views.remove(view).is_some() {
            state.stats.image_views_destroyed += 1;
        } else {
            log::warn!("DummyBackend: destroying unknown image view {:?}", view);
        }
    }

    fn create_buffer_view(
        &self,
        buffer: BufferHandle,
        info: &BufferViewInfo,
    ) -> BackendResult<BufferViewHandle> {
        let mut state = self.state.lock();
        let Some(target) = state.buffers.get(buffer) else {
            return Err(BackendError::InvalidHandle(format!(
                "buffer view of unknown buffer {buffer:?}"
            )));
        };
        let end = info.offset + info.size.unwrap_or(0);
        if info.offset >= target.descriptor.size || end > target.descriptor.size {
            return Err(BackendError::ResourceCreationFailed(format!(
                "buffer view {}..{} outside of buffer '{}'",
                info.offset, end, target.name
            )));
        }
        state.stats.buffer_views_created += 1;
        Ok(state.buffer_views.insert(buffer))
    }

    fn destroy_buffer_view(&self, view: BufferViewHandle) {
        let mut state = self.state.lock();
        if state.buffer_views.remove(view).is_some() {
            state.stats.buffer_views_destroyed += 1;
        } else {
            log::warn!("DummyBackend: destroying unknown buffer view {:?}", view);
        }
    }

    fn create_fence(&self, signaled: bool) -> BackendResult<FenceHandle> {
        Ok(self.state.lock().fences.insert(signaled))
    }

    fn wait_fence(&self, fence: FenceHandle) -> BackendResult<()> {
        match self.state.lock().fences.get(fence) {
            Some(true) => Ok(()),
            // Nothing is in flight, so an unsignaled fence would never signal.
            Some(false) => Err(BackendError::Internal(
                "waiting on a fence that was never submitted".to_string(),
            )),
            None => Err(BackendError::InvalidHandle(format!("fence {fence:?}"))),
        }
    }

    fn is_fence_signaled(&self, fence: FenceHandle) -> BackendResult<bool> {
        self.state
            .lock()
            .fences
            .get(fence)
            .copied()
            .ok_or_else(|| BackendError::InvalidHandle(format!("fence {fence:?}")))
    }

    fn reset_fence(&self, fence: FenceHandle) -> BackendResult<()> {
        let mut state = self.state.lock();
        let signaled = state
            .fences
            .get_mut(fence)
            .ok_or_else(|| BackendError::InvalidHandle(format!("fence {fence:?}")))?;
        *signaled = false;
        Ok(())
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        self.state.lock().fences.remove(fence);
    }

    fn create_timeline_semaphore(&self, initial_value: u64) -> BackendResult<SemaphoreHandle> {
        Ok(self.state.lock().semaphores.insert(initial_value))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        self.state.lock().semaphores.remove(semaphore);
    }

    fn create_command_list(&self, queue: QueueType) -> BackendResult<Box<dyn CommandList>> {
        Ok(Box::new(DummyCommandList::new(queue)))
    }

    fn submit(
        &self,
        queue: QueueType,
        command_list: Box<dyn CommandList>,
        info: &SubmitInfo<'_>,
    ) -> BackendResult<()> {
        let list = command_list
            .into_any()
            .downcast::<DummyCommandList>()
            .map_err(|_| {
                BackendError::InvalidHandle("command list from another backend".to_string())
            })?;
        if list.recording {
            return Err(BackendError::Internal(
                "submitting a command list that is still recording".to_string(),
            ));
        }
        if list.queue != queue {
            return Err(BackendError::InvalidHandle(format!(
                "command list for {} queue submitted to {} queue",
                list.queue.name(),
                queue.name()
            )));
        }

        let mut state = self.state.lock();
        for wait in info.waits {
            let value = state
                .semaphores
                .get(wait.semaphore)
                .copied()
                .ok_or_else(|| BackendError::InvalidHandle(format!("{:?}", wait.semaphore)))?;
            // Work runs to completion on submit, so every awaited value must already be signaled.
            if value < wait.value {
                return Err(BackendError::Internal(format!(
                    "wait on timeline value {} which is never signaled (current {})",
                    wait.value, value
                )));
            }
        }
        if let Some(signal) = info.signal {
            let value = state
                .semaphores
                .get_mut(signal.semaphore)
                .ok_or_else(|| BackendError::InvalidHandle(format!("{:?}", signal.semaphore)))?;
            *value = (*value).max(signal.value);
        }
        if let Some(fence) = info.fence {
            let signaled = state
                .fences
                .get_mut(fence)
                .ok_or_else(|| BackendError::InvalidHandle(format!("fence {fence:?}")))?;
            *signaled = true;
        }

        log::trace!(
            "DummyBackend: submitting {} commands to {} queue",
            list.commands.len(),
            queue.name()
        );
        state.stats.submissions += 1;
        state.submissions.push(SubmitRecord {
            queue,
            commands: list.commands,
            waits: info.waits.to_vec(),
            signal: info.signal,
            fence: info.fence,
        });
        Ok(())
    }

    fn wait_idle(&self) -> BackendResult<()> {
        Ok(())
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, Format, ImageUsage};

    #[test]
    fn test_dummy_backend_name() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy");
    }

    #[test]
    fn test_create_and_destroy_image() {
        let backend = DummyBackend::new();
        let desc = ImageDescriptor::new_2d(16, 16, Format::Rgba8Unorm, ImageUsage::SAMPLED);
        let image = backend.create_image("test", &desc).unwrap();
        assert!(backend.is_image_alive(image));
        assert_eq!(backend.memory_used(), 1024);
        assert_eq!(backend.image_descriptor(image), Some(desc));

        backend.destroy_image(image);
        assert!(!backend.is_image_alive(image));
        assert_eq!(backend.memory_used(), 0);
        let stats = backend.stats();
        assert_eq!(stats.images_created, 1);
        assert_eq!(stats.images_destroyed, 1);
    }

    #[test]
    fn test_memory_budget() {
        let backend = DummyBackend::with_memory_budget(1000);
        let desc = BufferDescriptor::new(600, BufferUsage::STORAGE);
        let first = backend.create_buffer("a", &desc).unwrap();
        assert_eq!(
            backend.create_buffer("b", &desc),
            Err(BackendError::OutOfMemory)
        );
        backend.destroy_buffer(first);
        assert!(backend.create_buffer("c", &desc).is_ok());
    }

    #[test]
    fn test_view_of_unknown_image_fails() {
        let backend = DummyBackend::new();
        let desc = ImageDescriptor::new_2d(4, 4, Format::Rgba8Unorm, ImageUsage::SAMPLED);
        let image = backend.create_image("gone", &desc).unwrap();
        backend.destroy_image(image);
        assert!(matches!(
            backend.create_image_view(image, &ImageViewInfo::color()),
            Err(BackendError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_buffer_view_range_checked() {
        let backend = DummyBackend::new();
        let buffer = backend
            .create_buffer("buf", &BufferDescriptor::new(64, BufferUsage::STORAGE))
            .unwrap();
        assert!(
            backend
                .create_buffer_view(buffer, &BufferViewInfo::range(0, 64))
                .is_ok()
        );
        assert!(
            backend
                .create_buffer_view(buffer, &BufferViewInfo::range(32, 64))
                .is_err()
        );
    }

    #[test]
    fn test_submit_signals_fence_and_timeline() {
        let backend = DummyBackend::new();
        let fence = backend.create_fence(false).unwrap();
        let semaphore = backend.create_timeline_semaphore(0).unwrap();
        assert!(!backend.is_fence_signaled(fence).unwrap());

        let mut list = backend.create_command_list(QueueType::Graphics).unwrap();
        list.begin();
        list.draw(3, 1, 0, 0);
        list.end();
        backend
            .submit(
                QueueType::Graphics,
                list,
                &SubmitInfo {
                    waits: &[],
                    signal: Some(SemaphoreSignal {
                        semaphore,
                        value: 1,
                    }),
                    fence: Some(fence),
                },
            )
            .unwrap();

        assert!(backend.is_fence_signaled(fence).unwrap());
        assert!(backend.wait_fence(fence).is_ok());
        assert_eq!(backend.semaphore_value(semaphore), Some(1));
        let submissions = backend.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(
            submissions[0].commands,
            vec![RecordedCommand::Draw {
                vertex_count: 3,
                instance_count: 1
            }]
        );
    }

    #[test]
    fn test_wait_on_unsubmitted_fence_fails() {
        let backend = DummyBackend::new();
        let fence = backend.create_fence(false).unwrap();
        assert!(backend.wait_fence(fence).is_err());
        backend.reset_fence(fence).unwrap();
    }

    #[test]
    fn test_submit_to_wrong_queue_fails() {
        let backend = DummyBackend::new();
        let mut list = backend.create_command_list(QueueType::Compute).unwrap();
        list.begin();
        list.end();
        let result = backend.submit(QueueType::Graphics, list, &SubmitInfo::default());
        assert!(matches!(result, Err(BackendError::InvalidHandle(_))));
    }

    #[test]
    #[should_panic(expected = "outside begin()/end()")]
    fn test_record_outside_begin_panics() {
        let backend = DummyBackend::new();
        let mut list = backend.create_command_list(QueueType::Compute).unwrap();
        list.dispatch(1, 1, 1);
    }
}
