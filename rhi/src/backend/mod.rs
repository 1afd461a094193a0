//! GPU backend abstraction.
//!
//! The frame scheduler talks to the device exclusively through the
//! [`GpuBackend`] trait. Exactly one implementation is selected at startup
//! via [`create_backend`]; there is no runtime backend switching.
//!
//! Physical objects are identified by generational handles owned by the
//! backend. The scheduler never dereferences them, it only passes them back.

#[cfg(feature = "dummy")]
pub mod dummy;
pub mod error;

use std::sync::Arc;

use slotmap::new_key_type;

use crate::command::CommandList;
use crate::graph::PipelineStage;
use crate::types::{BufferDescriptor, BufferViewInfo, ImageDescriptor, ImageViewInfo, QueueType};

#[cfg(feature = "dummy")]
pub use dummy::DummyBackend;
pub use error::{BackendError, BackendResult};

new_key_type! {
    /// Handle to a physical image.
    pub struct ImageHandle;
    /// Handle to a physical buffer.
    pub struct BufferHandle;
    /// Handle to an image view.
    pub struct ImageViewHandle;
    /// Handle to a buffer view.
    pub struct BufferViewHandle;
    /// Handle to a CPU-waitable fence.
    pub struct FenceHandle;
    /// Handle to a timeline semaphore.
    pub struct SemaphoreHandle;
}

/// Available backend implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Bookkeeping-only backend without a GPU.
    #[default]
    Dummy,
}

/// Wait on a timeline semaphore value before a submission executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreWait {
    pub semaphore: SemaphoreHandle,
    pub value: u64,
    /// Stages of the submission that must wait.
    pub stage: PipelineStage,
}

/// Signal a timeline semaphore value once a submission completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreSignal {
    pub semaphore: SemaphoreHandle,
    pub value: u64,
}

/// Synchronization attached to a queue submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitInfo<'a> {
    /// Timeline values to wait on.
    pub waits: &'a [SemaphoreWait],
    /// Timeline value to signal.
    pub signal: Option<SemaphoreSignal>,
    /// Fence signaled when the submission completes.
    pub fence: Option<FenceHandle>,
}

/// Device operations required by the frame scheduler.
///
/// Creation methods are only invoked by the scheduler while compiling a frame
/// (allocation, view creation) and destruction and submission while ending or
/// beginning one.
pub trait GpuBackend: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create an image. `name` is a debug label.
    fn create_image(&self, name: &str, descriptor: &ImageDescriptor) -> BackendResult<ImageHandle>;

    /// Destroy an image.
    fn destroy_image(&self, image: ImageHandle);

    /// Create a buffer. `name` is a debug label.
    fn create_buffer(
        &self,
        name: &str,
        descriptor: &BufferDescriptor,
    ) -> BackendResult<BufferHandle>;

    /// Destroy a buffer.
    fn destroy_buffer(&self, buffer: BufferHandle);

    /// Create a view of an image.
    fn create_image_view(
        &self,
        image: ImageHandle,
        info: &ImageViewInfo,
    ) -> BackendResult<ImageViewHandle>;

    /// Destroy an image view.
    fn destroy_image_view(&self, view: ImageViewHandle);

    /// Create a view of a buffer.
    fn create_buffer_view(
        &self,
        buffer: BufferHandle,
        info: &BufferViewInfo,
    ) -> BackendResult<BufferViewHandle>;

    /// Destroy a buffer view.
    fn destroy_buffer_view(&self, view: BufferViewHandle);

    /// Create a fence.
    fn create_fence(&self, signaled: bool) -> BackendResult<FenceHandle>;

    /// Block until the fence is signaled.
    fn wait_fence(&self, fence: FenceHandle) -> BackendResult<()>;

    /// Check if a fence is signaled (non-blocking).
    fn is_fence_signaled(&self, fence: FenceHandle) -> BackendResult<bool>;

    /// Reset a fence to the unsignaled state.
    fn reset_fence(&self, fence: FenceHandle) -> BackendResult<()>;

    /// Destroy a fence.
    fn destroy_fence(&self, fence: FenceHandle);

    /// Create a timeline semaphore starting at `initial_value`.
    fn create_timeline_semaphore(&self, initial_value: u64) -> BackendResult<SemaphoreHandle>;

    /// Destroy a semaphore.
    fn destroy_semaphore(&self, semaphore: SemaphoreHandle);

    /// Allocate a command list for the given queue.
    fn create_command_list(&self, queue: QueueType) -> BackendResult<Box<dyn CommandList>>;

    /// Submit a recorded command list.
    fn submit(
        &self,
        queue: QueueType,
        command_list: Box<dyn CommandList>,
        info: &SubmitInfo<'_>,
    ) -> BackendResult<()>;

    /// Block until the device is idle.
    fn wait_idle(&self) -> BackendResult<()>;
}

/// Create the backend selected at startup.
pub fn create_backend(backend_type: BackendType) -> BackendResult<Arc<dyn GpuBackend>> {
    match backend_type {
        #[cfg(feature = "dummy")]
        BackendType::Dummy => {
            log::info!("Using dummy backend");
            Ok(Arc::new(DummyBackend::new()))
        }
        #[cfg(not(feature = "dummy"))]
        BackendType::Dummy => {
            log::warn!("Dummy backend requested but the `dummy` feature is disabled");
            Err(BackendError::FeatureNotSupported(
                "dummy backend".to_string(),
            ))
        }
    }
}
