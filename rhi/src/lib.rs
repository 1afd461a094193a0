//! # RedLilium RHI
//!
//! Render hardware interface and per-frame scheduler for RedLilium.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`FrameScheduler`] - Records passes, derives barriers, transient memory
//!   and cross-queue waits from attachment use-chains, and submits the frame
//! - [`GpuBackend`] - Trait the scheduler drives the device through
//! - [`Swapchain`] - Ring of presentable images
//! - [`DummyBackend`] - Bookkeeping-only backend for tests and tools
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_rhi::{FrameScheduler, SchedulerConfig, ImageUseInfo, QueueType};
//!
//! let mut scheduler = FrameScheduler::new(backend, SchedulerConfig::default())?;
//! let output = scheduler.import_swapchain("Output", swapchain);
//! loop {
//!     scheduler.begin()?;
//!     let pass = scheduler.create_pass("main", QueueType::Graphics);
//!     scheduler.use_image(pass, output, ImageUseInfo::color_output(clear));
//!     scheduler.set_execute(pass, |ctx| ctx.command_list().draw(3, 1, 0, 0));
//!     scheduler.submit(pass);
//!     scheduler.compile()?;
//!     scheduler.end()?;
//! }
//! ```

pub mod backend;
pub mod command;
pub mod error;
pub mod graph;
pub mod profiling;
pub mod swapchain;
pub mod types;

// Re-export main types for convenience
#[cfg(feature = "dummy")]
pub use backend::DummyBackend;
pub use backend::{BackendError, BackendResult, BackendType, GpuBackend, create_backend};
pub use command::{CommandList, RenderingAttachment, RenderingInfo};
pub use error::{RhiError, RhiResult};
pub use graph::{
    AttachmentAccess, AttachmentHandle, AttachmentUsage, BufferUseInfo, FrameScheduler,
    FrameState, FrameStats, ImageUseInfo, PassContext, PassHandle, PassSize, SchedulerConfig,
};
pub use swapchain::{DummySwapchain, PresentMode, Swapchain, SwapchainCreateInfo};
pub use types::{
    BufferDescriptor, BufferUsage, ClearValue, Extent2d, Extent3d, Format, ImageCreateInfo,
    ImageDescriptor, ImageSize, ImageUsage, ImageViewInfo, LoadOp, QueueType, StoreOp,
};

/// RHI library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the RHI.
///
/// Only logs the version; backends are created explicitly through
/// [`create_backend`].
pub fn init() {
    log::info!("RedLilium RHI v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    #[cfg(feature = "dummy")]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert!(backend.name() == "Dummy");
    }

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.frame_count, 3);
    }
}
