//! Frame graph and scheduler.
//!
//! The frame graph describes one frame of GPU work as passes using
//! attachments. Every use is a node in its attachment's use-chain, and the
//! chains drive everything the scheduler derives:
//!
//! - Transient allocation at the head of a chain and release at its tail
//! - Barriers from the state of each node's predecessor
//! - Timeline semaphore waits where a chain crosses queues
//!
//! # Architecture
//!
//! | Layer | Type | Purpose |
//! |-------|------|---------|
//! | Frame | [`FrameScheduler`] | Begin / submit / compile / end cycle |
//! | Pass | [`Pass`] | Named GPU work on one queue |
//! | Use | [`PassAttachment`] | One pass using one attachment |
//! | Resource | [`Attachment`] | Persistent or transient logical resource |
//!
//! Passes run in submission order. The scheduler never reorders them.

mod attachment;
mod barrier;
mod handle;
mod pass;
mod pass_attachment;
mod scheduler;
mod sync;
mod transient_pool;
mod view_cache;

pub use attachment::{
    Attachment, AttachmentKind, AttachmentLifetime, AttachmentRegistry, AttachmentSource,
    PhysicalResource,
};
pub use barrier::{
    AccessFlags, Barrier, BarrierBatch, BarrierResource, ImageLayout, PipelineStage,
    ResourceState, needs_barrier,
};
pub use handle::{AttachmentHandle, PassAttachmentHandle, PassHandle};
pub use pass::{ExecuteFn, Pass, PassContext, PassResource, PassSize, PassState};
pub use pass_attachment::{
    AttachmentAccess, AttachmentUsage, AttachmentUse, BufferUseInfo, ChainIter, ImageUseInfo,
    PassAttachment, ResolvedView, ViewInfo,
};
pub use scheduler::{FrameScheduler, FrameState, FrameStats, SchedulerConfig};
pub use sync::{FrameFences, QueueTimeline};
pub use transient_pool::{PoolKey, TransientPool, TransientPoolStats};
pub use view_cache::{ViewCache, ViewCacheStats};
