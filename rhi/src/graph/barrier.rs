//! Barrier synthesis from attachment use-chains.
//!
//! Every use of an attachment maps to a [`ResourceState`] (pipeline stage,
//! access mask and image layout). The barrier placed before a use transitions
//! from the state of the previous use in the chain to the state of this one.
//! Barriers for one pass are collected into a [`BarrierBatch`] and emitted as
//! a single pipeline barrier command.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::backend::{BufferHandle, ImageHandle};
use crate::types::{ImageAspect, QueueType};

use super::handle::AttachmentHandle;
use super::pass_attachment::{AttachmentAccess, AttachmentUsage, AttachmentUse};

/// Layout an image must be in for a given use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    /// Contents are undefined; only valid as a source layout.
    #[default]
    Undefined,
    /// Usable for any operation.
    General,
    /// Color render target.
    ColorAttachment,
    /// Writable depth/stencil target.
    DepthStencilAttachment,
    /// Read-only depth/stencil (depth test + sampling).
    DepthStencilReadOnly,
    /// Sampled in a shader.
    ShaderReadOnly,
    /// Source of a copy.
    TransferSrc,
    /// Destination of a copy.
    TransferDst,
    /// Ready for presentation.
    Present,
}

bitflags! {
    /// Pipeline stages taking part in a barrier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStage: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_INPUT = 1 << 1;
        const VERTEX_SHADER = 1 << 2;
        const FRAGMENT_SHADER = 1 << 3;
        const EARLY_FRAGMENT_TESTS = 1 << 4;
        const LATE_FRAGMENT_TESTS = 1 << 5;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 6;
        const COMPUTE_SHADER = 1 << 7;
        const TRANSFER = 1 << 8;
        const BOTTOM_OF_PIPE = 1 << 9;
        const ALL_COMMANDS = 1 << 10;
    }
}

bitflags! {
    /// Memory accesses taking part in a barrier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const VERTEX_ATTRIBUTE_READ = 1 << 0;
        const INDEX_READ = 1 << 1;
        const SHADER_READ = 1 << 2;
        const SHADER_WRITE = 1 << 3;
        const COLOR_ATTACHMENT_READ = 1 << 4;
        const COLOR_ATTACHMENT_WRITE = 1 << 5;
        const DEPTH_STENCIL_READ = 1 << 6;
        const DEPTH_STENCIL_WRITE = 1 << 7;
        const TRANSFER_READ = 1 << 8;
        const TRANSFER_WRITE = 1 << 9;
        const MEMORY_READ = 1 << 10;
        const MEMORY_WRITE = 1 << 11;
    }
}

impl AccessFlags {
    /// Every write access.
    pub const WRITES: Self = Self::SHADER_WRITE
        .union(Self::COLOR_ATTACHMENT_WRITE)
        .union(Self::DEPTH_STENCIL_WRITE)
        .union(Self::TRANSFER_WRITE)
        .union(Self::MEMORY_WRITE);
}

/// Synchronization state of a resource at one point of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceState {
    pub stage: PipelineStage,
    pub access: AccessFlags,
    pub layout: ImageLayout,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl ResourceState {
    /// Initial state: nothing to wait for, contents undefined.
    pub const UNDEFINED: Self = Self {
        stage: PipelineStage::TOP_OF_PIPE,
        access: AccessFlags::empty(),
        layout: ImageLayout::Undefined,
    };

    /// State a swapchain image must be in before present.
    pub const PRESENT: Self = Self {
        stage: PipelineStage::BOTTOM_OF_PIPE,
        access: AccessFlags::empty(),
        layout: ImageLayout::Present,
    };

    /// State required by one attachment use on the given queue.
    pub fn for_use(attachment_use: AttachmentUse, queue: QueueType) -> Self {
        let AttachmentUse { usage, access } = attachment_use;
        let shader_stage = match queue {
            QueueType::Graphics => PipelineStage::VERTEX_SHADER | PipelineStage::FRAGMENT_SHADER,
            QueueType::Compute | QueueType::Transfer => PipelineStage::COMPUTE_SHADER,
        };
        let pick = |read: AccessFlags, write: AccessFlags| match access {
            AttachmentAccess::Read => read,
            AttachmentAccess::Write => write,
            AttachmentAccess::ReadWrite => read | write,
        };

        match usage {
            AttachmentUsage::Color | AttachmentUsage::Resolve => Self {
                stage: PipelineStage::COLOR_ATTACHMENT_OUTPUT,
                access: pick(
                    AccessFlags::COLOR_ATTACHMENT_READ,
                    AccessFlags::COLOR_ATTACHMENT_WRITE,
                ),
                layout: ImageLayout::ColorAttachment,
            },
            AttachmentUsage::DepthStencil => Self {
                stage: PipelineStage::EARLY_FRAGMENT_TESTS | PipelineStage::LATE_FRAGMENT_TESTS,
                access: pick(
                    AccessFlags::DEPTH_STENCIL_READ,
                    AccessFlags::DEPTH_STENCIL_WRITE,
                ),
                layout: if access.writes() {
                    ImageLayout::DepthStencilAttachment
                } else {
                    ImageLayout::DepthStencilReadOnly
                },
            },
            AttachmentUsage::ShaderResource => Self {
                stage: shader_stage,
                access: AccessFlags::SHADER_READ,
                layout: ImageLayout::ShaderReadOnly,
            },
            AttachmentUsage::ShaderStorage => Self {
                stage: shader_stage,
                access: pick(AccessFlags::SHADER_READ, AccessFlags::SHADER_WRITE),
                layout: ImageLayout::General,
            },
            AttachmentUsage::CopySource => Self {
                stage: PipelineStage::TRANSFER,
                access: AccessFlags::TRANSFER_READ,
                layout: ImageLayout::TransferSrc,
            },
            AttachmentUsage::CopyDestination => Self {
                stage: PipelineStage::TRANSFER,
                access: AccessFlags::TRANSFER_WRITE,
                layout: ImageLayout::TransferDst,
            },
            AttachmentUsage::VertexInput => Self {
                stage: PipelineStage::VERTEX_INPUT,
                access: AccessFlags::VERTEX_ATTRIBUTE_READ | AccessFlags::INDEX_READ,
                layout: ImageLayout::Undefined,
            },
        }
    }

    /// Returns true if this state writes the resource.
    pub fn writes(&self) -> bool {
        self.access.intersects(AccessFlags::WRITES)
    }
}

/// Returns true if moving from `src` to `dst` needs a barrier.
///
/// Read-after-read in the same image layout is the only hazard-free
/// transition.
pub fn needs_barrier(src: &ResourceState, dst: &ResourceState, is_image: bool) -> bool {
    src.writes() || dst.writes() || (is_image && src.layout != dst.layout)
}

/// Physical resource a barrier applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierResource {
    /// Whole image, restricted to the given aspects.
    Image {
        image: ImageHandle,
        aspect: ImageAspect,
    },
    /// Whole buffer.
    Buffer(BufferHandle),
}

/// A synchronization / layout transition between two uses of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrier {
    /// Attachment the barrier was computed for.
    pub attachment: AttachmentHandle,
    /// Physical resource.
    pub resource: BarrierResource,
    /// State left by the previous use.
    pub src: ResourceState,
    /// State required by the next use.
    pub dst: ResourceState,
    /// Previous use, `None` at the head of the chain.
    pub src_use: Option<AttachmentUse>,
    /// Next use, `None` for the final present transition.
    pub dst_use: Option<AttachmentUse>,
    /// Queue of the previous use.
    pub src_queue: QueueType,
    /// Queue of the next use.
    pub dst_queue: QueueType,
}

impl Barrier {
    /// Returns true if this barrier also transfers queue ownership.
    pub fn is_queue_transfer(&self) -> bool {
        self.src_queue != self.dst_queue
    }

    /// Returns true if the barrier changes the image layout.
    pub fn is_layout_transition(&self) -> bool {
        matches!(self.resource, BarrierResource::Image { .. }) && self.src.layout != self.dst.layout
    }
}

/// Barriers emitted together before (or after) a pass.
///
/// Transitions that need no synchronization are dropped on insert, and the
/// stage masks of all barriers are unioned for the pipeline barrier call.
#[derive(Debug, Clone, Default)]
pub struct BarrierBatch {
    barriers: SmallVec<[Barrier; 4]>,
    src_stages: Option<PipelineStage>,
    dst_stages: Option<PipelineStage>,
}

impl BarrierBatch {
    /// Create a new empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a barrier. Returns false if the transition was a no-op and skipped.
    pub fn push(&mut self, barrier: Barrier) -> bool {
        let is_image = matches!(barrier.resource, BarrierResource::Image { .. });
        if !needs_barrier(&barrier.src, &barrier.dst, is_image) && !barrier.is_queue_transfer() {
            return false;
        }
        self.src_stages = Some(self.src_stages.unwrap_or(PipelineStage::empty()) | barrier.src.stage);
        self.dst_stages = Some(self.dst_stages.unwrap_or(PipelineStage::empty()) | barrier.dst.stage);
        self.barriers.push(barrier);
        true
    }

    /// Barriers in insertion order.
    pub fn barriers(&self) -> &[Barrier] {
        &self.barriers
    }

    /// Union of the source stages.
    pub fn src_stages(&self) -> PipelineStage {
        self.src_stages.unwrap_or(PipelineStage::TOP_OF_PIPE)
    }

    /// Union of the destination stages.
    pub fn dst_stages(&self) -> PipelineStage {
        self.dst_stages.unwrap_or(PipelineStage::BOTTOM_OF_PIPE)
    }

    /// Check if the batch has any barriers.
    pub fn is_empty(&self) -> bool {
        self.barriers.is_empty()
    }

    /// Get the number of barriers in the batch.
    pub fn len(&self) -> usize {
        self.barriers.len()
    }

    /// Find the barrier computed for an attachment.
    pub fn find(&self, attachment: AttachmentHandle) -> Option<&Barrier> {
        self.barriers.iter().find(|b| b.attachment == attachment)
    }

    /// Remove every barrier.
    pub fn clear(&mut self) {
        self.barriers.clear();
        self.src_stages = None;
        self.dst_stages = None;
    }
}
