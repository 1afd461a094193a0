//! Passes and the context handed to their execute callbacks.
//!
//! A [`Pass`] is a named unit of GPU work on one queue. It is created fresh
//! every frame, collects attachment uses while recording and is replayed once
//! by the scheduler at the end of the frame.

use smallvec::SmallVec;

use crate::backend::{BufferHandle, BufferViewHandle, ImageHandle, ImageViewHandle, SemaphoreWait};
use crate::command::CommandList;
use crate::types::{Extent2d, QueueType};

use super::attachment::PhysicalResource;
use super::barrier::BarrierBatch;
use super::handle::{AttachmentHandle, PassAttachmentHandle};
use super::pass_attachment::{AttachmentUsage, ResolvedView};

/// Per-frame lifecycle of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassState {
    /// Accepting attachment uses.
    Recording,
    /// Appended to the frame's execution order.
    Submitted,
    /// Barriers, views and waits computed.
    Compiled,
    /// Commands recorded and submitted to the GPU.
    Executed,
}

/// Render area of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassSize {
    /// Fixed size in pixels.
    Absolute(Extent2d),
    /// Fraction of the frame extent (1.0 = full frame).
    RenderTargetRelative { width_scale: f32, height_scale: f32 },
}

impl Default for PassSize {
    fn default() -> Self {
        Self::RenderTargetRelative {
            width_scale: 1.0,
            height_scale: 1.0,
        }
    }
}

impl PassSize {
    /// Resolve against the frame extent.
    pub fn resolve(&self, frame_extent: Extent2d) -> Extent2d {
        match *self {
            Self::Absolute(extent) => extent,
            Self::RenderTargetRelative {
                width_scale,
                height_scale,
            } => frame_extent.scaled(width_scale, height_scale),
        }
    }
}

/// Callback recording a pass's commands.
pub type ExecuteFn = Box<dyn FnOnce(&mut PassContext<'_>) + Send>;

/// Physical resource and view bound to one use of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassResource {
    pub attachment: AttachmentHandle,
    pub resource: PhysicalResource,
    pub view: Option<ResolvedView>,
}

/// Everything an execute callback can see while recording.
pub struct PassContext<'a> {
    name: &'a str,
    queue: QueueType,
    extent: Extent2d,
    resources: &'a [PassResource],
    command_list: &'a mut dyn CommandList,
}

impl<'a> PassContext<'a> {
    pub(crate) fn new(
        name: &'a str,
        queue: QueueType,
        extent: Extent2d,
        resources: &'a [PassResource],
        command_list: &'a mut dyn CommandList,
    ) -> Self {
        Self {
            name,
            queue,
            extent,
            resources,
            command_list,
        }
    }

    /// Name of the pass being recorded.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// Render area of the pass.
    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    /// Command list of the pass.
    pub fn command_list(&mut self) -> &mut dyn CommandList {
        &mut *self.command_list
    }

    fn lookup(&self, attachment: AttachmentHandle) -> Option<&PassResource> {
        self.resources.iter().find(|r| r.attachment == attachment)
    }

    /// Image bound to an attachment used by this pass.
    pub fn image(&self, attachment: AttachmentHandle) -> Option<ImageHandle> {
        match self.lookup(attachment)?.resource {
            PhysicalResource::Image(image) => Some(image),
            PhysicalResource::Buffer(_) => None,
        }
    }

    /// Buffer bound to an attachment used by this pass.
    pub fn buffer(&self, attachment: AttachmentHandle) -> Option<BufferHandle> {
        match self.lookup(attachment)?.resource {
            PhysicalResource::Buffer(buffer) => Some(buffer),
            PhysicalResource::Image(_) => None,
        }
    }

    /// Image view resolved for an attachment used by this pass.
    pub fn image_view(&self, attachment: AttachmentHandle) -> Option<ImageViewHandle> {
        self.lookup(attachment)?.view?.image()
    }

    /// Buffer view resolved for an attachment used by this pass.
    pub fn buffer_view(&self, attachment: AttachmentHandle) -> Option<BufferViewHandle> {
        self.lookup(attachment)?.view?.buffer()
    }
}

/// A named unit of GPU work on one queue.
pub struct Pass {
    name: String,
    queue: QueueType,
    size: PassSize,
    pub(crate) state: PassState,
    pub(crate) uses: SmallVec<[PassAttachmentHandle; 8]>,
    pub(crate) color: SmallVec<[PassAttachmentHandle; 4]>,
    pub(crate) resolve: SmallVec<[PassAttachmentHandle; 4]>,
    pub(crate) depth_stencil: Option<PassAttachmentHandle>,
    pub(crate) shader_resources: SmallVec<[PassAttachmentHandle; 4]>,
    pub(crate) storage: SmallVec<[PassAttachmentHandle; 4]>,
    pub(crate) copy_sources: SmallVec<[PassAttachmentHandle; 2]>,
    pub(crate) copy_destinations: SmallVec<[PassAttachmentHandle; 2]>,
    pub(crate) vertex_inputs: SmallVec<[PassAttachmentHandle; 2]>,
    pub(crate) execute: Option<ExecuteFn>,
    pub(crate) barriers: BarrierBatch,
    /// Transitions emitted after the pass, such as the final present layout.
    pub(crate) post_barriers: BarrierBatch,
    pub(crate) waits: SmallVec<[SemaphoreWait; 2]>,
    pub(crate) signal_value: u64,
    pub(crate) extent: Extent2d,
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("queue", &self.queue)
            .field("state", &self.state)
            .field("uses", &self.uses.len())
            .field("has_execute", &self.execute.is_some())
            .finish()
    }
}

impl Pass {
    pub(crate) fn new(name: String, queue: QueueType) -> Self {
        Self {
            name,
            queue,
            size: PassSize::default(),
            state: PassState::Recording,
            uses: SmallVec::new(),
            color: SmallVec::new(),
            resolve: SmallVec::new(),
            depth_stencil: None,
            shader_resources: SmallVec::new(),
            storage: SmallVec::new(),
            copy_sources: SmallVec::new(),
            copy_destinations: SmallVec::new(),
            vertex_inputs: SmallVec::new(),
            execute: None,
            barriers: BarrierBatch::new(),
            post_barriers: BarrierBatch::new(),
            waits: SmallVec::new(),
            signal_value: 0,
            extent: Extent2d::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue(&self) -> QueueType {
        self.queue
    }

    pub fn size(&self) -> PassSize {
        self.size
    }

    pub(crate) fn set_size(&mut self, size: PassSize) {
        if let PassSize::RenderTargetRelative {
            width_scale,
            height_scale,
        } = size
        {
            assert!(
                width_scale > 0.0 && height_scale > 0.0,
                "pass '{}' has a non-positive size scale",
                self.name
            );
            assert!(
                width_scale.is_finite() && height_scale.is_finite(),
                "pass '{}' has a non-finite size scale",
                self.name
            );
        }
        if let PassSize::Absolute(extent) = size {
            assert!(!extent.is_empty(), "pass '{}' has a zero extent", self.name);
        }
        self.size = size;
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// Render area resolved at compile time.
    pub fn extent(&self) -> Extent2d {
        self.extent
    }

    /// Every use of the pass in declaration order.
    pub fn uses(&self) -> &[PassAttachmentHandle] {
        &self.uses
    }

    pub fn color_attachments(&self) -> &[PassAttachmentHandle] {
        &self.color
    }

    pub fn resolve_attachments(&self) -> &[PassAttachmentHandle] {
        &self.resolve
    }

    pub fn depth_stencil_attachment(&self) -> Option<PassAttachmentHandle> {
        self.depth_stencil
    }

    pub fn shader_resources(&self) -> &[PassAttachmentHandle] {
        &self.shader_resources
    }

    pub fn storage(&self) -> &[PassAttachmentHandle] {
        &self.storage
    }

    pub fn copy_sources(&self) -> &[PassAttachmentHandle] {
        &self.copy_sources
    }

    pub fn copy_destinations(&self) -> &[PassAttachmentHandle] {
        &self.copy_destinations
    }

    pub fn vertex_inputs(&self) -> &[PassAttachmentHandle] {
        &self.vertex_inputs
    }

    /// Returns true if the pass binds render targets.
    pub fn has_render_targets(&self) -> bool {
        !self.color.is_empty() || self.depth_stencil.is_some()
    }

    pub fn has_execute(&self) -> bool {
        self.execute.is_some()
    }

    /// Barriers emitted before the pass.
    pub fn barriers(&self) -> &BarrierBatch {
        &self.barriers
    }

    /// Barriers emitted after the pass.
    pub fn post_barriers(&self) -> &BarrierBatch {
        &self.post_barriers
    }

    /// Cross-queue waits of the pass.
    pub fn waits(&self) -> &[SemaphoreWait] {
        &self.waits
    }

    /// Timeline value the pass signals on its queue.
    pub fn signal_value(&self) -> u64 {
        self.signal_value
    }

    /// File a new use into the per-usage lists.
    pub(crate) fn record_use(&mut self, node: PassAttachmentHandle, usage: AttachmentUsage) {
        match usage {
            AttachmentUsage::Color => self.color.push(node),
            AttachmentUsage::Resolve => self.resolve.push(node),
            AttachmentUsage::DepthStencil => {
                assert!(
                    self.depth_stencil.is_none(),
                    "pass '{}' already has a depth-stencil attachment",
                    self.name
                );
                self.depth_stencil = Some(node);
            }
            AttachmentUsage::ShaderResource => self.shader_resources.push(node),
            AttachmentUsage::ShaderStorage => self.storage.push(node),
            AttachmentUsage::CopySource => self.copy_sources.push(node),
            AttachmentUsage::CopyDestination => self.copy_destinations.push(node),
            AttachmentUsage::VertexInput => self.vertex_inputs.push(node),
        }
        self.uses.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn node(id: u64) -> PassAttachmentHandle {
        PassAttachmentHandle::from(KeyData::from_ffi(id))
    }

    #[test]
    fn test_pass_size_resolve() {
        let frame = Extent2d::new(1600, 1200);
        assert_eq!(PassSize::default().resolve(frame), frame);
        assert_eq!(
            PassSize::RenderTargetRelative {
                width_scale: 0.5,
                height_scale: 0.5
            }
            .resolve(frame),
            Extent2d::new(800, 600)
        );
        assert_eq!(
            PassSize::Absolute(Extent2d::new(256, 256)).resolve(frame),
            Extent2d::new(256, 256)
        );
    }

    #[test]
    fn test_record_use_classifies() {
        let mut pass = Pass::new("lighting".to_string(), QueueType::Graphics);
        pass.record_use(node(1), AttachmentUsage::Color);
        pass.record_use(node(2), AttachmentUsage::DepthStencil);
        pass.record_use(node(3), AttachmentUsage::ShaderResource);
        pass.record_use(node(4), AttachmentUsage::ShaderResource);

        assert_eq!(pass.color_attachments(), &[node(1)]);
        assert_eq!(pass.depth_stencil_attachment(), Some(node(2)));
        assert_eq!(pass.shader_resources(), &[node(3), node(4)]);
        assert_eq!(pass.uses().len(), 4);
        assert!(pass.has_render_targets());
        assert_eq!(pass.state(), PassState::Recording);
    }

    #[test]
    #[should_panic(expected = "already has a depth-stencil attachment")]
    fn test_second_depth_stencil_panics() {
        let mut pass = Pass::new("depth".to_string(), QueueType::Graphics);
        pass.record_use(node(1), AttachmentUsage::DepthStencil);
        pass.record_use(node(2), AttachmentUsage::DepthStencil);
    }

    #[test]
    #[should_panic(expected = "non-finite size scale")]
    fn test_infinite_size_scale_panics() {
        let mut pass = Pass::new("huge".to_string(), QueueType::Graphics);
        pass.set_size(PassSize::RenderTargetRelative {
            width_scale: 1.0,
            height_scale: f32::INFINITY,
        });
    }

    #[test]
    #[should_panic(expected = "zero extent")]
    fn test_zero_absolute_size_panics() {
        let mut pass = Pass::new("empty".to_string(), QueueType::Compute);
        pass.set_size(PassSize::Absolute(Extent2d::new(0, 16)));
    }
}
