//! Pass attachments: one use of one attachment by one pass.
//!
//! Every pass attachment is a node in its attachment's use-chain, a doubly
//! linked list threaded through the scheduler's node arena in submission
//! order. The head of the chain (`prev == None`) is where a transient
//! attachment is allocated and the tail (`next == None`) is where it is
//! released. Barriers are computed from each node's predecessor.

use slotmap::SlotMap;

use crate::backend::{BufferViewHandle, ImageViewHandle};
use crate::types::{BufferViewInfo, ClearValue, ImageViewInfo, LoadOp, StoreOp};

use super::handle::{AttachmentHandle, PassAttachmentHandle, PassHandle};

/// How a pass accesses an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentAccess {
    Read,
    Write,
    ReadWrite,
}

impl AttachmentAccess {
    /// Check if this access reads the attachment.
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Check if this access writes the attachment.
    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// What a pass uses an attachment for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentUsage {
    /// Color render target (images).
    Color,
    /// Depth/stencil render target (images).
    DepthStencil,
    /// Multisample resolve target (images).
    Resolve,
    /// Sampled image or uniform buffer, read-only.
    ShaderResource,
    /// Storage image or storage buffer.
    ShaderStorage,
    /// Source of a copy.
    CopySource,
    /// Destination of a copy.
    CopyDestination,
    /// Vertex or index input (buffers).
    VertexInput,
}

impl AttachmentUsage {
    /// Returns true if the usage is valid for images.
    pub fn is_image_usage(self) -> bool {
        !matches!(self, Self::VertexInput)
    }

    /// Returns true if the usage is valid for buffers.
    pub fn is_buffer_usage(self) -> bool {
        !matches!(self, Self::Color | Self::DepthStencil | Self::Resolve)
    }

    /// Returns true if `access` is meaningful for this usage.
    pub fn allows(self, access: AttachmentAccess) -> bool {
        match self {
            Self::Color | Self::DepthStencil | Self::ShaderStorage => true,
            Self::ShaderResource | Self::CopySource | Self::VertexInput => {
                access == AttachmentAccess::Read
            }
            Self::CopyDestination | Self::Resolve => access == AttachmentAccess::Write,
        }
    }
}

/// Usage and access of one node, as recorded in barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentUse {
    pub usage: AttachmentUsage,
    pub access: AttachmentAccess,
}

/// How a pass uses an image attachment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageUseInfo {
    pub usage: AttachmentUsage,
    pub access: AttachmentAccess,
    pub view: ImageViewInfo,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

impl ImageUseInfo {
    /// Create a use with a full color view and load/store defaults.
    pub fn new(usage: AttachmentUsage, access: AttachmentAccess) -> Self {
        Self {
            usage,
            access,
            view: ImageViewInfo::color(),
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
        }
    }

    /// Write as a color render target, clearing to `clear`.
    pub fn color_output(clear: ClearValue) -> Self {
        Self::new(AttachmentUsage::Color, AttachmentAccess::Write).with_load_op(LoadOp::Clear(clear))
    }

    /// Blend into an existing color render target.
    pub fn color_blend() -> Self {
        Self::new(AttachmentUsage::Color, AttachmentAccess::ReadWrite)
    }

    /// Write as a depth render target, clearing to `clear`.
    pub fn depth_output(clear: ClearValue) -> Self {
        Self::new(AttachmentUsage::DepthStencil, AttachmentAccess::Write)
            .with_view(ImageViewInfo::depth())
            .with_load_op(LoadOp::Clear(clear))
    }

    /// Depth test against an existing depth buffer without writing it.
    pub fn depth_read() -> Self {
        Self::new(AttachmentUsage::DepthStencil, AttachmentAccess::Read)
            .with_view(ImageViewInfo::depth())
    }

    /// Resolve a multisampled color target into this image.
    pub fn resolve_output() -> Self {
        Self::new(AttachmentUsage::Resolve, AttachmentAccess::Write)
            .with_load_op(LoadOp::DontCare)
    }

    /// Sample in a shader.
    pub fn shader_read() -> Self {
        Self::new(AttachmentUsage::ShaderResource, AttachmentAccess::Read)
    }

    /// Bind as a storage image.
    pub fn storage(access: AttachmentAccess) -> Self {
        Self::new(AttachmentUsage::ShaderStorage, access)
    }

    /// Copy from.
    pub fn copy_source() -> Self {
        Self::new(AttachmentUsage::CopySource, AttachmentAccess::Read)
    }

    /// Copy into.
    pub fn copy_destination() -> Self {
        Self::new(AttachmentUsage::CopyDestination, AttachmentAccess::Write)
    }

    /// Set the view description.
    pub fn with_view(mut self, view: ImageViewInfo) -> Self {
        self.view = view;
        self
    }

    /// Set the load operation.
    pub fn with_load_op(mut self, load_op: LoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    /// Set the store operation.
    pub fn with_store_op(mut self, store_op: StoreOp) -> Self {
        self.store_op = store_op;
        self
    }
}

/// How a pass uses a buffer attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferUseInfo {
    pub usage: AttachmentUsage,
    pub access: AttachmentAccess,
    pub view: BufferViewInfo,
}

impl BufferUseInfo {
    /// Create a use covering the whole buffer.
    pub fn new(usage: AttachmentUsage, access: AttachmentAccess) -> Self {
        Self {
            usage,
            access,
            view: BufferViewInfo::whole(),
        }
    }

    /// Read in a shader.
    pub fn shader_read() -> Self {
        Self::new(AttachmentUsage::ShaderResource, AttachmentAccess::Read)
    }

    /// Bind as a storage buffer.
    pub fn storage(access: AttachmentAccess) -> Self {
        Self::new(AttachmentUsage::ShaderStorage, access)
    }

    /// Bind as vertex or index input.
    pub fn vertex_input() -> Self {
        Self::new(AttachmentUsage::VertexInput, AttachmentAccess::Read)
    }

    /// Copy from.
    pub fn copy_source() -> Self {
        Self::new(AttachmentUsage::CopySource, AttachmentAccess::Read)
    }

    /// Copy into.
    pub fn copy_destination() -> Self {
        Self::new(AttachmentUsage::CopyDestination, AttachmentAccess::Write)
    }

    /// Set the view description.
    pub fn with_view(mut self, view: BufferViewInfo) -> Self {
        self.view = view;
        self
    }
}

/// View requested by a pass attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewInfo {
    Image(ImageViewInfo),
    Buffer(BufferViewInfo),
}

/// View resolved for a pass attachment at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedView {
    Image(ImageViewHandle),
    Buffer(BufferViewHandle),
}

impl ResolvedView {
    /// The image view, if this is one.
    pub fn image(self) -> Option<ImageViewHandle> {
        match self {
            Self::Image(view) => Some(view),
            Self::Buffer(_) => None,
        }
    }

    /// The buffer view, if this is one.
    pub fn buffer(self) -> Option<BufferViewHandle> {
        match self {
            Self::Buffer(view) => Some(view),
            Self::Image(_) => None,
        }
    }
}

/// One use of one attachment by one pass.
#[derive(Debug, Clone)]
pub struct PassAttachment {
    pub(crate) pass: PassHandle,
    pub(crate) attachment: AttachmentHandle,
    pub(crate) usage: AttachmentUsage,
    pub(crate) access: AttachmentAccess,
    pub(crate) view_info: ViewInfo,
    pub(crate) load_op: LoadOp,
    pub(crate) store_op: StoreOp,
    pub(crate) view: Option<ResolvedView>,
    pub(crate) prev: Option<PassAttachmentHandle>,
    pub(crate) next: Option<PassAttachmentHandle>,
}

impl PassAttachment {
    pub(crate) fn from_image_use(
        pass: PassHandle,
        attachment: AttachmentHandle,
        info: &ImageUseInfo,
    ) -> Self {
        Self {
            pass,
            attachment,
            usage: info.usage,
            access: info.access,
            view_info: ViewInfo::Image(info.view),
            load_op: info.load_op,
            store_op: info.store_op,
            view: None,
            prev: None,
            next: None,
        }
    }

    pub(crate) fn from_buffer_use(
        pass: PassHandle,
        attachment: AttachmentHandle,
        info: &BufferUseInfo,
    ) -> Self {
        Self {
            pass,
            attachment,
            usage: info.usage,
            access: info.access,
            view_info: ViewInfo::Buffer(info.view),
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
            view: None,
            prev: None,
            next: None,
        }
    }

    /// The pass this use belongs to.
    pub fn pass(&self) -> PassHandle {
        self.pass
    }

    /// The attachment being used.
    pub fn attachment(&self) -> AttachmentHandle {
        self.attachment
    }

    pub fn usage(&self) -> AttachmentUsage {
        self.usage
    }

    pub fn access(&self) -> AttachmentAccess {
        self.access
    }

    /// Usage and access together.
    pub fn attachment_use(&self) -> AttachmentUse {
        AttachmentUse {
            usage: self.usage,
            access: self.access,
        }
    }

    /// Requested view.
    pub fn view_info(&self) -> &ViewInfo {
        &self.view_info
    }

    pub fn load_op(&self) -> LoadOp {
        self.load_op
    }

    pub fn store_op(&self) -> StoreOp {
        self.store_op
    }

    /// View resolved at compile time.
    pub fn view(&self) -> Option<ResolvedView> {
        self.view
    }

    /// Previous use of the same attachment.
    pub fn prev(&self) -> Option<PassAttachmentHandle> {
        self.prev
    }

    /// Next use of the same attachment.
    pub fn next(&self) -> Option<PassAttachmentHandle> {
        self.next
    }

    /// Returns true if this is the first use of the attachment this frame.
    pub fn is_first_use(&self) -> bool {
        self.prev.is_none()
    }

    /// Returns true if this is the last use of the attachment this frame.
    pub fn is_last_use(&self) -> bool {
        self.next.is_none()
    }
}

/// Arena owning every pass attachment of the current frame.
pub(crate) type PassAttachmentArena = SlotMap<PassAttachmentHandle, PassAttachment>;

/// Iterator over a use-chain, head to tail.
pub struct ChainIter<'a> {
    nodes: &'a PassAttachmentArena,
    cursor: Option<PassAttachmentHandle>,
}

impl<'a> ChainIter<'a> {
    pub(crate) fn new(nodes: &'a PassAttachmentArena, head: Option<PassAttachmentHandle>) -> Self {
        Self {
            nodes,
            cursor: head,
        }
    }
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = (PassAttachmentHandle, &'a PassAttachment);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let node = self.nodes.get(handle)?;
        self.cursor = node.next;
        Some((handle, node))
    }
}

/// Walk back from `node` to the closest earlier use that writes the attachment.
pub(crate) fn last_writer_before(
    nodes: &PassAttachmentArena,
    node: PassAttachmentHandle,
) -> Option<PassAttachmentHandle> {
    let mut cursor = nodes.get(node)?.prev;
    while let Some(handle) = cursor {
        let candidate = nodes.get(handle)?;
        if candidate.access.writes() {
            return Some(handle);
        }
        cursor = candidate.prev;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn pass(id: u64) -> PassHandle {
        PassHandle::from(KeyData::from_ffi(id))
    }

    fn attachment() -> AttachmentHandle {
        AttachmentHandle::from(KeyData::from_ffi(1))
    }

    /// Build a chain by hand, linking nodes in insertion order.
    fn chain(
        nodes: &mut PassAttachmentArena,
        uses: &[(u64, ImageUseInfo)],
    ) -> Vec<PassAttachmentHandle> {
        let mut handles: Vec<PassAttachmentHandle> = Vec::new();
        for (pass_id, info) in uses {
            let mut node = PassAttachment::from_image_use(pass(*pass_id), attachment(), info);
            node.prev = handles.last().copied();
            let handle = nodes.insert(node);
            if let Some(prev) = handles.last() {
                nodes[*prev].next = Some(handle);
            }
            handles.push(handle);
        }
        handles
    }

    #[test]
    fn test_access_reads_writes() {
        assert!(AttachmentAccess::Read.reads());
        assert!(!AttachmentAccess::Read.writes());
        assert!(AttachmentAccess::Write.writes());
        assert!(AttachmentAccess::ReadWrite.reads() && AttachmentAccess::ReadWrite.writes());
    }

    #[test]
    fn test_usage_access_rules() {
        assert!(AttachmentUsage::ShaderResource.allows(AttachmentAccess::Read));
        assert!(!AttachmentUsage::ShaderResource.allows(AttachmentAccess::Write));
        assert!(!AttachmentUsage::CopyDestination.allows(AttachmentAccess::Read));
        assert!(AttachmentUsage::ShaderStorage.allows(AttachmentAccess::ReadWrite));
        assert!(!AttachmentUsage::Color.is_buffer_usage());
        assert!(!AttachmentUsage::VertexInput.is_image_usage());
    }

    #[test]
    fn test_chain_iteration_order() {
        let mut nodes = PassAttachmentArena::with_key();
        let handles = chain(
            &mut nodes,
            &[
                (1, ImageUseInfo::color_output(ClearValue::color(0.0, 0.0, 0.0, 1.0))),
                (2, ImageUseInfo::shader_read()),
                (3, ImageUseInfo::shader_read()),
            ],
        );

        let visited: Vec<_> = ChainIter::new(&nodes, Some(handles[0]))
            .map(|(_, node)| node.pass())
            .collect();
        assert_eq!(visited, vec![pass(1), pass(2), pass(3)]);
        assert!(nodes[handles[0]].is_first_use());
        assert!(nodes[handles[2]].is_last_use());
    }

    #[test]
    fn test_last_writer_before() {
        let mut nodes = PassAttachmentArena::with_key();
        let handles = chain(
            &mut nodes,
            &[
                (1, ImageUseInfo::color_output(ClearValue::color(0.0, 0.0, 0.0, 1.0))),
                (2, ImageUseInfo::shader_read()),
                (3, ImageUseInfo::shader_read()),
            ],
        );
        assert_eq!(last_writer_before(&nodes, handles[2]), Some(handles[0]));
        assert_eq!(last_writer_before(&nodes, handles[0]), None);
    }

    #[test]
    fn test_image_use_builders() {
        let depth = ImageUseInfo::depth_output(ClearValue::depth(1.0));
        assert_eq!(depth.usage, AttachmentUsage::DepthStencil);
        assert!(depth.access.writes());
        assert_eq!(depth.view, ImageViewInfo::depth());
        assert!(matches!(depth.load_op, LoadOp::Clear(_)));

        let read = ImageUseInfo::shader_read().with_view(ImageViewInfo::color().with_mip(2));
        assert_eq!(read.view.subresource.base_mip_level, 2);
    }
}
