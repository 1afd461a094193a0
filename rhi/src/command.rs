//! Command list abstraction.
//!
//! A [`CommandList`] is an opaque recorder owned by the backend. The frame
//! scheduler begins and ends it, emits the barriers and render target setup
//! computed for a pass, and hands it to the pass's execute callback in
//! between. Pipeline and descriptor binding belong to the callback and are
//! outside the scope of this trait.

use std::any::Any;

use smallvec::SmallVec;

use crate::backend::{BufferHandle, ImageHandle, ImageViewHandle};
use crate::graph::{BarrierBatch, ImageLayout};
use crate::types::{Extent2d, Extent3d, LoadOp, QueueType, StoreOp};

/// One render target bound for a graphics pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderingAttachment {
    pub view: ImageViewHandle,
    pub layout: ImageLayout,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

/// Render target setup of a graphics pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderingInfo {
    /// Render area.
    pub extent: Extent2d,
    /// Color targets in declaration order.
    pub color_attachments: SmallVec<[RenderingAttachment; 4]>,
    /// Multisample resolve targets in declaration order.
    pub resolve_attachments: SmallVec<[RenderingAttachment; 4]>,
    /// Optional depth/stencil target.
    pub depth_stencil_attachment: Option<RenderingAttachment>,
}

/// GPU command recorder.
pub trait CommandList: Send {
    /// Queue this command list was allocated for.
    fn queue(&self) -> QueueType;

    /// Start recording.
    fn begin(&mut self);

    /// Finish recording.
    fn end(&mut self);

    /// Emit a batch of barriers as a single pipeline barrier.
    fn pipeline_barrier(&mut self, batch: &BarrierBatch);

    /// Begin rendering into the given targets.
    fn begin_rendering(&mut self, info: &RenderingInfo);

    /// End rendering.
    fn end_rendering(&mut self);

    /// Draw non-indexed primitives.
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    /// Draw indexed primitives.
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    /// Dispatch compute work groups.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Copy bytes between buffers.
    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, size: u64);

    /// Copy a region between images.
    fn copy_image(&mut self, src: ImageHandle, dst: ImageHandle, extent: Extent3d);

    /// Copy buffer contents into an image.
    fn copy_buffer_to_image(&mut self, src: BufferHandle, dst: ImageHandle, extent: Extent3d);

    /// Convert into `Any` so the owning backend can recover its concrete type
    /// on submit.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}
