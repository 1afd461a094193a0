//! Common types and descriptors for RHI resources.
//!
//! This module contains format enums, usage flags, create infos and view
//! descriptions used throughout the frame scheduler and backends.

mod buffer;
mod common;
mod image;
mod view;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{
    ClearValue, ColorValue, DepthStencilValue, Extent2d, Extent3d, LoadOp, QueueType, StoreOp,
};
pub use image::{Format, ImageCreateInfo, ImageDescriptor, ImageSize, ImageUsage};
pub use view::{
    BufferViewInfo, ComponentMapping, ComponentSwizzle, ImageAspect, ImageSubresourceRange,
    ImageViewInfo, ImageViewType, REMAINING,
};
