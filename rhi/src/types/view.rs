//! View descriptions.
//!
//! Views are deduplicated by content, so every type here is `Hash + Eq`.

use bitflags::bitflags;

use super::Format;

/// Use all remaining mip levels or array layers.
pub const REMAINING: u32 = u32::MAX;

bitflags! {
    /// Image aspects selected by a view.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspect: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Dimensionality of an image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageViewType {
    D1,
    #[default]
    D2,
    D2Array,
    D3,
    Cube,
}

/// Swizzle applied to a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentSwizzle {
    #[default]
    Identity,
    Zero,
    One,
    R,
    G,
    B,
    A,
}

/// Per-channel swizzle of an image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentMapping {
    pub r: ComponentSwizzle,
    pub g: ComponentSwizzle,
    pub b: ComponentSwizzle,
    pub a: ComponentSwizzle,
}

/// Range of mips and layers selected by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSubresourceRange {
    pub aspect: ImageAspect,
    pub base_mip_level: u32,
    pub mip_level_count: u32,
    pub base_array_layer: u32,
    pub array_layer_count: u32,
}

impl ImageSubresourceRange {
    /// Every mip and layer of the given aspect.
    pub const fn all(aspect: ImageAspect) -> Self {
        Self {
            aspect,
            base_mip_level: 0,
            mip_level_count: REMAINING,
            base_array_layer: 0,
            array_layer_count: REMAINING,
        }
    }
}

impl Default for ImageSubresourceRange {
    fn default() -> Self {
        Self::all(ImageAspect::COLOR)
    }
}

/// Description of an image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageViewInfo {
    pub view_type: ImageViewType,
    pub subresource: ImageSubresourceRange,
    pub components: ComponentMapping,
}

impl ImageViewInfo {
    /// Full color view.
    pub fn color() -> Self {
        Self::default()
    }

    /// Full depth view.
    pub fn depth() -> Self {
        Self {
            subresource: ImageSubresourceRange::all(ImageAspect::DEPTH),
            ..Default::default()
        }
    }

    /// Full depth and stencil view.
    pub fn depth_stencil() -> Self {
        Self {
            subresource: ImageSubresourceRange::all(ImageAspect::DEPTH | ImageAspect::STENCIL),
            ..Default::default()
        }
    }

    /// Full view matching the aspects of `format`.
    pub fn for_format(format: Format) -> Self {
        if format.has_stencil() {
            Self::depth_stencil()
        } else if format.is_depth_stencil() {
            Self::depth()
        } else {
            Self::color()
        }
    }

    /// Restrict the view to a single mip level.
    pub fn with_mip(mut self, mip: u32) -> Self {
        self.subresource.base_mip_level = mip;
        self.subresource.mip_level_count = 1;
        self
    }

    /// Restrict the view to a single array layer.
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.subresource.base_array_layer = layer;
        self.subresource.array_layer_count = 1;
        self
    }

    /// Set the component mapping.
    pub fn with_components(mut self, components: ComponentMapping) -> Self {
        self.components = components;
        self
    }
}

/// Description of a buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferViewInfo {
    /// Element format for texel buffers, `Unknown` for raw buffers.
    pub format: Format,
    /// Byte offset into the buffer.
    pub offset: u64,
    /// Byte size of the view, `None` for the rest of the buffer.
    pub size: Option<u64>,
}

impl BufferViewInfo {
    /// View of the whole buffer.
    pub fn whole() -> Self {
        Self::default()
    }

    /// View of a byte range.
    pub fn range(offset: u64, size: u64) -> Self {
        Self {
            format: Format::Unknown,
            offset,
            size: Some(size),
        }
    }

    /// Set the texel format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_for_format() {
        assert_eq!(
            ImageViewInfo::for_format(Format::Rgba8Unorm).subresource.aspect,
            ImageAspect::COLOR
        );
        assert_eq!(
            ImageViewInfo::for_format(Format::Depth32Float).subresource.aspect,
            ImageAspect::DEPTH
        );
        assert_eq!(
            ImageViewInfo::for_format(Format::Depth24UnormStencil8)
                .subresource
                .aspect,
            ImageAspect::DEPTH | ImageAspect::STENCIL
        );
    }

    #[test]
    fn test_views_differ_by_mip() {
        let full = ImageViewInfo::color();
        let mip1 = ImageViewInfo::color().with_mip(1);
        assert_ne!(full, mip1);
        assert_eq!(mip1.subresource.mip_level_count, 1);
    }
}
