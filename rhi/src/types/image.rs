//! Image types and create infos.

use bitflags::bitflags;

use super::{Extent2d, Extent3d};

/// Image pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// No format. Never valid for resource creation.
    #[default]
    Unknown,

    // 8-bit formats
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit red channel, unsigned integer.
    R8Uint,

    // 16-bit formats
    /// 16-bit red channel, float.
    R16Float,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,

    // 32-bit formats
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 8-bit RGBA channels, unsigned normalized.
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,

    // 64-bit formats
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RG channels, float.
    Rg32Float,

    // 128-bit formats
    /// 32-bit RGBA channels, float.
    Rgba32Float,

    // Depth/stencil formats
    /// 16-bit depth.
    Depth16Unorm,
    /// 24-bit depth with 8-bit stencil.
    Depth24UnormStencil8,
    /// 32-bit depth, float.
    Depth32Float,
    /// 32-bit depth float with 8-bit stencil.
    Depth32FloatStencil8,
}

impl Format {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm
                | Self::Depth24UnormStencil8
                | Self::Depth32Float
                | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24UnormStencil8 | Self::Depth32FloatStencil8)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::R8Unorm | Self::R8Uint => 1,
            Self::R16Float | Self::Rg8Unorm | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Depth24UnormStencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float | Self::Rg32Float | Self::Depth32FloatStencil8 => 8,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Usage flags for images.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        /// Image can be copied from.
        const COPY_SRC = 1 << 0;
        /// Image can be copied to.
        const COPY_DST = 1 << 1;
        /// Image can be sampled in a shader.
        const SAMPLED = 1 << 2;
        /// Image can be used as a storage image.
        const STORAGE = 1 << 3;
        /// Image can be used as a color attachment.
        const COLOR_ATTACHMENT = 1 << 4;
        /// Image can be used as a depth/stencil attachment.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
    }
}

impl Default for ImageUsage {
    fn default() -> Self {
        Self::empty()
    }
}

impl ImageUsage {
    /// Returns true if the image can be bound as a render target.
    pub fn is_render_target(&self) -> bool {
        self.intersects(Self::COLOR_ATTACHMENT | Self::DEPTH_STENCIL_ATTACHMENT)
    }
}

/// Requested size of a graph-owned image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageSize {
    /// Literal size, used verbatim.
    Absolute(Extent3d),
    /// Size relative to the render target of the first pass using the image.
    RenderTargetRelative {
        /// Width as a fraction of the render target width.
        width_scale: f32,
        /// Height as a fraction of the render target height.
        height_scale: f32,
    },
}

impl ImageSize {
    /// Full render target size.
    pub const RENDER_TARGET: Self = Self::RenderTargetRelative {
        width_scale: 1.0,
        height_scale: 1.0,
    };

    /// Resolve to a concrete extent given the owning pass's render target size.
    pub fn resolve(&self, target: Extent2d) -> Extent3d {
        match *self {
            Self::Absolute(extent) => extent,
            Self::RenderTargetRelative {
                width_scale,
                height_scale,
            } => target.scaled(width_scale, height_scale).into(),
        }
    }

    /// Returns true if this size depends on the render target.
    pub fn is_relative(&self) -> bool {
        matches!(self, Self::RenderTargetRelative { .. })
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::RENDER_TARGET
    }
}

/// Parameters of a transient image attachment.
///
/// The size may be relative to the render target, so the physical
/// [`ImageDescriptor`] is only known once the graph is compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCreateInfo {
    /// Requested size.
    pub size: ImageSize,
    /// Pixel format.
    pub format: Format,
    /// Usage flags.
    pub usage: ImageUsage,
    /// Mip level count.
    pub mip_levels: u32,
    /// Array layer count.
    pub array_layers: u32,
    /// Sample count for multisampling.
    pub samples: u32,
}

impl ImageCreateInfo {
    /// Create a 2D image create info with a fixed size.
    pub fn new_2d(width: u32, height: u32, format: Format, usage: ImageUsage) -> Self {
        Self {
            size: ImageSize::Absolute(Extent3d::new_2d(width, height)),
            format,
            usage,
            mip_levels: 1,
            array_layers: 1,
            samples: 1,
        }
    }

    /// Create a render-target sized image create info.
    pub fn render_target(format: Format, usage: ImageUsage) -> Self {
        Self {
            size: ImageSize::RENDER_TARGET,
            format,
            usage,
            mip_levels: 1,
            array_layers: 1,
            samples: 1,
        }
    }

    /// Set the requested size.
    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_levels = count;
        self
    }

    /// Set the array layer count.
    pub fn with_array_layers(mut self, count: u32) -> Self {
        self.array_layers = count;
        self
    }

    /// Set the sample count for multisampling.
    pub fn with_samples(mut self, count: u32) -> Self {
        self.samples = count;
        self
    }

    /// Check the create info, panicking on invalid parameters.
    pub fn validate(&self) {
        assert!(
            self.format != Format::Unknown,
            "image create info has an unknown format"
        );
        assert!(!self.usage.is_empty(), "image create info has no usage flags");
        assert!(self.samples != 0, "image create info has a zero sample count");
        assert!(self.mip_levels != 0, "image create info has zero mip levels");
        assert!(
            self.array_layers != 0,
            "image create info has zero array layers"
        );
        match self.size {
            ImageSize::Absolute(extent) => {
                assert!(!extent.is_empty(), "image create info has a zero extent")
            }
            ImageSize::RenderTargetRelative {
                width_scale,
                height_scale,
            } => {
                assert!(
                    self.usage.is_render_target(),
                    "render-target relative image without a render target usage"
                );
                assert!(
                    width_scale > 0.0 && height_scale > 0.0,
                    "render-target relative image with a non-positive scale"
                );
                assert!(
                    width_scale.is_finite() && height_scale.is_finite(),
                    "render-target relative image with a non-finite scale"
                );
            }
        }
    }

    /// Resolve into a physical descriptor given the owning pass's target size.
    pub fn resolve(&self, target: Extent2d) -> ImageDescriptor {
        ImageDescriptor {
            extent: self.size.resolve(target),
            format: self.format,
            usage: self.usage,
            mip_levels: self.mip_levels,
            array_layers: self.array_layers,
            samples: self.samples,
        }
    }
}

/// Physical description of an image, as passed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    /// Size in pixels.
    pub extent: Extent3d,
    /// Pixel format.
    pub format: Format,
    /// Usage flags.
    pub usage: ImageUsage,
    /// Mip level count.
    pub mip_levels: u32,
    /// Array layer count.
    pub array_layers: u32,
    /// Sample count.
    pub samples: u32,
}

impl ImageDescriptor {
    /// Create a single-mip, single-layer 2D image descriptor.
    pub fn new_2d(width: u32, height: u32, format: Format, usage: ImageUsage) -> Self {
        Self {
            extent: Extent3d::new_2d(width, height),
            format,
            usage,
            mip_levels: 1,
            array_layers: 1,
            samples: 1,
        }
    }

    /// Check the descriptor, panicking on invalid parameters.
    pub fn validate(&self) {
        assert!(
            self.format != Format::Unknown,
            "image descriptor has an unknown format"
        );
        assert!(!self.usage.is_empty(), "image descriptor has no usage flags");
        assert!(self.samples != 0, "image descriptor has a zero sample count");
        assert!(self.mip_levels != 0, "image descriptor has zero mip levels");
        assert!(
            self.array_layers != 0,
            "image descriptor has zero array layers"
        );
        assert!(!self.extent.is_empty(), "image descriptor has a zero extent");
    }

    /// Approximate memory footprint in bytes, including the mip chain.
    pub fn size_in_bytes(&self) -> u64 {
        let mut total = 0u64;
        let (mut w, mut h, mut d) = (
            self.extent.width as u64,
            self.extent.height as u64,
            self.extent.depth as u64,
        );
        for _ in 0..self.mip_levels {
            total += w * h * d;
            w = (w / 2).max(1);
            h = (h / 2).max(1);
            d = (d / 2).max(1);
        }
        total * self.format.block_size() as u64 * self.array_layers as u64 * self.samples as u64
    }
}
