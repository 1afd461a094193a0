//! Common types shared across the RHI.

/// 2D extent for render targets and swapchains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2d {
    /// Create a new 2D extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Scale both dimensions, rounding to the nearest pixel and clamping to 1.
    pub fn scaled(&self, width_scale: f32, height_scale: f32) -> Self {
        let scale = |value: u32, factor: f32| ((value as f32 * factor).round() as u32).max(1);
        Self {
            width: scale(self.width, width_scale),
            height: scale(self.height, height_scale),
        }
    }
}

/// 3D extent for images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth in pixels (1 for 2D images).
    pub depth: u32,
}

impl Extent3d {
    /// Create a new 2D extent.
    pub const fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// Create a new 3D extent.
    pub const fn new_3d(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Returns true if any dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    /// The width and height of this extent.
    pub fn to_2d(&self) -> Extent2d {
        Extent2d::new(self.width, self.height)
    }
}

impl From<Extent2d> for Extent3d {
    fn from(extent: Extent2d) -> Self {
        Self::new_2d(extent.width, extent.height)
    }
}

/// GPU queue a pass is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueueType {
    /// Graphics queue (also capable of compute and transfer).
    #[default]
    Graphics,
    /// Asynchronous compute queue.
    Compute,
    /// Dedicated transfer queue.
    Transfer,
}

impl QueueType {
    /// All queue types, in index order.
    pub const ALL: [QueueType; 3] = [Self::Graphics, Self::Compute, Self::Transfer];

    /// Dense index of this queue type.
    pub const fn index(self) -> usize {
        match self {
            Self::Graphics => 0,
            Self::Compute => 1,
            Self::Transfer => 2,
        }
    }

    /// Human readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Graphics => "graphics",
            Self::Compute => "compute",
            Self::Transfer => "transfer",
        }
    }
}

/// RGBA clear color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorValue {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorValue {
    /// Create a new color value.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for ColorValue {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

/// Depth and stencil clear values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilValue {
    pub depth: f32,
    pub stencil: u8,
}

impl Default for DepthStencilValue {
    fn default() -> Self {
        Self {
            depth: 1.0,
            stencil: 0xff,
        }
    }
}

/// Clear value for render targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Clear a color attachment.
    Color(ColorValue),
    /// Clear a depth/stencil attachment.
    DepthStencil(DepthStencilValue),
}

impl ClearValue {
    /// Create a color clear value.
    pub const fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color(ColorValue::new(r, g, b, a))
    }

    /// Create a depth clear value with the default stencil.
    pub fn depth(depth: f32) -> Self {
        Self::DepthStencil(DepthStencilValue {
            depth,
            ..Default::default()
        })
    }
}

/// Operation to perform when loading an attachment at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoadOp {
    /// Clear the attachment with a specified value.
    Clear(ClearValue),
    /// Load the existing contents of the attachment.
    #[default]
    Load,
    /// Don't care about the existing contents.
    DontCare,
}

impl LoadOp {
    /// Create a clear operation with a color value.
    pub const fn clear_color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Clear(ClearValue::color(r, g, b, a))
    }

    /// Create a clear operation with a depth value.
    pub fn clear_depth(depth: f32) -> Self {
        Self::Clear(ClearValue::depth(depth))
    }
}

/// Operation to perform when storing an attachment at the end of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    /// Store the attachment contents for later use.
    #[default]
    Store,
    /// Don't care about the contents after the pass.
    DontCare,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_scaled() {
        let extent = Extent2d::new(1600, 1200);
        assert_eq!(extent.scaled(0.5, 0.5), Extent2d::new(800, 600));
        assert_eq!(extent.scaled(1.0, 1.0), extent);
        assert_eq!(Extent2d::new(1, 1).scaled(0.25, 0.25), Extent2d::new(1, 1));
    }

    #[test]
    fn test_queue_index() {
        for (i, queue) in QueueType::ALL.iter().enumerate() {
            assert_eq!(queue.index(), i);
        }
    }

    #[test]
    fn test_clear_defaults() {
        assert_eq!(ColorValue::default(), ColorValue::new(1.0, 1.0, 1.0, 1.0));
        let ds = DepthStencilValue::default();
        assert_eq!(ds.depth, 1.0);
        assert_eq!(ds.stencil, 0xff);
        assert_eq!(LoadOp::default(), LoadOp::Load);
        assert_eq!(StoreOp::default(), StoreOp::Store);
    }
}
