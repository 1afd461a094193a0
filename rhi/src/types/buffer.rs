//! Buffer types and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 3;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 4;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 5;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self { size, usage }
    }

    /// Check the descriptor, panicking on invalid parameters.
    pub fn validate(&self) {
        assert!(self.size != 0, "buffer descriptor has a zero size");
        assert!(!self.usage.is_empty(), "buffer descriptor has no usage flags");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_descriptor() {
        let desc = BufferDescriptor::new(256, BufferUsage::STORAGE | BufferUsage::COPY_DST);
        desc.validate();
        assert!(desc.usage.contains(BufferUsage::STORAGE));
    }

    #[test]
    #[should_panic(expected = "zero size")]
    fn test_zero_size_panics() {
        BufferDescriptor::new(0, BufferUsage::STORAGE).validate();
    }

    #[test]
    #[should_panic(expected = "no usage flags")]
    fn test_empty_usage_panics() {
        BufferDescriptor::new(64, BufferUsage::empty()).validate();
    }
}
