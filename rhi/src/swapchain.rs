//! Swapchain abstraction.
//!
//! A swapchain is a ring of presentable images. The image handed out by
//! [`Swapchain::current_image`] changes after every [`Swapchain::present`],
//! so the frame scheduler never caches it and re-resolves it on each access.
//!
//! Window-system integration lives in the backend; this crate only needs the
//! ring semantics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::backend::{BackendError, BackendResult, GpuBackend, ImageHandle};
use crate::types::{Extent2d, Format, ImageDescriptor, ImageUsage};

/// Presentation mode for the swapchain.
///
/// Controls how frames are synchronized with the display refresh rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// No synchronization. May cause tearing but has lowest latency.
    Immediate,
    /// Triple buffering. Low latency without tearing.
    Mailbox,
    /// VSync enabled. No tearing, but may have higher latency.
    #[default]
    Fifo,
}

/// Parameters of a swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainCreateInfo {
    /// Number of images in the ring.
    pub image_count: u32,
    /// Format of every image.
    pub format: Format,
    /// Size of every image.
    pub extent: Extent2d,
    /// Usage applied to every image.
    pub usage: ImageUsage,
    /// Presentation mode.
    pub present_mode: PresentMode,
}

impl SwapchainCreateInfo {
    /// Create a swapchain description with color attachment usage.
    pub fn new(image_count: u32, format: Format, extent: Extent2d) -> Self {
        Self {
            image_count,
            format,
            extent,
            usage: ImageUsage::COLOR_ATTACHMENT,
            present_mode: PresentMode::default(),
        }
    }

    /// Set the present mode.
    pub fn with_present_mode(mut self, mode: PresentMode) -> Self {
        self.present_mode = mode;
        self
    }

    /// Set the image usage.
    pub fn with_usage(mut self, usage: ImageUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Ring of presentable images.
pub trait Swapchain: Send + Sync {
    /// Number of images in the ring.
    fn image_count(&self) -> u32;

    /// Index of the image currently acquired.
    fn current_image_index(&self) -> u32;

    /// The image currently acquired.
    fn current_image(&self) -> ImageHandle;

    /// Format of the images.
    fn format(&self) -> Format;

    /// Size of the images.
    fn extent(&self) -> Extent2d;

    /// Recreate the images at a new size.
    fn resize(&self, extent: Extent2d) -> BackendResult<()>;

    /// Present the current image and acquire the next one.
    fn present(&self) -> BackendResult<()>;
}

/// Swapchain backed by plain images of a [`GpuBackend`], without a window.
pub struct DummySwapchain {
    backend: Arc<dyn GpuBackend>,
    info: Mutex<SwapchainCreateInfo>,
    images: Mutex<Vec<ImageHandle>>,
    current: AtomicU32,
    presents: AtomicU64,
}

impl DummySwapchain {
    /// Create the swapchain images through `backend`.
    pub fn new(backend: Arc<dyn GpuBackend>, info: SwapchainCreateInfo) -> BackendResult<Self> {
        if info.image_count == 0 || info.extent.is_empty() {
            return Err(BackendError::InitializationFailed(format!(
                "swapchain with {} images of {}x{}",
                info.image_count, info.extent.width, info.extent.height
            )));
        }
        let images = Self::create_images(backend.as_ref(), &info)?;
        log::debug!(
            "Created swapchain with {} images ({}x{}, {:?})",
            info.image_count,
            info.extent.width,
            info.extent.height,
            info.present_mode
        );
        Ok(Self {
            backend,
            info: Mutex::new(info),
            images: Mutex::new(images),
            current: AtomicU32::new(0),
            presents: AtomicU64::new(0),
        })
    }

    fn create_images(
        backend: &dyn GpuBackend,
        info: &SwapchainCreateInfo,
    ) -> BackendResult<Vec<ImageHandle>> {
        let descriptor = ImageDescriptor::new_2d(
            info.extent.width,
            info.extent.height,
            info.format,
            info.usage,
        );
        let mut images = Vec::with_capacity(info.image_count as usize);
        for i in 0..info.image_count {
            match backend.create_image(&format!("swapchain[{i}]"), &descriptor) {
                Ok(image) => images.push(image),
                Err(err) => {
                    for image in images {
                        backend.destroy_image(image);
                    }
                    return Err(err);
                }
            }
        }
        Ok(images)
    }

    /// Number of presents so far.
    pub fn present_count(&self) -> u64 {
        self.presents.load(Ordering::Acquire)
    }

    /// Every image of the ring.
    pub fn images(&self) -> Vec<ImageHandle> {
        self.images.lock().clone()
    }
}

impl Swapchain for DummySwapchain {
    fn image_count(&self) -> u32 {
        self.info.lock().image_count
    }

    fn current_image_index(&self) -> u32 {
        self.current.load(Ordering::Acquire)
    }

    fn current_image(&self) -> ImageHandle {
        let images = self.images.lock();
        images[self.current.load(Ordering::Acquire) as usize % images.len()]
    }

    fn format(&self) -> Format {
        self.info.lock().format
    }

    fn extent(&self) -> Extent2d {
        self.info.lock().extent
    }

    fn resize(&self, extent: Extent2d) -> BackendResult<()> {
        let mut info = self.info.lock();
        if extent.is_empty() {
            return Err(BackendError::ResourceCreationFailed(format!(
                "swapchain resize to {}x{}",
                extent.width, extent.height
            )));
        }
        let mut new_info = *info;
        new_info.extent = extent;
        let new_images = Self::create_images(self.backend.as_ref(), &new_info)?;
        let old_images = std::mem::replace(&mut *self.images.lock(), new_images);
        for image in old_images {
            self.backend.destroy_image(image);
        }
        *info = new_info;
        self.current.store(0, Ordering::Release);
        log::debug!("Swapchain resized to {}x{}", extent.width, extent.height);
        Ok(())
    }

    fn present(&self) -> BackendResult<()> {
        let count = self.image_count();
        let next = (self.current.load(Ordering::Acquire) + 1) % count;
        self.current.store(next, Ordering::Release);
        self.presents.fetch_add(1, Ordering::AcqRel);
        log::trace!("DummySwapchain: presented, next image {}", next);
        Ok(())
    }
}

impl Drop for DummySwapchain {
    fn drop(&mut self) {
        for image in self.images.get_mut().drain(..) {
            self.backend.destroy_image(image);
        }
    }
}

static_assertions::assert_impl_all!(DummySwapchain: Send, Sync);
